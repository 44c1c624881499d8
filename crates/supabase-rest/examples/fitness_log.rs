//! Sign in, log a workout, read it back, and sign out.
//!
//! Run with: cargo run --example fitness_log -p supabase-rest
//!
//! Requires `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `DEMO_EMAIL` and
//! `DEMO_PASSWORD`, plus an `exercises` table readable by the user.

use serde_json::json;
use supabase_rest::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = SupabaseRestClient::from_env()?;
    let auth = client.auth();

    let _watch = auth
        .on_auth_state_change(|change| println!("  [auth] {}", change.event))
        .await;

    let email = std::env::var("DEMO_EMAIL")?;
    let password = std::env::var("DEMO_PASSWORD")?;

    println!("=== Sign in ===");
    let token = auth
        .sign_in_with_password(SignInCredentials::new(email, password))
        .await
        .into_result()?;
    let user_id = token.user.map(|u| u.id).unwrap_or_default();
    println!("  Signed in as {user_id}");

    println!("\n=== Insert ===");
    let saved = client
        .from("exercises")
        .insert(
            json!({"user_id": user_id, "kind": "run", "minutes": 30}),
            InsertOptions::new().single(),
        )
        .await
        .into_result()?;
    println!("  Saved {saved}");

    println!("\n=== Latest workouts ===");
    let rows = client
        .from("exercises")
        .select("*")
        .eq("user_id", user_id.as_str())
        .order("created_at", OrderOptions::ascending(false))
        .limit(5)
        .await
        .into_result()?;
    for row in rows.as_array().into_iter().flatten() {
        println!("  {row}");
    }

    let total = client
        .from("exercises")
        .count()
        .eq("user_id", user_id.as_str())
        .await
        .into_result()?;
    println!("  {total} workouts in total");

    println!("\n=== Sign out ===");
    auth.sign_out().await.into_result()?;
    Ok(())
}
