//! GoTrue auth for `supabase-rest`.
//!
//! Talks to the `/auth/v1/...` endpoints and keeps the resulting token
//! bundle in the client's [`SessionStore`](supabase_rest_core::SessionStore),
//! so every later REST request carries the bearer token.
//!
//! # Usage
//!
//! ```ignore
//! use supabase_rest::prelude::*;
//!
//! let client = SupabaseRestClient::from_env()?;
//! let auth = client.auth();
//!
//! let _watch = auth
//!     .on_auth_state_change(|change| println!("{} {:?}", change.event, change.session))
//!     .await;
//!
//! auth.sign_in_with_password(SignInCredentials::new("user@example.com", "pass")).await;
//! let session = auth.get_session().await;
//! auth.sign_out().await;
//! ```

pub mod client;
pub mod error;
pub mod params;
pub mod types;

pub use client::{AuthClient, AuthSubscription};
pub use error::GoTrueErrorResponse;
pub use params::*;
pub use types::*;

use supabase_rest_core::SupabaseRestClient;

/// Extension trait to get an [`AuthClient`] from a [`SupabaseRestClient`].
pub trait SupabaseRestAuthExt {
    /// An auth client sharing this client's HTTP pool and session store.
    fn auth(&self) -> AuthClient;
}

impl SupabaseRestAuthExt for SupabaseRestClient {
    fn auth(&self) -> AuthClient {
        AuthClient::new(self.clone())
    }
}
