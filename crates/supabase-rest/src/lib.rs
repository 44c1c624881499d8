//! A hand-built client for a Supabase project's REST surface: PostgREST
//! queries through `client.from(table)` and GoTrue auth through
//! `client.auth()`, sharing one session store.
//!
//! ```ignore
//! use supabase_rest::prelude::*;
//!
//! let client = SupabaseRestClient::from_env()?;
//! client
//!     .auth()
//!     .sign_in_with_password(SignInCredentials::new("user@example.com", "pass"))
//!     .await;
//! let rows = client.from("exercises").select("*").eq("user_id", "u1").await;
//! ```

// Re-export core (always available)
pub use supabase_rest_core::*;

// Re-export query builder (feature-gated)
#[cfg(feature = "query")]
pub use supabase_rest_query::*;

// Re-export auth crate
#[cfg(feature = "auth")]
pub use supabase_rest_auth;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use supabase_rest::prelude::*;
/// ```
pub mod prelude {
    pub use supabase_rest_core::row;
    pub use supabase_rest_core::{
        ClientConfig, ErrorInfo, ErrorKind, RestResponse, Row, SessionStore, SharedStorage,
        SupabaseRestClient, TokenBundle,
    };

    #[cfg(feature = "query")]
    pub use supabase_rest_query::{
        Filterable, InsertOptions, Modifiable, OrderDirection, OrderOptions, SupabaseRestQueryExt,
        UpdateOptions,
    };

    #[cfg(feature = "auth")]
    pub use supabase_rest_auth::{
        AuthChangeEvent, AuthClient, AuthResponse, AuthStateChange, AuthSubscription,
        ResetPasswordOptions, Session, SessionData, SignInCredentials, SignUpParams,
        SupabaseRestAuthExt, TokenResponse, UpdateUserParams, User,
    };
}
