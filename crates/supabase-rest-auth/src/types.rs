use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use supabase_rest_core::TokenBundle;

/// A GoTrue user object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: Option<JsonValue>,
    #[serde(default)]
    pub app_metadata: Option<JsonValue>,
}

/// Body of a successful `/token` exchange (password or refresh grant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

impl TokenResponse {
    /// The bundle to persist. When the server omits `expires_at` it is
    /// derived from `expires_in` relative to `now` (unix seconds).
    pub fn to_bundle_at(&self, now: i64) -> TokenBundle {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs));
        TokenBundle::new(self.access_token.clone(), self.refresh_token.clone(), expires_at)
    }

    pub fn to_bundle(&self) -> TokenBundle {
        self.to_bundle_at(Utc::now().timestamp())
    }
}

/// Result of a sign-up.
///
/// Auto-confirming projects return tokens right away (`session` is set);
/// otherwise only the created user comes back and the caller should ask
/// the user to confirm their email.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub session: Option<TokenResponse>,
    pub user: Option<User>,
}

impl AuthResponse {
    pub fn needs_confirmation(&self) -> bool {
        self.session.is_none()
    }
}

/// The current session: stored tokens plus the server-confirmed user.
///
/// Never persisted; rebuilt by every `get_session()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    pub(crate) fn from_bundle(bundle: TokenBundle, user: User) -> Self {
        Self {
            access_token: bundle.access_token,
            refresh_token: bundle.refresh_token,
            expires_at: bundle.expires_at,
            user,
        }
    }
}

/// Data half of `get_session()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub session: Option<Session>,
}

/// Auth state as seen by an `on_auth_state_change` handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
}

impl fmt::Display for AuthChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedIn => write!(f, "SIGNED_IN"),
            Self::SignedOut => write!(f, "SIGNED_OUT"),
        }
    }
}

/// One delivery to an `on_auth_state_change` handler.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthStateChange {
    pub(crate) fn from_session(session: Option<Session>) -> Self {
        let event = if session.is_some() {
            AuthChangeEvent::SignedIn
        } else {
            AuthChangeEvent::SignedOut
        };
        Self { event, session }
    }
}
