use std::time::Duration;

use crate::error::RestError;
use crate::store::DEFAULT_STORAGE_KEY;

/// Configuration for talking to a Supabase project over REST.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project URL (e.g. "https://xyz.supabase.co"), without trailing slash.
    pub supabase_url: String,
    /// Anon key, sent as the `apikey` header on every request.
    pub anon_key: String,
    /// Schema sent as `Content-Profile` (defaults to "public").
    pub schema: String,
    /// Key the token bundle is stored under.
    pub storage_key: String,
    /// Default per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Reject update/delete without filters unless `.all()` was called.
    pub require_mutation_filters: bool,
}

impl ClientConfig {
    /// Create a config from a project URL and anon key.
    pub fn new(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url: String = supabase_url.into();
        Self {
            supabase_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            schema: "public".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            request_timeout: None,
            require_mutation_filters: false,
        }
    }

    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY` (required) plus
    /// `SUPABASE_SCHEMA` and `SUPABASE_REQUEST_TIMEOUT_SECS` (optional).
    pub fn from_env() -> Result<Self, RestError> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| RestError::config("SUPABASE_URL is not set"))?;
        let key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| RestError::config("SUPABASE_ANON_KEY is not set"))?;

        let mut config = Self::new(url, key);
        if let Ok(schema) = std::env::var("SUPABASE_SCHEMA") {
            config = config.schema(schema);
        }
        if let Ok(secs) = std::env::var("SUPABASE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                RestError::config(format!("SUPABASE_REQUEST_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config = config.request_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the storage key for the token bundle.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the default request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Enable or disable the unscoped update/delete guard.
    pub fn require_mutation_filters(mut self, enabled: bool) -> Self {
        self.require_mutation_filters = enabled;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RestError> {
        if self.supabase_url.is_empty() {
            return Err(RestError::config("supabase_url must not be empty"));
        }
        if self.anon_key.is_empty() {
            return Err(RestError::config("anon_key must not be empty"));
        }
        url::Url::parse(&self.supabase_url)?;
        Ok(())
    }
}
