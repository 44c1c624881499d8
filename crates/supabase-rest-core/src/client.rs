use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use url::Url;

use crate::config::ClientConfig;
use crate::error::RestError;
use crate::platform::RequestOptions;
use crate::store::{SessionStore, SharedStorage};

/// The main client for talking to a Supabase project over REST.
///
/// Cheap to clone. Holds one HTTP connection pool, the configuration and
/// the session store; the query and auth crates extend it with
/// `from(...)` and `auth()`.
#[derive(Debug, Clone)]
pub struct SupabaseRestClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn SessionStore>,
}

impl SupabaseRestClient {
    /// Create a client with a private in-memory session store.
    pub fn new(config: ClientConfig) -> Result<Self, RestError> {
        let store = SharedStorage::new().context_with_key(config.storage_key.clone());
        Self::with_store(config, Arc::new(store))
    }

    /// Create a client over an existing session store.
    ///
    /// The store must publish under `config.storage_key`; a mismatch is a
    /// configuration error.
    pub fn with_store(config: ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, RestError> {
        config.validate()?;
        HeaderValue::from_str(&config.anon_key)?;
        if store.key() != config.storage_key {
            return Err(RestError::config(format!(
                "session store key {:?} does not match configured storage key {:?}",
                store.key(),
                config.storage_key
            )));
        }

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                store,
            }),
        })
    }

    /// Create a client from `SUPABASE_URL` / `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Result<Self, RestError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    pub fn supabase_url(&self) -> &str {
        &self.inner.config.supabase_url
    }

    pub fn api_key(&self) -> &str {
        &self.inner.config.anon_key
    }

    /// `{base}/rest/v1/{table}`
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.supabase_url(), table)
    }

    /// `{base}/auth/v1{path}`; `path` may carry a query string.
    pub fn auth_url(&self, path: &str) -> Result<Url, RestError> {
        let mut url = Url::parse(&format!("{}/auth/v1", self.supabase_url()))?;
        let current = url.path().to_string();
        match path.split_once('?') {
            Some((p, query)) => {
                url.set_path(&format!("{current}{p}"));
                url.set_query(Some(query));
            }
            None => url.set_path(&format!("{current}{path}")),
        }
        Ok(url)
    }

    /// Headers every REST request carries, computed from the store right now.
    ///
    /// `apikey` and `Content-Profile` are always present; `Authorization`
    /// only when a token bundle is stored.
    pub fn auth_headers(&self) -> Result<HeaderMap, RestError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(self.api_key())?);
        headers.insert("Content-Profile", HeaderValue::from_str(&self.config().schema)?);
        if let Some(bundle) = self.store().load() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", bundle.access_token))?,
            );
        }
        Ok(headers)
    }

    /// Merge per-call options with the configured defaults.
    pub fn request_options(&self, overrides: RequestOptions) -> RequestOptions {
        overrides.or_timeout(self.config().request_timeout)
    }
}
