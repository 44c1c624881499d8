use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tokio::sync::mpsc;

use supabase_rest_core::platform::{self, RequestOptions, SpawnHandle};
use supabase_rest_core::store::StorageEvent;
use supabase_rest_core::{
    ErrorInfo, RestError, RestResponse, SessionStore, Subscription, SupabaseRestClient,
    TokenBundle,
};

use crate::error::parse_error_body;
use crate::params::{ResetPasswordOptions, SignInCredentials, SignUpParams, UpdateUserParams};
use crate::types::*;

const NO_TOKEN_MESSAGE: &str = "No authentication token found";

/// GoTrue client bound to a [`SupabaseRestClient`] and its session store.
///
/// Every operation returns a [`RestResponse`]; nothing here returns `Err`
/// or panics on bad credentials, HTTP errors or network failures.
///
/// # Example
/// ```ignore
/// use supabase_rest::prelude::*;
///
/// let client = SupabaseRestClient::from_env()?;
/// let auth = client.auth();
/// let res = auth
///     .sign_in_with_password(SignInCredentials::new("user@example.com", "password"))
///     .await;
/// if let Some(err) = res.error_info() {
///     eprintln!("sign-in failed: {}", err.message);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: SupabaseRestClient,
}

impl AuthClient {
    pub fn new(client: SupabaseRestClient) -> Self {
        Self { client }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        self.client.store()
    }

    // ─── Session ───────────────────────────────────────────────

    /// The current session, confirmed against `GET /user`.
    ///
    /// No stored bundle, an expired bundle, or a bundle the server rejects
    /// all yield `session: None`; the latter two also clear the store.
    /// Expiry is decided locally, without a network call.
    pub async fn get_session(&self) -> RestResponse<SessionData> {
        self.load_session().await.into()
    }

    async fn load_session(&self) -> Result<SessionData, ErrorInfo> {
        let Some(bundle) = self.store().load() else {
            return Ok(SessionData::default());
        };

        if bundle.is_expired() {
            tracing::debug!(expires_at = ?bundle.expires_at, "Stored session expired, clearing it");
            self.store().clear();
            return Ok(SessionData::default());
        }

        let request = self
            .request(Method::GET, "/user")?
            .bearer_auth(&bundle.access_token);
        let resp = self.send(request).await?;

        if !resp.status().is_success() {
            tracing::debug!(status = resp.status().as_u16(), "Stored token rejected, clearing it");
            self.store().clear();
            return Ok(SessionData::default());
        }

        let user: User = read_json(resp).await?;
        Ok(SessionData {
            session: Some(Session::from_bundle(bundle, user)),
        })
    }

    /// Watch auth state.
    ///
    /// `handler` runs once with the current state before this returns, then
    /// again (with freshly computed state) every time the session store
    /// reports a change to the token key. Deliveries are sequential. Drop
    /// or [`unsubscribe`](AuthSubscription::unsubscribe) the returned
    /// handle to stop.
    pub async fn on_auth_state_change<F>(&self, handler: F) -> AuthSubscription
    where
        F: Fn(AuthStateChange) + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let key = self.store().key().to_string();
        let subscription = self.store().subscribe(Arc::new(move |event: &StorageEvent| {
            if event.key == key {
                let _ = tx.send(());
            }
        }));

        handler(self.current_state().await);

        let auth = self.clone();
        let task = platform::spawn(async move {
            while rx.recv().await.is_some() {
                handler(auth.current_state().await);
            }
        });

        AuthSubscription {
            _subscription: subscription,
            task,
        }
    }

    async fn current_state(&self) -> AuthStateChange {
        let (data, error) = self.get_session().await.into_parts();
        if let Some(err) = error {
            tracing::warn!("Could not resolve session for auth state change: {err}");
        }
        AuthStateChange::from_session(data.and_then(|d| d.session))
    }

    // ─── Sign In / Sign Up ─────────────────────────────────────

    /// Exchange email and password for tokens and persist them.
    ///
    /// Listeners in this context are notified as well as other contexts.
    pub async fn sign_in_with_password(
        &self,
        credentials: SignInCredentials,
    ) -> RestResponse<TokenResponse> {
        self.sign_in_inner(credentials).await.into()
    }

    async fn sign_in_inner(&self, credentials: SignInCredentials) -> Result<TokenResponse, ErrorInfo> {
        let request = self
            .request(Method::POST, "/token?grant_type=password")?
            .json(&credentials);
        let resp = self.send(request).await?;
        let token: TokenResponse = read_json(resp).await?;
        self.persist(&token);
        tracing::debug!(user_id = ?token.user.as_ref().map(|u| &u.id), "Signed in with password");
        Ok(token)
    }

    /// Register a user.
    ///
    /// When the project auto-confirms and the response carries tokens they
    /// are persisted just like a sign-in; otherwise the store is untouched.
    pub async fn sign_up(&self, params: SignUpParams) -> RestResponse<AuthResponse> {
        self.sign_up_inner(params).await.into()
    }

    async fn sign_up_inner(&self, params: SignUpParams) -> Result<AuthResponse, ErrorInfo> {
        let request = self.request(Method::POST, "/signup")?.json(&params);
        let resp = self.send(request).await?;
        let body: JsonValue = read_json(resp).await?;

        let has_token = body
            .get("access_token")
            .and_then(JsonValue::as_str)
            .is_some_and(|t| !t.is_empty());

        if has_token {
            let token: TokenResponse =
                serde_json::from_value(body).map_err(RestError::from)?;
            self.persist(&token);
            tracing::debug!("Signed up with an auto-confirmed session");
            return Ok(AuthResponse {
                user: token.user.clone(),
                session: Some(token),
            });
        }

        let user = serde_json::from_value::<User>(body.clone())
            .ok()
            .or_else(|| body.get("user").cloned().and_then(|u| serde_json::from_value(u).ok()));
        tracing::debug!("Signed up, confirmation pending");
        Ok(AuthResponse {
            session: None,
            user,
        })
    }

    /// Exchange the stored refresh token for a new bundle.
    ///
    /// Never called implicitly; `get_session` clears expired bundles.
    pub async fn refresh_session(&self) -> RestResponse<TokenResponse> {
        self.refresh_inner().await.into()
    }

    async fn refresh_inner(&self) -> Result<TokenResponse, ErrorInfo> {
        let bundle = self
            .store()
            .load()
            .filter(|b| !b.refresh_token.is_empty())
            .ok_or_else(|| ErrorInfo::new("No refresh token found"))?;

        let request = self
            .request(Method::POST, "/token?grant_type=refresh_token")?
            .json(&json!({ "refresh_token": bundle.refresh_token }));
        let resp = self.send(request).await?;
        let token: TokenResponse = read_json(resp).await?;
        self.persist(&token);
        tracing::debug!("Session refreshed");
        Ok(token)
    }

    // ─── Sign Out ──────────────────────────────────────────────

    /// Sign out.
    ///
    /// The logout call is best-effort: the store is cleared whatever its
    /// outcome. An HTTP rejection is only logged; a transport failure is
    /// reported in the envelope after local cleanup.
    pub async fn sign_out(&self) -> RestResponse<()> {
        let Some(bundle) = self.store().load() else {
            self.store().clear();
            return RestResponse::ok(());
        };

        let outcome = match self.logout(&bundle).await {
            Ok(status) if !(200..300).contains(&status) => {
                tracing::warn!(status, "Logout rejected by server, clearing session anyway");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::warn!("Logout request failed, clearing session anyway: {err}");
                Err(ErrorInfo::from(err))
            }
        };

        self.store().clear();
        self.store().notify_local(None);
        tracing::debug!("Signed out");
        outcome.into()
    }

    async fn logout(&self, bundle: &TokenBundle) -> Result<u16, RestError> {
        let request = self
            .request(Method::POST, "/logout")?
            .bearer_auth(&bundle.access_token);
        let resp = self.send(request).await?;
        Ok(resp.status().as_u16())
    }

    // ─── Password Recovery ─────────────────────────────────────

    /// Ask GoTrue to email a recovery link.
    pub async fn reset_password_for_email(
        &self,
        email: &str,
        options: ResetPasswordOptions,
    ) -> RestResponse<()> {
        self.reset_inner(email, options).await.into()
    }

    async fn reset_inner(&self, email: &str, options: ResetPasswordOptions) -> Result<(), ErrorInfo> {
        let mut body = json!({ "email": email });
        if let Some(redirect) = options.redirect_to {
            body["redirect_to"] = json!(redirect);
        }
        let request = self.request(Method::POST, "/recover")?.json(&body);
        let resp = self.send(request).await?;
        read_empty(resp).await
    }

    // ─── User ──────────────────────────────────────────────────

    /// Update the signed-in user. Fails fast when no token is stored.
    pub async fn update_user(&self, params: UpdateUserParams) -> RestResponse<User> {
        self.update_user_inner(params).await.into()
    }

    async fn update_user_inner(&self, params: UpdateUserParams) -> Result<User, ErrorInfo> {
        let bundle = self
            .store()
            .load()
            .ok_or_else(|| ErrorInfo::new(NO_TOKEN_MESSAGE))?;
        let request = self
            .request(Method::PUT, "/user")?
            .bearer_auth(&bundle.access_token)
            .json(&params);
        let resp = self.send(request).await?;
        read_json(resp).await
    }

    /// Fetch the user behind an arbitrary access token.
    pub async fn get_user(&self, access_token: &str) -> RestResponse<User> {
        self.get_user_inner(access_token).await.into()
    }

    async fn get_user_inner(&self, access_token: &str) -> Result<User, ErrorInfo> {
        let request = self.request(Method::GET, "/user")?.bearer_auth(access_token);
        let resp = self.send(request).await?;
        read_json(resp).await
    }

    // ─── Internal Helpers ──────────────────────────────────────

    fn persist(&self, token: &TokenResponse) {
        let bundle = token.to_bundle();
        self.store().save(&bundle);
        self.store().notify_local(bundle.to_storage_string().ok());
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RestError> {
        let url = self.client.auth_url(path)?;
        tracing::debug!(method = %method, path = url.path(), "Sending auth request");
        Ok(self
            .client
            .http()
            .request(method, url)
            .header("apikey", self.client.api_key()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RestError> {
        let options = self.client.request_options(RequestOptions::default());
        platform::bounded(&options, async { request.send().await.map_err(RestError::from) }).await
    }
}

async fn read_body(resp: reqwest::Response) -> Result<String, ErrorInfo> {
    let status = resp.status().as_u16();
    let text = resp.text().await.map_err(RestError::from)?;
    if !(200..300).contains(&status) {
        return Err(parse_error_body(status, &text));
    }
    Ok(text)
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ErrorInfo> {
    let text = read_body(resp).await?;
    serde_json::from_str(&text).map_err(|e| RestError::from(e).into())
}

async fn read_empty(resp: reqwest::Response) -> Result<(), ErrorInfo> {
    read_body(resp).await.map(|_| ())
}

/// Handle returned by [`AuthClient::on_auth_state_change`].
#[must_use = "dropping an AuthSubscription stops delivery immediately"]
#[derive(Debug)]
pub struct AuthSubscription {
    _subscription: Subscription,
    task: SpawnHandle,
}

impl AuthSubscription {
    /// Stop delivering auth state changes.
    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
