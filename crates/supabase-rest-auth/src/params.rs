use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Email/password credentials for `/token?grant_type=password`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

impl SignInCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Body of a `/signup` request.
///
/// `data` becomes the new user's `user_metadata` and is always sent,
/// as `{}` when no profile data was given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpParams {
    pub email: String,
    pub password: String,
    #[serde(default = "empty_object")]
    pub data: JsonValue,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Default::default())
}

impl SignUpParams {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            data: empty_object(),
        }
    }

    /// Attach profile data.
    pub fn data(mut self, data: JsonValue) -> Self {
        self.data = data;
        self
    }
}

/// Options for `reset_password_for_email`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ResetPasswordOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl ResetPasswordOptions {
    pub fn redirect_to(url: impl Into<String>) -> Self {
        Self {
            redirect_to: Some(url.into()),
        }
    }
}

/// Attributes accepted by `PUT /user`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateUserParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl UpdateUserParams {
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}
