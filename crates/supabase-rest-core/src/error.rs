use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Error code for a single-row request that matched zero rows.
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Error code for a failure before any HTTP response existed.
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";

/// Error code for a request stopped by its cancellation token.
pub const CANCELLED_CODE: &str = "REQUEST_CANCELLED";

/// Error code for an update/delete rejected because it had no filters.
pub const UNSCOPED_MUTATION_CODE: &str = "UNSCOPED_MUTATION";

/// Internal errors raised while preparing or sending a request.
///
/// These never cross the public boundary directly; they are folded into an
/// [`ErrorInfo`] inside a [`RestResponse`](crate::RestResponse).
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RestError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Broad classification of an [`ErrorInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failed before a response existed (DNS, connect, timeout).
    Network,
    /// A `single()` read matched no rows.
    NoRows,
    /// The server answered with a non-2xx status.
    Http,
    /// The caller cancelled the request.
    Cancelled,
    /// Everything raised locally: bad config, serialization, guards.
    Client,
}

/// The error half of every `{ data, error }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl ErrorInfo {
    /// An error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
            details: None,
        }
    }

    /// Transport-level failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(message).with_code(NETWORK_ERROR_CODE)
    }

    /// Zero rows matched a single-row request.
    pub fn no_rows() -> Self {
        Self::new("No rows returned").with_code(NO_ROWS_CODE)
    }

    /// Non-2xx response.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(message).with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self.code.as_deref() {
            Some(NETWORK_ERROR_CODE) => ErrorKind::Network,
            Some(NO_ROWS_CODE) if self.status.is_none() => ErrorKind::NoRows,
            Some(CANCELLED_CODE) => ErrorKind::Cancelled,
            _ if self.status.is_some() => ErrorKind::Http,
            _ => ErrorKind::Client,
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    pub fn is_no_rows(&self) -> bool {
        self.code.as_deref() == Some(NO_ROWS_CODE)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, "[{code}] ({status}) {}", self.message),
            (Some(code), None) => write!(f, "[{code}] {}", self.message),
            (None, Some(status)) => write!(f, "({status}) {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ErrorInfo {}

impl From<RestError> for ErrorInfo {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) if e.is_decode() => ErrorInfo::new(e.to_string()),
            RestError::Http(e) => ErrorInfo::network(e.to_string()),
            RestError::Timeout(_) => ErrorInfo::network(err.to_string()),
            RestError::Cancelled => ErrorInfo::new(err.to_string()).with_code(CANCELLED_CODE),
            other => ErrorInfo::new(other.to_string()),
        }
    }
}
