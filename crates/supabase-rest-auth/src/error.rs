use serde::Deserialize;
use serde_json::Value as JsonValue;

use supabase_rest_core::ErrorInfo;

/// Error body returned by GoTrue.
///
/// The shape varies between versions; this covers the common fields.
#[derive(Debug, Clone, Deserialize)]
pub struct GoTrueErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl GoTrueErrorResponse {
    /// The most informative message in the body, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
    }
}

/// Turn a non-2xx GoTrue response body into an [`ErrorInfo`].
///
/// JSON bodies keep their full content in `details`; anything else is
/// wrapped as the message.
pub(crate) fn parse_error_body(status: u16, text: &str) -> ErrorInfo {
    let fallback = || {
        if text.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            text.to_string()
        }
    };

    let Ok(json) = serde_json::from_str::<JsonValue>(text) else {
        return ErrorInfo::http(status, fallback());
    };

    let mut info = match serde_json::from_value::<GoTrueErrorResponse>(json.clone()) {
        Ok(body) => {
            let message = body.error_message().map(str::to_string).unwrap_or_else(fallback);
            let info = ErrorInfo::http(status, message);
            match body.error_code {
                Some(code) => info.with_code(code),
                None => info,
            }
        }
        Err(_) => ErrorInfo::http(status, fallback()),
    };
    info.details = Some(json);
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_priority() {
        let info = parse_error_body(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials","error_code":"invalid_credentials"}"#,
        );
        assert_eq!(info.message, "Invalid login credentials");
        assert_eq!(info.status, Some(400));
        assert_eq!(info.code.as_deref(), Some("invalid_credentials"));
        assert!(info.details.is_some());

        let info = parse_error_body(422, r#"{"msg":"Password should be at least 6 characters","message":"other"}"#);
        assert_eq!(info.message, "Password should be at least 6 characters");
    }

    #[test]
    fn raw_text_fallback() {
        let info = parse_error_body(502, "Bad Gateway");
        assert_eq!(info.message, "Bad Gateway");
        assert_eq!(info.status, Some(502));
        assert!(info.details.is_none());

        let info = parse_error_body(500, "");
        assert_eq!(info.message, "HTTP 500");
    }
}
