use crate::error::ErrorInfo;

/// Response type matching Supabase's `{ data, error }` pattern.
///
/// Exactly one side is present: the only constructors are [`ok`](Self::ok)
/// and [`error`](Self::error).
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse<T> {
    data: Option<T>,
    error: Option<ErrorInfo>,
}

impl<T> RestResponse<T> {
    /// A successful response.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// A failed response.
    pub fn error(err: impl Into<ErrorInfo>) -> Self {
        Self {
            data: None,
            error: Some(err.into()),
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error_info(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Convert into a Result, consuming the response.
    pub fn into_result(self) -> Result<T, ErrorInfo> {
        match (self.data, self.error) {
            (_, Some(err)) => Err(err),
            (Some(data), None) => Ok(data),
            (None, None) => Err(ErrorInfo::new("Response carried neither data nor error")),
        }
    }

    /// Split into the raw `(data, error)` pair.
    pub fn into_parts(self) -> (Option<T>, Option<ErrorInfo>) {
        (self.data, self.error)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RestResponse<U> {
        RestResponse {
            data: self.data.map(f),
            error: self.error,
        }
    }

    /// Chain a fallible conversion of the data.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> RestResponse<U>) -> RestResponse<U> {
        match self.into_result() {
            Ok(data) => f(data),
            Err(err) => RestResponse::error(err),
        }
    }
}

impl<T> From<Result<T, ErrorInfo>> for RestResponse<T> {
    fn from(result: Result<T, ErrorInfo>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_side_is_set() {
        let ok = RestResponse::ok(5);
        assert_eq!(ok.data(), Some(&5));
        assert!(ok.error_info().is_none());

        let err: RestResponse<i32> = RestResponse::error(ErrorInfo::no_rows());
        assert!(err.data().is_none());
        assert!(err.is_err());
    }

    #[test]
    fn map_keeps_error() {
        let err: RestResponse<i32> = RestResponse::error(ErrorInfo::network("reset"));
        let mapped = err.map(|n| n * 2);
        assert!(mapped.error_info().unwrap().is_network());
    }

    #[test]
    fn and_then_can_fail() {
        let resp = RestResponse::ok("x").and_then(|_| RestResponse::<u8>::error(ErrorInfo::new("bad")));
        assert_eq!(resp.into_result().unwrap_err().message, "bad");
    }
}
