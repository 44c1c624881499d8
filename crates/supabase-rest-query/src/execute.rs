use reqwest::header::HeaderMap;
use serde_json::Value as JsonValue;

use supabase_rest_core::platform::{self, RequestOptions};
use supabase_rest_core::{ErrorInfo, RestError, SupabaseRestClient, NO_ROWS_CODE};

use crate::postgrest::PreparedRequest;

/// A 2xx response: headers plus the parsed JSON body (`null` when empty).
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub headers: HeaderMap,
    pub body: JsonValue,
}

/// Send a prepared request with the client's auth headers, resolved now.
pub(crate) async fn send_prepared(
    client: &SupabaseRestClient,
    prepared: PreparedRequest,
    options: RequestOptions,
) -> Result<RawResponse, ErrorInfo> {
    let mut headers = client.auth_headers()?;
    headers.extend(prepared.headers);

    tracing::debug!(
        method = %prepared.method,
        url = %prepared.url,
        "Executing PostgREST request"
    );

    let mut request = client
        .http()
        .request(prepared.method, prepared.url.as_str())
        .headers(headers);
    if let Some(body) = &prepared.body {
        request = request.json(body);
    }

    let options = client.request_options(options);
    let (status, headers, text) = platform::bounded(&options, async move {
        let response = request.send().await.map_err(RestError::from)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(RestError::from)?;
        Ok::<_, RestError>((status, headers, text))
    })
    .await?;

    if !(200..300).contains(&status) {
        let err = normalize_error(status, &text, prepared.expect_single);
        tracing::debug!(status, code = ?err.code, "PostgREST request failed");
        return Err(err);
    }

    let body = if text.trim().is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_str(&text)
            .map_err(|e| ErrorInfo::new(format!("Failed to parse response: {e}")))?
    };

    Ok(RawResponse { headers, body })
}

/// Map a non-2xx PostgREST response to an [`ErrorInfo`].
///
/// A 406 on a single-object request means zero rows matched and becomes
/// exactly `{ message: "No rows returned", code: "PGRST116" }`. Otherwise
/// the message comes from the JSON `message`, then `hint`, then the raw
/// text; any other 406 is still tagged `PGRST116`.
pub fn normalize_error(status: u16, body: &str, expect_single: bool) -> ErrorInfo {
    if status == 406 && expect_single {
        return ErrorInfo::no_rows();
    }

    let json = serde_json::from_str::<JsonValue>(body).ok();
    let field = |name: &str| {
        json.as_ref()
            .and_then(|j| j.get(name))
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let message = field("message")
        .or_else(|| field("hint"))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.to_string()
            }
        });

    let mut info = ErrorInfo::http(status, message);
    if status == 406 {
        info = info.with_code(NO_ROWS_CODE);
    } else if let Some(code) = field("code") {
        info = info.with_code(code);
    }
    if let Some(json) = json.filter(JsonValue::is_object) {
        info = info.with_details(json);
    }
    info
}

/// Row count from `Content-Range: a-b/total`, else from the body.
pub(crate) fn parse_count(headers: &HeaderMap, body: &JsonValue) -> i64 {
    let from_header = headers
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.rsplit_once('/'))
        .and_then(|(_, total)| total.parse::<i64>().ok());

    from_header.unwrap_or_else(|| match body {
        JsonValue::Array(rows) => rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(JsonValue::as_i64)
            .unwrap_or(rows.len() as i64),
        _ => 0,
    })
}
