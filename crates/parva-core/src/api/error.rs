use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Server-supplied detail attached to a failed request: the parsed JSON
/// error body when there is one, else the raw text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Json(Value),
    Text(String),
}

impl ErrorDetail {
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => ErrorDetail::Json(value),
            Err(_) => ErrorDetail::Text(truncate_body(body)),
        }
    }

    /// The `detail` or `message` string of a JSON error body, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorDetail::Json(value) => value
                .get("detail")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str),
            ErrorDetail::Text(text) => Some(text.as_str()),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Json(value) => write!(f, "{}", truncate_body(&value.to_string())),
            ErrorDetail::Text(text) => f.write_str(text),
        }
    }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}... (truncated, {} total bytes)",
        &body[..end],
        body.len()
    )
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Network unavailable: {message}")]
    NetworkUnavailable { message: String },

    #[error("Request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("Server error {status}: {detail}")]
    ServerError { status: u16, detail: ErrorDetail },

    #[error("Request failed with status {status}: {detail}")]
    ClientError { status: u16, detail: ErrorDetail },

    #[error("Request aborted")]
    Aborted,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RequestError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = ErrorDetail::from_body(body);
        match status {
            500..=599 => RequestError::ServerError { status, detail },
            _ => RequestError::ClientError { status, detail },
        }
    }

    /// HTTP status for errors that came from a server response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RequestError::ServerError { status, .. } | RequestError::ClientError { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            RequestError::ServerError { detail, .. } | RequestError::ClientError { detail, .. } => {
                Some(detail)
            }
            _ => None,
        }
    }

    /// Transient failures: connection loss, timeouts and 5xx.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RequestError::NetworkUnavailable { .. }
                | RequestError::Timeout { .. }
                | RequestError::ServerError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_status_classifies() {
        let err = RequestError::from_status(503, "down");
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), Some(503));

        let err = RequestError::from_status(404, r#"{"detail": "Festival not found"}"#);
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(
            err.detail(),
            Some(&ErrorDetail::Json(json!({"detail": "Festival not found"})))
        );
        assert_eq!(err.detail().and_then(ErrorDetail::message), Some("Festival not found"));
    }

    #[test]
    fn test_plain_text_detail_is_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        match ErrorDetail::from_body(&body) {
            ErrorDetail::Text(text) => {
                assert!(text.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
                assert!(text.contains("truncated, 520 total bytes"));
            }
            other => panic!("expected text detail, got {:?}", other),
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let body = "न".repeat(MAX_ERROR_BODY_LENGTH);
        let truncated = truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        assert_eq!(RequestError::Aborted.status_code(), None);
        assert!(!RequestError::Aborted.is_retryable());
        let timeout = RequestError::Timeout {
            after: Duration::from_secs(15),
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.to_string(), "Request timed out after 15000ms");
    }
}
