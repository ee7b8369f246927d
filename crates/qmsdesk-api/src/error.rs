use serde_json::Value;
use thiserror::Error;

/// Shown when the server gave no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Ein unerwarteter Fehler ist aufgetreten.";

#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 401. The caller has to obtain a new token.
    #[error("not authenticated")]
    Unauthorized,

    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Text for the blocking alert: the server's own message, or the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => {
                "Sitzung abgelaufen. Bitte melden Sie sich erneut an.".to_string()
            }
            ApiError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Pull the human-readable message out of an error response body.
///
/// Understands `{"detail": "..."}`, FastAPI validation errors
/// (`{"detail": [{"msg": "..."}, ...]}`, joined with "; ") and
/// `{"message": "..."}`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    match value.get("detail") {
        Some(Value::String(detail)) if !detail.trim().is_empty() => {
            return Some(detail.clone());
        }
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}
