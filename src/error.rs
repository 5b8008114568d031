//! Errors shared by the openFDA and backend clients.

use serde_json::Value;
use thiserror::Error;

/// Failure while fetching one page of results from a remote source.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The remote side answered 429.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Any other non-2xx answer, with the best message we could extract.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },

    /// No response at all: connect failure, timeout, reset.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A 2xx answer whose body could not be decoded.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Classify a reqwest error that carries no HTTP status.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }

    /// Build an `Upstream` error from a status and raw body, preferring the
    /// message carried in the JSON body.
    pub fn upstream(status: u16, body: &str) -> Self {
        let details = serde_json::from_str::<Value>(body)
            .unwrap_or_else(|_| Value::String(body.to_string()));

        let message = extract_message(&details).unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status))
        });

        FetchError::Upstream {
            status,
            message,
            details,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands openFDA's `{"error": {"message": ..}}` and the backend's own
/// `{"error": ".."}` shape.
fn extract_message(body: &Value) -> Option<String> {
    let message = match body.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    message.filter(|m| !m.is_empty())
}
