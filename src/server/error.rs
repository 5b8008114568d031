use crate::error::FetchError;
use crate::models::ErrorBody;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing parameter")]
    MissingParameter(&'static str),

    #[error("Invalid limit parameter")]
    InvalidLimit,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingParameter(name) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Missing parameter".to_string(),
                    details: Some(Value::String(format!("{} is required", name))),
                },
            ),
            ApiError::InvalidLimit => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Invalid limit parameter".to_string(),
                    details: None,
                },
            ),
            ApiError::Fetch(FetchError::RateLimited) => {
                warn!("Upstream rate limit exceeded");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    ErrorBody {
                        error: "Rate limit exceeded".to_string(),
                        details: None,
                    },
                )
            }
            ApiError::Fetch(FetchError::Upstream {
                status,
                message,
                details,
            }) => {
                warn!("Upstream error {}: {}", status, message);
                (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    ErrorBody {
                        error: message,
                        details: Some(details),
                    },
                )
            }
            ApiError::Fetch(err @ (FetchError::Transport(_) | FetchError::Decode(_))) => {
                error!("Request to upstream failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Internal server error".to_string(),
                        details: Some(Value::String(err.to_string())),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
