//! Infrastructure errors raised at I/O boundaries.
//!
//! | HTTP status | AppError |
//! |-------------|----------|
//! | `400` | `BadRequest` |
//! | `401`, `403` | `Unauthorized` |
//! | `404` | `NotFound` |
//! | `408`, `504` | `Timeout` |
//! | `503` | `ServiceUnavailable` |
//! | anything else | `Upstream` |

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// Map a non-success HTTP status and its raw body onto the error taxonomy.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::BAD_REQUEST => AppError::BadRequest(anyhow::anyhow!(body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::Unauthorized(anyhow::anyhow!(body))
            }
            StatusCode::NOT_FOUND => AppError::NotFound(anyhow::anyhow!(body)),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => AppError::Timeout(body),
            StatusCode::SERVICE_UNAVAILABLE => AppError::ServiceUnavailable(body),
            _ => AppError::Upstream {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// True for failures caused by the network path rather than the peer's answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Timeout(_) | AppError::ServiceUnavailable(_) | AppError::BadGateway(_)
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadGateway(format!("Malformed response body: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            AppError::ServiceUnavailable(err.to_string())
        } else if err.is_decode() || err.is_body() {
            AppError::BadGateway(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::from_status(status, err.to_string())
        } else {
            AppError::InternalError(anyhow::Error::new(err))
        }
    }
}
