//! Error taxonomy for the HTTP boundary
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl turns
//! each variant into the uniform `{ "error", "message" }` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::database::StoreError;
use crate::providers::ProviderError;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed, missing or out-of-range request fields
    #[error("{0}")]
    InvalidInput(String),

    /// Free-tier daily cap reached for the caller's bucket
    #[error("Daily free limit of {limit} requests reached. Try again tomorrow or use your own API key.")]
    RateLimited { remaining: u32, limit: u32, used: u32 },

    /// Server secret missing
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Custom key path references an adapter or key entry that does not exist
    #[error("{0}")]
    UnsupportedProvider(String),

    /// Caller-supplied key could not be decoded
    #[error("{0}")]
    InvalidApiKey(String),

    #[error("Invalid or missing authorization header")]
    Unauthorized,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::UnsupportedProvider(_)
            | ApiError::InvalidApiKey(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Configuration(_) | ApiError::Provider(_) | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short error kind placed in the `error` field
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "Invalid request",
            ApiError::RateLimited { .. } => "Rate limit exceeded",
            ApiError::Configuration(_) => "Server configuration error",
            ApiError::Provider(_) => "AI service error",
            ApiError::UnsupportedProvider(_) => "Invalid API configuration",
            ApiError::InvalidApiKey(_) => "Invalid API key",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Storage(_) => "Storage error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Configuration(_) | ApiError::Storage(_) => {
                tracing::error!("server error: {}", self);
            }
            ApiError::Provider(err) => {
                tracing::warn!(provider = err.provider, status = ?err.status, "provider error: {}", err.message);
            }
            _ => {
                tracing::debug!("client error: {}", self);
            }
        }

        let body = match &self {
            ApiError::RateLimited {
                remaining,
                limit,
                used,
            } => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "remaining": remaining,
                "limit": limit,
                "used": used,
            }),
            // Storage details stay in the log
            ApiError::Storage(_) => json!({
                "error": self.kind(),
                "message": "Failed to access storage",
            }),
            _ => json!({
                "error": self.kind(),
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
