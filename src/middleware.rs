use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::database::AppState;
use crate::error::ApiError;

/// Middleware guarding account endpoints (history, analytics, style publishing)
///
/// When `AUTHORIZATION` is configured, the request must carry an
/// `Authorization` header equal to it, either raw or as `Bearer <token>`.
/// Without a configured token the check is skipped.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(secret) = state.config.auth_token.as_deref() {
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).trim());

        if provided != Some(secret) {
            return Err(ApiError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}
