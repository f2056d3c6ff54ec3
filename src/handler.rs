//! HTTP request handlers
//!
//! `disguise` is the core endpoint: validate → resolve provider → reserve a
//! quota slot (free tier only) → build prompt → invoke adapter (sanitizes) →
//! respond. A failed request hands its slot back. Adapter failures end the
//! request; nothing is retried here.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::analytics::{process_user_data, render_report, rule_based_insights, DEFAULT_TOP_N};
use crate::database::{self, AppState};
use crate::error::{ApiError, Result};
use crate::language::detect_language;
use crate::model::{
    AnalyticsParams, ApiConfig, ApiMode, CreateHistoryRequest, CreateStyleRequest, HistoryRecord,
    ListParams, RawTransformRequest, StyleRecord, TestKeyRequest, TestKeyResponse,
    TransformMetadata, TransformRequest, TransformResponse,
};
use crate::prompt::build_prompt;
use crate::providers::ProviderAdapter;
use crate::rate_limit::{ClientIp, LimitStatus};
use crate::sanitize::sanitize;

/// Provider used for the operator-funded free tier
pub const FREE_TIER_PROVIDER: &str = "gemini";

const MAX_STYLE_NAME: usize = 50;
const MAX_STYLE_DESCRIPTION: usize = 300;

/// How a transformation will be paid for
enum Route {
    Free,
    Custom {
        adapter: Arc<dyn ProviderAdapter>,
        api_key: String,
        model: Option<String>,
    },
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))
}

fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Decodes a caller-supplied key stored base64-encoded on the client
fn decode_api_key(encoded: &str) -> Result<String> {
    let invalid = || ApiError::InvalidApiKey("API key is not valid base64".to_string());

    let bytes = STANDARD.decode(encoded.trim()).map_err(|_| invalid())?;
    let key = String::from_utf8(bytes).map_err(|_| invalid())?;
    let key = key.trim();
    if key.is_empty() {
        return Err(invalid());
    }
    Ok(key.to_string())
}

fn resolve_route(state: &AppState, config: &ApiConfig) -> Result<Route> {
    if config.mode == ApiMode::Free {
        return Ok(Route::Free);
    }

    let provider = config
        .active_provider
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            ApiError::UnsupportedProvider(
                "An active provider is required in custom API mode".to_string(),
            )
        })?;

    let adapter = state.providers.get(provider).ok_or_else(|| {
        ApiError::UnsupportedProvider(format!("Unsupported provider: {}", provider))
    })?;

    let entry = config
        .custom_apis
        .get(provider)
        .or_else(|| config.custom_apis.get(adapter.name()))
        .filter(|entry| !entry.api_key.trim().is_empty())
        .ok_or_else(|| {
            ApiError::UnsupportedProvider(format!("No API key configured for {}", provider))
        })?;

    Ok(Route::Custom {
        api_key: decode_api_key(&entry.api_key)?,
        model: entry.model.clone(),
        adapter,
    })
}

/// Produces the transformed text for a request that already holds its quota
async fn generate(state: &AppState, route: &Route, request: &TransformRequest) -> Result<String> {
    if state.config.mock_api {
        return Ok(sanitize(&format!("[MOCK] {}", request.text)));
    }

    let prompt = build_prompt(&request.text, &request.conversion, request.output_language);
    let text = match route {
        Route::Free => {
            let api_key = state.config.gemini_api_key.as_deref().ok_or_else(|| {
                ApiError::Configuration("Server API key is not configured".to_string())
            })?;
            let adapter = state.providers.get(FREE_TIER_PROVIDER).ok_or_else(|| {
                ApiError::Configuration("Free tier provider is not registered".to_string())
            })?;
            adapter.invoke(&prompt, api_key, None).await?
        }
        Route::Custom {
            adapter,
            api_key,
            model,
        } => adapter.invoke(&prompt, api_key, model.as_deref()).await?,
    };
    Ok(text)
}

/// Transforms text into the requested style
///
/// # Request Body
///
/// ```json
/// {
///   "text": "Hello world",
///   "mode": "style",
///   "style": "poem",
///   "outputLanguage": "en"
/// }
/// ```
///
/// # Response
///
/// - **200 OK** - `{ success, result, metadata }`
/// - **400 Bad Request** - validation or API configuration failure
/// - **429 Too Many Requests** - free-tier daily cap reached
/// - **500 Internal Server Error** - missing server key or vendor failure
pub async fn disguise(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    body: std::result::Result<Json<RawTransformRequest>, JsonRejection>,
) -> Result<Json<TransformResponse>> {
    let request = TransformRequest::decode(json_body(body)?)?;
    let route = resolve_route(&state, &request.api_config)?;

    let free_tier = matches!(route, Route::Free);
    if free_tier {
        let status = state.usage.try_reserve(&client).await;
        if !status.allowed {
            info!(client = %client, used = status.used, "free tier limit reached");
            return Err(ApiError::RateLimited {
                remaining: status.remaining,
                limit: status.limit,
                used: status.used,
            });
        }
        debug!(client = %client, remaining = status.remaining, "free tier slot reserved");
    }

    let result = match generate(&state, &route, &request).await {
        Ok(result) => result,
        Err(err) => {
            if free_tier {
                state.usage.release(&client).await;
            }
            return Err(err);
        }
    };

    info!(free_tier, mode = request.conversion.mode(), "transformation completed");

    Ok(Json(TransformResponse {
        success: true,
        result,
        metadata: TransformMetadata::for_request(&request),
    }))
}

/// Checks a vendor key with a minimal prompt
///
/// Logical failures (bad key, unknown provider) are reported with
/// `success: false` and HTTP 200; only malformed bodies get a 400.
pub async fn test_api_key(
    State(state): State<AppState>,
    body: std::result::Result<Json<TestKeyRequest>, JsonRejection>,
) -> Result<Json<TestKeyResponse>> {
    let request = json_body(body)?;

    let provider = request
        .provider
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Provider is required".to_string()))?;
    let api_key = request
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("API key is required".to_string()))?;

    let Some(adapter) = state.providers.get(provider) else {
        return Ok(Json(TestKeyResponse {
            success: false,
            message: format!("Unsupported provider: {}", provider),
            provider: None,
            model: None,
        }));
    };

    if state.config.mock_api {
        return Ok(Json(TestKeyResponse {
            success: true,
            message: "API key is valid (mock)".to_string(),
            provider: Some(adapter.name().to_string()),
            model: Some(
                request
                    .model
                    .unwrap_or_else(|| adapter.default_model().to_string()),
            ),
        }));
    }

    let response = match adapter.test_key(api_key, request.model.as_deref()).await {
        Ok(model) => TestKeyResponse {
            success: true,
            message: "API key is valid".to_string(),
            provider: Some(adapter.name().to_string()),
            model: Some(model),
        },
        Err(err) => {
            warn!(provider = adapter.name(), status = ?err.status, "API key test failed");
            TestKeyResponse {
                success: false,
                message: err.message,
                provider: Some(adapter.name().to_string()),
                model: None,
            }
        }
    };

    Ok(Json(response))
}

/// Remaining free-tier quota for the caller, without consuming any
pub async fn usage(State(state): State<AppState>, ClientIp(client): ClientIp) -> Json<LimitStatus> {
    Json(state.usage.check_limit(&client).await)
}

/// Lists up to 100 public styles, newest first
pub async fn list_public_styles(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let styles = database::list_public_styles(&state.db)?;
    Ok(Json(json!({
        "styles": styles,
        "total": styles.len(),
    })))
}

/// Publishes a style to the marketplace
///
/// # Response
///
/// - **201 Created** - the stored style record
/// - **400 Bad Request** - missing or oversized fields
pub async fn create_style(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateStyleRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = json_body(body)?;

    let display_name = request.display_name.trim().to_string();
    if display_name.is_empty() || display_name.chars().count() > MAX_STYLE_NAME {
        return Err(ApiError::InvalidInput(format!(
            "displayName must be 1 to {} characters",
            MAX_STYLE_NAME
        )));
    }
    let description = request.description.unwrap_or_default().trim().to_string();
    if description.chars().count() > MAX_STYLE_DESCRIPTION {
        return Err(ApiError::InvalidInput(format!(
            "description must be at most {} characters",
            MAX_STYLE_DESCRIPTION
        )));
    }

    let name = request
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| display_name.to_lowercase().replace(char::is_whitespace, "-"));

    let mut style = StyleRecord {
        id: random_id(8),
        name,
        display_name,
        description,
        prompt_template: request
            .prompt_template
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        is_public: request.is_public,
        author_id: request.author_id,
        usage_count: 0,
        created_at: Utc::now(),
    };

    // ids are random; a collision just draws again
    for _ in 0..5 {
        if database::insert_style(&state.db, &style)? {
            info!(style_id = %style.id, public = style.is_public, "style created");
            return Ok((StatusCode::CREATED, Json(style)));
        }
        style.id = random_id(8);
    }

    Err(ApiError::Configuration(
        "Could not allocate a unique style id".to_string(),
    ))
}

/// Stores one transformation in a user's history
pub async fn create_history(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateHistoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let CreateHistoryRequest { user_id, mut record } = json_body(body)?;

    let user_id = user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(ApiError::InvalidInput("userId is required".to_string()));
    }
    if record.original.trim().is_empty() {
        return Err(ApiError::InvalidInput("original text is required".to_string()));
    }

    fill_history_defaults(&mut record);
    database::insert_history(&state.db, &user_id, &record)?;

    Ok((StatusCode::CREATED, Json(record)))
}

fn fill_history_defaults(record: &mut HistoryRecord) {
    if record.id.trim().is_empty() {
        record.id = random_id(12);
    }
    if record.created_at.is_none() {
        record.created_at = Some(Utc::now());
    }
    if record.conversion_mode.trim().is_empty() {
        record.conversion_mode = "style".to_string();
    }
    if record.detected_language.trim().is_empty() {
        record.detected_language = detect_language(&record.original).code().to_string();
    }
    record.usage_count = record.usage_count.max(1);
}

/// Lists a user's history with pagination, newest first
///
/// # Example Request
///
/// `GET /api/history?user_id=user_123&page=2&limit=20`
pub async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse> {
    let user_id = required_user(params.user_id.as_deref())?;

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1).saturating_mul(limit);

    let records = database::list_history(&state.db, user_id, offset, limit)?;

    Ok(Json(json!({
        "page": page,
        "limit": limit,
        "total_fetched": records.len(),
        "data": records
    })))
}

fn required_user(user_id: Option<&str>) -> Result<&str> {
    user_id
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("user_id is required".to_string()))
}

/// Aggregated statistics and rule-based insights over a user's history
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse> {
    let user_id = required_user(params.user_id.as_deref())?;
    let records = database::all_history(&state.db, user_id)?;

    let data = process_user_data(&records, params.top.unwrap_or(DEFAULT_TOP_N));
    let insights = rule_based_insights(&data);

    Ok(Json(json!({
        "success": true,
        "data": data,
        "insights": insights,
    })))
}

/// Markdown export of the same aggregate
pub async fn get_report(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse> {
    let user_id = required_user(params.user_id.as_deref())?;
    let records = database::all_history(&state.db, user_id)?;

    let data = process_user_data(&records, params.top.unwrap_or(DEFAULT_TOP_N));
    let report = render_report(&data, &rule_based_insights(&data));

    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        report,
    ))
}
