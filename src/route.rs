//! Route definitions for the AI Disguise API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::http::{header, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::database::AppState;
use crate::handler::{
    create_history, create_style, disguise, get_analytics, get_report, list_history,
    list_public_styles, test_api_key, usage,
};
use crate::middleware::auth_middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `POST /api/disguise` - Transforms text into the requested style
/// - `POST /api/test-api-key` - Checks a vendor key
/// - `GET /api/usage` - Remaining free-tier quota for the caller
/// - `GET /api/styles/public` - Public style marketplace
/// - `POST /api/styles` - Publishes a style (guarded)
/// - `GET|POST /api/history` - Transformation history (guarded)
/// - `GET /api/analytics` - Usage statistics and insights (guarded)
/// - `GET /api/analytics/report` - Markdown usage report (guarded)
///
/// Every response carries permissive CORS headers and `OPTIONS` preflights
/// are answered with 200.
///
/// # Example Usage
///
/// ```no_run
/// # use ai_disguise::config::Config;
/// # use ai_disguise::database::{init_db, AppState};
/// # use ai_disguise::route::create_app;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState::new(db, Config::from_env());
/// let app = create_app(state);
/// ```
pub fn create_app(state: AppState) -> Router {
    let account_routes = Router::new()
        .route("/styles", post(create_style))
        .route("/history", get(list_history).post(create_history))
        .route("/analytics", get(get_analytics))
        .route("/analytics/report", get(get_report))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let public_routes = Router::new()
        .route("/disguise", post(disguise))
        .route("/test-api-key", post(test_api_key))
        .route("/usage", get(usage))
        .route("/styles/public", get(list_public_styles));

    Router::new()
        .nest("/api", public_routes.merge(account_routes))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
