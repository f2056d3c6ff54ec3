use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use ai_disguise::config::Config;
use ai_disguise::database::{init_db, AppState};
use ai_disguise::route::create_app;

fn setup_test_app(auth_token: Option<&str>) -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();
    let db = init_db(db_path).expect("Failed to initialize test database");
    let config = Config {
        mock_api: true,
        auth_token: auth_token.map(str::to_string),
        ..Config::default()
    };
    (create_app(AppState::new(db, config)), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn create_style_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/styles")
        .header("content-type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder
        .body(Body::from(
            json!({ "displayName": "Pirate", "isPublic": true }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_auth_middleware_enabled_valid_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(create_style_request(Some("secret_token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_auth_middleware_accepts_bearer_scheme() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(create_style_request(Some("Bearer secret_token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_auth_middleware_enabled_invalid_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .oneshot(create_style_request(Some("wrong_token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Invalid or missing authorization header");
}

#[tokio::test]
async fn test_auth_middleware_enabled_missing_token() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    for uri in [
        "/api/history?user_id=u1",
        "/api/analytics?user_id=u1",
        "/api/analytics/report?user_id=u1",
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri: {}", uri);
    }

    let response = app.oneshot(create_style_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_middleware_disabled() {
    let (app, _temp_db) = setup_test_app(None);

    let response = app.oneshot(create_style_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_public_endpoints_skip_auth() {
    let (app, _temp_db) = setup_test_app(Some("secret_token"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/disguise")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "text": "hello", "mode": "style", "style": "chat" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for uri in ["/api/usage", "/api/styles/public"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri: {}", uri);
    }
}
