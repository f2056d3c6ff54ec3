//! Application entry point and server initialization
//!
//! Loads configuration, opens the database and serves the API with graceful
//! shutdown support.

use std::error::Error;
use std::net::SocketAddr;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_disguise::config::Config;
use ai_disguise::database::{init_db, AppState};
use ai_disguise::route::create_app;

/// Application entry point
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "data.db")
/// - `GEMINI_API_KEY` - Server key for the free tier
/// - `MOCK_API` - Answer locally instead of calling vendors
/// - `FREE_DAILY_LIMIT` - Free requests per client per day (default: 40)
/// - `PROVIDER_TIMEOUT_SECS` - Vendor request timeout (default: 30)
/// - `AUTHORIZATION` - Token required on account endpoints
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ai_disguise=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();
    if config.gemini_api_key.is_none() && !config.mock_api {
        warn!("GEMINI_API_KEY is not set; free tier requests will fail");
    }

    let db = init_db(&config.database_url)?;
    let port = config.port;
    let database_url = config.database_url.clone();
    let mock_api = config.mock_api;

    let state = AppState::new(db, config);
    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!(database = %database_url, mock_api, "server running at http://localhost:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM so in-flight requests and database
/// transactions can finish before exit
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
