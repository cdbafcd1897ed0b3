//! Shopcore Server - Main entry point

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use shopcore_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, time::Duration};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use shopcore_server::{
    api::response::ErrorResponse,
    auth::TokenIssuer,
    config::Config,
    features, middleware,
    storage::{config::StorageConfig, MediaStorage},
};

/// Application state shared across the root handlers
#[derive(Clone)]
struct AppState {
    db: sqlx::PgPool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("shopcore-server".to_string())
        .filter_directives(
            "shopcore_server=debug,tower_http=debug,axum=trace,sqlx=info".to_string(),
        )
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Shopcore Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    info!("Database connection pool established");

    // Initialize S3-compatible media storage
    let storage_config = StorageConfig::from_env()?;
    let storage = MediaStorage::new(storage_config).await?;
    info!("Media storage client initialized");

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    // Ensure the upload staging directory exists
    tokio::fs::create_dir_all(&config.media.staging_dir).await?;
    info!(
        "Upload staging directory ready at {}",
        config.media.staging_dir.display()
    );

    // Create feature state
    let tokens = TokenIssuer::new(&config.auth);
    let state = features::FeatureState {
        db: db_pool.clone(),
        storage,
        tokens,
        media: config.media.clone(),
    };

    // Build the application router
    let app = create_router(state, db_pool, &config)?;

    // Create socket address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown (connect info feeds the
    // peer-IP-keyed rate limiter)
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
    .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(
    state: features::FeatureState,
    db: sqlx::PgPool,
    config: &Config,
) -> Result<Router> {
    // Feature routes (CQRS architecture)
    let feature_routes = features::router(state);

    // Build the main router with middleware stack
    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(AppState { db })
        .merge(feature_routes)
        .fallback(unknown_route)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors));

    let rate_limit = middleware::rate_limit::RateLimitConfig::from_env();
    middleware::rate_limit::apply(router, &rate_limit)
}

/// Root banner handler
async fn root() -> &'static str {
    "API is running"
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    // Check database connectivity
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

/// Uniform 404 envelope for undefined routes
async fn unknown_route(uri: axum::http::Uri) -> Response {
    let error = ErrorResponse::new(
        "NOT_FOUND",
        format!("Can't find {} on this server!", uri.path()),
    );
    (StatusCode::NOT_FOUND, Json(error)).into_response()
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
