//! Feature modules implementing the shopcore API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes, following the CQRS (Command Query Responsibility Segregation)
//! pattern:
//!
//! - **auth**: user registration, login, and logout with session tokens
//! - **products**: product catalog CRUD, image upload lifecycle, and the
//!   filtered/sorted/paginated listing
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations (register, login, create, update, delete)
//! - `queries/` - Read operations (get, list)
//! - `routes.rs` - HTTP route definitions and error-to-status mapping
//!
//! Commands and queries are pure data handled by standalone async functions;
//! the mediator wiring lives in `crate::cqrs`.

pub mod auth;
pub mod products;
pub mod shared;

use crate::auth::TokenIssuer;
use crate::config::MediaConfig;
use crate::media;
use crate::storage::MediaStorage;
use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, Router};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool
    pub db: sqlx::PgPool,
    /// S3-compatible media storage for product images
    pub storage: MediaStorage,
    /// Session token issuer (carries the token TTL)
    pub tokens: TokenIssuer,
    /// Upload staging configuration
    pub media: MediaConfig,
}

/// Creates the main API router with all feature routes mounted
///
/// - `/api/v1/auth` - registration, login, logout (public)
/// - `/products` - product catalog (token-gated)
pub fn router(state: FeatureState) -> Router<()> {
    // Enough room for a full image batch plus the form fields
    let upload_body_limit = state
        .media
        .max_file_bytes
        .saturating_mul(media::MAX_BATCH_SIZE + 1);

    let product_routes = products::products_routes()
        .route_layer(from_fn_with_state(
            state.tokens.clone(),
            crate::middleware::auth::require_auth,
        ))
        .layer(DefaultBodyLimit::max(upload_body_limit))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1/auth", auth::auth_routes().with_state(state))
        .nest("/products", product_routes)
}
