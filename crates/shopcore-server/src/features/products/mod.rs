//! Products feature: catalog CRUD, image lifecycle, filtered listing

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::products_routes;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A catalog product as stored and exposed over the API
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i64,
    /// Durable remote image URLs, in upload order; non-empty by invariant
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
