//! Delete product command
//!
//! Removes the product record. The caller releases the product's remote
//! images first; record removal proceeds regardless of that outcome.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Command to delete a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteProductCommand {
    pub id: Uuid,
}

/// Response from deleting a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteProductResponse {
    pub id: Uuid,
}

/// Errors that can occur when deleting a product
#[derive(Debug, thiserror::Error)]
pub enum DeleteProductError {
    #[error("Product with id '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DeleteProductResponse, DeleteProductError>> for DeleteProductCommand {}

impl crate::cqrs::middleware::Command for DeleteProductCommand {}

/// Handler function for deleting products
#[tracing::instrument(skip(pool), fields(product_id = %command.id))]
pub async fn handle(
    pool: PgPool,
    command: DeleteProductCommand,
) -> Result<DeleteProductResponse, DeleteProductError> {
    let deleted: Option<(Uuid,)> =
        sqlx::query_as("DELETE FROM products WHERE id = $1 RETURNING id")
            .bind(command.id)
            .fetch_optional(&pool)
            .await?;

    let (id,) = deleted.ok_or(DeleteProductError::NotFound(command.id))?;

    tracing::info!(product_id = %id, "Product deleted");

    Ok(DeleteProductResponse { id })
}
