//! Update product command
//!
//! Partially updates an existing product. Only provided fields are written;
//! the image list is replaced only when the request carried a new batch
//! (the caller has already released the old remote images and ingested the
//! new ones by the time this command runs). Field changes and the image
//! replacement land in one UPDATE.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::features::products::Product;
use crate::features::shared::validation::{
    validate_min_length, validate_non_negative, FieldValidationError,
};
use crate::media::MAX_BATCH_SIZE;

/// Command to update an existing product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProductCommand {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Replacement image list; `None` leaves the stored list untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Errors that can occur when updating a product
#[derive(Debug, thiserror::Error)]
pub enum UpdateProductError {
    #[error("Price must be a number")]
    PriceInvalid,

    #[error("Stock must be a number")]
    StockInvalid,

    #[error(transparent)]
    Validation(#[from] FieldValidationError),

    #[error("At least one product image is required")]
    ImagesRequired,

    #[error("Maximum allowed files are {MAX_BATCH_SIZE}.")]
    TooManyImages,

    #[error("Product with id '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Product, UpdateProductError>> for UpdateProductCommand {}

impl crate::cqrs::middleware::Command for UpdateProductCommand {}

impl UpdateProductCommand {
    /// Validates the provided fields; absent fields are not checked
    pub fn validate(&self) -> Result<(), UpdateProductError> {
        if let Some(ref name) = self.name {
            validate_min_length(name, 3, "Product name")?;
        }
        if let Some(ref description) = self.description {
            validate_min_length(description, 10, "Description")?;
        }
        if let Some(price) = self.price {
            validate_non_negative(price, "Price")?;
        }
        if let Some(stock) = self.stock {
            validate_non_negative(stock as f64, "Stock")?;
        }
        if let Some(ref images) = self.images {
            if images.is_empty() {
                return Err(UpdateProductError::ImagesRequired);
            }
            if images.len() > MAX_BATCH_SIZE {
                return Err(UpdateProductError::TooManyImages);
            }
        }
        Ok(())
    }
}

/// Handler function for updating products
#[tracing::instrument(skip(pool, command), fields(product_id = %command.id))]
pub async fn handle(
    pool: PgPool,
    command: UpdateProductCommand,
) -> Result<Product, UpdateProductError> {
    command.validate()?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE products SET updated_at = NOW()");

    if let Some(ref name) = command.name {
        builder.push(", name = ").push_bind(name);
    }
    if let Some(ref description) = command.description {
        builder.push(", description = ").push_bind(description);
    }
    if let Some(price) = command.price {
        builder.push(", price = ").push_bind(price);
    }
    if let Some(stock) = command.stock {
        builder.push(", stock = ").push_bind(stock);
    }
    if let Some(ref category) = command.category {
        builder.push(", category = ").push_bind(category);
    }
    if let Some(ref images) = command.images {
        builder.push(", images = ").push_bind(images);
    }

    builder.push(" WHERE id = ").push_bind(command.id);
    builder.push(
        " RETURNING id, name, description, price, category, stock, images, \
         created_at, updated_at",
    );

    let product = builder
        .build_query_as::<Product>()
        .fetch_optional(&pool)
        .await?
        .ok_or(UpdateProductError::NotFound(command.id))?;

    tracing::info!(
        product_id = %product.id,
        replaced_images = command.images.is_some(),
        "Product updated"
    );

    Ok(product)
}
