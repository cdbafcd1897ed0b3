//! Create product command
//!
//! The image URLs arrive already ingested (validated, uploaded, local temp
//! files cleaned); this command validates the remaining fields and writes
//! the record.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::products::Product;
use crate::features::shared::validation::{
    validate_min_length, validate_non_negative, FieldValidationError,
};
use crate::media::MAX_BATCH_SIZE;

/// Command to create a new product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductCommand {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub category: String,
    /// Durable remote image URLs for the new product
    pub images: Vec<String>,
}

/// Errors that can occur when creating a product
#[derive(Debug, thiserror::Error)]
pub enum CreateProductError {
    #[error("Please provide all required fields.")]
    MissingFields,

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

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Product, CreateProductError>> for CreateProductCommand {}

impl crate::cqrs::middleware::Command for CreateProductCommand {}

impl CreateProductCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - Name shorter than 3 characters
    /// - Description shorter than 10 characters
    /// - Negative price or stock
    /// - Empty or oversized image list
    pub fn validate(&self) -> Result<(), CreateProductError> {
        validate_min_length(&self.name, 3, "Product name")?;
        validate_min_length(&self.description, 10, "Description")?;
        validate_non_negative(self.price, "Price")?;
        validate_non_negative(self.stock as f64, "Stock")?;

        if self.images.is_empty() {
            return Err(CreateProductError::ImagesRequired);
        }
        if self.images.len() > MAX_BATCH_SIZE {
            return Err(CreateProductError::TooManyImages);
        }

        Ok(())
    }
}

/// Handler function for creating products
#[tracing::instrument(
    skip(pool, command),
    fields(name = %command.name, category = %command.category)
)]
pub async fn handle(
    pool: PgPool,
    command: CreateProductCommand,
) -> Result<Product, CreateProductError> {
    command.validate()?;

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, description, price, category, stock, images)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, description, price, category, stock, images,
                  created_at, updated_at
        "#,
    )
    .bind(&command.name)
    .bind(&command.description)
    .bind(command.price)
    .bind(&command.category)
    .bind(command.stock)
    .bind(&command.images)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        product_id = %product.id,
        images = product.images.len(),
        "Product created"
    );

    Ok(product)
}
