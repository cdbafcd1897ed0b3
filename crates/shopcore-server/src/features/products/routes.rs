//! Product API routes
//!
//! Wires the product commands and queries to Axum HTTP handlers. All routes
//! sit behind the auth gate.
//!
//! # Route Structure
//!
//! - `POST /products/create-product` - Multipart create with up to 5 images
//! - `GET /products/all-products` - Filtered, sorted, paginated listing
//! - `GET /products/:id` - Get a single product
//! - `PATCH /products/:id` - Partial update with optional image replacement
//! - `DELETE /products/:id` - Delete a product and release its images

use crate::api::response::ErrorResponse;
use crate::auth::Claims;
use crate::features::FeatureState;
use crate::media::{self, IngestError};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use super::commands::{
    create, delete as delete_cmd, update, CreateProductCommand, CreateProductError,
    DeleteProductCommand, DeleteProductError, UpdateProductCommand, UpdateProductError,
};
use super::queries::{get as get_query, list, GetProductError, GetProductQuery, ListProductsError, ListProductsQuery};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the products router with all routes configured
pub fn products_routes() -> Router<FeatureState> {
    Router::new()
        .route("/create-product", post(create_product))
        .route("/all-products", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id", patch(update_product))
        .route("/:id", delete(delete_product))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Create a new product from a multipart request
///
/// # Response
///
/// - `201 Created` - Product created with its remote image URLs
/// - `400 Bad Request` - File count/type violation or missing fields
#[tracing::instrument(skip(state, claims, multipart), fields(user = %claims.sub))]
async fn create_product(
    State(state): State<FeatureState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Response, ProductApiError> {
    let batch = media::stage_batch(&mut multipart, &state.media).await?;

    // Whole-batch rejection happens before any upload; staged temp files
    // from a rejected batch are discarded.
    if let Err(e) = media::validate_batch(&batch.files) {
        media::discard_staged(&batch.files).await;
        return Err(e.into());
    }

    let images = media::ingest_batch(&state.storage, batch.files).await?;

    let command = build_create_command(&batch.fields, images)?;
    let product = create::handle(state.db.clone(), command).await?;

    tracing::info!(
        product_id = %product.id,
        user = %claims.sub,
        "Product created via API"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Product created successfully",
            "product": product,
        })),
    )
        .into_response())
}

/// Update a product; new image batches replace the stored list
///
/// # Response
///
/// - `200 OK` - Updated product
/// - `400 Bad Request` - File or field validation failure
/// - `404 Not Found` - Unknown product id
#[tracing::instrument(skip(state, claims, multipart), fields(product_id = %id, user = %claims.sub))]
async fn update_product(
    State(state): State<FeatureState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Response, ProductApiError> {
    let batch = media::stage_batch(&mut multipart, &state.media).await?;

    let existing = get_query::handle(state.db.clone(), GetProductQuery { id }).await?;

    // Replace images only when the request carried new files: validate the
    // new batch first, release the old remote images (best-effort), then
    // upload the replacements.
    let images = if batch.files.is_empty() {
        None
    } else {
        if let Err(e) = media::validate_batch(&batch.files) {
            media::discard_staged(&batch.files).await;
            return Err(e.into());
        }

        media::release_batch(&state.storage, &existing.images).await;

        Some(media::ingest_batch(&state.storage, batch.files).await?)
    };

    let command = build_update_command(id, &batch.fields, images)?;
    let updated = update::handle(state.db.clone(), command).await?;

    tracing::info!(
        product_id = %updated.id,
        user = %claims.sub,
        "Product updated via API"
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Product updated successfully",
            "updatedProduct": updated,
        })),
    )
        .into_response())
}

/// Delete a product and release its remote images
///
/// # Response
///
/// - `200 OK` - Product deleted
/// - `404 Not Found` - Unknown product id
#[tracing::instrument(skip(state, claims), fields(product_id = %id, user = %claims.sub))]
async fn delete_product(
    State(state): State<FeatureState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response, ProductApiError> {
    let existing = get_query::handle(state.db.clone(), GetProductQuery { id }).await?;

    // Best-effort: record removal proceeds regardless of release outcome
    media::release_batch(&state.storage, &existing.images).await;

    let deleted = delete_cmd::handle(state.db.clone(), DeleteProductCommand { id }).await?;

    tracing::info!(
        product_id = %deleted.id,
        user = %claims.sub,
        "Product deleted via API"
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Product deleted successfully",
        })),
    )
        .into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// List products with filtering, sorting, and pagination
///
/// # Endpoint
///
/// `GET /products/all-products?search=&category=&minPrice=&maxPrice=&sort=&page=&limit=`
#[tracing::instrument(skip(state, query))]
async fn list_products(
    State(state): State<FeatureState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Response, ProductApiError> {
    let response = list::handle(state.db.clone(), query).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "count": response.products.len(),
            "page": response.pagination.page,
            "totalPages": response.pagination.pages,
            "totalProducts": response.pagination.total,
            "products": response.products,
        })),
    )
        .into_response())
}

/// Get a single product by id
#[tracing::instrument(skip(state), fields(product_id = %id))]
async fn get_product(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ProductApiError> {
    let product = get_query::handle(state.db.clone(), GetProductQuery { id }).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "product": product,
        })),
    )
        .into_response())
}

// ============================================================================
// Field Parsing
// ============================================================================

/// Build the create command from multipart text fields plus ingested URLs
fn build_create_command(
    fields: &HashMap<String, String>,
    images: Vec<String>,
) -> Result<CreateProductCommand, ProductApiError> {
    let (name, description, price, stock, category) = (
        fields.get("name"),
        fields.get("description"),
        fields.get("price"),
        fields.get("stock"),
        fields.get("category"),
    );

    let (Some(name), Some(description), Some(price), Some(stock), Some(category)) =
        (name, description, price, stock, category)
    else {
        return Err(CreateProductError::MissingFields.into());
    };

    Ok(CreateProductCommand {
        name: name.clone(),
        description: description.clone(),
        price: price
            .trim()
            .parse()
            .map_err(|_| CreateProductError::PriceInvalid)?,
        stock: stock
            .trim()
            .parse()
            .map_err(|_| CreateProductError::StockInvalid)?,
        category: category.clone(),
        images,
    })
}

/// Build the update command from the optional multipart text fields
fn build_update_command(
    id: Uuid,
    fields: &HashMap<String, String>,
    images: Option<Vec<String>>,
) -> Result<UpdateProductCommand, ProductApiError> {
    let price = fields
        .get("price")
        .map(|p| p.trim().parse::<f64>())
        .transpose()
        .map_err(|_| UpdateProductError::PriceInvalid)?;

    let stock = fields
        .get("stock")
        .map(|s| s.trim().parse::<i64>())
        .transpose()
        .map_err(|_| UpdateProductError::StockInvalid)?;

    Ok(UpdateProductCommand {
        id,
        name: fields.get("name").cloned(),
        description: fields.get("description").cloned(),
        price,
        stock,
        category: fields.get("category").cloned(),
        images,
    })
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for product API endpoints
#[derive(Debug)]
enum ProductApiError {
    Ingest(IngestError),
    Create(CreateProductError),
    Update(UpdateProductError),
    Delete(DeleteProductError),
    Get(GetProductError),
    List(ListProductsError),
}

impl From<IngestError> for ProductApiError {
    fn from(err: IngestError) -> Self {
        Self::Ingest(err)
    }
}

impl From<CreateProductError> for ProductApiError {
    fn from(err: CreateProductError) -> Self {
        Self::Create(err)
    }
}

impl From<UpdateProductError> for ProductApiError {
    fn from(err: UpdateProductError) -> Self {
        Self::Update(err)
    }
}

impl From<DeleteProductError> for ProductApiError {
    fn from(err: DeleteProductError) -> Self {
        Self::Delete(err)
    }
}

impl From<GetProductError> for ProductApiError {
    fn from(err: GetProductError) -> Self {
        Self::Get(err)
    }
}

impl From<ListProductsError> for ProductApiError {
    fn from(err: ListProductsError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for ProductApiError {
    fn into_response(self) -> Response {
        match self {
            // Upload lifecycle errors
            ProductApiError::Ingest(IngestError::EmptyBatch)
            | ProductApiError::Ingest(IngestError::TooManyFiles)
            | ProductApiError::Ingest(IngestError::UnsupportedType { .. })
            | ProductApiError::Ingest(IngestError::FileTooLarge { .. })
            | ProductApiError::Ingest(IngestError::Multipart(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ProductApiError::Ingest(IngestError::Upload(_))
            | ProductApiError::Ingest(IngestError::Io(_)) => {
                tracing::error!("Upload error during product request: {}", self);
                let error = ErrorResponse::internal(
                    "UPLOAD_ERROR",
                    "Error uploading images to remote storage",
                    &self,
                );
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Create errors
            ProductApiError::Create(CreateProductError::MissingFields)
            | ProductApiError::Create(CreateProductError::PriceInvalid)
            | ProductApiError::Create(CreateProductError::StockInvalid)
            | ProductApiError::Create(CreateProductError::Validation(_))
            | ProductApiError::Create(CreateProductError::ImagesRequired)
            | ProductApiError::Create(CreateProductError::TooManyImages) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ProductApiError::Create(CreateProductError::Database(_)) => {
                tracing::error!("Database error during product creation: {}", self);
                let error =
                    ErrorResponse::internal("INTERNAL_ERROR", "A database error occurred", &self);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Update errors
            ProductApiError::Update(UpdateProductError::PriceInvalid)
            | ProductApiError::Update(UpdateProductError::StockInvalid)
            | ProductApiError::Update(UpdateProductError::Validation(_))
            | ProductApiError::Update(UpdateProductError::ImagesRequired)
            | ProductApiError::Update(UpdateProductError::TooManyImages) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ProductApiError::Update(UpdateProductError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ProductApiError::Update(UpdateProductError::Database(_)) => {
                tracing::error!("Database error during product update: {}", self);
                let error =
                    ErrorResponse::internal("INTERNAL_ERROR", "A database error occurred", &self);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Delete errors
            ProductApiError::Delete(DeleteProductError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ProductApiError::Delete(DeleteProductError::Database(_)) => {
                tracing::error!("Database error during product deletion: {}", self);
                let error =
                    ErrorResponse::internal("INTERNAL_ERROR", "A database error occurred", &self);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Get errors
            ProductApiError::Get(GetProductError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ProductApiError::Get(GetProductError::Database(_)) => {
                tracing::error!("Database error during product retrieval: {}", self);
                let error =
                    ErrorResponse::internal("INTERNAL_ERROR", "A database error occurred", &self);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // List errors
            ProductApiError::List(ListProductsError::Database(_)) => {
                tracing::error!("Database error during product listing: {}", self);
                let error =
                    ErrorResponse::internal("INTERNAL_ERROR", "A database error occurred", &self);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for ProductApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ingest(e) => write!(f, "{}", e),
            Self::Create(e) => write!(f, "{}", e),
            Self::Update(e) => write!(f, "{}", e),
            Self::Delete(e) => write!(f, "{}", e),
            Self::Get(e) => write!(f, "{}", e),
            Self::List(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_fields() -> HashMap<String, String> {
        fields(&[
            ("name", "Walnut desk"),
            ("description", "A sturdy desk made of solid walnut."),
            ("price", "349.99"),
            ("stock", "4"),
            ("category", "furniture"),
        ])
    }

    #[test]
    fn test_build_create_command() {
        let command = build_create_command(
            &full_fields(),
            vec!["https://cdn.example.com/media/product-images/1-a.png".to_string()],
        )
        .expect("command");

        assert_eq!(command.name, "Walnut desk");
        assert_eq!(command.price, 349.99);
        assert_eq!(command.stock, 4);
        assert_eq!(command.images.len(), 1);
    }

    #[test]
    fn test_build_create_command_missing_field() {
        let mut incomplete = full_fields();
        incomplete.remove("category");

        let result = build_create_command(&incomplete, vec!["https://x/a.png".to_string()]);
        assert!(matches!(
            result,
            Err(ProductApiError::Create(CreateProductError::MissingFields))
        ));
    }

    #[test]
    fn test_build_create_command_bad_price() {
        let mut bad = full_fields();
        bad.insert("price".to_string(), "free".to_string());

        let result = build_create_command(&bad, vec!["https://x/a.png".to_string()]);
        assert!(matches!(
            result,
            Err(ProductApiError::Create(CreateProductError::PriceInvalid))
        ));
    }

    #[test]
    fn test_build_update_command_partial() {
        let command = build_update_command(
            Uuid::new_v4(),
            &fields(&[("price", "19.5")]),
            None,
        )
        .expect("command");

        assert_eq!(command.price, Some(19.5));
        assert!(command.name.is_none());
        assert!(command.images.is_none());
    }

    #[test]
    fn test_build_update_command_bad_stock() {
        let result = build_update_command(Uuid::new_v4(), &fields(&[("stock", "many")]), None);
        assert!(matches!(
            result,
            Err(ProductApiError::Update(UpdateProductError::StockInvalid))
        ));
    }

    #[test]
    fn test_error_display() {
        let err = ProductApiError::Ingest(IngestError::TooManyFiles);
        assert!(err.to_string().contains("Maximum allowed files are 5"));
    }

    #[test]
    fn test_routes_structure() {
        let router = products_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
