//! Image upload lifecycle
//!
//! Manages the path from locally staged multipart files to persisted remote
//! image URLs across product create, update (replace), and delete:
//!
//! 1. **Staged**: each multipart `images` part is written to the staging
//!    directory under a timestamp-prefixed name.
//! 2. **Validated**: the whole batch is rejected when it is empty, exceeds
//!    [`MAX_BATCH_SIZE`] files, or contains a non-image content type; no
//!    upload is attempted for a rejected batch.
//! 3. **Uploaded**: all files upload concurrently; the batch join fails as
//!    a whole if any upload fails, and files that already completed stay in
//!    remote storage.
//! 4. **Local cleanup**: staged files are removed after a successful
//!    upload. Remote durability takes precedence: a failed removal is
//!    logged and the upload is not unwound.
//!
//! [`release_batch`] is the compensating side: best-effort concurrent
//! deletion of remote objects that must never fail the caller.

use crate::config::MediaConfig;
use crate::storage::MediaStorage;
use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Maximum number of image files per create/update request
pub const MAX_BATCH_SIZE: usize = 5;

/// Content types accepted for product images
pub const ALLOWED_IMAGE_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Multipart field name carrying image files
pub const IMAGES_FIELD: &str = "images";

/// A file staged in the local upload directory
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: String,
}

/// Staged files plus the text fields of the same multipart request
#[derive(Debug, Default)]
pub struct StagedBatch {
    pub files: Vec<StagedFile>,
    pub fields: HashMap<String, String>,
}

/// Errors from staging, validating, or ingesting an upload batch
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Please upload up to {MAX_BATCH_SIZE} image files for the product.")]
    EmptyBatch,

    #[error("Maximum allowed files are {MAX_BATCH_SIZE}.")]
    TooManyFiles,

    #[error("Only JPEG, PNG, and WEBP formats are allowed (got {content_type}).")]
    UnsupportedType { content_type: String },

    #[error("Image files must not exceed {max_bytes} bytes.")]
    FileTooLarge { max_bytes: usize },

    #[error("Failed to read multipart payload: {0}")]
    Multipart(String),

    #[error("Error uploading images to remote storage: {0}")]
    Upload(#[source] anyhow::Error),

    #[error("IO error while staging upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Drain a multipart request into the staging directory.
///
/// `images` parts are written to disk under `<unix-millis>-<original name>`;
/// every other part is collected as a text field.
pub async fn stage_batch(
    multipart: &mut Multipart,
    config: &MediaConfig,
) -> Result<StagedBatch, IngestError> {
    tokio::fs::create_dir_all(&config.staging_dir).await?;

    let mut batch = StagedBatch::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());

        if name == IMAGES_FIELD && file_name.is_some() {
            let original = file_name.unwrap_or_default();
            let data = field
                .bytes()
                .await
                .map_err(|e| IngestError::Multipart(e.to_string()))?;

            if data.len() > config.max_file_bytes {
                return Err(IngestError::FileTooLarge {
                    max_bytes: config.max_file_bytes,
                });
            }

            let staged_name = staged_file_name(&original);
            let path = config.staging_dir.join(&staged_name);
            tokio::fs::write(&path, &data).await?;

            debug!(
                file = %staged_name,
                bytes = data.len(),
                "Staged upload file"
            );

            batch.files.push(StagedFile {
                path,
                file_name: staged_name,
                content_type: content_type.unwrap_or_default(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| IngestError::Multipart(e.to_string()))?;
            batch.fields.insert(name, value);
        }
    }

    Ok(batch)
}

/// Validate a staged batch against the count and content-type rules.
///
/// A rejection is terminal for the whole request; callers must not upload
/// any file from a rejected batch.
pub fn validate_batch(files: &[StagedFile]) -> Result<(), IngestError> {
    if files.is_empty() {
        return Err(IngestError::EmptyBatch);
    }

    if files.len() > MAX_BATCH_SIZE {
        return Err(IngestError::TooManyFiles);
    }

    for file in files {
        if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
            return Err(IngestError::UnsupportedType {
                content_type: file.content_type.clone(),
            });
        }
    }

    Ok(())
}

/// Validate a staged batch, upload every file concurrently, and clean up the
/// local temp files. Returns the durable remote URLs in batch order.
///
/// Files that completed before a failed join stay uploaded remotely; there
/// is no compensating deletion on partial batch failure.
#[tracing::instrument(skip(storage, files), fields(batch_size = files.len()))]
pub async fn ingest_batch(
    storage: &MediaStorage,
    files: Vec<StagedFile>,
) -> Result<Vec<String>, IngestError> {
    validate_batch(&files)?;

    let uploads = files.into_iter().map(|file| upload_one(storage, file));
    let urls = futures::future::try_join_all(uploads).await?;

    Ok(urls)
}

async fn upload_one(storage: &MediaStorage, file: StagedFile) -> Result<String, IngestError> {
    let data = tokio::fs::read(&file.path).await?;
    let key = storage.key_for(&file.file_name);

    let uploaded = storage
        .upload(&key, data, Some(file.content_type.clone()))
        .await
        .map_err(IngestError::Upload)?;

    // The remote copy is durable at this point; local tidiness is secondary.
    if let Err(e) = tokio::fs::remove_file(&file.path).await {
        warn!(
            path = %file.path.display(),
            error = %e,
            "Failed to delete staged upload file after remote upload"
        );
    }

    Ok(uploaded.url)
}

/// Best-effort removal of remote objects referenced by stored image URLs.
///
/// Runs all deletions concurrently; every failure is logged and none is
/// surfaced to the caller.
#[tracing::instrument(skip(storage, urls), fields(count = urls.len()))]
pub async fn release_batch(storage: &MediaStorage, urls: &[String]) {
    let deletions = urls.iter().map(|url| async move {
        match MediaStorage::key_from_url(url) {
            Some(key) => {
                if let Err(e) = storage.delete(&key).await {
                    warn!(key = %key, error = %e, "Failed to delete remote image");
                }
            },
            None => {
                warn!(url = %url, "Could not derive storage key from image URL");
            },
        }
    });

    futures::future::join_all(deletions).await;
}

/// Best-effort removal of staged files from a rejected batch.
pub async fn discard_staged(files: &[StagedFile]) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            warn!(
                path = %file.path.display(),
                error = %e,
                "Failed to remove rejected staged file"
            );
        }
    }
}

/// Staging name: unix-millis prefix plus the sanitized original name
fn staged_file_name(original: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-{}", millis, sanitize_file_name(original))
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
