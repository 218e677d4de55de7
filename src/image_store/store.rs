/// Image Store Manager
///
/// Coordinates an image backend with metadata tracking in the document store
use crate::{
    error::{ServiceError, ServiceResult},
    image_store::{
        disk::DiskImageBackend, validate_key, ImageBackend, ImageDimensions, ImageMetadata,
        ImageRef, ImageUpload,
    },
    metrics,
    store::DocumentStore,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

/// Collection holding image metadata
pub const COLLECTION: &str = "images";

/// MIME types accepted for upload
const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Image store configuration
#[derive(Debug, Clone)]
pub struct ImageStoreConfig {
    /// Root directory of the disk backend
    pub location: PathBuf,

    /// Maximum image size in bytes (default: 5MB)
    pub max_image_size: usize,

    /// Base URL prepended to `/images/{key}` in image references
    pub public_url: String,
}

impl Default for ImageStoreConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("./data/images"),
            max_image_size: 5 * 1024 * 1024, // 5MB
            public_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Main image store manager
#[derive(Clone)]
pub struct ImageStore {
    config: ImageStoreConfig,
    backend: Arc<dyn ImageBackend>,
    store: Arc<dyn DocumentStore>,
}

impl ImageStore {
    /// Create an image store on the disk backend
    pub fn new(config: ImageStoreConfig, store: Arc<dyn DocumentStore>) -> Self {
        let backend = Arc::new(DiskImageBackend::new(config.location.clone()));
        Self::with_backend(config, backend, store)
    }

    /// Create an image store on an arbitrary backend
    pub fn with_backend(
        config: ImageStoreConfig,
        backend: Arc<dyn ImageBackend>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            config,
            backend,
            store,
        }
    }

    /// Extract image dimensions from data
    fn extract_image_dimensions(data: &[u8]) -> Option<ImageDimensions> {
        match image::load_from_memory(data) {
            Ok(img) => Some(ImageDimensions {
                width: img.width(),
                height: img.height(),
            }),
            Err(e) => {
                tracing::warn!("Failed to extract image dimensions: {}", e);
                None
            }
        }
    }

    /// Sniff the MIME type from the leading bytes
    fn detect_mime_type(data: &[u8]) -> Option<String> {
        image::guess_format(data)
            .ok()
            .map(|format| format.to_mime_type().to_string())
    }

    /// Upload an image under a key prefix such as `complaints`
    ///
    /// Keys are content addressed, so uploading the same bytes twice yields
    /// the same reference and stores them once.
    pub async fn upload(
        &self,
        prefix: &str,
        upload: ImageUpload,
        owner_id: &str,
    ) -> ServiceResult<ImageRef> {
        let ImageUpload { data, mime_type } = upload;

        // Validate size
        let size = data.len();
        if size == 0 {
            return Err(ServiceError::Validation("Image is empty".to_string()));
        }
        if size > self.config.max_image_size {
            return Err(ServiceError::Validation(format!(
                "Image of {} bytes exceeds the {} byte limit",
                size, self.config.max_image_size
            )));
        }

        // Detect MIME type from data if not provided
        let mime_type = mime_type
            .or_else(|| Self::detect_mime_type(&data))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        self.validate_mime_type(&mime_type)?;

        let key = self.calculate_key(prefix, &data, &mime_type)?;
        let dimensions = Self::extract_image_dimensions(&data);

        let image_ref = ImageRef {
            url: self.url_for(&key),
            key: key.clone(),
            mime_type: mime_type.clone(),
            size: size as u64,
            width: dimensions.map(|d| d.width),
            height: dimensions.map(|d| d.height),
        };

        // Check if image already exists
        if self.backend.exists(&key).await? {
            return Ok(image_ref);
        }

        self.backend.put(&key, data, &mime_type).await?;

        let metadata = ImageMetadata {
            id: key.clone(),
            mime_type: mime_type.clone(),
            size: size as u64,
            owner_id: owner_id.to_string(),
            width: image_ref.width,
            height: image_ref.height,
            created_at: Utc::now(),
        };
        match self.store.insert(COLLECTION, &key, &metadata).await {
            // Bytes were stored earlier but their file was lost; metadata is still valid
            Ok(()) | Err(ServiceError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }

        metrics::record_image_upload(&mime_type);
        tracing::info!("Stored image {} ({} bytes)", key, size);

        Ok(image_ref)
    }

    /// Get an image and its MIME type by key
    pub async fn get(&self, key: &str) -> ServiceResult<Option<(Vec<u8>, String)>> {
        let data = match self.backend.get(key).await? {
            Some(data) => data,
            None => return Ok(None),
        };

        let mime_type = self
            .get_metadata(key)
            .await?
            .map(|m| m.mime_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(Some((data, mime_type)))
    }

    /// Get image metadata by key
    pub async fn get_metadata(&self, key: &str) -> ServiceResult<Option<ImageMetadata>> {
        self.store.fetch(COLLECTION, key).await
    }

    /// Delete an image and its metadata
    pub async fn delete(&self, key: &str) -> ServiceResult<()> {
        self.backend.delete(key).await?;
        self.store.delete(COLLECTION, key).await?;

        tracing::info!("Deleted image {}", key);
        Ok(())
    }

    /// Public URL of a key
    pub fn url_for(&self, key: &str) -> String {
        format!(
            "{}/images/{}",
            self.config.public_url.trim_end_matches('/'),
            key
        )
    }

    /// Build the content-addressed key: `{prefix}/{sha256}.{ext}`
    fn calculate_key(&self, prefix: &str, data: &[u8], mime_type: &str) -> ServiceResult<String> {
        let hash = hex::encode(Sha256::digest(data));
        let extension = mime_type.rsplit('/').next().unwrap_or("bin");
        let key = format!("{}/{}.{}", prefix, hash, extension);
        validate_key(&key)?;
        Ok(key)
    }

    /// Validate MIME type is allowed
    fn validate_mime_type(&self, mime_type: &str) -> ServiceResult<()> {
        if ALLOWED_TYPES.contains(&mime_type) {
            Ok(())
        } else {
            Err(ServiceError::Validation(format!(
                "Unsupported MIME type: {}",
                mime_type
            )))
        }
    }
}
