/// Image Storage System
///
/// Handles binary storage for complaint photos and profile images.
/// Backends implement [`ImageBackend`]; [`ImageStore`] adds validation,
/// content addressing and metadata tracking on top.

pub mod disk;
pub mod models;
pub mod store;

pub use models::*;
pub use store::{ImageStore, ImageStoreConfig};

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;

/// Image storage backend trait
///
/// Implementations handle the actual storage and retrieval of image bytes.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Store bytes under a key
    async fn put(&self, key: &str, data: Vec<u8>, mime_type: &str) -> ServiceResult<()>;

    /// Retrieve bytes by key
    async fn get(&self, key: &str) -> ServiceResult<Option<Vec<u8>>>;

    /// Delete by key
    async fn delete(&self, key: &str) -> ServiceResult<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> ServiceResult<bool>;
}

/// Validate a storage key
///
/// Keys are `/`-separated segments of `[a-z0-9_.-]`, never `.` or `..`, so a
/// key taken from a request path cannot escape the storage root.
pub fn validate_key(key: &str) -> ServiceResult<()> {
    let valid = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment.chars().all(|c| {
                    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-')
                })
        });

    if valid {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!("Invalid image key: {}", key)))
    }
}
