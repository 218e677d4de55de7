/// Disk-based image storage backend
use crate::{
    error::{ServiceError, ServiceResult},
    image_store::{validate_key, ImageBackend},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores images on the local filesystem, sharding each key's final segment
/// by its first two characters to keep directories small.
#[derive(Clone)]
pub struct DiskImageBackend {
    base_path: PathBuf,
}

impl DiskImageBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a key
    ///
    /// `complaints/abcdef.png` -> `{base}/complaints/ab/abcdef.png`
    fn get_image_path(&self, key: &str) -> ServiceResult<PathBuf> {
        validate_key(key)?;

        let (dir, name) = match key.rsplit_once('/') {
            Some((dir, name)) => (Some(dir), name),
            None => (None, key),
        };
        let shard = if name.len() >= 2 { &name[0..2] } else { "_" };

        let mut path = self.base_path.clone();
        if let Some(dir) = dir {
            path.push(dir);
        }
        Ok(path.join(shard).join(name))
    }

    /// Ensure the directory for an image exists
    async fn ensure_image_dir(&self, key: &str) -> ServiceResult<PathBuf> {
        let image_path = self.get_image_path(key)?;
        if let Some(parent) = image_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ServiceError::ImageStorage(format!("Failed to create image directory: {}", e))
            })?;
        }
        Ok(image_path)
    }
}

#[async_trait]
impl ImageBackend for DiskImageBackend {
    async fn put(&self, key: &str, data: Vec<u8>, _mime_type: &str) -> ServiceResult<()> {
        let image_path = self.ensure_image_dir(key).await?;

        fs::write(&image_path, data).await.map_err(|e| {
            ServiceError::ImageStorage(format!("Failed to write image {}: {}", key, e))
        })?;

        Ok(())
    }

    async fn get(&self, key: &str) -> ServiceResult<Option<Vec<u8>>> {
        let image_path = self.get_image_path(key)?;

        match fs::read(&image_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServiceError::ImageStorage(format!(
                "Failed to read image {}: {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        let image_path = self.get_image_path(key)?;

        match fs::remove_file(&image_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::ImageStorage(format!(
                "Failed to delete image {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> ServiceResult<bool> {
        let image_path = self.get_image_path(key)?;
        Ok(fs::try_exists(&image_path).await.unwrap_or(false))
    }
}
