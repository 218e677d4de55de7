/// Configuration management for the complaints service
use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "civic_complaints=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub complaints: ComplaintConfig,
    pub authentication: AuthConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL used in image links handed to clients
    pub public_url: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub image_directory: PathBuf,
    pub image_upload_limit: usize,
}

/// Complaint submission limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintConfig {
    pub max_images: usize,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from any variable source
    pub fn from_vars<F>(var: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hostname = var("CIVIC_HOSTNAME").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("CIVIC_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .map_err(|_| ServiceError::Validation("Invalid port number".to_string()))?;
        let public_url =
            var("CIVIC_PUBLIC_URL").unwrap_or_else(|| format!("http://{}:{}", hostname, port));
        let version = var("CIVIC_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = var("CIVIC_DATA_DIRECTORY")
            .unwrap_or_else(|| "./data".to_string())
            .into();
        let database = var("CIVIC_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_directory.join("civic.sqlite"));
        let image_directory = var("CIVIC_IMAGE_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_directory.join("images"));
        let image_upload_limit = var("CIVIC_IMAGE_UPLOAD_LIMIT")
            .unwrap_or_else(|| "5242880".to_string())
            .parse()
            .map_err(|_| ServiceError::Validation("Invalid image upload limit".to_string()))?;

        let max_images = var("CIVIC_MAX_IMAGES_PER_COMPLAINT")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| ServiceError::Validation("Invalid image count limit".to_string()))?;

        let jwt_secret = var("CIVIC_JWT_SECRET")
            .ok_or_else(|| ServiceError::Validation("JWT secret required".to_string()))?;

        let log_level = var("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                image_directory,
                image_upload_limit,
            },
            complaints: ComplaintConfig { max_images },
            authentication: AuthConfig { jwt_secret },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ServiceResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ServiceError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ServiceError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.storage.image_upload_limit == 0 {
            return Err(ServiceError::Validation(
                "Image upload limit must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
