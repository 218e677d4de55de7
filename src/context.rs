/// Application context and dependency injection
use crate::{
    complaints::ComplaintService,
    config::ServerConfig,
    db,
    error::{ServiceError, ServiceResult},
    feedback::FeedbackService,
    image_store::{ImageStore, ImageStoreConfig},
    notifications::NotificationService,
    store::{DocumentStore, SqliteDocumentStore},
    users::UserService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub images: Arc<ImageStore>,
    pub users: Arc<UserService>,
    pub notifications: Arc<NotificationService>,
    pub complaints: Arc<ComplaintService>,
    pub feedback: Arc<FeedbackService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ServiceResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        Ok(Self::with_pool(config, pool))
    }

    /// Wire the services over an already migrated pool
    pub fn with_pool(config: ServerConfig, pool: SqlitePool) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool.clone()));

        let images = Arc::new(ImageStore::new(
            ImageStoreConfig {
                location: config.storage.image_directory.clone(),
                max_image_size: config.storage.image_upload_limit,
                public_url: config.service.public_url.clone(),
            },
            store.clone(),
        ));

        let notifications = NotificationService::new(store.clone());
        let users = Arc::new(UserService::new(store.clone(), images.clone()));
        let complaints = Arc::new(
            ComplaintService::new(store.clone(), images.clone(), notifications.clone())
                .with_max_images(config.complaints.max_images),
        );
        let feedback = Arc::new(FeedbackService::new(store.clone(), complaints.clone()));

        Self {
            config: Arc::new(config),
            db: pool,
            images,
            users,
            notifications: Arc::new(notifications),
            complaints,
            feedback,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ServiceResult<()> {
        let dirs = [
            &config.storage.data_directory,
            &config.storage.image_directory,
        ];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    ServiceError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
