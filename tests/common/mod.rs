/// Shared setup for integration tests
use civic_complaints::{config::ServerConfig, db, AppContext};
use std::collections::HashMap;
use tempfile::TempDir;

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// An application context over an in-memory database and a temporary image directory
pub async fn test_context() -> (AppContext, TempDir) {
    let dir = tempfile::tempdir().unwrap();

    let vars: HashMap<&str, String> = [
        ("CIVIC_JWT_SECRET", JWT_SECRET.to_string()),
        ("CIVIC_DATA_DIRECTORY", dir.path().display().to_string()),
        ("CIVIC_PUBLIC_URL", "http://civic.test".to_string()),
        ("CIVIC_MAX_IMAGES_PER_COMPLAINT", "3".to_string()),
    ]
    .into_iter()
    .collect();
    let config = ServerConfig::from_vars(|key| vars.get(key).cloned()).unwrap();
    config.validate().unwrap();

    let pool = db::in_memory_pool().await.unwrap();
    (AppContext::with_pool(config, pool), dir)
}
