/// Image storage data models
use crate::store::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image metadata kept in the `images` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub id: String,
    pub mime_type: String,
    pub size: u64,
    pub owner_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(with = "time")]
    pub created_at: DateTime<Utc>,
}

/// Image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Reference to a stored image, embedded in complaints and profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub key: String,
    pub url: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// An image payload waiting to be stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    /// Declared MIME type; sniffed from the bytes when absent
    pub mime_type: Option<String>,
}

impl ImageUpload {
    pub fn new(data: Vec<u8>, mime_type: Option<&str>) -> Self {
        Self {
            data,
            mime_type: mime_type.map(String::from),
        }
    }
}
