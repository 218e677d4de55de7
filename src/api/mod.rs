/// API routes and handlers
pub mod complaints;
pub mod feedback;
pub mod images;
pub mod notifications;
pub mod users;

use crate::{
    context::AppContext,
    error::{ServiceError, ServiceResult},
    image_store::ImageUpload,
};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(complaints::routes())
        .merge(notifications::routes())
        .merge(feedback::routes())
        .merge(users::routes())
        .merge(images::routes())
}

/// Image sent inside a JSON body
///
/// `data` is base64, either bare or as a `data:<mime>;base64,` URL.
#[derive(Debug, Deserialize)]
pub struct ImagePayload {
    pub data: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl ImagePayload {
    pub fn into_upload(self) -> ServiceResult<ImageUpload> {
        let (declared, encoded) = match self.data.strip_prefix("data:") {
            Some(rest) => {
                let (header, encoded) = rest.split_once(',').ok_or_else(|| {
                    ServiceError::Validation("Malformed data URL".to_string())
                })?;
                let mime = header.strip_suffix(";base64").ok_or_else(|| {
                    ServiceError::Validation("Data URL must be base64 encoded".to_string())
                })?;
                (Some(mime.to_string()), encoded)
            }
            None => (None, self.data.as_str()),
        };

        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ServiceError::Validation(format!("Invalid image encoding: {}", e)))?;

        Ok(ImageUpload {
            data,
            mime_type: self.mime_type.or(declared).filter(|m| !m.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_base64() {
        let upload = ImagePayload {
            data: STANDARD.encode(b"pixels"),
            mime_type: Some("image/png".into()),
        }
        .into_upload()
        .unwrap();

        assert_eq!(upload.data, b"pixels");
        assert_eq!(upload.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_data_url() {
        let upload = ImagePayload {
            data: format!("data:image/webp;base64,{}", STANDARD.encode(b"pixels")),
            mime_type: None,
        }
        .into_upload()
        .unwrap();

        assert_eq!(upload.data, b"pixels");
        assert_eq!(upload.mime_type.as_deref(), Some("image/webp"));
    }

    #[test]
    fn test_invalid_payloads() {
        for data in ["not base64!!", "data:image/png,plain", "data:image/png;base64"] {
            let result = ImagePayload {
                data: data.to_string(),
                mime_type: None,
            }
            .into_upload();
            assert!(matches!(result, Err(ServiceError::Validation(_))), "{}", data);
        }
    }
}
