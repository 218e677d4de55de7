/// Image Serving Endpoint
use crate::{
    error::{ServiceError, ServiceResult},
    AppContext,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};

/// Build image routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/images/*key", get(get_image))
}

/// Serve stored image bytes
///
/// Keys are content addressed, so responses are cacheable forever.
async fn get_image(
    State(ctx): State<AppContext>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> ServiceResult<Response> {
    let (data, mime_type) = ctx
        .images
        .get(&key)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Image not found: {}", key)))?;

    let etag = format!("\"{}\"", key);

    // Check If-None-Match header for 304 Not Modified
    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag);

    let builder = Response::builder()
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable");

    let response = if not_modified {
        builder.status(StatusCode::NOT_MODIFIED).body(Body::empty())
    } else {
        builder
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_LENGTH, data.len().to_string())
            .body(Body::from(data))
    };

    response.map_err(|e| ServiceError::Internal(format!("Failed to build response: {}", e)))
}
