/// Metrics and telemetry for the complaints service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Document store operation counts and latencies
/// - Complaint submissions, status transitions and comments
/// - Notification deliveries and fan-out failures
/// - Feedback ratings and image uploads

use crate::error::{ServiceError, ServiceResult};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // ========== Document Store Metrics ==========

    /// Document store operations by operation and collection
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "store_operations_total",
        "Total number of document store operations",
        &["operation", "collection"]
    )
    .unwrap();

    /// Document store operation duration in seconds
    pub static ref STORE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "store_operation_duration_seconds",
        "Document store operation latencies in seconds",
        &["operation", "collection"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // ========== Complaint Metrics ==========

    /// Complaints submitted by category
    pub static ref COMPLAINTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "complaints_submitted_total",
        "Total number of complaints submitted",
        &["category"]
    )
    .unwrap();

    /// Status transitions by target status
    pub static ref STATUS_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "complaint_status_transitions_total",
        "Total number of applied complaint status transitions",
        &["status"]
    )
    .unwrap();

    /// Comments by author role
    pub static ref COMMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "complaint_comments_total",
        "Total number of comments appended to complaints",
        &["role"]
    )
    .unwrap();

    // ========== Notification Metrics ==========

    /// Notifications by kind and outcome
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "notifications_total",
        "Total number of notification writes",
        &["kind", "status"]
    )
    .unwrap();

    // ========== Feedback & Image Metrics ==========

    /// Feedback submissions by rating
    pub static ref FEEDBACK_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feedback_submitted_total",
        "Total number of feedback submissions",
        &["rating"]
    )
    .unwrap();

    /// Image uploads by MIME type
    pub static ref IMAGE_UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "image_uploads_total",
        "Total number of image uploads",
        &["mime_type"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> ServiceResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ServiceError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::Internal(format!("Metrics are not UTF-8: {}", e)))
}

/// Record a document store operation
pub fn record_store_operation(operation: &str, collection: &str, duration: f64) {
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection])
        .inc();
    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);
}

/// Record a complaint submission
pub fn record_complaint_submitted(category: &str) {
    COMPLAINTS_SUBMITTED_TOTAL
        .with_label_values(&[category])
        .inc();
}

/// Record an applied status transition
pub fn record_status_transition(status: &str) {
    STATUS_TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a comment
pub fn record_comment(role: &str) {
    COMMENTS_TOTAL.with_label_values(&[role]).inc();
}

/// Record a notification write
pub fn record_notification(kind: &str, delivered: bool) {
    NOTIFICATIONS_TOTAL
        .with_label_values(&[kind, if delivered { "delivered" } else { "failed" }])
        .inc();
}

/// Record a feedback submission
pub fn record_feedback(rating: u8) {
    FEEDBACK_TOTAL
        .with_label_values(&[&rating.to_string()])
        .inc();
}

/// Record an image upload
pub fn record_image_upload(mime_type: &str) {
    IMAGE_UPLOADS_TOTAL.with_label_values(&[mime_type]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_metrics() {
        record_complaint_submitted("water");
        record_notification("complaint_new", true);

        let output = render_metrics().unwrap();
        assert!(output.contains("complaints_submitted_total"));
        assert!(output.contains("notifications_total"));
    }

    #[test]
    fn test_counter_increments() {
        let before = STATUS_TRANSITIONS_TOTAL
            .with_label_values(&["resolved"])
            .get();
        record_status_transition("resolved");
        let after = STATUS_TRANSITIONS_TOTAL
            .with_label_values(&["resolved"])
            .get();
        assert!(after > before);
    }
}
