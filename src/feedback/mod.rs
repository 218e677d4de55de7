/// Citizen Feedback
use crate::{
    complaints::ComplaintService,
    error::{ServiceError, ServiceResult},
    metrics,
    store::{time, DocumentStore, Query},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Collection holding feedback
pub const COLLECTION: &str = "feedback";

/// Feedback record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub complaint_id: Option<String>,
    pub rating: u8,
    pub comment: String,
    #[serde(with = "time")]
    pub created_at: DateTime<Utc>,
}

/// Feedback submission
#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    #[serde(default)]
    pub complaint_id: Option<String>,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// Feedback service
#[derive(Clone)]
pub struct FeedbackService {
    store: Arc<dyn DocumentStore>,
    complaints: Arc<ComplaintService>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn DocumentStore>, complaints: Arc<ComplaintService>) -> Self {
        Self { store, complaints }
    }

    /// Record feedback, linking it to its complaint when that complaint exists
    pub async fn submit(
        &self,
        user_id: &str,
        user_name: &str,
        submission: NewFeedback,
    ) -> ServiceResult<Feedback> {
        if !(1..=5).contains(&submission.rating) {
            return Err(ServiceError::Validation(format!(
                "Rating must be between 1 and 5, got {}",
                submission.rating
            )));
        }

        let feedback = Feedback {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            complaint_id: submission.complaint_id.filter(|id| !id.trim().is_empty()),
            rating: submission.rating,
            comment: submission.comment.trim().to_string(),
            created_at: Utc::now(),
        };

        self.store.insert(COLLECTION, &feedback.id, &feedback).await?;
        metrics::record_feedback(feedback.rating);

        if let Some(complaint_id) = &feedback.complaint_id {
            let linked = self
                .complaints
                .link_feedback(complaint_id, &feedback.id, feedback.rating)
                .await?;
            if !linked {
                tracing::warn!(
                    "Feedback {} refers to missing complaint {}",
                    feedback.id,
                    complaint_id
                );
            }
        }

        tracing::info!("Feedback {} submitted by {}", feedback.id, user_id);
        Ok(feedback)
    }

    pub async fn get(&self, feedback_id: &str) -> ServiceResult<Feedback> {
        self.store.fetch_required(COLLECTION, feedback_id).await
    }

    /// All feedback, newest first
    pub async fn list_all(&self, limit: Option<u32>) -> ServiceResult<Vec<Feedback>> {
        self.store
            .find(COLLECTION, &Query::new().newest_first().limit(limit))
            .await
    }

    pub async fn list_for_user(&self, user_id: &str) -> ServiceResult<Vec<Feedback>> {
        self.store
            .find(
                COLLECTION,
                &Query::new().filter_eq("user_id", user_id).newest_first(),
            )
            .await
    }

    pub async fn list_for_complaint(&self, complaint_id: &str) -> ServiceResult<Vec<Feedback>> {
        self.store
            .find(
                COLLECTION,
                &Query::new()
                    .filter_eq("complaint_id", complaint_id)
                    .newest_first(),
            )
            .await
    }
}
