/// Complaint Lifecycle Manager
///
/// Creates complaints, moves them through pending -> in_progress -> resolved,
/// appends comments and answers listing and statistics queries. Every
/// lifecycle event fans out notifications through [`NotificationService`].
///
/// Operations are single request/response calls over the document store.
/// Multi-step operations are not transactional: if a submission fails after
/// some images were stored, those images stay orphaned.

pub mod models;

pub use models::{
    Actor, Comment, Complaint, ComplaintCategory, ComplaintFilter, ComplaintStats,
    ComplaintStatus, Location, NewComplaint,
};

use crate::{
    error::{ServiceError, ServiceResult},
    image_store::ImageStore,
    metrics,
    notifications::{NewNotification, NotificationKind, NotificationService},
    store::{time, DocumentStore, Query, Update},
    users::Role,
};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

/// Collection holding complaints
pub const COLLECTION: &str = "complaints";

/// Default cap on images per submission
pub const DEFAULT_MAX_IMAGES: usize = 5;

/// Complaint service
#[derive(Clone)]
pub struct ComplaintService {
    store: Arc<dyn DocumentStore>,
    images: Arc<ImageStore>,
    notifications: NotificationService,
    max_images: usize,
}

impl ComplaintService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        images: Arc<ImageStore>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            images,
            notifications,
            max_images: DEFAULT_MAX_IMAGES,
        }
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    /// File a new complaint
    ///
    /// Images are stored concurrently; any failed upload fails the submission.
    /// All officers and admins are notified once the complaint is written.
    pub async fn submit(&self, submission: NewComplaint) -> ServiceResult<Complaint> {
        submission.check(self.max_images)?;

        let id = Uuid::new_v4().to_string();
        let prefix = format!("{}/{}", COLLECTION, id);

        let NewComplaint {
            title,
            description,
            category,
            location,
            citizen_id,
            citizen_name,
            images,
        } = submission;

        let images = try_join_all(
            images
                .into_iter()
                .map(|upload| self.images.upload(&prefix, upload, &citizen_id)),
        )
        .await?;

        let now = Utc::now();
        let complaint = Complaint {
            id: id.clone(),
            title,
            description,
            category,
            status: ComplaintStatus::Pending,
            location,
            images,
            citizen_id,
            citizen_name,
            assigned_to: None,
            assigned_to_name: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            comments: Vec::new(),
            feedback_id: None,
            feedback_rating: None,
        };

        self.store.insert(COLLECTION, &id, &complaint).await?;
        metrics::record_complaint_submitted(complaint.category.as_str());
        tracing::info!(
            "Complaint {} submitted by {} ({}, {} images)",
            id,
            complaint.citizen_id,
            complaint.category.as_str(),
            complaint.images.len()
        );

        self.notifications
            .notify_staff(
                NewNotification::new(
                    NotificationKind::ComplaintNew,
                    format!("New complaint submitted: {}", complaint.title),
                    format!(
                        "A new complaint has been submitted by {}",
                        complaint.citizen_name
                    ),
                )
                .about(&id),
            )
            .await?;

        Ok(complaint)
    }

    /// Get a complaint by id
    pub async fn get(&self, complaint_id: &str) -> ServiceResult<Complaint> {
        self.store.fetch_required(COLLECTION, complaint_id).await
    }

    /// Move a complaint to `target`
    ///
    /// Setting the current status again changes nothing and notifies no one.
    /// Moving backwards fails with `InvalidTransition`. Entering in_progress
    /// with an officer assigns the complaint to that officer.
    pub async fn transition_status(
        &self,
        complaint_id: &str,
        target: ComplaintStatus,
        officer: Option<&Actor>,
    ) -> ServiceResult<Complaint> {
        let complaint = self.get(complaint_id).await?;

        if target == complaint.status {
            tracing::debug!(
                "Complaint {} already {}, nothing to do",
                complaint_id,
                target.as_str()
            );
            return Ok(complaint);
        }
        if target < complaint.status {
            return Err(ServiceError::InvalidTransition {
                from: complaint.status,
                to: target,
            });
        }

        let now = Utc::now();
        let mut update = Update::new()
            .set("status", target.as_str())
            .set("updated_at", time::format(&now));

        let mut new_assignee = None;
        match target {
            ComplaintStatus::InProgress => {
                if let Some(officer) = officer {
                    update = update
                        .set("assigned_to", officer.id.as_str())
                        .set("assigned_to_name", officer.name.as_str());
                    if complaint.assigned_to.as_deref() != Some(officer.id.as_str()) {
                        new_assignee = Some(officer);
                    }
                }
            }
            ComplaintStatus::Resolved => {
                update = update.set("resolved_at", time::format(&now));
            }
            // Nothing sorts below pending, so it is never a forward target
            ComplaintStatus::Pending => {}
        }

        self.store.update(COLLECTION, complaint_id, update).await?;
        metrics::record_status_transition(target.as_str());
        tracing::info!(
            "Complaint {} moved from {} to {}",
            complaint_id,
            complaint.status.as_str(),
            target.as_str()
        );

        let message = match target {
            ComplaintStatus::Pending => {
                format!("Your complaint \"{}\" is pending review", complaint.title)
            }
            ComplaintStatus::InProgress => format!(
                "Your complaint \"{}\" is now being processed by {}",
                complaint.title,
                officer.map(|o| o.name.as_str()).unwrap_or("an officer")
            ),
            ComplaintStatus::Resolved => {
                format!("Your complaint \"{}\" has been resolved", complaint.title)
            }
        };
        self.notifications
            .notify(
                &complaint.citizen_id,
                NewNotification::new(
                    NotificationKind::ComplaintUpdate,
                    format!("Complaint status updated to {}", target.label()),
                    message,
                )
                .about(complaint_id),
            )
            .await?;

        if let Some(officer) = new_assignee {
            self.notifications
                .notify(
                    &officer.id,
                    NewNotification::new(
                        NotificationKind::ComplaintAssigned,
                        "Complaint assigned to you",
                        format!("You have been assigned to complaint \"{}\"", complaint.title),
                    )
                    .about(complaint_id),
                )
                .await?;
        }

        self.get(complaint_id).await
    }

    /// Append a comment
    ///
    /// The citizen hears about comments from anyone else. The assigned officer
    /// hears about comments from citizens.
    pub async fn add_comment(
        &self,
        complaint_id: &str,
        text: &str,
        author: &Actor,
    ) -> ServiceResult<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::Validation("Comment text is required".to_string()));
        }

        let complaint = self.get(complaint_id).await?;

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_role: author.role,
            created_at: Utc::now(),
        };

        self.store
            .update(
                COLLECTION,
                complaint_id,
                Update::new()
                    .set("updated_at", time::format(&comment.created_at))
                    .append("comments", serde_json::to_value(&comment)?),
            )
            .await?;
        metrics::record_comment(author.role.as_str());
        tracing::debug!("Comment {} added to complaint {}", comment.id, complaint_id);

        if author.id != complaint.citizen_id {
            self.notifications
                .notify(
                    &complaint.citizen_id,
                    NewNotification::new(
                        NotificationKind::ComplaintComment,
                        "New comment on your complaint",
                        format!("{} commented on \"{}\"", author.name, complaint.title),
                    )
                    .about(complaint_id),
                )
                .await?;
        }

        let notify_officer = match author.role {
            Role::Citizen => complaint
                .assigned_to
                .as_deref()
                .filter(|officer| *officer != author.id),
            Role::MunicipalOfficer | Role::Admin => None,
        };
        if let Some(officer) = notify_officer {
            self.notifications
                .notify(
                    officer,
                    NewNotification::new(
                        NotificationKind::ComplaintComment,
                        "New comment on assigned complaint",
                        format!("{} commented on \"{}\"", author.name, complaint.title),
                    )
                    .about(complaint_id),
                )
                .await?;
        }

        Ok(comment)
    }

    /// Complaints filed by a citizen, newest first
    pub async fn list_for_citizen(
        &self,
        citizen_id: &str,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Complaint>> {
        self.search(&ComplaintFilter {
            citizen_id: Some(citizen_id.to_string()),
            limit,
            ..Default::default()
        })
        .await
    }

    /// Complaints assigned to an officer, newest first
    pub async fn list_for_officer(
        &self,
        officer_id: &str,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Complaint>> {
        self.search(&ComplaintFilter {
            assigned_to: Some(officer_id.to_string()),
            limit,
            ..Default::default()
        })
        .await
    }

    /// Every complaint, newest first
    pub async fn list_all(&self, limit: Option<u32>) -> ServiceResult<Vec<Complaint>> {
        self.search(&ComplaintFilter {
            limit,
            ..Default::default()
        })
        .await
    }

    pub async fn list_by_status(
        &self,
        status: ComplaintStatus,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Complaint>> {
        self.search(&ComplaintFilter {
            status: Some(status),
            limit,
            ..Default::default()
        })
        .await
    }

    pub async fn list_by_category(
        &self,
        category: ComplaintCategory,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Complaint>> {
        self.search(&ComplaintFilter {
            category: Some(category),
            limit,
            ..Default::default()
        })
        .await
    }

    /// Complaints matching every set filter, newest first
    pub async fn search(&self, filter: &ComplaintFilter) -> ServiceResult<Vec<Complaint>> {
        let mut query = Query::new().newest_first().limit(filter.limit);
        if let Some(citizen_id) = &filter.citizen_id {
            query = query.filter_eq("citizen_id", citizen_id.as_str());
        }
        if let Some(officer_id) = &filter.assigned_to {
            query = query.filter_eq("assigned_to", officer_id.as_str());
        }
        if let Some(status) = filter.status {
            query = query.filter_eq("status", status.as_str());
        }
        if let Some(category) = filter.category {
            query = query.filter_eq("category", category.as_str());
        }

        self.store.find(COLLECTION, &query).await
    }

    /// Aggregate statistics over all complaints
    pub async fn stats(&self) -> ServiceResult<ComplaintStats> {
        let complaints = self.list_all(None).await?;
        Ok(ComplaintStats::from_complaints(&complaints))
    }

    /// Delete a complaint and its images, then tell the citizen
    ///
    /// Image deletion is best effort: failures are logged and skipped.
    pub async fn delete(&self, complaint_id: &str) -> ServiceResult<()> {
        let complaint = self.get(complaint_id).await?;

        for image in &complaint.images {
            if let Err(e) = self.images.delete(&image.key).await {
                tracing::warn!(
                    "Failed to delete image {} of complaint {}: {}",
                    image.key,
                    complaint_id,
                    e
                );
            }
        }

        self.store.delete(COLLECTION, complaint_id).await?;
        tracing::info!("Deleted complaint {}", complaint_id);

        self.notifications
            .notify(
                &complaint.citizen_id,
                NewNotification::new(
                    NotificationKind::ComplaintDeleted,
                    "Complaint deleted",
                    format!(
                        "Your complaint \"{}\" was removed by an administrator",
                        complaint.title
                    ),
                ),
            )
            .await?;

        Ok(())
    }

    /// Record feedback on a complaint
    ///
    /// Returns false when the complaint does not exist.
    pub async fn link_feedback(
        &self,
        complaint_id: &str,
        feedback_id: &str,
        rating: u8,
    ) -> ServiceResult<bool> {
        let update = Update::new()
            .set("feedback_id", feedback_id)
            .set("feedback_rating", rating)
            .set("updated_at", time::format(&Utc::now()));

        match self.store.update(COLLECTION, complaint_id, update).await {
            Ok(()) => Ok(true),
            Err(ServiceError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
