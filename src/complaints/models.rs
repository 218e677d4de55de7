/// Complaint models
use crate::{
    error::{ServiceError, ServiceResult},
    image_store::{ImageRef, ImageUpload},
    store::time,
    users::{Role, User},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Lifecycle status; variants are declared in lifecycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 3] = [
        ComplaintStatus::Pending,
        ComplaintStatus::InProgress,
        ComplaintStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> ServiceResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ComplaintStatus::Pending),
            "in_progress" => Ok(ComplaintStatus::InProgress),
            "resolved" => Ok(ComplaintStatus::Resolved),
            _ => Err(ServiceError::Validation(format!("Invalid status: {}", s))),
        }
    }

    /// Human readable form used in notification titles
    pub fn label(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in progress",
            ComplaintStatus::Resolved => "resolved",
        }
    }
}

/// Fixed set of complaint categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintCategory {
    Road,
    Water,
    Garbage,
    Electricity,
    Sewage,
    PublicProperty,
    Other,
}

impl ComplaintCategory {
    pub const ALL: [ComplaintCategory; 7] = [
        ComplaintCategory::Road,
        ComplaintCategory::Water,
        ComplaintCategory::Garbage,
        ComplaintCategory::Electricity,
        ComplaintCategory::Sewage,
        ComplaintCategory::PublicProperty,
        ComplaintCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintCategory::Road => "road",
            ComplaintCategory::Water => "water",
            ComplaintCategory::Garbage => "garbage",
            ComplaintCategory::Electricity => "electricity",
            ComplaintCategory::Sewage => "sewage",
            ComplaintCategory::PublicProperty => "public_property",
            ComplaintCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> ServiceResult<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s.to_lowercase())
            .ok_or_else(|| ServiceError::Validation(format!("Invalid category: {}", s)))
    }
}

/// Where the problem is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(length(min = 1))]
    pub address: String,
}

/// A comment inside a complaint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    /// Role of the author when the comment was written
    pub author_role: Role,
    #[serde(with = "time")]
    pub created_at: DateTime<Utc>,
}

/// Complaint document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: ComplaintCategory,
    pub status: ComplaintStatus,
    pub location: Location,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    pub citizen_id: String,
    pub citizen_name: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub assigned_to_name: Option<String>,
    #[serde(with = "time")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "time")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, with = "time::option")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub feedback_id: Option<String>,
    #[serde(default)]
    pub feedback_rating: Option<u8>,
}

/// The user acting on a complaint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name().to_string(),
            role: user.role,
        }
    }
}

/// Complaint submission
#[derive(Debug, Clone, Validate)]
pub struct NewComplaint {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub category: ComplaintCategory,
    #[validate(nested)]
    pub location: Location,
    #[validate(length(min = 1))]
    pub citizen_id: String,
    pub citizen_name: String,
    pub images: Vec<ImageUpload>,
}

impl NewComplaint {
    /// Field checks beyond the derived ones
    pub fn check(&self, max_images: usize) -> ServiceResult<()> {
        self.validate()?;

        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("address", &self.location.address),
            ("citizen_id", &self.citizen_id),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::Validation(format!("{} is required", field)));
            }
        }

        if self.images.len() > max_images {
            return Err(ServiceError::Validation(format!(
                "At most {} images may be attached to a complaint",
                max_images
            )));
        }

        Ok(())
    }
}

/// Optional filters for complaint listings
#[derive(Debug, Clone, Default)]
pub struct ComplaintFilter {
    pub citizen_id: Option<String>,
    pub assigned_to: Option<String>,
    pub status: Option<ComplaintStatus>,
    pub category: Option<ComplaintCategory>,
    pub limit: Option<u32>,
}

/// Aggregate statistics over complaints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplaintStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub by_category: BTreeMap<ComplaintCategory, u64>,
    /// Mean days from creation to resolution
    pub average_resolution_time: f64,
}

impl ComplaintStats {
    pub fn from_complaints(complaints: &[Complaint]) -> Self {
        let mut stats = ComplaintStats {
            total: complaints.len() as u64,
            pending: 0,
            in_progress: 0,
            resolved: 0,
            by_category: ComplaintCategory::ALL.into_iter().map(|c| (c, 0)).collect(),
            average_resolution_time: 0.0,
        };

        let mut resolution_days = Vec::new();
        for complaint in complaints {
            match complaint.status {
                ComplaintStatus::Pending => stats.pending += 1,
                ComplaintStatus::InProgress => stats.in_progress += 1,
                ComplaintStatus::Resolved => stats.resolved += 1,
            }
            *stats.by_category.entry(complaint.category).or_insert(0) += 1;

            // Complaints without a resolution timestamp are left out of the mean
            if let Some(resolved_at) = complaint.resolved_at {
                let elapsed = resolved_at - complaint.created_at;
                resolution_days.push(elapsed.num_milliseconds() as f64 / 86_400_000.0);
            }
        }

        if !resolution_days.is_empty() {
            stats.average_resolution_time =
                resolution_days.iter().sum::<f64>() / resolution_days.len() as f64;
        }

        stats
    }
}
