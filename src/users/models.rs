/// User profile models
use crate::{
    error::{ServiceError, ServiceResult},
    image_store::ImageRef,
    store::time,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Files complaints and feedback
    Citizen,
    /// Handles assigned complaints
    MunicipalOfficer,
    /// Full access
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Citizen, Role::MunicipalOfficer, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::MunicipalOfficer => "municipal_officer",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> ServiceResult<Self> {
        match s.to_lowercase().as_str() {
            "citizen" => Ok(Role::Citizen),
            "municipal_officer" => Ok(Role::MunicipalOfficer),
            "admin" => Ok(Role::Admin),
            _ => Err(ServiceError::Validation(format!("Invalid role: {}", s))),
        }
    }

    /// Officers and admins triage complaints and receive new-complaint notifications
    pub fn is_staff(&self) -> bool {
        match self {
            Role::Citizen => false,
            Role::MunicipalOfficer | Role::Admin => true,
        }
    }
}

/// User profile document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub profile_image: Option<ImageRef>,
    #[serde(with = "time")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "time::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name shown on comments and notifications
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Anonymous")
    }
}

/// Partial profile update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.phone_number.is_none() && self.address.is_none()
    }
}
