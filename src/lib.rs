/// Civic Complaints - municipal complaint tracking service
///
/// Citizens file complaints with photos and a location, municipal officers
/// and admins triage and resolve them, and every lifecycle event fans out
/// per-user notifications.

pub mod api;
pub mod auth;
pub mod complaints;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod feedback;
pub mod image_store;
pub mod metrics;
pub mod notifications;
pub mod server;
pub mod store;
pub mod users;

pub use context::AppContext;
pub use error::{ServiceError, ServiceResult};
