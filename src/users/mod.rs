/// User Profiles
///
/// Profiles live in the `users` collection. Accounts themselves belong to
/// the external identity provider; this module only keeps the profile
/// document the rest of the service reads roles and names from.

pub mod models;

pub use models::{ProfileUpdate, Role, User};

use crate::{
    error::{ServiceError, ServiceResult},
    image_store::{ImageRef, ImageStore, ImageUpload},
    store::{time, DocumentStore, Query, Update},
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Collection holding user profiles
pub const COLLECTION: &str = "users";

/// Key prefix for profile images
const IMAGE_PREFIX: &str = "profile_images";

/// Profile service
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn DocumentStore>,
    images: Arc<ImageStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, images: Arc<ImageStore>) -> Self {
        Self { store, images }
    }

    /// Get a profile by user id
    pub async fn get(&self, user_id: &str) -> ServiceResult<User> {
        self.store.fetch_required(COLLECTION, user_id).await
    }

    /// Get a profile if it exists
    pub async fn find(&self, user_id: &str) -> ServiceResult<Option<User>> {
        self.store.fetch(COLLECTION, user_id).await
    }

    /// Create the profile on first sign-in
    ///
    /// New profiles start as citizens; an existing profile is returned as is.
    pub async fn ensure_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> ServiceResult<User> {
        if let Some(user) = self.find(user_id).await? {
            return Ok(user);
        }

        match self.create(user_id, email, display_name, Role::Citizen).await {
            // A concurrent first request created it in between
            Err(ServiceError::Conflict(_)) => self.get(user_id).await,
            result => result,
        }
    }

    /// Create a profile with an explicit role
    pub async fn create(
        &self,
        user_id: &str,
        email: Option<&str>,
        display_name: Option<&str>,
        role: Role,
    ) -> ServiceResult<User> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::Validation("User id is required".to_string()));
        }

        let user = User {
            id: user_id.to_string(),
            email: email.map(String::from),
            display_name: display_name.map(String::from),
            role,
            phone_number: None,
            address: None,
            profile_image: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.store.insert(COLLECTION, user_id, &user).await?;
        tracing::info!("Created {} profile for {}", role.as_str(), user_id);

        Ok(user)
    }

    /// Update display name, phone number and address
    pub async fn update_profile(&self, user_id: &str, changes: ProfileUpdate) -> ServiceResult<User> {
        if changes.is_empty() {
            return self.get(user_id).await;
        }

        let mut update = Update::new().set("updated_at", time::format(&Utc::now()));
        if let Some(display_name) = changes.display_name {
            update = update.set("display_name", display_name);
        }
        if let Some(phone_number) = changes.phone_number {
            update = update.set("phone_number", phone_number);
        }
        if let Some(address) = changes.address {
            update = update.set("address", address);
        }

        self.store.update(COLLECTION, user_id, update).await?;
        self.get(user_id).await
    }

    /// Store a new profile image and point the profile at it
    pub async fn upload_profile_image(
        &self,
        user_id: &str,
        upload: ImageUpload,
    ) -> ServiceResult<ImageRef> {
        // Fail before storing bytes for a profile that does not exist
        self.get(user_id).await?;

        let prefix = format!("{}/{}", IMAGE_PREFIX, key_segment(user_id));
        let image = self.images.upload(&prefix, upload, user_id).await?;

        self.store
            .update(
                COLLECTION,
                user_id,
                Update::new()
                    .set("profile_image", serde_json::to_value(&image)?)
                    .set("updated_at", time::format(&Utc::now())),
            )
            .await?;

        Ok(image)
    }

    /// List profiles, optionally restricted to one role, newest first
    pub async fn list(&self, role: Option<Role>) -> ServiceResult<Vec<User>> {
        let mut query = Query::new().newest_first();
        if let Some(role) = role {
            query = query.filter_eq("role", role.as_str());
        }
        self.store.find(COLLECTION, &query).await
    }

    /// Change a user's role
    pub async fn update_role(&self, user_id: &str, role: Role) -> ServiceResult<User> {
        self.store
            .update(
                COLLECTION,
                user_id,
                Update::new()
                    .set("role", json!(role))
                    .set("updated_at", time::format(&Utc::now())),
            )
            .await?;

        tracing::info!("Changed role of {} to {}", user_id, role.as_str());
        self.get(user_id).await
    }

    /// Delete a profile document
    pub async fn delete(&self, user_id: &str) -> ServiceResult<()> {
        if !self.store.delete(COLLECTION, user_id).await? {
            return Err(ServiceError::NotFound(format!("user {} not found", user_id)));
        }

        tracing::info!("Deleted profile {}", user_id);
        Ok(())
    }
}

/// Map a user id onto the character set allowed in image keys
fn key_segment(user_id: &str) -> String {
    user_id
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, image_store::ImageStoreConfig, store::SqliteDocumentStore};
    use tempfile::{tempdir, TempDir};

    async fn create_test_service() -> (UserService, TempDir) {
        let dir = tempdir().unwrap();
        let pool = db::in_memory_pool().await.unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool));
        let images = Arc::new(ImageStore::new(
            ImageStoreConfig {
                location: dir.path().to_path_buf(),
                ..Default::default()
            },
            store.clone(),
        ));
        (UserService::new(store, images), dir)
    }

    #[tokio::test]
    async fn test_ensure_profile_is_idempotent() {
        let (users, _dir) = create_test_service().await;

        let first = users
            .ensure_profile("u1", Some("ana@example.org"), Some("Ana"))
            .await
            .unwrap();
        assert_eq!(first.role, Role::Citizen);

        users.update_role("u1", Role::Admin).await.unwrap();

        // A second sign-in does not reset the role
        let second = users.ensure_profile("u1", None, None).await.unwrap();
        assert_eq!(second.role, Role::Admin);
        assert_eq!(second.display_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_concurrent_first_sign_in() {
        let (users, _dir) = create_test_service().await;

        for round in 0..10 {
            let id = format!("u{}", round);
            let (a, b) = tokio::join!(
                users.ensure_profile(&id, Some("ana@example.org"), None),
                users.ensure_profile(&id, Some("ana@example.org"), None),
            );
            let (a, b) = (a.unwrap(), b.unwrap());
            assert_eq!(a.id, id);
            assert_eq!(b.id, id);
            assert_eq!(b.role, Role::Citizen);
        }

        assert_eq!(users.list(None).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_get_missing_profile() {
        let (users, _dir) = create_test_service().await;
        let err = users.get("ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let (users, _dir) = create_test_service().await;
        users.ensure_profile("u1", None, Some("Ana")).await.unwrap();

        let updated = users
            .update_profile(
                "u1",
                ProfileUpdate {
                    phone_number: Some("555-0100".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name.as_deref(), Some("Ana"));
        assert_eq!(updated.phone_number.as_deref(), Some("555-0100"));
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_list_by_role() {
        let (users, _dir) = create_test_service().await;
        users.create("c1", None, None, Role::Citizen).await.unwrap();
        users.create("o1", None, None, Role::MunicipalOfficer).await.unwrap();
        users.create("a1", None, None, Role::Admin).await.unwrap();

        assert_eq!(users.list(None).await.unwrap().len(), 3);

        let officers = users.list(Some(Role::MunicipalOfficer)).await.unwrap();
        assert_eq!(officers.len(), 1);
        assert_eq!(officers[0].id, "o1");
    }

    #[tokio::test]
    async fn test_upload_profile_image() {
        let (users, _dir) = create_test_service().await;
        users.ensure_profile("U1", None, None).await.unwrap();

        let image = users
            .upload_profile_image("U1", ImageUpload::new(b"face".to_vec(), Some("image/jpeg")))
            .await
            .unwrap();
        assert!(image.key.starts_with("profile_images/u1/"));

        let user = users.get("U1").await.unwrap();
        assert_eq!(user.profile_image, Some(image));
    }

    #[test]
    fn test_key_segment() {
        assert_eq!(key_segment("AbC123"), "abc123");
        assert_eq!(key_segment("auth0|42.x"), "auth0_42_x");
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let (users, _dir) = create_test_service().await;
        users.ensure_profile("u1", None, None).await.unwrap();

        users.delete("u1").await.unwrap();
        assert!(users.find("u1").await.unwrap().is_none());
        assert!(matches!(
            users.delete("u1").await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
