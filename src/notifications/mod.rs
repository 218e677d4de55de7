/// Notification Fan-out
///
/// Creates per-user notification records for complaint lifecycle events and
/// manages their read state. Each notification is its own document; a
/// fan-out to several users is a series of independent writes.

pub mod models;

pub use models::{FanOutReport, NewNotification, Notification, NotificationKind};

use crate::{
    error::{ServiceError, ServiceResult},
    metrics,
    store::{time, DocumentStore, Query, Update},
    users::{self, Role, User},
};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

/// Collection holding notifications
pub const COLLECTION: &str = "notifications";

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create an unread notification for one user
    pub async fn notify(&self, user_id: &str, content: NewNotification) -> ServiceResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: content.title,
            message: content.message,
            kind: content.kind,
            reference_id: content.reference_id,
            read: false,
            created_at: Utc::now(),
            read_at: None,
        };

        let result = self
            .store
            .insert(COLLECTION, &notification.id, &notification)
            .await;
        metrics::record_notification(notification.kind.as_str(), result.is_ok());
        result?;

        tracing::debug!(
            "Notified {} ({}): {}",
            user_id,
            notification.kind.as_str(),
            notification.title
        );

        Ok(notification)
    }

    /// Notify every municipal officer and admin
    ///
    /// One write per recipient. A failed write is recorded in the report and
    /// does not undo or stop the others; only the recipient lookup failing
    /// fails the whole call.
    pub async fn notify_staff(&self, content: NewNotification) -> ServiceResult<FanOutReport> {
        let staff_roles = Role::ALL.into_iter().filter(Role::is_staff).map(|r| r.as_str());
        let recipients: Vec<User> = self
            .store
            .find(users::COLLECTION, &Query::new().filter_in("role", staff_roles))
            .await?;

        let writes = recipients.iter().map(|user| {
            let content = content.clone();
            async move { (user.id.clone(), self.notify(&user.id, content).await) }
        });

        let mut report = FanOutReport::default();
        for (user_id, result) in join_all(writes).await {
            match result {
                Ok(_) => report.delivered.push(user_id),
                Err(e) => {
                    tracing::warn!("Failed to notify {} of {}: {}", user_id, content.title, e);
                    report.failed.push((user_id, e.to_string()));
                }
            }
        }

        if report.is_complete() {
            tracing::info!(
                "Fan-out '{}' delivered to {} staff",
                content.title,
                report.delivered.len()
            );
        } else {
            tracing::warn!(
                "Fan-out '{}' delivered to {} of {} staff",
                content.title,
                report.delivered.len(),
                recipients.len()
            );
        }

        Ok(report)
    }

    /// All notifications for a user, newest first
    pub async fn list_for_user(&self, user_id: &str) -> ServiceResult<Vec<Notification>> {
        self.store
            .find(
                COLLECTION,
                &Query::new().filter_eq("user_id", user_id).newest_first(),
            )
            .await
    }

    /// Number of unread notifications for a user
    pub async fn unread_count(&self, user_id: &str) -> ServiceResult<u64> {
        self.store
            .count(COLLECTION, &Self::unread_query(user_id))
            .await
    }

    /// Mark one notification read on behalf of its recipient
    pub async fn mark_read(&self, notification_id: &str, acting_user: &str) -> ServiceResult<Notification> {
        let notification = self.get_owned(notification_id, acting_user).await?;
        if notification.read {
            return Ok(notification);
        }

        self.store
            .update(COLLECTION, notification_id, Self::read_update())
            .await?;

        self.store.fetch_required(COLLECTION, notification_id).await
    }

    /// Mark every unread notification of a user read
    ///
    /// Returns how many were flipped. Other users' notifications are untouched.
    pub async fn mark_all_read(&self, user_id: &str) -> ServiceResult<usize> {
        let unread: Vec<Notification> = self
            .store
            .find(COLLECTION, &Self::unread_query(user_id))
            .await?;

        for notification in &unread {
            self.store
                .update(COLLECTION, &notification.id, Self::read_update())
                .await?;
        }

        tracing::debug!("Marked {} notifications read for {}", unread.len(), user_id);
        Ok(unread.len())
    }

    /// Permanently delete a notification on behalf of its recipient
    pub async fn delete(&self, notification_id: &str, acting_user: &str) -> ServiceResult<()> {
        self.get_owned(notification_id, acting_user).await?;
        self.store.delete(COLLECTION, notification_id).await?;
        Ok(())
    }

    /// Load a notification and check it is addressed to `acting_user`
    async fn get_owned(&self, notification_id: &str, acting_user: &str) -> ServiceResult<Notification> {
        let notification: Notification = self
            .store
            .fetch_required(COLLECTION, notification_id)
            .await?;

        if notification.user_id != acting_user {
            return Err(ServiceError::Authorization(
                "Notifications can only be changed by their recipient".to_string(),
            ));
        }

        Ok(notification)
    }

    fn unread_query(user_id: &str) -> Query {
        Query::new()
            .filter_eq("user_id", user_id)
            .filter_eq("read", false)
    }

    fn read_update() -> Update {
        Update::new()
            .set("read", true)
            .set("read_at", time::format(&Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, store::SqliteDocumentStore};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// Store whose notification writes fail for one recipient
    struct FailingRecipientStore {
        inner: Arc<dyn DocumentStore>,
        recipient: &'static str,
    }

    #[async_trait]
    impl DocumentStore for FailingRecipientStore {
        async fn create(&self, collection: &str, id: &str, body: Value) -> ServiceResult<()> {
            if collection == COLLECTION && body["user_id"] == self.recipient {
                return Err(ServiceError::Internal("disk full".to_string()));
            }
            self.inner.create(collection, id, body).await
        }

        async fn get(&self, collection: &str, id: &str) -> ServiceResult<Option<Value>> {
            self.inner.get(collection, id).await
        }

        async fn update(&self, collection: &str, id: &str, update: Update) -> ServiceResult<()> {
            self.inner.update(collection, id, update).await
        }

        async fn delete(&self, collection: &str, id: &str) -> ServiceResult<bool> {
            self.inner.delete(collection, id).await
        }

        async fn query(&self, collection: &str, query: &Query) -> ServiceResult<Vec<Value>> {
            self.inner.query(collection, query).await
        }

        async fn count(&self, collection: &str, query: &Query) -> ServiceResult<u64> {
            self.inner.count(collection, query).await
        }
    }

    async fn create_test_service() -> (NotificationService, Arc<dyn DocumentStore>) {
        let pool = db::in_memory_pool().await.unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool));
        (NotificationService::new(store.clone()), store)
    }

    async fn add_user(store: &Arc<dyn DocumentStore>, id: &str, role: Role) {
        store
            .create(
                users::COLLECTION,
                id,
                json!({
                    "id": id,
                    "role": role,
                    "created_at": time::format(&Utc::now()),
                }),
            )
            .await
            .unwrap();
    }

    fn content(title: &str) -> NewNotification {
        NewNotification::new(NotificationKind::ComplaintUpdate, title, "message").about("c1")
    }

    #[tokio::test]
    async fn test_notify_creates_unread() {
        let (service, _store) = create_test_service().await;

        let notification = service.notify("u1", content("hello")).await.unwrap();
        assert!(!notification.read);
        assert_eq!(notification.reference_id.as_deref(), Some("c1"));

        let listed = service.list_for_user("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, notification.id);
        assert_eq!(service.unread_count("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (service, _store) = create_test_service().await;

        for title in ["first", "second", "third"] {
            service.notify("u1", content(title)).await.unwrap();
        }

        let titles: Vec<_> = service
            .list_for_user("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_notify_staff_skips_citizens() {
        let (service, store) = create_test_service().await;
        add_user(&store, "citizen", Role::Citizen).await;
        add_user(&store, "officer", Role::MunicipalOfficer).await;
        add_user(&store, "admin", Role::Admin).await;

        let report = service
            .notify_staff(NewNotification::new(
                NotificationKind::ComplaintNew,
                "New complaint submitted: Pothole",
                "A new complaint has been submitted by Ana",
            ))
            .await
            .unwrap();

        assert!(report.is_complete());
        let mut delivered = report.delivered.clone();
        delivered.sort();
        assert_eq!(delivered, vec!["admin", "officer"]);
        assert_eq!(service.unread_count("citizen").await.unwrap(), 0);
        assert_eq!(service.unread_count("officer").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_notify_staff_continues_past_failed_recipient() {
        let (_, store) = create_test_service().await;
        add_user(&store, "officer-a", Role::MunicipalOfficer).await;
        add_user(&store, "officer-b", Role::MunicipalOfficer).await;
        add_user(&store, "admin", Role::Admin).await;

        let failing: Arc<dyn DocumentStore> = Arc::new(FailingRecipientStore {
            inner: store.clone(),
            recipient: "officer-b",
        });
        let service = NotificationService::new(failing);

        let report = service
            .notify_staff(NewNotification::new(
                NotificationKind::ComplaintNew,
                "New complaint submitted: Streetlight",
                "A new complaint has been submitted by Ana",
            ))
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "officer-b");

        let mut delivered = report.delivered.clone();
        delivered.sort();
        assert_eq!(delivered, vec!["admin", "officer-a"]);

        // The other writes landed
        assert_eq!(service.unread_count("officer-a").await.unwrap(), 1);
        assert_eq!(service.unread_count("admin").await.unwrap(), 1);
        assert_eq!(service.unread_count("officer-b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_and_mark_all_read() {
        let (service, _store) = create_test_service().await;

        let first = service.notify("u1", content("a")).await.unwrap();
        service.notify("u1", content("b")).await.unwrap();
        service.notify("u1", content("c")).await.unwrap();
        service.notify("u2", content("other")).await.unwrap();

        let read = service.mark_read(&first.id, "u1").await.unwrap();
        assert!(read.read);
        assert!(read.read_at.is_some());
        assert_eq!(service.unread_count("u1").await.unwrap(), 2);

        assert_eq!(service.mark_all_read("u1").await.unwrap(), 2);
        assert_eq!(service.unread_count("u1").await.unwrap(), 0);
        assert_eq!(service.unread_count("u2").await.unwrap(), 1);

        // Nothing left to flip
        assert_eq!(service.mark_all_read("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_only_recipient_can_change() {
        let (service, _store) = create_test_service().await;
        let notification = service.notify("u1", content("mine")).await.unwrap();

        let err = service.mark_read(&notification.id, "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));

        let err = service.delete(&notification.id, "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));

        let err = service.mark_read("missing", "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let (service, _store) = create_test_service().await;
        let notification = service.notify("u1", content("gone")).await.unwrap();

        service.delete(&notification.id, "u1").await.unwrap();
        assert!(service.list_for_user("u1").await.unwrap().is_empty());
    }
}
