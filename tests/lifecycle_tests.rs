/// End-to-end complaint lifecycle through the service layer
mod common;

use civic_complaints::{
    complaints::{Actor, ComplaintCategory, ComplaintStatus, Location, NewComplaint},
    feedback::NewFeedback,
    image_store::ImageUpload,
    notifications::NotificationKind,
    users::Role,
    ServiceError,
};
use tokio_test::{assert_err, assert_ok};

fn pothole(citizen: &Actor, images: Vec<ImageUpload>) -> NewComplaint {
    NewComplaint {
        title: "Pothole on Main St".into(),
        description: "Deep pothole near the bus stop".into(),
        category: ComplaintCategory::Road,
        location: Location {
            latitude: 40.7,
            longitude: -74.0,
            address: "12 Main St".into(),
        },
        citizen_id: citizen.id.clone(),
        citizen_name: citizen.name.clone(),
        images,
    }
}

#[tokio::test]
async fn test_full_lifecycle() {
    let (ctx, _dir) = common::test_context().await;

    let citizen = ctx
        .users
        .ensure_profile("citizen-1", Some("ana@example.org"), Some("Ana"))
        .await
        .unwrap();
    let officer = ctx
        .users
        .create("officer-1", None, Some("Officer Lee"), Role::MunicipalOfficer)
        .await
        .unwrap();
    let citizen = Actor::from(&citizen);
    let officer = Actor::from(&officer);

    // Submit with a photo
    let complaint = ctx
        .complaints
        .submit(pothole(
            &citizen,
            vec![ImageUpload::new(b"photo bytes".to_vec(), Some("image/jpeg"))],
        ))
        .await
        .unwrap();
    assert_eq!(complaint.images.len(), 1);
    assert!(complaint.images[0].url.starts_with("http://civic.test/images/complaints/"));
    assert_eq!(ctx.notifications.unread_count(&officer.id).await.unwrap(), 1);

    // Officer picks it up
    let in_progress = ctx
        .complaints
        .transition_status(&complaint.id, ComplaintStatus::InProgress, Some(&officer))
        .await
        .unwrap();
    assert_eq!(in_progress.assigned_to.as_deref(), Some("officer-1"));

    // Citizen asks for an update, officer answers
    assert_ok!(ctx.complaints.add_comment(&complaint.id, "Any news?", &citizen).await);
    assert_ok!(
        ctx.complaints
            .add_comment(&complaint.id, "Crew scheduled for Monday", &officer)
            .await
    );

    // Resolve
    let resolved = ctx
        .complaints
        .transition_status(&complaint.id, ComplaintStatus::Resolved, Some(&officer))
        .await
        .unwrap();
    assert!(resolved.resolved_at.is_some());
    assert_eq!(resolved.comments.len(), 2);

    // No way back
    let err = assert_err!(
        ctx.complaints
            .transition_status(&complaint.id, ComplaintStatus::InProgress, Some(&officer))
            .await
    );
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));

    // Citizen inbox: in progress, officer comment, resolved
    let kinds: Vec<_> = ctx
        .notifications
        .list_for_user(&citizen.id)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::ComplaintUpdate,
            NotificationKind::ComplaintComment,
            NotificationKind::ComplaintUpdate,
        ]
    );

    // Officer inbox: new complaint, assignment, citizen comment
    assert_eq!(ctx.notifications.unread_count(&officer.id).await.unwrap(), 3);
    assert_eq!(ctx.notifications.mark_all_read(&officer.id).await.unwrap(), 3);
    assert_eq!(ctx.notifications.unread_count(&officer.id).await.unwrap(), 0);
    assert_eq!(ctx.notifications.unread_count(&citizen.id).await.unwrap(), 3);

    // Feedback links back to the complaint
    let feedback = ctx
        .feedback
        .submit(
            &citizen.id,
            &citizen.name,
            NewFeedback {
                complaint_id: Some(complaint.id.clone()),
                rating: 5,
                comment: "Fixed quickly".into(),
            },
        )
        .await
        .unwrap();
    let linked = ctx.complaints.get(&complaint.id).await.unwrap();
    assert_eq!(linked.feedback_id, Some(feedback.id));
    assert_eq!(linked.feedback_rating, Some(5));

    let stats = ctx.complaints.stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.by_category[&ComplaintCategory::Road], 1);
}

#[tokio::test]
async fn test_submission_limits_from_config() {
    let (ctx, _dir) = common::test_context().await;
    let citizen = Actor {
        id: "citizen-2".into(),
        name: "Ben".into(),
        role: Role::Citizen,
    };

    let images = (0..4)
        .map(|i| ImageUpload::new(format!("photo {}", i).into_bytes(), Some("image/png")))
        .collect();
    let err = assert_err!(ctx.complaints.submit(pothole(&citizen, images)).await);
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(ctx.complaints.list_all(None).await.unwrap().is_empty());
}
