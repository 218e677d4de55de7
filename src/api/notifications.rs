/// Notification API Endpoints
use crate::{
    auth::AuthContext, error::ServiceResult, notifications::Notification, AppContext,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

/// Build notification API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/:id/read", post(mark_read))
        .route("/api/notifications/:id", delete(delete_notification))
}

async fn list_notifications(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<Vec<Notification>>> {
    Ok(Json(ctx.notifications.list_for_user(auth.user_id()).await?))
}

#[derive(Debug, Serialize)]
struct UnreadCountResponse {
    count: u64,
}

async fn unread_count(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<UnreadCountResponse>> {
    let count = ctx.notifications.unread_count(auth.user_id()).await?;
    Ok(Json(UnreadCountResponse { count }))
}

async fn mark_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ServiceResult<Json<Notification>> {
    Ok(Json(ctx.notifications.mark_read(&id, auth.user_id()).await?))
}

#[derive(Debug, Serialize)]
struct MarkAllReadResponse {
    updated: usize,
}

async fn mark_all_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<MarkAllReadResponse>> {
    let updated = ctx.notifications.mark_all_read(auth.user_id()).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

async fn delete_notification(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ServiceResult<StatusCode> {
    ctx.notifications.delete(&id, auth.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
