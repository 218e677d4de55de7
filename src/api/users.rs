/// Profile and User Management API Endpoints
use crate::{
    api::ImagePayload,
    auth::AuthContext,
    error::{ServiceError, ServiceResult},
    image_store::ImageRef,
    users::{ProfileUpdate, Role, User},
    AppContext,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

/// Build profile and user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/profile/image", post(upload_profile_image))
        .route("/api/users", get(list_users))
        .route("/api/users/:id/role", put(update_role))
        .route("/api/users/:id", delete(delete_user))
}

// ============================================================================
// Own profile
// ============================================================================

async fn get_profile(auth: AuthContext) -> Json<User> {
    Json(auth.user)
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ProfileUpdate>,
) -> ServiceResult<Json<User>> {
    Ok(Json(ctx.users.update_profile(auth.user_id(), req).await?))
}

async fn upload_profile_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ImagePayload>,
) -> ServiceResult<(StatusCode, Json<ImageRef>)> {
    let image = ctx
        .users
        .upload_profile_image(auth.user_id(), req.into_upload()?)
        .await?;

    Ok((StatusCode::CREATED, Json(image)))
}

// ============================================================================
// Admin user management
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListUsersQuery {
    role: Option<Role>,
}

async fn list_users(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<ListUsersQuery>,
) -> ServiceResult<Json<Vec<User>>> {
    auth.require_admin()?;
    Ok(Json(ctx.users.list(query.role).await?))
}

#[derive(Debug, Deserialize)]
struct UpdateRoleRequest {
    role: Role,
}

async fn update_role(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> ServiceResult<Json<User>> {
    auth.require_admin()?;
    Ok(Json(ctx.users.update_role(&id, req.role).await?))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ServiceResult<StatusCode> {
    auth.require_admin()?;
    if id == auth.user_id() {
        return Err(ServiceError::Validation(
            "Admins cannot delete their own profile".to_string(),
        ));
    }

    ctx.users.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
