/// Complaint API Endpoints
use crate::{
    api::ImagePayload,
    auth::AuthContext,
    complaints::{
        Comment, Complaint, ComplaintCategory, ComplaintFilter, ComplaintStats, ComplaintStatus,
        Location, NewComplaint,
    },
    error::ServiceResult,
    feedback::Feedback,
    users::Role,
    AppContext,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

/// Build complaint API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/complaints", post(submit_complaint).get(list_complaints))
        .route(
            "/api/complaints/:id",
            get(get_complaint).delete(delete_complaint),
        )
        .route("/api/complaints/:id/status", post(update_status))
        .route("/api/complaints/:id/comments", post(add_comment))
        .route("/api/complaints/:id/feedback", get(complaint_feedback))
        .route("/api/stats", get(get_stats))
}

#[derive(Debug, Deserialize)]
struct SubmitComplaintRequest {
    title: String,
    description: String,
    category: ComplaintCategory,
    location: Location,
    #[serde(default)]
    images: Vec<ImagePayload>,
}

/// File a complaint as the calling citizen
async fn submit_complaint(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<SubmitComplaintRequest>,
) -> ServiceResult<(StatusCode, Json<Complaint>)> {
    auth.require_citizen()?;

    let images = req
        .images
        .into_iter()
        .map(ImagePayload::into_upload)
        .collect::<ServiceResult<Vec<_>>>()?;

    let complaint = ctx
        .complaints
        .submit(NewComplaint {
            title: req.title,
            description: req.description,
            category: req.category,
            location: req.location,
            citizen_id: auth.user.id.clone(),
            citizen_name: auth.user.name().to_string(),
            images,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(complaint)))
}

#[derive(Debug, Deserialize)]
struct ListComplaintsQuery {
    status: Option<ComplaintStatus>,
    category: Option<ComplaintCategory>,
    limit: Option<u32>,
}

/// List complaints visible to the caller
///
/// Citizens see their own, officers see those assigned to them, admins see all.
async fn list_complaints(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<ListComplaintsQuery>,
) -> ServiceResult<Json<Vec<Complaint>>> {
    let mut filter = ComplaintFilter {
        status: query.status,
        category: query.category,
        limit: query.limit,
        ..Default::default()
    };
    match auth.user.role {
        Role::Citizen => filter.citizen_id = Some(auth.user.id.clone()),
        Role::MunicipalOfficer => filter.assigned_to = Some(auth.user.id.clone()),
        Role::Admin => {}
    }

    Ok(Json(ctx.complaints.search(&filter).await?))
}

async fn get_complaint(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> ServiceResult<Json<Complaint>> {
    Ok(Json(ctx.complaints.get(&id).await?))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: ComplaintStatus,
}

/// Move a complaint forward; the caller becomes the assignee on in_progress
async fn update_status(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> ServiceResult<Json<Complaint>> {
    auth.require_staff()?;

    let officer = auth.actor();
    let complaint = ctx
        .complaints
        .transition_status(&id, req.status, Some(&officer))
        .await?;

    Ok(Json(complaint))
}

#[derive(Debug, Deserialize)]
struct AddCommentRequest {
    text: String,
}

async fn add_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<AddCommentRequest>,
) -> ServiceResult<(StatusCode, Json<Comment>)> {
    let comment = ctx
        .complaints
        .add_comment(&id, &req.text, &auth.actor())
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Delete a complaint (admin only)
async fn delete_complaint(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ServiceResult<StatusCode> {
    auth.require_admin()?;
    ctx.complaints.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn complaint_feedback(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> ServiceResult<Json<Vec<Feedback>>> {
    Ok(Json(ctx.feedback.list_for_complaint(&id).await?))
}

/// Aggregate statistics over all complaints
async fn get_stats(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<ComplaintStats>> {
    auth.require_staff()?;
    Ok(Json(ctx.complaints.stats().await?))
}
