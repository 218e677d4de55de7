/// Feedback API Endpoints
use crate::{
    auth::AuthContext,
    error::ServiceResult,
    feedback::{Feedback, NewFeedback},
    AppContext,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Build feedback API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/feedback", get(list_feedback).post(submit_feedback))
        .route("/api/feedback/mine", get(my_feedback))
        .route("/api/feedback/:id", get(get_feedback))
}

async fn submit_feedback(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<NewFeedback>,
) -> ServiceResult<(StatusCode, Json<Feedback>)> {
    auth.require_citizen()?;

    let feedback = ctx
        .feedback
        .submit(auth.user_id(), auth.user.name(), req)
        .await?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

#[derive(Debug, Deserialize)]
struct ListFeedbackQuery {
    limit: Option<u32>,
}

/// All feedback (admin only)
async fn list_feedback(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<ListFeedbackQuery>,
) -> ServiceResult<Json<Vec<Feedback>>> {
    auth.require_admin()?;
    Ok(Json(ctx.feedback.list_all(query.limit).await?))
}

async fn my_feedback(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ServiceResult<Json<Vec<Feedback>>> {
    Ok(Json(ctx.feedback.list_for_user(auth.user_id()).await?))
}

async fn get_feedback(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> ServiceResult<Json<Feedback>> {
    Ok(Json(ctx.feedback.get(&id).await?))
}
