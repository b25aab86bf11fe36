use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::ValidJson;
use crate::jobs::JobView;
use crate::jobs::validation::{parse_status, validate_reminder, JobForm, ReminderForm};
use crate::models::StatusSummary;
use crate::session::Session;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: String,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<JobView>>, AppError> {
    let status = match params.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(parse_status(raw).map_err(|e| AppError::Validation(e.message))?),
    };
    let jobs = state.jobs.list_jobs(session.user_id, status).await?;
    Ok(Json(jobs))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    session: Session,
    ValidJson(form): ValidJson<JobForm>,
) -> Result<(StatusCode, Json<JobView>), AppError> {
    let view = state
        .jobs
        .create_job(session.user_id, &form, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/jobs/summary
pub async fn handle_summary(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<StatusSummary>, AppError> {
    Ok(Json(state.jobs.summary(session.user_id).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, AppError> {
    Ok(Json(state.jobs.get_job(session.user_id, id).await?))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ValidJson(form): ValidJson<JobForm>,
) -> Result<Json<JobView>, AppError> {
    let view = state
        .jobs
        .update_job(session.user_id, id, &form, Utc::now())
        .await?;
    Ok(Json(view))
}

/// PATCH /api/v1/jobs/:id/status
pub async fn handle_set_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<StatusUpdate>,
) -> Result<Json<JobView>, AppError> {
    let status = parse_status(&req.status).map_err(|e| AppError::InvalidFields(vec![e]))?;
    let view = state
        .jobs
        .set_status(session.user_id, id, status, Utc::now())
        .await?;
    Ok(Json(view))
}

/// PUT /api/v1/jobs/:id/reminder
pub async fn handle_toggle_reminder(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<ReminderForm>,
) -> Result<Json<JobView>, AppError> {
    let settings = validate_reminder(req, state.jobs.default_reminder_days())
        .map_err(|e| AppError::InvalidFields(vec![e]))?;
    let view = state
        .jobs
        .toggle_reminder(session.user_id, id, settings, Utc::now())
        .await?;
    Ok(Json(view))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.jobs.delete_job(session.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
