use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::OptionalJson;
use crate::models::{ActiveReminder, Reminder};
use crate::session::Session;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct PostponeRequest {
    pub days: Option<u32>,
}

/// GET /api/v1/reminders
pub async fn handle_active_reminders(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<ActiveReminder>>, AppError> {
    let reminders = state.reminders.get_active_reminders(session.user_id).await?;
    Ok(Json(reminders))
}

/// POST /api/v1/reminders/:id/complete
pub async fn handle_complete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Reminder>, AppError> {
    Ok(Json(state.reminders.complete_reminder(session.user_id, id).await?))
}

/// POST /api/v1/reminders/:id/postpone
/// Body is optional; `days` defaults to the configured postpone interval.
/// A body that is present but malformed is rejected before anything is written.
pub async fn handle_postpone(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    OptionalJson(req): OptionalJson<PostponeRequest>,
) -> Result<Json<Reminder>, AppError> {
    let days = req
        .and_then(|r| r.days)
        .unwrap_or(state.config.default_postpone_days);
    let reminder = state
        .reminders
        .postpone_reminder(session.user_id, id, days)
        .await?;
    Ok(Json(reminder))
}

/// DELETE /api/v1/reminders/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.jobs.remove_reminder(session.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
