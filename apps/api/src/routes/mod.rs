pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::reminders::handlers as reminders;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/summary", get(jobs::handle_summary))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route("/api/v1/jobs/:id/status", patch(jobs::handle_set_status))
        .route("/api/v1/jobs/:id/reminder", put(jobs::handle_toggle_reminder))
        // Reminders
        .route("/api/v1/reminders", get(reminders::handle_active_reminders))
        .route(
            "/api/v1/reminders/:id",
            axum::routing::delete(reminders::handle_delete),
        )
        .route(
            "/api/v1/reminders/:id/complete",
            post(reminders::handle_complete),
        )
        .route(
            "/api/v1/reminders/:id/postpone",
            post(reminders::handle_postpone),
        )
        .with_state(state)
}
