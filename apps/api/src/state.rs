use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobService;
use crate::reminders::ReminderManager;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub jobs: JobService,
    pub reminders: ReminderManager,
    pub config: Config,
}
