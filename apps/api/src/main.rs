mod config;
mod db;
mod errors;
mod extract;
mod files;
mod jobs;
mod models;
mod reminders;
mod routes;
mod session;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::files::UploadThingClient;
use crate::jobs::JobService;
use crate::reminders::ReminderManager;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobtrack API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; records are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let files = Arc::new(UploadThingClient::new(
        config.uploadthing_api_url.clone(),
        config.uploadthing_api_key.clone(),
    )?);
    info!("File service client initialized ({})", config.uploadthing_api_url);

    info!(
        "Reminder defaults: due in {} days, postpone by {} days",
        config.default_reminder_days, config.default_postpone_days
    );

    let state = AppState {
        jobs: JobService::new(store.clone(), files, config.default_reminder_days),
        reminders: ReminderManager::new(store.clone()),
        store,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
