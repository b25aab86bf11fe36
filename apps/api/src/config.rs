use anyhow::{Context, Result};

const DEFAULT_UPLOADTHING_API_URL: &str = "https://api.uploadthing.com";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// When unset the service keeps records in memory.
    pub database_url: Option<String>,
    pub uploadthing_api_url: String,
    pub uploadthing_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub default_reminder_days: u32,
    pub default_postpone_days: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            uploadthing_api_url: optional_env("UPLOADTHING_API_URL")
                .unwrap_or_else(|| DEFAULT_UPLOADTHING_API_URL.to_string()),
            uploadthing_api_key: require_env("UPLOADTHING_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            default_reminder_days: parse_days("DEFAULT_REMINDER_DAYS")?,
            default_postpone_days: parse_days("DEFAULT_POSTPONE_DAYS")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
    }
}

fn parse_days(key: &str) -> Result<u32> {
    let days = parse_env(key, 3u32)?;
    anyhow::ensure!(
        crate::reminders::days_in_range(days),
        "{key} must be between {} and {}",
        crate::reminders::MIN_DAYS,
        crate::reminders::MAX_DAYS
    );
    Ok(days)
}
