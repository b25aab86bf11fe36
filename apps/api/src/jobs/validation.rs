use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::{AppError, FieldError};
use crate::jobs::sync::ReminderSettings;
use crate::models::{Attachment, JobFields, JobStatus};
use crate::reminders::{days_in_range, MAX_DAYS, MIN_DAYS};

const MAX_TEXT_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 10_000;

/// Add/edit job form as submitted by the client. Everything is loosely typed
/// here so that bad input turns into per-field messages rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobForm {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    pub applied_at: Option<String>,
    pub notes: Option<String>,
    pub resume: Option<AttachmentForm>,
    pub cover_letter: Option<AttachmentForm>,
    pub reminder: Option<ReminderForm>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReminderForm {
    pub enabled: bool,
    pub days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidJobForm {
    pub fields: JobFields,
    /// `None` when the form did not touch the reminder switch.
    pub reminder: Option<ReminderSettings>,
}

/// Validates a job form, collecting every field error.
pub fn validate_job_form(form: &JobForm, default_days: u32) -> Result<ValidJobForm, AppError> {
    let mut errors = Vec::new();

    let company = required_text(&form.company, "company", "Company is required", &mut errors);
    let title = required_text(&form.title, "title", "Job title is required", &mut errors);
    let status = parse_status(&form.status)
        .map_err(|e| errors.push(e))
        .ok();

    let applied_at = match form.applied_at.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(FieldError::new(
                    "appliedAt",
                    "Applied date must be a valid date (YYYY-MM-DD)",
                ));
                None
            }
        },
    };

    let notes = form
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    if notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        errors.push(FieldError::new(
            "notes",
            format!("Notes must be at most {MAX_NOTES_LEN} characters"),
        ));
    }

    let resume = attachment(form.resume.as_ref(), "resume", &mut errors);
    let cover_letter = attachment(form.cover_letter.as_ref(), "coverLetter", &mut errors);

    let reminder = match form.reminder {
        None => None,
        Some(r) => match validate_reminder(r, default_days) {
            Ok(settings) => Some(settings),
            Err(e) => {
                errors.push(e);
                None
            }
        },
    };

    match status {
        Some(status) if errors.is_empty() => Ok(ValidJobForm {
            fields: JobFields {
                company,
                title,
                status,
                applied_at,
                notes,
                resume,
                cover_letter,
            },
            reminder,
        }),
        _ => Err(AppError::InvalidFields(errors)),
    }
}

pub fn parse_status(raw: &str) -> Result<JobStatus, FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FieldError::new("status", "Status is required"));
    }
    raw.parse().map_err(|_| {
        FieldError::new(
            "status",
            "Status must be one of applied, interviewing, offered, rejected",
        )
    })
}

pub fn validate_reminder(form: ReminderForm, default_days: u32) -> Result<ReminderSettings, FieldError> {
    let days = match form.days {
        None => default_days,
        Some(days) => u32::try_from(days)
            .ok()
            .filter(|d| days_in_range(*d))
            .ok_or_else(|| {
                FieldError::new(
                    "reminder.days",
                    format!("Reminder days must be between {MIN_DAYS} and {MAX_DAYS}"),
                )
            })?,
    };
    Ok(ReminderSettings {
        enabled: form.enabled,
        days,
    })
}

fn required_text(
    raw: &str,
    field: &'static str,
    missing: &str,
    errors: &mut Vec<FieldError>,
) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(FieldError::new(field, missing));
    } else if value.chars().count() > MAX_TEXT_LEN {
        errors.push(FieldError::new(
            field,
            format!("Must be at most {MAX_TEXT_LEN} characters"),
        ));
    }
    value.to_string()
}

fn attachment(
    form: Option<&AttachmentForm>,
    field: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<Attachment> {
    let form = form?;
    let url = form.url.trim();
    let name = form.name.trim();
    if url.is_empty() || name.is_empty() {
        errors.push(FieldError::new(field, "Attachment needs both a url and a name"));
        return None;
    }
    Some(Attachment {
        url: url.to_string(),
        name: name.to_string(),
    })
}
