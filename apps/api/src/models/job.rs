use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an application currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Applied,
    Interviewing,
    Offered,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Offered,
        JobStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "applied",
            JobStatus::Interviewing => "interviewing",
            JobStatus::Offered => "offered",
            JobStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status '{s}'"))
    }
}

/// A hosted document (resume or cover letter) attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
}

/// The user-editable part of a job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFields {
    pub company: String,
    pub title: String,
    pub status: JobStatus,
    pub applied_at: Option<NaiveDate>,
    pub notes: Option<String>,
    pub resume: Option<Attachment>,
    pub cover_letter: Option<Attachment>,
}

impl JobFields {
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.resume.iter().chain(self.cover_letter.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(flatten)]
    pub fields: JobFields,
    /// Weak back-reference to the job's follow-up reminder. Stays set after the
    /// reminder is completed; see `ReminderState`.
    pub reminder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-status counts for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub applied: usize,
    pub interviewing: usize,
    pub offered: usize,
    pub rejected: usize,
}

impl StatusSummary {
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        jobs.into_iter()
            .fold(StatusSummary::default(), |mut summary, job| {
                summary.total += 1;
                match job.fields.status {
                    JobStatus::Applied => summary.applied += 1,
                    JobStatus::Interviewing => summary.interviewing += 1,
                    JobStatus::Offered => summary.offered += 1,
                    JobStatus::Rejected => summary.rejected += 1,
                }
                summary
            })
    }
}
