//! Record store access: two flat collections, `jobs` and `reminders`.
//!
//! Reads go through the query methods. Every write goes through `commit`, which
//! applies a `WriteBatch` atomically so multi-record changes (a job and its
//! reminder) can never be left half-applied.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Job, JobFields, JobStatus, Reminder};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Jobs,
    Reminders,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Jobs => "jobs",
            Collection::Reminders => "reminders",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} record {id} not found", collection.as_str())]
    NotFound { collection: Collection, id: Uuid },

    #[error("job {job_id} already has an active reminder")]
    Conflict { job_id: Uuid },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn job_not_found(id: Uuid) -> Self {
        StoreError::NotFound {
            collection: Collection::Jobs,
            id,
        }
    }

    pub fn reminder_not_found(id: Uuid) -> Self {
        StoreError::NotFound {
            collection: Collection::Reminders,
            id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub owner_id: Uuid,
    pub status: Option<JobStatus>,
}

impl JobFilter {
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            status: None,
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        job.owner_id == self.owner_id && self.status.map_or(true, |s| job.fields.status == s)
    }
}

/// Equality filter over reminders; `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct ReminderFilter {
    pub owner_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub completed: Option<bool>,
}

impl ReminderFilter {
    pub fn active_for_owner(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            job_id: None,
            completed: Some(false),
        }
    }

    pub fn for_job(job_id: Uuid) -> Self {
        Self {
            job_id: Some(job_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, reminder: &Reminder) -> bool {
        self.owner_id.map_or(true, |id| reminder.owner_id == id)
            && self.job_id.map_or(true, |id| reminder.job_id == id)
            && self.completed.map_or(true, |c| reminder.completed == c)
    }
}

/// Partial update of a reminder; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderChanges {
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    InsertJob(Job),
    UpdateJob {
        id: Uuid,
        fields: JobFields,
        updated_at: DateTime<Utc>,
    },
    /// Sets or clears `Job::reminder_id`.
    LinkReminder {
        job_id: Uuid,
        reminder_id: Option<Uuid>,
    },
    DeleteJob(Uuid),
    InsertReminder(Reminder),
    UpdateReminder {
        id: Uuid,
        changes: ReminderChanges,
    },
    DeleteReminder(Uuid),
}

/// Ordered group of writes committed all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[cfg(test)]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

impl From<WriteOp> for WriteBatch {
    fn from(op: WriteOp) -> Self {
        Self { ops: vec![op] }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn find_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError>;

    async fn get_reminder(&self, id: Uuid) -> Result<Option<Reminder>, StoreError>;

    async fn find_reminders(&self, filter: &ReminderFilter) -> Result<Vec<Reminder>, StoreError>;

    /// Applies every op in order, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
