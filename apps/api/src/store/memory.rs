use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{JobFilter, RecordStore, ReminderFilter, StoreError, WriteBatch, WriteOp};
use crate::models::{Job, Reminder};

#[derive(Debug, Clone, Default)]
struct Tables {
    jobs: HashMap<Uuid, Job>,
    reminders: HashMap<Uuid, Reminder>,
}

impl Tables {
    fn apply(&mut self, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::InsertJob(job) => {
                self.jobs.insert(job.id, job);
            }
            WriteOp::UpdateJob {
                id,
                fields,
                updated_at,
            } => {
                let job = self
                    .jobs
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::job_not_found(id))?;
                job.fields = fields;
                job.updated_at = updated_at;
            }
            WriteOp::LinkReminder {
                job_id,
                reminder_id,
            } => {
                let job = self
                    .jobs
                    .get_mut(&job_id)
                    .ok_or_else(|| StoreError::job_not_found(job_id))?;
                job.reminder_id = reminder_id;
            }
            WriteOp::DeleteJob(id) => {
                self.jobs
                    .remove(&id)
                    .ok_or_else(|| StoreError::job_not_found(id))?;
                // ON DELETE CASCADE
                self.reminders.retain(|_, r| r.job_id != id);
            }
            WriteOp::InsertReminder(reminder) => {
                if !self.jobs.contains_key(&reminder.job_id) {
                    return Err(StoreError::job_not_found(reminder.job_id));
                }
                if reminder.is_active() {
                    self.ensure_no_active(reminder.job_id, reminder.id)?;
                }
                self.reminders.insert(reminder.id, reminder);
            }
            WriteOp::UpdateReminder { id, changes } => {
                let job_id = self
                    .reminders
                    .get(&id)
                    .map(|r| r.job_id)
                    .ok_or_else(|| StoreError::reminder_not_found(id))?;
                if changes.completed == Some(false) {
                    self.ensure_no_active(job_id, id)?;
                }
                if let Some(reminder) = self.reminders.get_mut(&id) {
                    if let Some(due_date) = changes.due_date {
                        reminder.due_date = due_date;
                    }
                    if let Some(completed) = changes.completed {
                        reminder.completed = completed;
                    }
                }
            }
            WriteOp::DeleteReminder(id) => {
                self.reminders
                    .remove(&id)
                    .ok_or_else(|| StoreError::reminder_not_found(id))?;
            }
        }
        Ok(())
    }

    /// Mirrors the partial unique index on `reminders(job_id) WHERE NOT completed`.
    fn ensure_no_active(&self, job_id: Uuid, except: Uuid) -> Result<(), StoreError> {
        let clash = self
            .reminders
            .values()
            .any(|r| r.job_id == job_id && r.id != except && r.is_active());
        if clash {
            return Err(StoreError::Conflict { job_id });
        }
        Ok(())
    }
}

/// Process-local record store. Used when no database is configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.tables.read().await.jobs.get(&id).cloned())
    }

    async fn find_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect())
    }

    async fn get_reminder(&self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        Ok(self.tables.read().await.reminders.get(&id).cloned())
    }

    async fn find_reminders(&self, filter: &ReminderFilter) -> Result<Vec<Reminder>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reminders
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        // Work on a copy so a failing op leaves the committed state untouched.
        let mut staged = tables.clone();
        for op in batch.into_ops() {
            staged.apply(op)?;
        }
        *tables = staged;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
