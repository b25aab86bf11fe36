use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::{days_in_range, MAX_DAYS, MIN_DAYS};
use crate::errors::AppError;
use crate::models::{ActiveReminder, Reminder};
use crate::store::{
    JobFilter, RecordStore, ReminderChanges, ReminderFilter, StoreError, WriteBatch, WriteOp,
};

/// Performs single-reminder mutations. Never decides whether a job *should*
/// have a reminder; callers that need the job's `reminder_id` kept in step use
/// the `stage_*` helpers and commit everything in one batch.
#[derive(Clone)]
pub struct ReminderManager {
    store: Arc<dyn RecordStore>,
}

pub fn due_in(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now + Duration::days(i64::from(days))
}

impl ReminderManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn stage_create(
        batch: &mut WriteBatch,
        job_id: Uuid,
        owner_id: Uuid,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Uuid {
        let reminder = Reminder::follow_up(job_id, owner_id, due_date, now);
        let id = reminder.id;
        batch.push(WriteOp::InsertReminder(reminder));
        id
    }

    /// Moves the due date and clears `completed`, re-arming a finished reminder.
    pub fn stage_rearm(batch: &mut WriteBatch, reminder_id: Uuid, due_date: DateTime<Utc>) {
        batch.push(WriteOp::UpdateReminder {
            id: reminder_id,
            changes: ReminderChanges {
                due_date: Some(due_date),
                completed: Some(false),
            },
        });
    }

    pub fn stage_delete(batch: &mut WriteBatch, reminder_id: Uuid) {
        batch.push(WriteOp::DeleteReminder(reminder_id));
    }

    /// Creates an active follow-up reminder and returns its id. Does not check
    /// for an existing active reminder; the store rejects a second one with
    /// `Conflict`. The HTTP surface creates reminders through `stage_create`.
    #[allow(dead_code)]
    pub async fn create_reminder(
        &self,
        job_id: Uuid,
        owner_id: Uuid,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AppError> {
        let mut batch = WriteBatch::new();
        let id = Self::stage_create(&mut batch, job_id, owner_id, due_date, now);
        self.store.commit(batch).await?;
        info!("Created reminder {id} for job {job_id}, due {due_date}");
        Ok(id)
    }

    /// Loads a reminder and checks it belongs to `owner_id`.
    pub async fn get_owned(&self, owner_id: Uuid, reminder_id: Uuid) -> Result<Reminder, AppError> {
        let reminder = self
            .store
            .get_reminder(reminder_id)
            .await?
            .ok_or_else(|| StoreError::reminder_not_found(reminder_id))?;
        if reminder.owner_id != owner_id {
            return Err(AppError::Forbidden);
        }
        Ok(reminder)
    }

    /// All of the owner's active reminders, joined with their job's title and
    /// company, soonest due first.
    pub async fn get_active_reminders(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<ActiveReminder>, AppError> {
        let reminders = self
            .store
            .find_reminders(&ReminderFilter::active_for_owner(owner_id))
            .await?;
        let jobs: HashMap<Uuid, _> = self
            .store
            .find_jobs(&JobFilter::owned_by(owner_id))
            .await?
            .into_iter()
            .map(|job| (job.id, job))
            .collect();

        let mut active: Vec<ActiveReminder> = reminders
            .into_iter()
            .map(|reminder| {
                let (title, company) = jobs
                    .get(&reminder.job_id)
                    .map(|job| (job.fields.title.clone(), job.fields.company.clone()))
                    .unwrap_or_default();
                ActiveReminder {
                    reminder,
                    title,
                    company,
                }
            })
            .collect();
        active.sort_by(|a, b| {
            a.reminder
                .due_date
                .cmp(&b.reminder.due_date)
                .then(a.reminder.created_at.cmp(&b.reminder.created_at))
        });

        debug!("Owner {owner_id} has {} active reminders", active.len());
        Ok(active)
    }

    /// Marks a reminder completed. Completing an already-completed reminder is
    /// a no-op. The job's `reminder_id` is left pointing at it.
    pub async fn complete_reminder(
        &self,
        owner_id: Uuid,
        reminder_id: Uuid,
    ) -> Result<Reminder, AppError> {
        let mut reminder = self.get_owned(owner_id, reminder_id).await?;
        if reminder.completed {
            debug!("Reminder {reminder_id} already completed");
            return Ok(reminder);
        }

        self.store
            .commit(
                WriteOp::UpdateReminder {
                    id: reminder_id,
                    changes: ReminderChanges {
                        completed: Some(true),
                        ..ReminderChanges::default()
                    },
                }
                .into(),
            )
            .await?;
        reminder.completed = true;

        info!("Completed reminder {reminder_id}");
        Ok(reminder)
    }

    /// Pushes the due date `days` past its current value, not past now.
    pub async fn postpone_reminder(
        &self,
        owner_id: Uuid,
        reminder_id: Uuid,
        days: u32,
    ) -> Result<Reminder, AppError> {
        if !days_in_range(days) {
            return Err(AppError::Validation(format!(
                "days must be between {MIN_DAYS} and {MAX_DAYS}"
            )));
        }

        let mut reminder = self.get_owned(owner_id, reminder_id).await?;
        let due_date = due_in(reminder.due_date, days);
        self.store
            .commit(
                WriteOp::UpdateReminder {
                    id: reminder_id,
                    changes: ReminderChanges {
                        due_date: Some(due_date),
                        ..ReminderChanges::default()
                    },
                }
                .into(),
            )
            .await?;
        reminder.due_date = due_date;

        info!("Postponed reminder {reminder_id} by {days} days to {due_date}");
        Ok(reminder)
    }

    /// Removes the reminder record only; the owning job's `reminder_id` is the
    /// caller's concern (see `JobService::remove_reminder`).
    #[allow(dead_code)]
    pub async fn delete_reminder(&self, owner_id: Uuid, reminder_id: Uuid) -> Result<(), AppError> {
        self.get_owned(owner_id, reminder_id).await?;
        self.store
            .commit(WriteOp::DeleteReminder(reminder_id).into())
            .await?;
        info!("Deleted reminder {reminder_id}");
        Ok(())
    }
}
