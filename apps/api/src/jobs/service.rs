use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::files::{extract_file_key, FileStore};
use crate::jobs::sync::{self, ReminderSettings};
use crate::jobs::validation::{validate_job_form, JobForm};
use crate::models::{
    Attachment, Job, JobFields, JobStatus, Reminder, ReminderState, StatusSummary,
};
use crate::reminders::ReminderManager;
use crate::store::{JobFilter, RecordStore, ReminderFilter, StoreError, WriteBatch, WriteOp};

/// A job as the client sees it: the record plus its derived reminder state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    pub reminder_state: ReminderState,
    pub reminder: Option<Reminder>,
}

impl JobView {
    fn new(job: Job, reminder: Option<Reminder>) -> Self {
        let reminder = reminder.filter(|r| Some(r.id) == job.reminder_id);
        Self {
            reminder_state: ReminderState::derive(job.reminder_id, reminder.as_ref()),
            job,
            reminder,
        }
    }
}

/// Job operations, all scoped to the calling owner. Every transition that
/// touches both a job and its reminder is committed as one batch.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn RecordStore>,
    files: Arc<dyn FileStore>,
    default_reminder_days: u32,
}

impl JobService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        files: Arc<dyn FileStore>,
        default_reminder_days: u32,
    ) -> Self {
        Self {
            store,
            files,
            default_reminder_days,
        }
    }

    pub fn default_reminder_days(&self) -> u32 {
        self.default_reminder_days
    }

    async fn load_owned(&self, owner_id: Uuid, job_id: Uuid) -> Result<Job, AppError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| StoreError::job_not_found(job_id))?;
        if job.owner_id != owner_id {
            return Err(AppError::Forbidden);
        }
        Ok(job)
    }

    async fn view(&self, job: Job) -> Result<JobView, AppError> {
        let reminder = match job.reminder_id {
            Some(id) => self.store.get_reminder(id).await?,
            None => None,
        };
        Ok(JobView::new(job, reminder))
    }

    /// The reminder the job points at, or failing that an active reminder for
    /// the job that lost its back-reference.
    async fn current_reminder(&self, job: &Job) -> Result<Option<Reminder>, AppError> {
        if let Some(id) = job.reminder_id {
            if let Some(reminder) = self.store.get_reminder(id).await? {
                return Ok(Some(reminder));
            }
        }
        let orphan = self
            .store
            .find_reminders(&ReminderFilter {
                job_id: Some(job.id),
                completed: Some(false),
                ..ReminderFilter::default()
            })
            .await?
            .into_iter()
            .next();
        if let Some(orphan) = &orphan {
            warn!("Job {} has unlinked active reminder {}; adopting it", job.id, orphan.id);
        }
        Ok(orphan)
    }

    pub async fn create_job(
        &self,
        owner_id: Uuid,
        form: &JobForm,
        now: DateTime<Utc>,
    ) -> Result<JobView, AppError> {
        let valid = validate_job_form(form, self.default_reminder_days)?;
        let job = Job {
            id: Uuid::new_v4(),
            owner_id,
            fields: valid.fields,
            reminder_id: None,
            created_at: now,
            updated_at: now,
        };
        let plan = sync::plan_on_create(valid.reminder, job.fields.status, now);

        let mut batch = WriteBatch::from(WriteOp::InsertJob(job.clone()));
        let link = sync::stage(&plan, &mut batch, job.id, owner_id, now);
        self.store.commit(batch).await?;

        info!(
            "Created job {} ({} at {}) for owner {owner_id}, reminder plan {:?}",
            job.id, job.fields.title, job.fields.company, plan
        );
        let job = Job {
            reminder_id: link.flatten(),
            ..job
        };
        self.view(job).await
    }

    pub async fn get_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<JobView, AppError> {
        let job = self.load_owned(owner_id, job_id).await?;
        self.view(job).await
    }

    /// Owner's jobs, newest first, optionally restricted to one status.
    pub async fn list_jobs(
        &self,
        owner_id: Uuid,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobView>, AppError> {
        let mut jobs = self
            .store
            .find_jobs(&JobFilter { owner_id, status })
            .await?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut reminders: HashMap<Uuid, Reminder> = self
            .store
            .find_reminders(&ReminderFilter {
                owner_id: Some(owner_id),
                ..ReminderFilter::default()
            })
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        Ok(jobs
            .into_iter()
            .map(|job| {
                let reminder = job.reminder_id.and_then(|id| reminders.remove(&id));
                JobView::new(job, reminder)
            })
            .collect())
    }

    pub async fn summary(&self, owner_id: Uuid) -> Result<StatusSummary, AppError> {
        let jobs = self.store.find_jobs(&JobFilter::owned_by(owner_id)).await?;
        Ok(StatusSummary::from_jobs(&jobs))
    }

    /// Full edit from the details form. Reminder changes follow the switch in
    /// the form; omitting it leaves the reminder alone.
    pub async fn update_job(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        form: &JobForm,
        now: DateTime<Utc>,
    ) -> Result<JobView, AppError> {
        let valid = validate_job_form(form, self.default_reminder_days)?;
        let job = self.load_owned(owner_id, job_id).await?;
        let replaced = replaced_file_keys(&job.fields, &valid.fields);

        let updated = self
            .write_job(job, Some(valid.fields), valid.reminder, now)
            .await?;

        if !replaced.is_empty() {
            // The job already points at the new files; a stale upload is only clutter.
            if let Err(e) = self.files.delete_files(&replaced).await {
                warn!("Failed to delete replaced files {:?} for job {job_id}: {e}", replaced);
            }
        }
        self.view(updated).await
    }

    pub async fn set_status(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        status: JobStatus,
        now: DateTime<Utc>,
    ) -> Result<JobView, AppError> {
        let job = self.load_owned(owner_id, job_id).await?;
        let fields = JobFields {
            status,
            ..job.fields.clone()
        };
        let updated = self.write_job(job, Some(fields), None, now).await?;
        self.view(updated).await
    }

    pub async fn toggle_reminder(
        &self,
        owner_id: Uuid,
        job_id: Uuid,
        settings: ReminderSettings,
        now: DateTime<Utc>,
    ) -> Result<JobView, AppError> {
        let job = self.load_owned(owner_id, job_id).await?;
        let updated = self.write_job(job, None, Some(settings), now).await?;
        self.view(updated).await
    }

    /// Applies new fields and/or reminder settings to `job` in one batch and
    /// returns the job as stored afterwards.
    async fn write_job(
        &self,
        job: Job,
        fields: Option<JobFields>,
        settings: Option<ReminderSettings>,
        now: DateTime<Utc>,
    ) -> Result<Job, AppError> {
        let current = match settings {
            Some(_) => self.current_reminder(&job).await?,
            None => None,
        };
        let plan = sync::plan_on_edit(job.reminder_id, current.as_ref(), settings, now);

        let mut batch = WriteBatch::new();
        let mut job = job;
        if let Some(fields) = fields {
            batch.push(WriteOp::UpdateJob {
                id: job.id,
                fields: fields.clone(),
                updated_at: now,
            });
            job.fields = fields;
            job.updated_at = now;
        }
        if let Some(link) = sync::stage(&plan, &mut batch, job.id, job.owner_id, now) {
            job.reminder_id = link;
        }
        self.store.commit(batch).await?;

        info!("Updated job {}, reminder plan {:?}", job.id, plan);
        Ok(job)
    }

    /// Deletes hosted files first, then every reminder of the job together with
    /// the job itself. If the file service fails nothing is deleted.
    pub async fn delete_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<(), AppError> {
        let job = self.load_owned(owner_id, job_id).await?;

        let keys = file_keys(job.fields.attachments());
        self.files.delete_files(&keys).await?;

        let reminders = self
            .store
            .find_reminders(&ReminderFilter::for_job(job_id))
            .await?;
        let mut batch = WriteBatch::new();
        for reminder in &reminders {
            batch.push(WriteOp::DeleteReminder(reminder.id));
        }
        batch.push(WriteOp::DeleteJob(job_id));
        self.store.commit(batch).await?;

        info!(
            "Deleted job {job_id} with {} file(s) and {} reminder(s)",
            keys.len(),
            reminders.len()
        );
        Ok(())
    }

    /// Deletes a reminder and clears the owning job's back-reference in one batch.
    pub async fn remove_reminder(&self, owner_id: Uuid, reminder_id: Uuid) -> Result<(), AppError> {
        let reminder = self
            .store
            .get_reminder(reminder_id)
            .await?
            .ok_or_else(|| StoreError::reminder_not_found(reminder_id))?;
        if reminder.owner_id != owner_id {
            return Err(AppError::Forbidden);
        }

        let mut batch = WriteBatch::new();
        ReminderManager::stage_delete(&mut batch, reminder_id);
        if let Some(job) = self.store.get_job(reminder.job_id).await? {
            if job.reminder_id == Some(reminder_id) {
                batch.push(WriteOp::LinkReminder {
                    job_id: job.id,
                    reminder_id: None,
                });
            }
        }
        self.store.commit(batch).await?;

        info!("Removed reminder {reminder_id} from job {}", reminder.job_id);
        Ok(())
    }
}

fn file_keys<'a>(attachments: impl Iterator<Item = &'a Attachment>) -> Vec<String> {
    attachments
        .filter_map(|a| {
            let key = extract_file_key(&a.url);
            if key.is_none() {
                warn!("No file key in attachment url {}", a.url);
            }
            key.map(str::to_string)
        })
        .collect()
}

/// Keys of files the old fields referenced that the new fields no longer do.
fn replaced_file_keys(old: &JobFields, new: &JobFields) -> Vec<String> {
    let still_used: Vec<&str> = new.attachments().map(|a| a.url.as_str()).collect();
    file_keys(
        old.attachments()
            .filter(|a| !still_used.contains(&a.url.as_str())),
    )
}
