use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{JobFilter, RecordStore, ReminderFilter, StoreError, WriteBatch, WriteOp};
use crate::models::{Attachment, Job, JobFields, Reminder, ReminderKind};

const UNIQUE_ACTIVE_INDEX: &str = "reminders_one_active_per_job";

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    owner_id: Uuid,
    company: String,
    title: String,
    status: String,
    applied_at: Option<NaiveDate>,
    notes: Option<String>,
    resume_url: Option<String>,
    resume_name: Option<String>,
    cover_letter_url: Option<String>,
    cover_letter_name: Option<String>,
    reminder_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn attachment(url: Option<String>, name: Option<String>) -> Option<Attachment> {
    match (url, name) {
        (Some(url), Some(name)) => Some(Attachment { url, name }),
        _ => None,
    }
}

impl JobRow {
    fn into_job(self) -> Result<Job, StoreError> {
        let status = self.status.parse().map_err(StoreError::Corrupt)?;
        Ok(Job {
            id: self.id,
            owner_id: self.owner_id,
            fields: JobFields {
                company: self.company,
                title: self.title,
                status,
                applied_at: self.applied_at,
                notes: self.notes,
                resume: attachment(self.resume_url, self.resume_name),
                cover_letter: attachment(self.cover_letter_url, self.cover_letter_name),
            },
            reminder_id: self.reminder_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReminderRow {
    id: Uuid,
    job_id: Uuid,
    owner_id: Uuid,
    kind: String,
    due_date: DateTime<Utc>,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl ReminderRow {
    fn into_reminder(self) -> Result<Reminder, StoreError> {
        let kind = ReminderKind::parse(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown reminder type '{}'", self.kind)))?;
        Ok(Reminder {
            id: self.id,
            job_id: self.job_id,
            owner_id: self.owner_id,
            kind,
            due_date: self.due_date,
            completed: self.completed,
            created_at: self.created_at,
        })
    }
}

/// PostgreSQL-backed record store. Each batch runs in its own transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a violation of the one-active-reminder index to `Conflict`.
fn map_reminder_write(err: sqlx::Error, job_id: Uuid) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.constraint() == Some(UNIQUE_ACTIVE_INDEX) {
            return StoreError::Conflict { job_id };
        }
    }
    StoreError::Database(err)
}

fn expect_one(rows_affected: u64, not_found: StoreError) -> Result<(), StoreError> {
    if rows_affected == 0 {
        return Err(not_found);
    }
    Ok(())
}

async fn apply_op(tx: &mut Transaction<'_, Postgres>, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::InsertJob(job) => {
            let JobFields {
                company,
                title,
                status,
                applied_at,
                notes,
                resume,
                cover_letter,
            } = job.fields;
            let (resume_url, resume_name) = resume.map(|a| (a.url, a.name)).unzip();
            let (cover_letter_url, cover_letter_name) =
                cover_letter.map(|a| (a.url, a.name)).unzip();
            sqlx::query(
                r#"
                INSERT INTO jobs
                    (id, owner_id, company, title, status, applied_at, notes,
                     resume_url, resume_name, cover_letter_url, cover_letter_name,
                     reminder_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(job.id)
            .bind(job.owner_id)
            .bind(company)
            .bind(title)
            .bind(status.as_str())
            .bind(applied_at)
            .bind(notes)
            .bind(resume_url)
            .bind(resume_name)
            .bind(cover_letter_url)
            .bind(cover_letter_name)
            .bind(job.reminder_id)
            .bind(job.created_at)
            .bind(job.updated_at)
            .execute(&mut **tx)
            .await?;
        }
        WriteOp::UpdateJob {
            id,
            fields,
            updated_at,
        } => {
            let (resume_url, resume_name) = fields.resume.map(|a| (a.url, a.name)).unzip();
            let (cover_letter_url, cover_letter_name) =
                fields.cover_letter.map(|a| (a.url, a.name)).unzip();
            let result = sqlx::query(
                r#"
                UPDATE jobs
                SET company = $2, title = $3, status = $4, applied_at = $5, notes = $6,
                    resume_url = $7, resume_name = $8,
                    cover_letter_url = $9, cover_letter_name = $10,
                    updated_at = $11
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(fields.company)
            .bind(fields.title)
            .bind(fields.status.as_str())
            .bind(fields.applied_at)
            .bind(fields.notes)
            .bind(resume_url)
            .bind(resume_name)
            .bind(cover_letter_url)
            .bind(cover_letter_name)
            .bind(updated_at)
            .execute(&mut **tx)
            .await?;
            expect_one(result.rows_affected(), StoreError::job_not_found(id))?;
        }
        WriteOp::LinkReminder {
            job_id,
            reminder_id,
        } => {
            let result = sqlx::query("UPDATE jobs SET reminder_id = $2 WHERE id = $1")
                .bind(job_id)
                .bind(reminder_id)
                .execute(&mut **tx)
                .await?;
            expect_one(result.rows_affected(), StoreError::job_not_found(job_id))?;
        }
        WriteOp::DeleteJob(id) => {
            let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
            expect_one(result.rows_affected(), StoreError::job_not_found(id))?;
        }
        WriteOp::InsertReminder(reminder) => {
            let job_exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1)")
                    .bind(reminder.job_id)
                    .fetch_one(&mut **tx)
                    .await?;
            if !job_exists {
                return Err(StoreError::job_not_found(reminder.job_id));
            }
            sqlx::query(
                r#"
                INSERT INTO reminders (id, job_id, owner_id, kind, due_date, completed, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(reminder.id)
            .bind(reminder.job_id)
            .bind(reminder.owner_id)
            .bind(reminder.kind.as_str())
            .bind(reminder.due_date)
            .bind(reminder.completed)
            .bind(reminder.created_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_reminder_write(e, reminder.job_id))?;
        }
        WriteOp::UpdateReminder { id, changes } => {
            let job_id: Option<Uuid> =
                sqlx::query_scalar("SELECT job_id FROM reminders WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut **tx)
                    .await?;
            let job_id = job_id.ok_or_else(|| StoreError::reminder_not_found(id))?;
            sqlx::query(
                r#"
                UPDATE reminders
                SET due_date = COALESCE($2, due_date),
                    completed = COALESCE($3, completed)
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(changes.due_date)
            .bind(changes.completed)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_reminder_write(e, job_id))?;
        }
        WriteOp::DeleteReminder(id) => {
            let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
            expect_one(result.rows_affected(), StoreError::reminder_not_found(id))?;
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(JobRow::into_job)
            .transpose()
    }

    async fn find_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM jobs WHERE owner_id = ");
        query.push_bind(filter.owner_id);
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query
            .build_query_as::<JobRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(JobRow::into_job)
            .collect()
    }

    async fn get_reminder(&self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        sqlx::query_as::<_, ReminderRow>("SELECT * FROM reminders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ReminderRow::into_reminder)
            .transpose()
    }

    async fn find_reminders(&self, filter: &ReminderFilter) -> Result<Vec<Reminder>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM reminders WHERE TRUE");
        if let Some(owner_id) = filter.owner_id {
            query.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(job_id) = filter.job_id {
            query.push(" AND job_id = ").push_bind(job_id);
        }
        if let Some(completed) = filter.completed {
            query.push(" AND completed = ").push_bind(completed);
        }
        query
            .build_query_as::<ReminderRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ReminderRow::into_reminder)
            .collect()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let op_count = batch.len();
        let mut tx = self.pool.begin().await?;
        for op in batch.into_ops() {
            // Dropping `tx` on error rolls the transaction back.
            apply_op(&mut tx, op).await?;
        }
        tx.commit().await?;
        debug!("Committed batch of {op_count} writes");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Run with a reachable database: `DATABASE_URL=postgres://... cargo test -- --ignored`.
// `sqlx::test` creates a scratch database per test and applies ./migrations.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collection, ReminderChanges};
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    fn job(owner_id: Uuid) -> Job {
        Job {
            id: Uuid::new_v4(),
            owner_id,
            fields: JobFields {
                company: "Acme".to_string(),
                title: "Engineer".to_string(),
                status: crate::models::JobStatus::Applied,
                applied_at: NaiveDate::from_ymd_opt(2025, 3, 1),
                notes: Some("referred by Sam".to_string()),
                resume: Some(Attachment {
                    url: "https://utfs.io/f/cv".to_string(),
                    name: "cv.pdf".to_string(),
                }),
                cover_letter: None,
            },
            reminder_id: None,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    fn reminder_for(job: &Job) -> Reminder {
        Reminder::follow_up(job.id, job.owner_id, at(1) + Duration::days(3), at(1))
    }

    async fn seed(store: &PgStore) -> (Job, Reminder) {
        let j = job(Uuid::new_v4());
        let r = reminder_for(&j);
        let mut batch = WriteBatch::new();
        batch
            .push(WriteOp::InsertJob(j.clone()))
            .push(WriteOp::InsertReminder(r.clone()))
            .push(WriteOp::LinkReminder {
                job_id: j.id,
                reminder_id: Some(r.id),
            });
        store.commit(batch).await.unwrap();
        (j, r)
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_commit_round_trips_job_and_reminder(pool: PgPool) {
        let store = PgStore::new(pool);
        let (j, r) = seed(&store).await;

        let stored = store.get_job(j.id).await.unwrap().unwrap();
        assert_eq!(stored.fields, j.fields);
        assert_eq!(stored.reminder_id, Some(r.id));
        assert_eq!(store.get_reminder(r.id).await.unwrap(), Some(r));
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_second_active_reminder_is_conflict_and_rolls_back(pool: PgPool) {
        let store = PgStore::new(pool);
        let (j, _) = seed(&store).await;
        let other = job(j.owner_id);

        let mut batch = WriteBatch::new();
        batch
            .push(WriteOp::InsertJob(other.clone()))
            .push(WriteOp::InsertReminder(reminder_for(&j)));
        let err = store.commit(batch).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict { job_id } if job_id == j.id));
        assert_eq!(store.get_job(other.id).await.unwrap(), None);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_rearming_next_to_active_reminder_is_conflict(pool: PgPool) {
        let store = PgStore::new(pool);
        let (j, first) = seed(&store).await;

        let second = reminder_for(&j);
        let mut batch = WriteBatch::new();
        batch
            .push(WriteOp::UpdateReminder {
                id: first.id,
                changes: ReminderChanges {
                    completed: Some(true),
                    ..ReminderChanges::default()
                },
            })
            .push(WriteOp::InsertReminder(second));
        store.commit(batch).await.unwrap();

        let err = store
            .commit(
                WriteOp::UpdateReminder {
                    id: first.id,
                    changes: ReminderChanges {
                        completed: Some(false),
                        ..ReminderChanges::default()
                    },
                }
                .into(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_partial_reminder_update_keeps_other_columns(pool: PgPool) {
        let store = PgStore::new(pool);
        let (_, r) = seed(&store).await;

        let complete = WriteOp::UpdateReminder {
            id: r.id,
            changes: ReminderChanges {
                completed: Some(true),
                ..ReminderChanges::default()
            },
        };
        store.commit(complete.into()).await.unwrap();
        let stored = store.get_reminder(r.id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.due_date, r.due_date);

        let postpone = WriteOp::UpdateReminder {
            id: r.id,
            changes: ReminderChanges {
                due_date: Some(at(10)),
                ..ReminderChanges::default()
            },
        };
        store.commit(postpone.into()).await.unwrap();
        let stored = store.get_reminder(r.id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.due_date, at(10));
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_missing_targets_are_not_found(pool: PgPool) {
        let store = PgStore::new(pool);
        let missing = Uuid::new_v4();

        let err = store
            .commit(WriteOp::DeleteReminder(missing).into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound { collection: Collection::Reminders, id } if id == missing
        ));

        let orphan = Reminder::follow_up(missing, Uuid::new_v4(), at(4), at(1));
        let err = store
            .commit(WriteOp::InsertReminder(orphan).into())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { collection: Collection::Jobs, .. }));
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_filters_and_cascading_delete(pool: PgPool) {
        let store = PgStore::new(pool);
        let (j, r) = seed(&store).await;

        let active = store
            .find_reminders(&ReminderFilter::active_for_owner(j.owner_id))
            .await
            .unwrap();
        assert_eq!(active, vec![r.clone()]);
        let offered = store
            .find_jobs(&JobFilter {
                owner_id: j.owner_id,
                status: Some(crate::models::JobStatus::Offered),
            })
            .await
            .unwrap();
        assert!(offered.is_empty());

        store.commit(WriteOp::DeleteJob(j.id).into()).await.unwrap();
        assert_eq!(store.get_reminder(r.id).await.unwrap(), None);
    }
}
