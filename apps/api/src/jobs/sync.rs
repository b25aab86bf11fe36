//! Keeps a job's `reminder_id` consistent with the reminders collection.
//!
//! Planning is pure: given the job's current reminder and what the user asked
//! for, decide what has to happen. `stage` then appends the reminder writes and
//! the job's back-reference update to the same batch as the job write, so the
//! whole transition commits atomically.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{JobStatus, Reminder};
use crate::reminders::lifecycle::due_in;
use crate::reminders::ReminderManager;
use crate::store::{WriteBatch, WriteOp};

/// State of the reminder switch on the add/edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReminderPlan {
    Keep,
    Create { due_date: DateTime<Utc> },
    /// Move the due date and reset `completed`.
    Rearm {
        reminder_id: Uuid,
        due_date: DateTime<Utc>,
    },
    Remove { reminder_id: Uuid },
    /// The job points at a reminder that no longer exists; clear the pointer.
    Unlink,
}

/// New jobs only get a reminder when the switch is on and the job starts out
/// as `applied`.
pub fn plan_on_create(
    settings: Option<ReminderSettings>,
    status: JobStatus,
    now: DateTime<Utc>,
) -> ReminderPlan {
    match settings {
        Some(s) if s.enabled && status == JobStatus::Applied => ReminderPlan::Create {
            due_date: due_in(now, s.days),
        },
        _ => ReminderPlan::Keep,
    }
}

/// `linked_id` is the job's stored `reminder_id`; `current` is the reminder
/// record it resolves to (or an unlinked active reminder for the same job,
/// which is adopted rather than duplicated).
pub fn plan_on_edit(
    linked_id: Option<Uuid>,
    current: Option<&Reminder>,
    settings: Option<ReminderSettings>,
    now: DateTime<Utc>,
) -> ReminderPlan {
    let Some(settings) = settings else {
        return ReminderPlan::Keep;
    };

    match (settings.enabled, current) {
        (true, Some(reminder)) => ReminderPlan::Rearm {
            reminder_id: reminder.id,
            due_date: due_in(now, settings.days),
        },
        (true, None) => ReminderPlan::Create {
            due_date: due_in(now, settings.days),
        },
        (false, Some(reminder)) => ReminderPlan::Remove {
            reminder_id: reminder.id,
        },
        (false, None) if linked_id.is_some() => ReminderPlan::Unlink,
        (false, None) => ReminderPlan::Keep,
    }
}

/// Appends the writes for `plan` to `batch`. Returns the reminder id the job
/// will point at afterwards, when the plan changes it.
pub fn stage(
    plan: &ReminderPlan,
    batch: &mut WriteBatch,
    job_id: Uuid,
    owner_id: Uuid,
    now: DateTime<Utc>,
) -> Option<Option<Uuid>> {
    let link = match *plan {
        ReminderPlan::Keep => return None,
        ReminderPlan::Create { due_date } => Some(ReminderManager::stage_create(
            batch, job_id, owner_id, due_date, now,
        )),
        ReminderPlan::Rearm {
            reminder_id,
            due_date,
        } => {
            ReminderManager::stage_rearm(batch, reminder_id, due_date);
            Some(reminder_id)
        }
        ReminderPlan::Remove { reminder_id } => {
            ReminderManager::stage_delete(batch, reminder_id);
            None
        }
        ReminderPlan::Unlink => None,
    };
    batch.push(WriteOp::LinkReminder {
        job_id,
        reminder_id: link,
    });
    Some(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn on(days: u32) -> Option<ReminderSettings> {
        Some(ReminderSettings {
            enabled: true,
            days,
        })
    }

    fn off() -> Option<ReminderSettings> {
        Some(ReminderSettings {
            enabled: false,
            days: 3,
        })
    }

    fn reminder(completed: bool) -> Reminder {
        let mut r = Reminder::follow_up(Uuid::new_v4(), Uuid::new_v4(), now(), now());
        r.completed = completed;
        r
    }

    #[test]
    fn test_create_with_switch_on_and_applied() {
        assert_eq!(
            plan_on_create(on(5), JobStatus::Applied, now()),
            ReminderPlan::Create {
                due_date: now() + Duration::days(5)
            }
        );
    }

    #[test]
    fn test_create_skipped_for_other_status_or_switch_off() {
        assert_eq!(
            plan_on_create(on(3), JobStatus::Interviewing, now()),
            ReminderPlan::Keep
        );
        assert_eq!(plan_on_create(off(), JobStatus::Applied, now()), ReminderPlan::Keep);
        assert_eq!(plan_on_create(None, JobStatus::Applied, now()), ReminderPlan::Keep);
    }

    #[test]
    fn test_edit_without_switch_keeps_everything() {
        let r = reminder(false);
        assert_eq!(
            plan_on_edit(Some(r.id), Some(&r), None, now()),
            ReminderPlan::Keep
        );
    }

    #[test]
    fn test_edit_switch_on_without_reminder_creates() {
        assert_eq!(
            plan_on_edit(None, None, on(4), now()),
            ReminderPlan::Create {
                due_date: now() + Duration::days(4)
            }
        );
    }

    #[test]
    fn test_edit_switch_on_rearms_existing_even_when_done() {
        for completed in [false, true] {
            let r = reminder(completed);
            assert_eq!(
                plan_on_edit(Some(r.id), Some(&r), on(2), now()),
                ReminderPlan::Rearm {
                    reminder_id: r.id,
                    due_date: now() + Duration::days(2)
                }
            );
        }
    }

    #[test]
    fn test_edit_switch_off_removes_existing() {
        let r = reminder(false);
        assert_eq!(
            plan_on_edit(Some(r.id), Some(&r), off(), now()),
            ReminderPlan::Remove { reminder_id: r.id }
        );
    }

    #[test]
    fn test_edit_dangling_reference() {
        let dangling = Some(Uuid::new_v4());
        assert_eq!(plan_on_edit(dangling, None, off(), now()), ReminderPlan::Unlink);
        assert!(matches!(
            plan_on_edit(dangling, None, on(3), now()),
            ReminderPlan::Create { .. }
        ));
        assert_eq!(plan_on_edit(None, None, off(), now()), ReminderPlan::Keep);
    }

    #[test]
    fn test_stage_create_links_new_reminder() {
        let (job_id, owner_id) = (Uuid::new_v4(), Uuid::new_v4());
        let mut batch = WriteBatch::new();
        let link = stage(
            &ReminderPlan::Create { due_date: now() },
            &mut batch,
            job_id,
            owner_id,
            now(),
        );

        let Some(Some(reminder_id)) = link else {
            panic!("expected a new link, got {link:?}");
        };
        match batch.ops() {
            [WriteOp::InsertReminder(r), WriteOp::LinkReminder {
                job_id: linked_job,
                reminder_id: linked,
            }] => {
                assert_eq!(r.id, reminder_id);
                assert_eq!(r.job_id, job_id);
                assert_eq!(*linked_job, job_id);
                assert_eq!(*linked, Some(reminder_id));
            }
            ops => panic!("unexpected ops {ops:?}"),
        }
    }

    #[test]
    fn test_stage_remove_clears_link() {
        let reminder_id = Uuid::new_v4();
        let mut batch = WriteBatch::new();
        let link = stage(
            &ReminderPlan::Remove { reminder_id },
            &mut batch,
            Uuid::new_v4(),
            Uuid::new_v4(),
            now(),
        );
        assert_eq!(link, Some(None));
        assert!(matches!(batch.ops()[0], WriteOp::DeleteReminder(id) if id == reminder_id));
        assert!(matches!(
            batch.ops()[1],
            WriteOp::LinkReminder {
                reminder_id: None,
                ..
            }
        ));
    }

    #[test]
    fn test_stage_keep_writes_nothing() {
        let mut batch = WriteBatch::new();
        let link = stage(
            &ReminderPlan::Keep,
            &mut batch,
            Uuid::new_v4(),
            Uuid::new_v4(),
            now(),
        );
        assert_eq!(link, None);
        assert!(batch.is_empty());
    }
}
