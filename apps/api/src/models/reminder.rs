use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderKind {
    FollowUp,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::FollowUp => "followUp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "followUp" => Some(ReminderKind::FollowUp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub job_id: Uuid,
    pub owner_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// A fresh, not yet completed follow-up reminder.
    pub fn follow_up(
        job_id: Uuid,
        owner_id: Uuid,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            owner_id,
            kind: ReminderKind::FollowUp,
            due_date,
            completed: false,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.completed
    }
}

/// A reminder joined with the title and company of the job it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveReminder {
    #[serde(flatten)]
    pub reminder: Reminder,
    pub title: String,
    pub company: String,
}

/// Reminder status of a job, derived at read time from `Job::reminder_id` and
/// the referenced reminder's `completed` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderState {
    None,
    Active,
    Done,
}

impl ReminderState {
    /// A dangling `reminder_id` (record gone) reads as `None`.
    pub fn derive(reminder_id: Option<Uuid>, reminder: Option<&Reminder>) -> Self {
        match (reminder_id, reminder) {
            (Some(id), Some(r)) if r.id == id && r.completed => ReminderState::Done,
            (Some(id), Some(r)) if r.id == id => ReminderState::Active,
            _ => ReminderState::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reminder(completed: bool) -> Reminder {
        let now = Utc::now();
        let mut r = Reminder::follow_up(
            Uuid::new_v4(),
            Uuid::new_v4(),
            now + Duration::days(3),
            now,
        );
        r.completed = completed;
        r
    }

    #[test]
    fn test_follow_up_starts_active() {
        let r = reminder(false);
        assert!(r.is_active());
        assert_eq!(r.kind, ReminderKind::FollowUp);
    }

    #[test]
    fn test_state_none_without_reference() {
        assert_eq!(ReminderState::derive(None, None), ReminderState::None);
        let r = reminder(false);
        assert_eq!(ReminderState::derive(None, Some(&r)), ReminderState::None);
    }

    #[test]
    fn test_state_active_and_done() {
        let active = reminder(false);
        assert_eq!(
            ReminderState::derive(Some(active.id), Some(&active)),
            ReminderState::Active
        );
        let done = reminder(true);
        assert_eq!(
            ReminderState::derive(Some(done.id), Some(&done)),
            ReminderState::Done
        );
    }

    #[test]
    fn test_state_dangling_reference_is_none() {
        assert_eq!(
            ReminderState::derive(Some(Uuid::new_v4()), None),
            ReminderState::None
        );
        let other = reminder(false);
        assert_eq!(
            ReminderState::derive(Some(Uuid::new_v4()), Some(&other)),
            ReminderState::None
        );
    }

    #[test]
    fn test_reminder_serializes_type_field() {
        let value = serde_json::to_value(reminder(false)).unwrap();
        assert_eq!(value["type"], "followUp");
        assert_eq!(value["completed"], false);
        assert!(value.get("dueDate").is_some());
    }
}
