pub mod job;
pub mod reminder;

pub use job::{Attachment, Job, JobFields, JobStatus, StatusSummary};
pub use reminder::{ActiveReminder, Reminder, ReminderKind, ReminderState};
