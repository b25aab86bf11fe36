// Reminder lifecycle: create, list, complete, postpone, delete.
// Deciding *when* a job should have a reminder lives in jobs::sync.

pub mod handlers;
pub mod lifecycle;

pub use lifecycle::ReminderManager;

/// Allowed range for "remind me in N days" and "postpone by N days".
pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 365;

pub fn days_in_range(days: u32) -> bool {
    (MIN_DAYS..=MAX_DAYS).contains(&days)
}
