// Job records and the job/reminder synchronizer.
// Every multi-record change is staged into one WriteBatch and committed atomically.

pub mod handlers;
pub mod service;
pub mod sync;
pub mod validation;

pub use service::{JobService, JobView};
