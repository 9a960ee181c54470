//! est core data models.
//!
//! This crate defines the task entity, its lifecycle state, estimate
//! accuracy observations, and the weekly work schedule that the calendar,
//! ledger and forecast crates build on.

#![warn(missing_docs)]

mod id;
mod task;
mod accuracy;
mod schedule;
pub mod duration;

pub use id::TaskId;
pub use task::{Phase, Task, TaskError, TaskStatus, Tracking, TASK_NAME_MAX_LEN};
pub use accuracy::{AccuracyRatio, AccuracyRatios};
pub use schedule::{parse_clock_time, ScheduleError, WorkSchedule};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
