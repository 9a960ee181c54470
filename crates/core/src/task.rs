//! Task model - the unit of estimation in est.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accuracy::AccuracyRatio;
use crate::duration::{as_hours, serde_nanos};
use crate::id::TaskId;
use crate::Time;

/// Maximum length of a task name, after trimming.
pub const TASK_NAME_MAX_LEN: usize = 120;

/// Rejected task operations.
///
/// Every variant is a precondition violation: the task is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Name empty or too long
    #[error("{0}")]
    InvalidName(String),

    /// Estimate changed after the task was started, or start on an active task
    #[error("task {0} has already been started")]
    AlreadyStarted(TaskId),

    /// Start on a deleted task
    #[error("cannot start deleted task {0}")]
    Deleted(TaskId),

    /// Start on a task with no estimate
    #[error("task {0} must be estimated before it is started")]
    Unestimated(TaskId),

    /// Pause on a task which isn't active
    #[error("cannot pause task {0} because it isn't started")]
    NotActive(TaskId),

    /// Complete on a task which is neither active nor paused
    #[error("cannot mark done task {0} because it isn't started or paused")]
    NotActiveOrPaused(TaskId),

    /// Delete or undelete on an active task
    #[error("cannot delete or undelete task {0} while it is started")]
    ActiveTask(TaskId),

    /// Delete on a deleted task
    #[error("task {0} is already deleted")]
    AlreadyDeleted(TaskId),

    /// Undelete on a task which isn't deleted
    #[error("cannot undelete task {0} because it isn't deleted")]
    NotDeleted(TaskId),

    /// Logging time against a task which was never started
    #[error("cannot log time on task {0} because it was never started")]
    NeverStarted(TaskId),

    /// Negative estimate or logged duration
    #[error("duration must not be negative")]
    NegativeDuration,

    /// A stored task whose fields contradict each other
    #[error("task {id} is inconsistent: {reason}")]
    Inconsistent {
        /// Offending task
        id: TaskId,
        /// What doesn't hold
        reason: &'static str,
    },
}

/// Where a started task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Accruing time
    Active,
    /// Started before, not accruing
    Paused,
    /// Finished; may be restarted
    Done,
}

/// Time-tracking state of a task that has been started at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    /// Instant up to which `actual` has been caught up
    pub actual_updated_at: Time,

    /// Current lifecycle phase
    pub phase: Phase,
}

/// One-dimensional projection of task state for humans.
///
/// Variant order matches listing order: `ls` sorts by status descending, so
/// unestimated and started tasks come first and deleted tasks last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Soft-deleted, orthogonal to everything else
    Deleted,
    /// Finished
    Done,
    /// Estimated but never started
    Estimated,
    /// Started before, currently paused
    Paused,
    /// Currently accruing time
    Started,
    /// Created without an estimate
    Unestimated,
}

impl TaskStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::Done => "done",
            Self::Estimated => "estimated",
            Self::Paused => "paused",
            Self::Started => "started",
            Self::Unestimated => "unestimated",
        }
    }
}

/// A task represents a unit of estimated work.
///
/// Lifecycle transitions that change the set of active tasks (start, pause,
/// complete) must go through a ledger so elapsed time is shared between the
/// tasks that were active; the methods here validate and apply the state
/// change for a single task only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord")]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    name: String,

    /// Estimated duration; zero means unestimated
    #[serde(with = "serde_nanos")]
    estimated: Duration,

    /// Accrued working time
    #[serde(with = "serde_nanos")]
    actual: Duration,

    /// None iff the task was never started
    tracking: Option<Tracking>,

    /// Some iff the task is deleted
    deleted_at: Option<Time>,

    // Most recent occurrence of each event, shown to humans.
    created_at: Time,
    estimated_at: Option<Time>,
    started_at: Option<Time>,
    paused_at: Option<Time>,
    done_at: Option<Time>,
}

/// Stored form of [`Task`], checked before it becomes one.
#[derive(Deserialize)]
struct TaskRecord {
    id: TaskId,
    name: String,
    #[serde(with = "serde_nanos")]
    estimated: Duration,
    #[serde(with = "serde_nanos")]
    actual: Duration,
    tracking: Option<Tracking>,
    deleted_at: Option<Time>,
    created_at: Time,
    estimated_at: Option<Time>,
    started_at: Option<Time>,
    paused_at: Option<Time>,
    done_at: Option<Time>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = TaskError;

    fn try_from(r: TaskRecord) -> Result<Self, TaskError> {
        let inconsistent = |reason| TaskError::Inconsistent { id: r.id, reason };
        if r.estimated < Duration::zero() || r.actual < Duration::zero() {
            return Err(inconsistent("negative duration"));
        }
        if let Some(tracking) = r.tracking {
            if r.estimated.is_zero() {
                return Err(inconsistent("started without an estimate"));
            }
            if tracking.phase == Phase::Active && r.deleted_at.is_some() {
                return Err(inconsistent("active and deleted"));
            }
        } else if !r.actual.is_zero() {
            return Err(inconsistent("actual time on a task never started"));
        }
        Ok(Self {
            id: r.id,
            name: validate_name(&r.name)?,
            estimated: r.estimated,
            actual: r.actual,
            tracking: r.tracking,
            deleted_at: r.deleted_at,
            created_at: r.created_at,
            estimated_at: r.estimated_at,
            started_at: r.started_at,
            paused_at: r.paused_at,
            done_at: r.done_at,
        })
    }
}

impl Task {
    /// Create a new unestimated task.
    pub fn new(name: &str, now: Time) -> Result<Self, TaskError> {
        Ok(Self {
            id: TaskId::new(),
            name: validate_name(name)?,
            estimated: Duration::zero(),
            actual: Duration::zero(),
            tracking: None,
            deleted_at: None,
            created_at: now,
            estimated_at: None,
            started_at: None,
            paused_at: None,
            done_at: None,
        })
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename this task.
    pub fn rename(&mut self, name: &str) -> Result<(), TaskError> {
        self.name = validate_name(name)?;
        Ok(())
    }

    /// Estimated duration, zero if unestimated.
    pub fn estimated(&self) -> Duration {
        self.estimated
    }

    /// Estimated duration in fractional hours.
    pub fn estimated_hours(&self) -> f64 {
        as_hours(self.estimated)
    }

    /// Accrued working time.
    pub fn actual(&self) -> Duration {
        self.actual
    }

    /// Time-tracking state, None if never started.
    pub fn tracking(&self) -> Option<Tracking> {
        self.tracking
    }

    /// Instant up to which `actual` is caught up, None if never started.
    pub fn actual_updated_at(&self) -> Option<Time> {
        self.tracking.map(|t| t.actual_updated_at)
    }

    /// True iff this task has a non-zero estimate.
    pub fn is_estimated(&self) -> bool {
        !self.estimated.is_zero()
    }

    /// True iff this task was never started.
    pub fn is_never_started(&self) -> bool {
        self.tracking.is_none()
    }

    /// True iff this task is currently accruing time.
    pub fn is_active(&self) -> bool {
        self.phase() == Some(Phase::Active)
    }

    /// True iff this task is currently paused.
    pub fn is_paused(&self) -> bool {
        self.phase() == Some(Phase::Paused)
    }

    /// True iff this task is done.
    pub fn is_done(&self) -> bool {
        self.phase() == Some(Phase::Done)
    }

    /// True iff this task is deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// When this task was created.
    pub fn created_at(&self) -> Time {
        self.created_at
    }

    /// Most recent estimate.
    pub fn estimated_at(&self) -> Option<Time> {
        self.estimated_at
    }

    /// Most recent start.
    pub fn started_at(&self) -> Option<Time> {
        self.started_at
    }

    /// Most recent pause.
    pub fn paused_at(&self) -> Option<Time> {
        self.paused_at
    }

    /// Most recent completion.
    pub fn done_at(&self) -> Option<Time> {
        self.done_at
    }

    /// When this task was deleted.
    pub fn deleted_at(&self) -> Option<Time> {
        self.deleted_at
    }

    fn phase(&self) -> Option<Phase> {
        self.tracking.map(|t| t.phase)
    }

    /// Derived status. Precedence: deleted, done, paused, started,
    /// estimated, unestimated.
    pub fn status(&self) -> TaskStatus {
        self.status_at().0
    }

    /// Derived status together with the instant that status was entered.
    pub fn status_at(&self) -> (TaskStatus, Time) {
        let or_created = |t: Option<Time>| t.unwrap_or(self.created_at);
        if let Some(at) = self.deleted_at {
            return (TaskStatus::Deleted, at);
        }
        match self.phase() {
            Some(Phase::Done) => (TaskStatus::Done, or_created(self.done_at)),
            Some(Phase::Paused) => (TaskStatus::Paused, or_created(self.paused_at)),
            Some(Phase::Active) => (TaskStatus::Started, or_created(self.started_at)),
            None if self.is_estimated() => (TaskStatus::Estimated, or_created(self.estimated_at)),
            None => (TaskStatus::Unestimated, self.created_at),
        }
    }

    /// Set the estimate. Only allowed while the task was never started.
    pub fn estimate(&mut self, d: Duration, now: Time) -> Result<(), TaskError> {
        if !self.is_never_started() {
            return Err(TaskError::AlreadyStarted(self.id));
        }
        if d < Duration::zero() {
            return Err(TaskError::NegativeDuration);
        }
        self.estimated = d;
        self.estimated_at = Some(now);
        Ok(())
    }

    /// Check that this task may be started.
    pub fn check_start(&self) -> Result<(), TaskError> {
        if self.is_deleted() {
            return Err(TaskError::Deleted(self.id));
        }
        if !self.is_estimated() {
            return Err(TaskError::Unestimated(self.id));
        }
        if self.is_active() {
            return Err(TaskError::AlreadyStarted(self.id));
        }
        Ok(())
    }

    /// Mark this task active as of `now`, clearing paused and done.
    ///
    /// Ledger building block: this does not accrue time to other active
    /// tasks. Use `TaskLedger::start` instead.
    #[doc(hidden)]
    pub fn start(&mut self, now: Time) -> Result<(), TaskError> {
        self.check_start()?;
        self.tracking = Some(Tracking {
            actual_updated_at: now,
            phase: Phase::Active,
        });
        self.started_at = Some(now);
        Ok(())
    }

    /// Check that this task may be paused.
    pub fn check_pause(&self) -> Result<(), TaskError> {
        if !self.is_active() {
            return Err(TaskError::NotActive(self.id));
        }
        Ok(())
    }

    /// Mark this task paused. `actual_updated_at` is left to accrual.
    ///
    /// Ledger building block. Use `TaskLedger::pause` instead.
    #[doc(hidden)]
    pub fn pause(&mut self, now: Time) -> Result<(), TaskError> {
        self.check_pause()?;
        self.set_phase(Phase::Paused);
        self.paused_at = Some(now);
        Ok(())
    }

    /// Check that this task may be marked done.
    pub fn check_complete(&self) -> Result<(), TaskError> {
        if !self.is_active() && !self.is_paused() {
            return Err(TaskError::NotActiveOrPaused(self.id));
        }
        Ok(())
    }

    /// Mark this task done. `actual_updated_at` is left to accrual.
    ///
    /// Ledger building block. Use `TaskLedger::complete` instead.
    #[doc(hidden)]
    pub fn complete(&mut self, now: Time) -> Result<(), TaskError> {
        self.check_complete()?;
        self.set_phase(Phase::Done);
        self.done_at = Some(now);
        Ok(())
    }

    /// Soft-delete this task.
    pub fn delete(&mut self, now: Time) -> Result<(), TaskError> {
        if self.is_active() {
            return Err(TaskError::ActiveTask(self.id));
        }
        if self.is_deleted() {
            return Err(TaskError::AlreadyDeleted(self.id));
        }
        self.deleted_at = Some(now);
        Ok(())
    }

    /// Reverse a soft delete.
    pub fn undelete(&mut self) -> Result<(), TaskError> {
        if !self.is_deleted() {
            return Err(TaskError::NotDeleted(self.id));
        }
        // Deleted tasks can't be started, and started tasks can't be deleted.
        assert!(!self.is_active(), "deleted task {} is active", self.id);
        self.deleted_at = None;
        Ok(())
    }

    /// Add manually logged time, bypassing automatic accrual.
    ///
    /// Callers are responsible for not double-counting an interval that
    /// accrual also covers.
    pub fn log_actual(&mut self, d: Duration, now: Time) -> Result<(), TaskError> {
        if d < Duration::zero() {
            return Err(TaskError::NegativeDuration);
        }
        let Some(tracking) = self.tracking.as_mut() else {
            return Err(TaskError::NeverStarted(self.id));
        };
        tracking.actual_updated_at = now;
        self.actual = self.actual + d;
        Ok(())
    }

    /// Credit a share of accrued time and advance the catch-up instant.
    ///
    /// Panics unless the task is active and not deleted: accrual only ever
    /// runs over the active set. Only the ledger's accrual step calls this.
    #[doc(hidden)]
    pub fn accrue(&mut self, share: Duration, until: Time) {
        assert!(
            self.is_active() && !self.is_deleted(),
            "accrual on task {} which is not in the active set",
            self.id
        );
        assert!(share >= Duration::zero(), "negative accrual share {}", share);
        if let Some(tracking) = self.tracking.as_mut() {
            tracking.actual_updated_at = until;
        }
        self.actual = self.actual + share;
    }

    /// Estimate accuracy of this task: estimated hours over actual hours.
    ///
    /// 1.0 is a perfect estimate, 2.0 means the task took half as long as
    /// estimated, 0.5 twice as long. Panics if `actual` is zero; callers
    /// filter those tasks out first.
    pub fn accuracy_ratio(&self) -> AccuracyRatio {
        assert!(
            !self.actual.is_zero(),
            "accuracy ratio of task {} with zero actual time",
            self.id
        );
        AccuracyRatio {
            recorded_at: self
                .done_at
                .or(self.actual_updated_at())
                .unwrap_or(self.created_at),
            estimated: self.estimated,
            ratio: as_hours(self.estimated) / as_hours(self.actual),
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if let Some(tracking) = self.tracking.as_mut() {
            tracking.phase = phase;
        }
    }
}

fn validate_name(name: &str) -> Result<String, TaskError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaskError::InvalidName("task name cannot be empty".to_string()));
    }
    if trimmed.chars().count() > TASK_NAME_MAX_LEN {
        return Err(TaskError::InvalidName(format!(
            "task name can be at most {} characters",
            TASK_NAME_MAX_LEN
        )));
    }
    Ok(trimmed.to_string())
}
