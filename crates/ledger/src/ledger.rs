//! Task ledger - owns the task collection and applies lifecycle transitions.

use chrono::{Duration, Local, NaiveDate, TimeZone};
use est_calendar::BusinessCalendar;
use est_core::{Task, TaskError, TaskId, Time};
use thiserror::Error;
use tracing::info;

use crate::accrual::accrue;

/// Ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A single-task precondition failed
    #[error(transparent)]
    Task(#[from] TaskError),

    /// No task matches the given ID or reference
    #[error("no task with ID '{0}'")]
    TaskNotFound(String),

    /// More than one task matches a short reference
    #[error("'{reference}' matches {} tasks", .candidates.len())]
    AmbiguousReference {
        /// What the user typed
        reference: String,
        /// Every matching task
        candidates: Vec<TaskId>,
    },

    /// Exclusive start with more than one other task active
    #[error("{0} tasks are started; pause all but one or use --multiple")]
    MultipleActive(usize),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Tasks touched on a given day.
#[derive(Debug, Clone)]
pub struct DayActivity<'a> {
    /// The day reported on
    pub date: NaiveDate,

    /// Tasks started now, or whose status changed during `date`
    pub tasks: Vec<&'a Task>,
}

/// The authoritative task collection.
///
/// Every transition that changes the set of active tasks first catches all
/// active tasks up to the transition instant, then applies the change. A
/// rejected operation leaves the ledger untouched.
#[derive(Debug, Clone)]
pub struct TaskLedger<Tz: TimeZone = Local> {
    calendar: BusinessCalendar<Tz>,
    tasks: Vec<Task>,
}

impl<Tz: TimeZone> TaskLedger<Tz> {
    /// Wrap an existing task collection.
    pub fn new(calendar: BusinessCalendar<Tz>, tasks: Vec<Task>) -> Self {
        Self { calendar, tasks }
    }

    /// The calendar accrual runs against.
    pub fn calendar(&self) -> &BusinessCalendar<Tz> {
        &self.calendar
    }

    /// All tasks, including deleted ones, in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Give the tasks back, e.g. for persisting.
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Look up a task by full ID.
    pub fn get(&self, id: TaskId) -> Result<&Task> {
        self.index_of(id).map(|i| &self.tasks[i])
    }

    /// Create an unestimated task.
    pub fn add(&mut self, name: &str, now: Time) -> Result<TaskId> {
        let task = Task::new(name, now)?;
        let id = task.id;
        info!(task = %id, name = task.name(), "added task");
        self.tasks.push(task);
        Ok(id)
    }

    /// Resolve a full ID or a case-insensitive prefix or suffix of one.
    pub fn find_by_reference(&self, reference: &str) -> Result<TaskId> {
        let candidates: Vec<TaskId> = self
            .tasks
            .iter()
            .map(|t| t.id)
            .filter(|id| id.matches_reference(reference))
            .collect();
        match candidates.as_slice() {
            [] => Err(LedgerError::TaskNotFound(reference.to_string())),
            [id] => Ok(*id),
            _ => Err(LedgerError::AmbiguousReference {
                reference: reference.to_string(),
                candidates,
            }),
        }
    }

    /// Change a task's name.
    pub fn rename(&mut self, id: TaskId, name: &str) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].rename(name)?;
        Ok(())
    }

    /// Set the estimate of a never-started task.
    pub fn estimate(&mut self, id: TaskId, d: Duration, now: Time) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].estimate(d, now)?;
        info!(task = %id, estimate_secs = d.num_seconds(), "estimated task");
        Ok(())
    }

    /// Start a task alongside whatever else is active.
    pub fn start(&mut self, id: TaskId, now: Time) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].check_start()?;
        accrue(&self.calendar, &mut self.tasks, now);
        self.tasks[i].start(now)?;
        info!(task = %id, %now, "started task");
        Ok(())
    }

    /// Start a task, pausing the single other active task first.
    ///
    /// Fails without changes if more than one other task is active.
    pub fn start_exclusive(&mut self, id: TaskId, now: Time) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].check_start()?;
        let others: Vec<TaskId> = self.active().map(|t| t.id).collect();
        match others.as_slice() {
            [] => {}
            [other] => self.pause(*other, now)?,
            _ => return Err(LedgerError::MultipleActive(others.len())),
        }
        self.start(id, now)
    }

    /// Pause an active task.
    pub fn pause(&mut self, id: TaskId, now: Time) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].check_pause()?;
        accrue(&self.calendar, &mut self.tasks, now);
        self.tasks[i].pause(now)?;
        info!(task = %id, %now, "paused task");
        Ok(())
    }

    /// Mark an active or paused task done.
    ///
    /// Accrual runs only when the task was active; completing a paused task
    /// leaves every catch-up instant alone.
    pub fn complete(&mut self, id: TaskId, now: Time) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].check_complete()?;
        if self.tasks[i].is_active() {
            accrue(&self.calendar, &mut self.tasks, now);
        }
        self.tasks[i].complete(now)?;
        info!(task = %id, %now, "completed task");
        Ok(())
    }

    /// Soft-delete a task that isn't active.
    pub fn delete(&mut self, id: TaskId, now: Time) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].delete(now)?;
        info!(task = %id, "deleted task");
        Ok(())
    }

    /// Reverse a soft delete.
    pub fn undelete(&mut self, id: TaskId) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].undelete()?;
        info!(task = %id, "undeleted task");
        Ok(())
    }

    /// Add manually logged time to a task that was started before.
    ///
    /// Moves the task's catch-up instant to `now`. Other tasks are not
    /// caught up.
    pub fn log_manual(&mut self, id: TaskId, d: Duration, now: Time) -> Result<()> {
        let i = self.index_of(id)?;
        self.tasks[i].log_actual(d, now)?;
        info!(task = %id, logged_secs = d.num_seconds(), "logged time");
        Ok(())
    }

    /// Currently active, non-deleted tasks.
    pub fn active(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().filter(|t| t.is_active() && !t.is_deleted())
    }

    /// Estimated tasks nobody has started yet: what the forecast schedules.
    pub fn pending(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.is_estimated() && t.is_never_started() && !t.is_deleted())
            .collect()
    }

    /// Done, non-deleted tasks with some actual time: the forecast history.
    pub fn historical(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.is_done() && !t.is_deleted() && !t.actual().is_zero())
            .collect()
    }

    /// Tasks in listing order: status descending, then most recent status
    /// change first. Deleted tasks are left out unless asked for.
    pub fn listing(&self, include_deleted: bool) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| include_deleted || !t.is_deleted())
            .collect();
        tasks.sort_by(|a, b| b.status_at().cmp(&a.status_at()));
        tasks
    }

    /// What happened on the workday before the one containing `now`.
    pub fn activity_on_previous_workday(&self, now: Time) -> DayActivity<'_> {
        let date = self.calendar.previous_workday(now);
        let start = self.calendar.start_of_day(date);
        let end = self.calendar.end_of_day(date);
        let tasks = self
            .tasks
            .iter()
            .filter(|t| !t.is_deleted())
            .filter(|t| {
                let (_, at) = t.status_at();
                t.is_active() || (at >= start && at < end)
            })
            .collect();
        DayActivity { date, tasks }
    }

    fn index_of(&self, id: TaskId) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| LedgerError::TaskNotFound(id.to_string()))
    }
}
