//! Automatic accrual of working time.
//!
//! Elapsed working time is shared equally among the tasks active at each
//! instant: with `k` tasks active, each accrues at `1/k` of the working-time
//! rate. A task that became active later only shares from the instant it
//! joined, and never accrues before its own join instant.

use chrono::{Duration, TimeZone};
use est_calendar::BusinessCalendar;
use est_core::{Task, Time};
use tracing::debug;

/// Catch every active, non-deleted task in `tasks` up to `end`.
///
/// Tasks are processed in cohorts: all tasks sharing the lowest catch-up
/// instant advance together to the next distinct catch-up instant (or `end`),
/// splitting the working time of that interval evenly. Repeats until every
/// active task is caught up to `end`. No-op when nothing is active.
///
/// Integer division of a cohort's duration truncates to the nanosecond.
pub fn accrue<Tz: TimeZone>(calendar: &BusinessCalendar<Tz>, tasks: &mut [Task], end: Time) {
    // (index into tasks, catch-up instant), kept sorted ascending by instant.
    let mut active: Vec<(usize, Time)> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_active() && !t.is_deleted())
        .filter_map(|(i, t)| t.actual_updated_at().map(|at| (i, at)))
        .collect();
    if active.is_empty() {
        return;
    }
    active.sort_by_key(|&(_, at)| at);

    loop {
        let lowest = active[0].1;
        if lowest >= end {
            return;
        }

        let cohort = active.iter().take_while(|&&(_, at)| at == lowest).count();
        // Cohort members move to `next`, which never passes the following entry,
        // so `active` stays sorted.
        let next = active
            .get(cohort)
            .map(|&(_, at)| at)
            .unwrap_or(end)
            .min(end);

        let elapsed = calendar.duration_between(lowest, next);
        let share = elapsed / cohort as i32;
        debug!(
            cohort,
            %lowest,
            %next,
            elapsed_secs = elapsed.num_seconds(),
            "accruing shared working time"
        );

        for entry in active.iter_mut().take(cohort) {
            tasks[entry.0].accrue(share, next);
            entry.1 = next;
        }
    }
}

/// Total accrued time across `tasks`, for conservation checks.
pub fn total_actual<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Duration {
    tasks
        .into_iter()
        .fold(Duration::zero(), |acc, t| acc + t.actual())
}
