//! Plain-text rendering for terminal output.

use std::fmt::Display;

use chrono::{Duration, TimeZone};
use est_core::duration::as_hours;
use est_core::{AccuracyRatios, Task, TaskStatus, Time};
use est_forecast::PERCENTILES;
use est_ledger::DayActivity;

const STATUS_WIDTH: usize = 22;

fn local<Tz>(t: Time, tz: &Tz) -> chrono::DateTime<Tz>
where
    Tz: TimeZone,
{
    t.with_timezone(tz)
}

/// Month/day of `t` in `tz`, e.g. `5/6`.
fn month_day<Tz>(t: Time, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    local(t, tz).format("%-m/%-d").to_string()
}

/// A duration at a readable magnitude: `45.0s`, `12.5m` or `3.2h`.
pub fn short_duration(d: Duration) -> String {
    if d < Duration::minutes(1) {
        format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0)
    } else if d < Duration::hours(1) {
        format!("{:.1}m", as_hours(d) * 60.0)
    } else {
        format!("{:.1}h", as_hours(d))
    }
}

fn status_text<Tz>(task: &Task, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (status, at) = task.status_at();
    let day = month_day(at, tz);
    match status {
        TaskStatus::Done => format!("done in {} on {}", short_duration(task.actual()), day),
        other => format!("{} on {}", other.as_str(), day),
    }
}

/// Column headers matching [`task_line`].
pub fn task_header() -> String {
    format!(
        "{:<width$}  {:>8}  {:<6}  {}",
        "STATUS",
        "ESTIMATE",
        "ID",
        "NAME",
        width = STATUS_WIDTH
    )
}

/// One task per line: status, estimate, short ID, name.
pub fn task_line<Tz>(task: &Task, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{:<width$}  {:>7.1}h  {:<6}  {}",
        status_text(task, tz),
        task.estimated_hours(),
        task.id.short(),
        task.name(),
        width = STATUS_WIDTH
    )
}

/// Header plus one line per task.
pub fn task_table<Tz>(tasks: &[&Task], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = task_header();
    out.push('\n');
    for task in tasks {
        out.push_str(&task_line(task, tz));
        out.push('\n');
    }
    out
}

/// Sparse delivery schedule: 0%, then every fifth percentile up to 95%,
/// then 99%.
pub fn delivery_schedule<Tz>(dates: &[Time; PERCENTILES], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = format!("{:>3}% {}\n", 0, local(dates[0], tz).format("%b %-d"));
    for i in 1..=20 {
        let bucket = i * 5 - 1;
        let pct = if i == 20 { 99 } else { i * 5 };
        out.push_str(&format!("{:>3}% {}\n", pct, local(dates[bucket], tz).format("%b %-d")));
    }
    out
}

/// Tasks touched on the previous workday.
pub fn day_activity<Tz>(activity: &DayActivity<'_>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = format!("Activity on {}\n", activity.date.format("%A, %B %-d, %Y"));
    if activity.tasks.is_empty() {
        out.push_str("No task activity.\n");
        return out;
    }
    out.push_str(&task_table(&activity.tasks, tz));
    out
}

/// Accuracy history, oldest first, with a median summary.
pub fn accuracy_report<Tz>(ratios: &AccuracyRatios, days: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if ratios.is_empty() {
        return format!("No done tasks in the last {} days.\n", days);
    }

    let mut out = format!(
        "{:<6}  {:>8}  {:>6}  {}\n",
        "DONE", "ESTIMATE", "RATIO", "ACTUAL/ESTIMATE"
    );
    for r in ratios.iter() {
        out.push_str(&format!(
            "{:<6}  {:>7.1}h  {:>6.2}  {:.2}x\n",
            month_day(r.recorded_at, tz),
            as_hours(r.estimated),
            r.ratio,
            1.0 / r.ratio
        ));
    }

    let mut sorted = ratios.ratios();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = if sorted.len() % 2 == 1 {
        sorted[sorted.len() / 2]
    } else {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    };
    out.push_str(&format!(
        "{} tasks in the last {} days, median ratio {:.2}\n",
        ratios.len(),
        days,
        median
    ));
    out
}
