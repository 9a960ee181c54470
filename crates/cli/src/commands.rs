//! Command execution against a loaded ledger.

use std::fmt::Display;
use std::io::Write;

use anyhow::{bail, Result};
use chrono::{Duration, TimeZone};
use clap::Subcommand;
use est_core::{TaskId, Time};
use est_forecast::{accuracy_history, pad_with_synthetic, ForecastEngine};
use est_ledger::TaskLedger;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::duration::{parse_duration, parse_estimate};
use crate::render;

/// Days of history shown by `howamidoing`.
pub const ACCURACY_WINDOW_DAYS: i64 = 90;

/// est subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a task; the name is every non-flag argument joined by spaces
    #[command(alias = "a")]
    Add {
        /// Task name
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
        /// Estimate, e.g. "30m", "3.5h", "2d" or "0.75w"
        #[arg(short, long)]
        estimate: Option<String>,
        /// Start the new task immediately (requires --estimate)
        #[arg(short, long)]
        start: bool,
        /// Log time worked on the new task (requires --start)
        #[arg(short, long)]
        log: Option<String>,
        /// Leave other started tasks running
        #[arg(long)]
        multiple: bool,
    },
    /// Set the estimate of a task that was never started
    #[command(alias = "e")]
    Estimate {
        /// Task ID, or a prefix or suffix of one
        id: String,
        /// Estimate, e.g. "30m", "3.5h", "2d" or "0.75w"
        estimate: String,
    },
    /// Start a task, pausing the task in progress
    #[command(alias = "s")]
    Start {
        /// Task ID, or a prefix or suffix of one
        id: String,
        /// Leave other started tasks running
        #[arg(long)]
        multiple: bool,
        /// Start as of this long ago, e.g. "20m"
        #[arg(short, long, conflicts_with = "log")]
        ago: Option<String>,
        /// Log time worked on the task
        #[arg(short, long)]
        log: Option<String>,
    },
    /// Pause a started task
    #[command(alias = "p")]
    Pause {
        /// Task ID, or a prefix or suffix of one
        id: String,
        /// Pause as of this long ago, e.g. "20m"
        #[arg(short, long)]
        ago: Option<String>,
    },
    /// Mark a started or paused task done
    #[command(alias = "d")]
    Done {
        /// Task ID, or a prefix or suffix of one
        id: String,
        /// Log time worked on the task
        #[arg(short, long, conflicts_with = "ago")]
        log: Option<String>,
        /// Mark done as of this long ago, e.g. "20m"
        #[arg(short, long)]
        ago: Option<String>,
    },
    /// Log time worked on a task, in lieu of automatic time tracking
    #[command(alias = "l")]
    Log {
        /// Task ID, or a prefix or suffix of one
        id: String,
        /// Time worked, e.g. "45m" or "1.5h"
        duration: String,
    },
    /// Delete a task
    Rm {
        /// Task ID, or a prefix or suffix of one
        id: String,
    },
    /// Restore a deleted task
    Undelete {
        /// Task ID, or a prefix or suffix of one
        id: String,
    },
    /// List tasks
    Ls {
        /// Include deleted tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Show a probabilistic delivery schedule for estimated, unstarted tasks
    #[command(alias = "c")]
    Schedule,
    /// Show task activity on the previous workday
    #[command(alias = "y")]
    Yesterday {
        /// Look back from this long ago, e.g. "48h"
        #[arg(short, long)]
        ago: Option<String>,
    },
    /// Show the accuracy of recent estimates
    #[command(alias = "h")]
    Howamidoing,
}

impl Commands {
    /// Whether this command changes the estfile.
    pub fn mutates(&self) -> bool {
        !matches!(
            self,
            Commands::Ls { .. }
                | Commands::Schedule
                | Commands::Yesterday { .. }
                | Commands::Howamidoing
        )
    }
}

fn shift_back(now: Time, ago: Option<&str>) -> Result<Time> {
    match ago {
        Some(s) => Ok(now - parse_duration(s, "duration ago")?),
        None => Ok(now),
    }
}

fn start_task<Tz: TimeZone>(
    ledger: &mut TaskLedger<Tz>,
    id: TaskId,
    multiple: bool,
    now: Time,
) -> Result<()> {
    if multiple {
        ledger.start(id, now)?;
    } else {
        ledger.start_exclusive(id, now)?;
    }
    Ok(())
}

fn log_time<Tz: TimeZone>(
    ledger: &mut TaskLedger<Tz>,
    id: TaskId,
    log: Option<&str>,
    now: Time,
) -> Result<()> {
    if let Some(s) = log {
        let d = parse_duration(s, "log duration")?;
        ledger.log_manual(id, d, now)?;
    }
    Ok(())
}

/// Run `command` against `ledger`, writing output to `out`.
///
/// `synthetic` pads scarce accuracy history for `schedule`. A failed command
/// may leave `ledger` partly modified; callers persist only on success.
pub fn execute<Tz, W>(
    command: Commands,
    ledger: &mut TaskLedger<Tz>,
    synthetic: &[f64],
    now: Time,
    out: &mut W,
) -> Result<()>
where
    Tz: TimeZone + Sync,
    Tz::Offset: Display,
    W: Write,
{
    let tz = ledger.calendar().timezone().clone();
    let touched = match command {
        Commands::Add {
            name,
            estimate,
            start,
            log,
            multiple,
        } => {
            let estimate = estimate.as_deref().map(parse_estimate).transpose()?;
            if start && estimate.is_none() {
                bail!("cannot start new task because no estimate was given");
            }
            if log.is_some() && !start {
                bail!("cannot log time on a new task unless it is started with --start");
            }
            let id = ledger.add(&name.join(" "), now)?;
            if let Some(d) = estimate {
                ledger.estimate(id, d, now)?;
            }
            if start {
                start_task(ledger, id, multiple, now)?;
            }
            log_time(ledger, id, log.as_deref(), now)?;
            Some(id)
        }
        Commands::Estimate { id, estimate } => {
            let d = parse_estimate(&estimate)?;
            let id = ledger.find_by_reference(&id)?;
            ledger.estimate(id, d, now)?;
            Some(id)
        }
        Commands::Start {
            id,
            multiple,
            ago: since,
            log,
        } => {
            let now = shift_back(now, since.as_deref())?;
            let id = ledger.find_by_reference(&id)?;
            start_task(ledger, id, multiple, now)?;
            log_time(ledger, id, log.as_deref(), now)?;
            Some(id)
        }
        Commands::Pause { id, ago: since } => {
            let now = shift_back(now, since.as_deref())?;
            let id = ledger.find_by_reference(&id)?;
            ledger.pause(id, now)?;
            Some(id)
        }
        Commands::Done {
            id,
            log,
            ago: since,
        } => {
            let now = shift_back(now, since.as_deref())?;
            let id = ledger.find_by_reference(&id)?;
            // Complete first so accrual runs up to `now` before the log moves
            // the catch-up instant.
            ledger.complete(id, now)?;
            log_time(ledger, id, log.as_deref(), now)?;
            Some(id)
        }
        Commands::Log { id, duration } => {
            let id = ledger.find_by_reference(&id)?;
            log_time(ledger, id, Some(&duration), now)?;
            Some(id)
        }
        Commands::Rm { id } => {
            let id = ledger.find_by_reference(&id)?;
            ledger.delete(id, now)?;
            Some(id)
        }
        Commands::Undelete { id } => {
            let id = ledger.find_by_reference(&id)?;
            ledger.undelete(id)?;
            Some(id)
        }
        Commands::Ls { all } => {
            write!(out, "{}", render::task_table(&ledger.listing(all), &tz))?;
            None
        }
        Commands::Schedule => {
            let pending = ledger.pending();
            if pending.is_empty() {
                writeln!(out, "No estimated, unstarted tasks to schedule.")?;
                return Ok(());
            }
            let hours: Vec<f64> = pending.iter().map(|t| t.estimated_hours()).collect();
            let history = accuracy_history(ledger.tasks()).sort_by_time();
            let ratios = pad_with_synthetic(&history.ratios(), synthetic);
            debug!(
                real = history.len(),
                padded = ratios.len(),
                tasks = hours.len(),
                "forecasting schedule"
            );

            let engine = ForecastEngine::new(ledger.calendar().clone());
            let mut rng = StdRng::from_entropy();
            let dates = engine.forecast(now, &ratios, &hours, &mut rng)?;
            write!(out, "{}", render::delivery_schedule(&dates, &tz))?;
            None
        }
        Commands::Yesterday { ago: since } => {
            let now = shift_back(now, since.as_deref())?;
            let activity = ledger.activity_on_previous_workday(now);
            write!(out, "{}", render::day_activity(&activity, &tz))?;
            None
        }
        Commands::Howamidoing => {
            let since = now - Duration::days(ACCURACY_WINDOW_DAYS);
            let recent = accuracy_history(ledger.tasks())
                .after(since)
                .sort_by_time();
            write!(
                out,
                "{}",
                render::accuracy_report(&recent, ACCURACY_WINDOW_DAYS, &tz)
            )?;
            None
        }
    };

    if let Some(id) = touched {
        write!(out, "{}", render::task_table(&[ledger.get(id)?], &tz))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Utc, Weekday};
    use est_calendar::BusinessCalendar;
    use est_core::{TaskStatus, WorkSchedule};

    fn ledger() -> TaskLedger<Utc> {
        let schedule = WorkSchedule::parse(
            [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            &["9:00am", "12:00pm", "1:00pm", "5:00pm"],
        )
        .unwrap();
        TaskLedger::new(BusinessCalendar::with_timezone(schedule, Utc), Vec::new())
    }

    /// 2024-05-06 is a Monday.
    fn at(day: u32, hour: u32, minute: u32) -> Time {
        Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
    }

    fn run(ledger: &mut TaskLedger<Utc>, command: Commands, now: Time) -> Result<String> {
        let mut out = Vec::new();
        execute(command, ledger, &[0.8; 20], now, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn add(name: &str, estimate: Option<&str>, start: bool) -> Commands {
        Commands::Add {
            name: name.split(' ').map(String::from).collect(),
            estimate: estimate.map(String::from),
            start,
            log: None,
            multiple: false,
        }
    }

    #[test]
    fn test_add_and_start() {
        let mut ledger = ledger();
        let out = run(&mut ledger, add("fix the bug", Some("0.5d"), true), at(6, 9, 0)).unwrap();
        assert!(out.contains("fix the bug"));

        let task = &ledger.tasks()[0];
        assert_eq!(task.name(), "fix the bug");
        assert_eq!(task.estimated(), Duration::hours(4));
        assert!(task.is_active());
    }

    #[test]
    fn test_add_start_requires_estimate() {
        let mut ledger = ledger();
        let err = run(&mut ledger, add("bare", None, true), at(6, 9, 0)).unwrap_err();
        assert!(err.to_string().contains("no estimate"));
        assert!(ledger.tasks().is_empty());
    }

    #[test]
    fn test_start_pauses_task_in_progress() {
        let mut ledger = ledger();
        run(&mut ledger, add("first", Some("2h"), true), at(6, 9, 0)).unwrap();
        run(&mut ledger, add("second", Some("2h"), false), at(6, 9, 0)).unwrap();
        let second = ledger.tasks()[1].id.short();

        run(
            &mut ledger,
            Commands::Start {
                id: second,
                multiple: false,
                ago: Some("30m".to_string()),
                log: None,
            },
            at(6, 11, 0),
        )
        .unwrap();

        let first = &ledger.tasks()[0];
        assert!(first.is_paused());
        assert_eq!(first.actual(), Duration::minutes(90));
        assert_eq!(first.paused_at(), Some(at(6, 10, 30)));
        assert!(ledger.tasks()[1].is_active());
    }

    #[test]
    fn test_done_with_log() {
        let mut ledger = ledger();
        run(&mut ledger, add("report", Some("3h"), true), at(6, 9, 0)).unwrap();
        let id = ledger.tasks()[0].id.to_string();

        run(
            &mut ledger,
            Commands::Done {
                id,
                log: Some("1h".to_string()),
                ago: None,
            },
            at(6, 11, 0),
        )
        .unwrap();

        let task = &ledger.tasks()[0];
        assert_eq!(task.status(), TaskStatus::Done);
        assert_eq!(task.actual(), Duration::hours(3));
    }

    #[test]
    fn test_unknown_reference() {
        let mut ledger = ledger();
        let err = run(&mut ledger, Commands::Rm { id: "zzzz".to_string() }, at(6, 9, 0))
            .unwrap_err();
        assert!(err.to_string().contains("no task with ID 'zzzz'"));
    }

    #[test]
    fn test_ls_hides_deleted() {
        let mut ledger = ledger();
        run(&mut ledger, add("keep", None, false), at(6, 9, 0)).unwrap();
        run(&mut ledger, add("drop", None, false), at(6, 9, 0)).unwrap();
        let drop = ledger.tasks()[1].id.short();
        run(&mut ledger, Commands::Rm { id: drop }, at(6, 9, 0)).unwrap();

        let out = run(&mut ledger, Commands::Ls { all: false }, at(6, 10, 0)).unwrap();
        assert!(out.contains("keep"));
        assert!(!out.contains("drop"));

        let out = run(&mut ledger, Commands::Ls { all: true }, at(6, 10, 0)).unwrap();
        assert!(out.contains("deleted on 5/6"));
    }

    #[test]
    fn test_schedule_prints_sparse_table() {
        let mut ledger = ledger();
        run(&mut ledger, add("a", Some("4h"), false), at(6, 9, 0)).unwrap();
        run(&mut ledger, add("b", Some("1d"), false), at(6, 9, 0)).unwrap();

        let out = run(&mut ledger, Commands::Schedule, at(6, 9, 0)).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 21);
        assert!(lines[0].starts_with("  0% May"));
        assert!(lines[20].starts_with(" 99% May"));
    }

    #[test]
    fn test_schedule_with_nothing_pending() {
        let mut ledger = ledger();
        let out = run(&mut ledger, Commands::Schedule, at(6, 9, 0)).unwrap();
        assert_eq!(out, "No estimated, unstarted tasks to schedule.\n");
    }

    #[test]
    fn test_mutates() {
        assert!(add("a", None, false).mutates());
        assert!(Commands::Rm { id: "a".into() }.mutates());
        assert!(!Commands::Schedule.mutates());
        assert!(!Commands::Ls { all: false }.mutates());
    }
}
