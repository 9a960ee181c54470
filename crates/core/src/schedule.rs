//! Work schedule - which weekdays and which clock times count as working time.

use chrono::{Duration, NaiveTime, Timelike, Weekday};
use thiserror::Error;

/// Errors raised while building a [`WorkSchedule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// No working-time boundaries were given
    #[error("work hours was empty and must be non-zero even length and monotonically increasing")]
    Empty,

    /// Boundaries must pair up into (start, end) windows
    #[error("work hours was odd length ({0}) and must be non-zero even length and monotonically increasing")]
    OddLength(usize),

    /// Boundaries must be strictly increasing
    #[error("work hours must be monotonically increasing, work hour {index} ({previous}) was not before the following one ({next})")]
    NotIncreasing {
        /// Index of the earlier boundary
        index: usize,
        /// The earlier boundary
        previous: NaiveTime,
        /// The boundary that failed to follow it
        next: NaiveTime,
    },

    /// Boundaries have minute resolution
    #[error("work hour {0} has sub-minute precision; boundaries are whole minutes")]
    SubMinute(NaiveTime),

    /// At least one weekday must be a workday
    #[error("work schedule has no workdays")]
    NoWorkdays,

    /// A boundary could not be parsed
    #[error("invalid work hour '{0}', expected e.g. \"9:30am\" or \"5:00pm\"")]
    InvalidTime(String),
}

/// The weekly working pattern used for business-time arithmetic.
///
/// Immutable after construction. Boundaries are local wall-clock times of day
/// `[s1, e1, s2, e2, ...]`; each `(s, e)` pair is a working window applied to
/// every workday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSchedule {
    workdays: [bool; 7],
    boundaries: Vec<NaiveTime>,
}

impl WorkSchedule {
    /// Build a schedule, validating the boundaries.
    pub fn new(
        workdays: impl IntoIterator<Item = Weekday>,
        boundaries: Vec<NaiveTime>,
    ) -> Result<Self, ScheduleError> {
        let mut days = [false; 7];
        for day in workdays {
            days[day.num_days_from_monday() as usize] = true;
        }
        if !days.iter().any(|d| *d) {
            return Err(ScheduleError::NoWorkdays);
        }
        if boundaries.is_empty() {
            return Err(ScheduleError::Empty);
        }
        if boundaries.len() % 2 == 1 {
            return Err(ScheduleError::OddLength(boundaries.len()));
        }
        if let Some(t) = boundaries.iter().find(|t| t.second() != 0 || t.nanosecond() != 0) {
            return Err(ScheduleError::SubMinute(*t));
        }
        for (index, pair) in boundaries.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(ScheduleError::NotIncreasing {
                    index,
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }

        Ok(Self {
            workdays: days,
            boundaries,
        })
    }

    /// Build a schedule from boundary strings such as `"9:30am"`.
    pub fn parse(
        workdays: impl IntoIterator<Item = Weekday>,
        boundaries: &[impl AsRef<str>],
    ) -> Result<Self, ScheduleError> {
        let times = boundaries
            .iter()
            .map(|s| parse_clock_time(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(workdays, times)
    }

    /// Monday to Friday, 9:30am-12:00pm and 12:30pm-5:30pm.
    pub fn standard() -> Self {
        Self {
            workdays: [true, true, true, true, true, false, false],
            boundaries: vec![
                hm(9, 30),
                hm(12, 0),
                hm(12, 30),
                hm(17, 30),
            ],
        }
    }

    /// Whether `day` is a workday.
    pub fn is_workday(&self, day: Weekday) -> bool {
        self.workdays[day.num_days_from_monday() as usize]
    }

    /// Workdays in Monday-first order.
    pub fn workdays(&self) -> Vec<Weekday> {
        const ALL: [Weekday; 7] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        ALL.into_iter().filter(|d| self.is_workday(*d)).collect()
    }

    /// Raw boundaries.
    pub fn boundaries(&self) -> &[NaiveTime] {
        &self.boundaries
    }

    /// Working windows as `(start, end)` pairs in time-of-day order.
    pub fn windows(&self) -> impl Iterator<Item = (NaiveTime, NaiveTime)> + '_ {
        self.boundaries.chunks_exact(2).map(|w| (w[0], w[1]))
    }

    /// Working time in one full workday.
    pub fn daily_duration(&self) -> Duration {
        self.windows()
            .map(|(start, end)| end - start)
            .fold(Duration::zero(), |acc, d| acc + d)
    }
}

/// Parse a clock time such as `"9:30am"`, `"12:00PM"` or `"5:00 pm"`.
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, ScheduleError> {
    let normalized: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    NaiveTime::parse_from_str(&normalized, "%I:%M%p")
        .map_err(|_| ScheduleError::InvalidTime(s.to_string()))
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
