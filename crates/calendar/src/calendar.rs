//! Business calendar over a weekly work schedule.

use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use est_core::{Time, WorkSchedule};
use thiserror::Error;
use tracing::debug;

/// How far past its start `time_after` will search.
pub const SEARCH_HORIZON_DAYS: i64 = 365 * 100;

/// Errors from calendar queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// `time_after` was asked to go backwards
    #[error("negative duration unsupported: {0}")]
    NegativeDuration(Duration),

    /// The requested working time is not reached within the search horizon
    #[error("{requested} of working time is not reached within {horizon_days} days")]
    OutOfRange {
        /// Requested working time
        requested: Duration,
        /// Search horizon
        horizon_days: i64,
    },
}

/// Business calendar: which instants count as working time.
///
/// Day boundaries and working windows are evaluated in the calendar's time
/// zone, which defaults to the process-local zone. Instants going in and
/// coming out are UTC.
#[derive(Debug, Clone)]
pub struct BusinessCalendar<Tz: TimeZone = Local> {
    schedule: WorkSchedule,
    tz: Tz,
}

impl BusinessCalendar<Local> {
    /// A calendar in the process-local time zone.
    pub fn new(schedule: WorkSchedule) -> Self {
        Self::with_timezone(schedule, Local)
    }
}

impl<Tz: TimeZone> BusinessCalendar<Tz> {
    /// A calendar evaluating days and windows in `tz`.
    pub fn with_timezone(schedule: WorkSchedule, tz: Tz) -> Self {
        Self { schedule, tz }
    }

    /// The underlying schedule.
    pub fn schedule(&self) -> &WorkSchedule {
        &self.schedule
    }

    /// The calendar's time zone.
    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Calendar date of `t` in the calendar's time zone.
    pub fn local_date(&self, t: Time) -> NaiveDate {
        t.with_timezone(&self.tz).date_naive()
    }

    /// Whether `date` is a workday.
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        self.schedule.is_workday(date.weekday())
    }

    /// Working windows on the calendar day containing `day`, in order.
    ///
    /// Empty when that day is not a workday.
    pub fn work_windows_on(&self, day: Time) -> Vec<(Time, Time)> {
        self.windows_on_date(self.local_date(day))
    }

    /// Working windows on `date`, in order. Empty on non-workdays.
    pub fn windows_on_date(&self, date: NaiveDate) -> Vec<(Time, Time)> {
        if !self.is_workday(date) {
            return Vec::new();
        }
        self.schedule
            .windows()
            .map(|(start, end)| (self.localize(date, start), self.localize(date, end)))
            .collect()
    }

    /// First instant of `date`.
    pub fn start_of_day(&self, date: NaiveDate) -> Time {
        self.localize(date, NaiveTime::MIN)
    }

    /// First instant of the day after `date`.
    pub fn end_of_day(&self, date: NaiveDate) -> Time {
        match date.succ_opt() {
            Some(next) => self.start_of_day(next),
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    /// The closest workday strictly before the day containing `t`.
    pub fn previous_workday(&self, t: Time) -> NaiveDate {
        let today = self.local_date(t);
        let mut date = today;
        // At least one weekday is a workday, so a week back always finds one.
        for _ in 0..7 {
            match date.pred_opt() {
                Some(prev) => date = prev,
                None => return today,
            }
            if self.is_workday(date) {
                return date;
            }
        }
        date
    }

    /// Working time between `a` and `b`, in either order.
    ///
    /// Walks calendar days from the earlier instant, adding the part of each
    /// working window that overlaps `[a, b)`. Cost is linear in the number of
    /// calendar days spanned.
    pub fn duration_between(&self, a: Time, b: Time) -> Duration {
        let (start, end) = if b < a { (b, a) } else { (a, b) };
        let last = self.local_date(end);
        let mut date = self.local_date(start);
        let mut total = Duration::zero();
        while date <= last {
            for (window_start, window_end) in self.windows_on_date(date) {
                let from = window_start.max(start);
                let to = window_end.min(end);
                if to > from {
                    total = total + (to - from);
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        total
    }

    /// The earliest instant `t >= start` with `duration_between(start, t) == d`.
    ///
    /// This is the inverse of [`duration_between`](Self::duration_between),
    /// found by bisection down to a one-nanosecond bracket. When `d` is used
    /// up exactly at the end of a working window, the result is that window's
    /// end, not some later instant in the non-working stretch after it. A
    /// zero duration returns `start`.
    pub fn time_after(&self, start: Time, d: Duration) -> Result<Time, CalendarError> {
        if d < Duration::zero() {
            return Err(CalendarError::NegativeDuration(d));
        }
        if d.is_zero() {
            return Ok(start);
        }

        let horizon = start + Duration::days(SEARCH_HORIZON_DAYS);
        let resolution = Duration::nanoseconds(1);

        // Invariant: duration_between(start, low) == covered < d, and
        // duration_between(start, high) >= d.
        let mut low = start;
        let mut covered = Duration::zero();

        // Grow the upper bound from one week, doubling, until it covers d.
        let mut span = Duration::weeks(1);
        let mut high = loop {
            let candidate = (start + span).min(horizon);
            let reached = covered + self.duration_between(low, candidate);
            if reached >= d {
                break candidate;
            }
            if candidate == horizon {
                return Err(CalendarError::OutOfRange {
                    requested: d,
                    horizon_days: SEARCH_HORIZON_DAYS,
                });
            }
            low = candidate;
            covered = reached;
            span = span * 2;
        };

        let mut steps = 0u32;
        while high - low > resolution {
            steps += 1;
            let mid = low + (high - low) / 2;
            let reached = covered + self.duration_between(low, mid);
            if reached >= d {
                high = mid;
            } else {
                low = mid;
                covered = reached;
            }
        }
        debug!(%start, %high, steps, "time_after converged");
        Ok(high)
    }

    fn localize(&self, date: NaiveDate, time: NaiveTime) -> Time {
        let naive = date.and_time(time);
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => t.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            // Skipped by a DST jump: the boundary moves to the jump itself.
            LocalResult::None => self.first_instant_at_or_after(naive),
        }
    }

    /// Earliest instant whose wall-clock time is at or after `naive`.
    ///
    /// Searches one day either side of `naive` read as UTC, which brackets
    /// every real-world offset, to one-second resolution.
    fn first_instant_at_or_after(&self, naive: NaiveDateTime) -> Time {
        let as_utc = Utc.from_utc_datetime(&naive);
        let mut low = as_utc - Duration::days(1);
        let mut high = as_utc + Duration::days(1);
        while (high - low).num_seconds() > 1 {
            let mid = low + Duration::seconds((high - low).num_seconds() / 2);
            if mid.with_timezone(&self.tz).naive_local() >= naive {
                high = mid;
            } else {
                low = mid;
            }
        }
        high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Weekday};
    use proptest::prelude::*;

    /// Mon-Fri, 9:00-12:00 and 13:00-17:00: seven working hours a day.
    fn calendar() -> BusinessCalendar<Utc> {
        let schedule = WorkSchedule::parse(
            [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            &["9:00am", "12:00pm", "1:00pm", "5:00pm"],
        )
        .unwrap();
        BusinessCalendar::with_timezone(schedule, Utc)
    }

    /// 2024-05-06 is a Monday.
    fn at(day: u32, hour: u32, minute: u32) -> Time {
        Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_windows_on_workday() {
        let windows = calendar().work_windows_on(at(6, 20, 0));
        assert_eq!(
            windows,
            vec![(at(6, 9, 0), at(6, 12, 0)), (at(6, 13, 0), at(6, 17, 0))]
        );
    }

    #[test]
    fn test_windows_on_weekend_empty() {
        assert!(calendar().work_windows_on(at(4, 10, 0)).is_empty());
        assert!(calendar().work_windows_on(at(5, 10, 0)).is_empty());
    }

    #[test]
    fn test_same_non_workday_is_zero() {
        assert_eq!(
            calendar().duration_between(at(4, 14, 0), at(4, 15, 0)),
            Duration::zero()
        );
    }

    #[test]
    fn test_reversed_instants_are_swapped() {
        assert_eq!(
            calendar().duration_between(at(3, 15, 0), at(3, 14, 0)),
            Duration::hours(1)
        );
    }

    #[test]
    fn test_start_before_business_hours() {
        assert_eq!(
            calendar().duration_between(at(3, 7, 30), at(3, 10, 0)),
            Duration::hours(1)
        );
    }

    #[test]
    fn test_lunch_break_excluded() {
        assert_eq!(
            calendar().duration_between(at(6, 11, 0), at(6, 14, 0)),
            Duration::hours(2)
        );
        assert_eq!(
            calendar().duration_between(at(6, 12, 15), at(6, 12, 45)),
            Duration::zero()
        );
    }

    #[test]
    fn test_spans_weekend() {
        // Friday 16:00 to Monday 10:00: one hour each side of the weekend.
        assert_eq!(
            calendar().duration_between(at(3, 16, 0), at(6, 10, 0)),
            Duration::hours(2)
        );
    }

    #[test]
    fn test_full_days() {
        assert_eq!(
            calendar().duration_between(at(6, 9, 0), at(8, 9, 0)),
            Duration::hours(14)
        );
        assert_eq!(
            calendar().duration_between(at(6, 0, 0), at(13, 0, 0)),
            Duration::hours(35)
        );
    }

    #[test]
    fn test_time_after_within_day() {
        let t = calendar().time_after(at(6, 9, 0), Duration::hours(2)).unwrap();
        assert_eq!(t, at(6, 11, 0));
    }

    #[test]
    fn test_time_after_crosses_weekend() {
        let start = at(3, 16, 0);
        let t = calendar().time_after(start, Duration::hours(3)).unwrap();
        // One hour on Friday, then two on Monday morning.
        assert_eq!(t, at(6, 11, 0));
    }

    #[test]
    fn test_time_after_ending_at_close_of_business() {
        let cal = calendar();
        assert_eq!(cal.time_after(at(6, 9, 0), Duration::hours(7)), Ok(at(6, 17, 0)));
        // Morning block used up exactly: lunch is not part of the answer.
        assert_eq!(cal.time_after(at(6, 9, 0), Duration::hours(3)), Ok(at(6, 12, 0)));
        // Friday's last hour ends the week, not Monday morning.
        assert_eq!(cal.time_after(at(3, 16, 0), Duration::hours(1)), Ok(at(3, 17, 0)));
        assert_eq!(cal.time_after(at(6, 9, 0), Duration::hours(14)), Ok(at(7, 17, 0)));
    }

    #[test]
    fn test_time_after_from_non_working_time() {
        // Saturday evening: the first hour of work is Monday 9-10.
        assert_eq!(
            calendar().time_after(at(4, 20, 0), Duration::hours(1)),
            Ok(at(6, 10, 0))
        );
    }

    #[test]
    fn test_time_after_zero_is_start() {
        let start = at(4, 10, 0);
        assert_eq!(calendar().time_after(start, Duration::zero()), Ok(start));
    }

    #[test]
    fn test_time_after_rejects_negative() {
        assert_eq!(
            calendar().time_after(at(6, 9, 0), Duration::hours(-1)),
            Err(CalendarError::NegativeDuration(Duration::hours(-1)))
        );
    }

    #[test]
    fn test_time_after_out_of_range() {
        let err = calendar()
            .time_after(at(6, 9, 0), Duration::hours(7 * 5 * 53 * 101))
            .unwrap_err();
        assert!(matches!(err, CalendarError::OutOfRange { .. }));
    }

    #[test]
    fn test_previous_workday_skips_weekend() {
        let cal = calendar();
        assert_eq!(cal.previous_workday(at(6, 10, 0)), at(3, 0, 0).date_naive());
        assert_eq!(cal.previous_workday(at(7, 10, 0)), at(6, 0, 0).date_naive());
        assert_eq!(cal.previous_workday(at(5, 10, 0)), at(3, 0, 0).date_naive());
    }

    #[test]
    fn test_day_bounds() {
        let cal = calendar();
        let date = at(6, 0, 0).date_naive();
        assert_eq!(cal.start_of_day(date), at(6, 0, 0));
        assert_eq!(cal.end_of_day(date), at(7, 0, 0));
    }

    #[test]
    fn test_fixed_offset_zone() {
        // In UTC+02:00, 07:00Z-10:00Z is 09:00-12:00 local.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let cal = BusinessCalendar::with_timezone(calendar().schedule().clone(), tz);
        assert_eq!(
            cal.duration_between(at(6, 7, 0), at(6, 10, 0)),
            Duration::hours(3)
        );
    }

    /// Central European offsets around one switch: spring forward on
    /// 2024-03-31 (02:00 -> 03:00) or fall back on 2024-10-27 (03:00 -> 02:00).
    #[derive(Debug, Clone, Copy)]
    struct CentralEurope<const SPRING: bool>;

    impl<const SPRING: bool> CentralEurope<SPRING> {
        fn switch() -> NaiveDateTime {
            let (month, day) = if SPRING { (3, 31) } else { (10, 27) };
            NaiveDate::from_ymd_opt(2024, month, day)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
        }

        fn offsets() -> (FixedOffset, FixedOffset) {
            let winter = FixedOffset::east_opt(3600).unwrap();
            let summer = FixedOffset::east_opt(2 * 3600).unwrap();
            if SPRING {
                (winter, summer)
            } else {
                (summer, winter)
            }
        }
    }

    impl<const SPRING: bool> TimeZone for CentralEurope<SPRING> {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            Self
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let (before, after) = Self::offsets();
            let switch = Self::switch();
            let valid_before = *local - Duration::seconds(before.local_minus_utc().into()) < switch;
            let valid_after = *local - Duration::seconds(after.local_minus_utc().into()) >= switch;
            match (valid_before, valid_after) {
                (true, true) => LocalResult::Ambiguous(before, after),
                (true, false) => LocalResult::Single(before),
                (false, true) => LocalResult::Single(after),
                (false, false) => LocalResult::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            let (before, after) = Self::offsets();
            if *utc < Self::switch() {
                before
            } else {
                after
            }
        }
    }

    /// Every day, 2:30-4:00am local: straddles both switches.
    fn small_hours<Tz: TimeZone>(tz: Tz) -> BusinessCalendar<Tz> {
        let schedule = WorkSchedule::parse(
            [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
            &["2:30am", "4:00am"],
        )
        .unwrap();
        BusinessCalendar::with_timezone(schedule, tz)
    }

    fn utc(month: u32, day: u32, hour: u32, minute: u32) -> Time {
        Utc.with_ymd_and_hms(2024, month, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_window_start_in_dst_gap_moves_to_jump() {
        let cal = small_hours(CentralEurope::<true>);
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        // 2:30 doesn't exist; the window opens when clocks jump to 3:00 CEST.
        assert_eq!(cal.windows_on_date(date), vec![(utc(3, 31, 1, 0), utc(3, 31, 2, 0))]);
        assert_eq!(
            cal.duration_between(utc(3, 31, 0, 0), utc(3, 31, 3, 0)),
            Duration::hours(1)
        );
    }

    #[test]
    fn test_repeated_wall_time_uses_earliest() {
        let cal = small_hours(CentralEurope::<false>);
        let date = NaiveDate::from_ymd_opt(2024, 10, 27).unwrap();
        // 2:30 happens twice; the first one (CEST) opens the window.
        assert_eq!(cal.windows_on_date(date), vec![(utc(10, 27, 0, 30), utc(10, 27, 3, 0))]);
    }

    fn instant() -> impl Strategy<Value = Time> {
        // 2020-01-01 to 2030-01-01
        (1_577_836_800i64..1_893_456_000i64)
            .prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_order_independent(a in instant(), b in instant()) {
            let cal = calendar();
            prop_assert_eq!(cal.duration_between(a, b), cal.duration_between(b, a));
        }

        #[test]
        fn prop_never_exceeds_wall_time(a in instant(), b in instant()) {
            let d = calendar().duration_between(a, b);
            prop_assert!(d >= Duration::zero());
            prop_assert!(d <= (b - a).abs());
        }

        #[test]
        fn prop_additive(a in instant(), b in instant(), c in instant()) {
            let mut v = [a, b, c];
            v.sort();
            let cal = calendar();
            prop_assert_eq!(
                cal.duration_between(v[0], v[2]),
                cal.duration_between(v[0], v[1]) + cal.duration_between(v[1], v[2])
            );
        }

        #[test]
        fn prop_time_after_inverts_duration_between(
            start in instant(),
            minutes in 0i64..(2000 * 60),
        ) {
            let cal = calendar();
            let d = Duration::minutes(minutes);
            let t = cal.time_after(start, d).unwrap();
            prop_assert!(t >= start);
            prop_assert_eq!(cal.duration_between(start, t), d);
            if minutes > 0 {
                // Earliest such instant: a minute earlier falls short.
                prop_assert!(cal.duration_between(start, t - Duration::minutes(1)) < d);
            }
        }

        #[test]
        fn prop_time_after_lands_on_window_end(start in instant(), days in 0i64..30) {
            let cal = calendar();
            let date = start.date_naive() + Duration::days(days);
            let close = Utc.from_utc_datetime(&date.and_hms_opt(17, 0, 0).unwrap());
            let d = cal.duration_between(start, close);
            prop_assume!(cal.is_workday(date) && close > start && d > Duration::zero());
            prop_assert_eq!(cal.time_after(start, d), Ok(close));
        }
    }
}
