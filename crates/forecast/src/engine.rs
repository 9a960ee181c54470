//! Monte Carlo delivery forecast.

use chrono::{Local, TimeZone};
use est_calendar::{BusinessCalendar, CalendarError};
use est_core::duration::from_hours;
use est_core::Time;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::percentile::{percentile_table, PERCENTILES};
use crate::scatter::scatter_gather;

/// Number of simulation trials per forecast.
///
/// Tied to [`PERCENTILES`]: with 100 trials, one bucket is one trial, so
/// bucket `i` reads as "`i + 1` in 100".
pub const TRIALS: usize = PERCENTILES;

/// Forecast errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    /// No accuracy ratios to sample from
    #[error("no historical accuracy ratios to sample from")]
    NoHistoricalRatios,

    /// Too few samples for a percentile table
    #[error("percentile table needs at least {needed} samples, got {got}")]
    InsufficientSamples {
        /// Samples provided
        got: usize,
        /// Samples required
        needed: usize,
    },

    /// A percentile could not be placed on the calendar
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Result type for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Turns pending estimates plus accuracy history into delivery dates.
#[derive(Debug, Clone)]
pub struct ForecastEngine<Tz: TimeZone = Local> {
    calendar: BusinessCalendar<Tz>,
}

impl<Tz: TimeZone + Sync> ForecastEngine<Tz> {
    /// Create an engine placing dates on `calendar`.
    pub fn new(calendar: BusinessCalendar<Tz>) -> Self {
        Self { calendar }
    }

    /// Forecast when all `pending_hours` will be delivered, starting `now`.
    ///
    /// Runs [`TRIALS`] independent trials. Each trial divides every pending
    /// estimate by a ratio drawn with replacement from `ratios` and sums the
    /// results. Entry `i` of the returned array is the date by which `i + 1`
    /// percent of trials finished, except entry 0, which is the most
    /// optimistic trial.
    pub fn forecast<R: Rng + ?Sized>(
        &self,
        now: Time,
        ratios: &[f64],
        pending_hours: &[f64],
        rng: &mut R,
    ) -> Result<[Time; PERCENTILES]> {
        let samples = sample_distribution(rng, TRIALS, ratios, pending_hours)?;
        let table = percentile_table(&samples)?;
        debug!(
            trials = TRIALS,
            tasks = pending_hours.len(),
            ratios = ratios.len(),
            min_hours = table[0],
            max_hours = table[PERCENTILES - 1],
            "simulated delivery hours"
        );

        let dates = scatter_gather(&table, |&hours| {
            self.calendar.time_after(now, from_hours(hours))
        });

        let mut out = [now; PERCENTILES];
        for (slot, date) in out.iter_mut().zip(dates) {
            *slot = date?;
        }
        Ok(out)
    }
}

/// Run `trials` resampling trials and return their total hours, unsorted.
///
/// Each trial draws from its own generator, seeded from `rng` up front, so
/// the outcome for a given `rng` state doesn't depend on how trials are
/// scheduled across threads.
pub fn sample_distribution<R: Rng + ?Sized>(
    rng: &mut R,
    trials: usize,
    ratios: &[f64],
    pending_hours: &[f64],
) -> Result<Vec<f64>> {
    if ratios.is_empty() {
        return Err(ForecastError::NoHistoricalRatios);
    }
    let seeds: Vec<u64> = (0..trials).map(|_| rng.gen()).collect();
    Ok(scatter_gather(&seeds, |&seed| {
        let mut trial_rng = StdRng::seed_from_u64(seed);
        pending_hours
            .iter()
            .map(|estimate| estimate / ratios[trial_rng.gen_range(0..ratios.len())])
            .sum::<f64>()
    }))
}
