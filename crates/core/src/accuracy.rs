//! Estimate accuracy observations.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::duration::serde_nanos;
use crate::Time;

/// An anonymous (estimated, actual) observation, e.g. from a done task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRatio {
    /// When the observation was made, e.g. the task's done date
    pub recorded_at: Time,

    /// The estimate this observation is about
    #[serde(with = "serde_nanos")]
    pub estimated: Duration,

    /// Estimated hours over actual hours
    pub ratio: f64,
}

/// An ordered collection of accuracy observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracyRatios(Vec<AccuracyRatio>);

impl AccuracyRatios {
    /// Wrap observations.
    pub fn new(ratios: Vec<AccuracyRatio>) -> Self {
        Self(ratios)
    }

    /// Sort in place by ascending observation time.
    pub fn sort_by_time(mut self) -> Self {
        self.0.sort_by_key(|r| r.recorded_at);
        self
    }

    /// The bare ratios, in order.
    pub fn ratios(&self) -> Vec<f64> {
        self.0.iter().map(|r| r.ratio).collect()
    }

    /// Observations strictly after `t`.
    pub fn after(&self, t: Time) -> Self {
        Self(self.0.iter().filter(|r| r.recorded_at > t).copied().collect())
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no observations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over observations.
    pub fn iter(&self) -> std::slice::Iter<'_, AccuracyRatio> {
        self.0.iter()
    }
}

impl FromIterator<AccuracyRatio> for AccuracyRatios {
    fn from_iter<I: IntoIterator<Item = AccuracyRatio>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AccuracyRatios {
    type Item = AccuracyRatio;
    type IntoIter = std::vec::IntoIter<AccuracyRatio>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ratio(day: u32, r: f64) -> AccuracyRatio {
        AccuracyRatio {
            recorded_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            estimated: Duration::hours(1),
            ratio: r,
        }
    }

    #[test]
    fn test_sort_and_filter() {
        let ratios: AccuracyRatios = vec![ratio(9, 0.9), ratio(2, 1.2), ratio(5, 0.5)]
            .into_iter()
            .collect();
        let sorted = ratios.sort_by_time();
        assert_eq!(sorted.ratios(), vec![1.2, 0.5, 0.9]);

        let cutoff = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let recent = sorted.after(cutoff);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent.ratios(), vec![0.9]);
    }
}
