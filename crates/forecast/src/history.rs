//! Historical accuracy evidence and the synthetic prior that pads it.

use est_core::{AccuracyRatios, Task};
use rand::Rng;
use rand_distr::StandardNormal;

/// Below this many real ratios, forecasts are padded with synthetic ones.
pub const MIN_HISTORY: usize = 20;

/// How many synthetic ratios a fresh estfile is seeded with.
pub const SYNTHETIC_COUNT: usize = 20;

/// Mean of the synthetic prior: the average task takes 25% longer than
/// estimated.
const SYNTHETIC_MEAN: f64 = 0.8;

/// One standard deviation of the synthetic prior.
const SYNTHETIC_STD_DEV: f64 = 0.2;

/// Accuracy ratios of done, non-deleted tasks with non-zero actual time.
pub fn accuracy_history<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> AccuracyRatios {
    tasks
        .into_iter()
        .filter(|t| t.is_done() && !t.is_deleted() && !t.actual().is_zero())
        .map(Task::accuracy_ratio)
        .collect()
}

/// Copy `real` and top it up from `synthetic` until it holds
/// [`MIN_HISTORY`] ratios or `synthetic` runs out.
pub fn pad_with_synthetic(real: &[f64], synthetic: &[f64]) -> Vec<f64> {
    let missing = MIN_HISTORY.saturating_sub(real.len());
    real.iter()
        .chain(synthetic.iter().take(missing))
        .copied()
        .collect()
}

/// Draw `n` conservative synthetic ratios from a normal distribution with
/// mean 0.8 and standard deviation 0.2.
///
/// Non-positive draws are rejected and redrawn, since a ratio is divided
/// into an estimate.
pub fn synthetic_ratios<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<f64> {
    let mut ratios = Vec::with_capacity(n);
    while ratios.len() < n {
        let z: f64 = rng.sample(StandardNormal);
        let ratio = z * SYNTHETIC_STD_DEV + SYNTHETIC_MEAN;
        if ratio > 0.0 {
            ratios.push(ratio);
        }
    }
    ratios
}
