//! Evidence-based delivery forecasting (Layer 3)
//!
//! Resamples historical estimate accuracy to turn a list of pending
//! estimates into a distribution of delivery dates.

#![warn(missing_docs)]

pub mod engine;
pub mod history;
pub mod percentile;
pub mod scatter;

pub use engine::{ForecastEngine, ForecastError, Result, TRIALS};
pub use history::{accuracy_history, pad_with_synthetic, synthetic_ratios, MIN_HISTORY, SYNTHETIC_COUNT};
pub use percentile::{percentile_table, PERCENTILES};
pub use scatter::scatter_gather;
