//! The persisted estfile document.

use est_core::Task;
use serde::{Deserialize, Serialize};

/// Schema version written by this build.
pub const ESTFILE_VERSION: u32 = 1;

/// Everything est persists: one user's task history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstFile {
    /// Schema version, for migrating old estfiles
    pub version: u32,

    /// All tasks, including deleted ones
    #[serde(default)]
    pub tasks: Vec<Task>,

    /// Synthetic accuracy ratios used to pad scarce history. Stored so
    /// forecasts are stable across runs.
    #[serde(default)]
    pub synthetic_ratios: Vec<f64>,
}

impl EstFile {
    /// An empty estfile seeded with `synthetic_ratios`.
    pub fn new(synthetic_ratios: Vec<f64>) -> Self {
        Self {
            version: ESTFILE_VERSION,
            tasks: Vec::new(),
            synthetic_ratios,
        }
    }
}
