//! Percentile table construction.

use crate::engine::{ForecastError, Result};

/// Number of buckets in a percentile table.
pub const PERCENTILES: usize = 100;

/// Build a percentile table from at least [`PERCENTILES`] unsorted samples.
///
/// `table[i]` is the largest sample such that at most `i + 1` percent of
/// samples rank at or below it. Buckets are filled from the top down by
/// scanning the sorted samples from largest to smallest. `table[0]` is then
/// forced to the smallest sample, so the first and last entries span the
/// full range of outcomes.
pub fn percentile_table(samples: &[f64]) -> Result<[f64; PERCENTILES]> {
    let n = samples.len();
    if n < PERCENTILES {
        return Err(ForecastError::InsufficientSamples {
            got: n,
            needed: PERCENTILES,
        });
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut table = [0.0; PERCENTILES];
    // Buckets `next..PERCENTILES` are filled.
    let mut next = PERCENTILES;
    for (i, &value) in sorted.iter().enumerate().rev() {
        if next == 0 {
            break;
        }
        if PERCENTILES * i / n < next {
            next -= 1;
            table[next] = value;
        }
    }
    assert_eq!(next, 0, "percentile table left {} buckets unfilled", next);

    table[0] = sorted[0];
    Ok(table)
}
