//! Task ledger (Layer 2)
//!
//! Lifecycle transitions for a collection of tasks, with automatic accrual of
//! working time shared between concurrently active tasks.

#![warn(missing_docs)]

pub mod accrual;
pub mod ledger;

pub use accrual::accrue;
pub use ledger::{DayActivity, LedgerError, Result, TaskLedger};
