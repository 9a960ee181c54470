//! Business-time arithmetic.
//!
//! [`BusinessCalendar`] answers two questions about a [`WorkSchedule`]:
//! how much working time elapsed between two instants, and which instant
//! lies a given amount of working time after another.

#![warn(missing_docs)]

mod calendar;

pub use calendar::{BusinessCalendar, CalendarError, SEARCH_HORIZON_DAYS};
