//! Occurrence scheduling and completion resolution for habits.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::DashboardError;
use crate::habit::{HabitFrequency, LogEntry};

impl HabitFrequency {
    /// Whether an occurrence of this frequency falls on `date`.
    pub fn is_due_on(self, date: NaiveDate, week_start: Weekday) -> bool {
        match self {
            HabitFrequency::Daily => true,
            HabitFrequency::Weekly => date.weekday() == week_start,
            HabitFrequency::Monthly => date.day() == 1,
        }
    }
}

/// Decides whether a habit with the persisted `frequency` is due on `date`.
///
/// Weekly habits are due on `week_start` only; monthly habits on the first
/// calendar day of the month. Unknown frequencies fail with
/// [`DashboardError::InvalidFrequency`].
pub fn is_due(frequency: &str, date: NaiveDate, week_start: Weekday) -> Result<bool, DashboardError> {
    let frequency: HabitFrequency = frequency.parse()?;
    Ok(frequency.is_due_on(date, week_start))
}

/// True when any supplied entry on `date`'s calendar day is marked completed.
///
/// Only the entries passed in are considered; nothing older is consulted.
pub fn is_completed_on(entries: &[LogEntry], date: NaiveDate) -> bool {
    entries
        .iter()
        .any(|entry| entry.is_completed && entry.date.date() == date)
}
