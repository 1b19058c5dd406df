use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::habit::Habit;
use crate::schedule::is_completed_on;
use crate::todo::Todo;

/// Occurrences assumed per habit per week when sizing the weekly total.
pub const WEEKLY_OCCURRENCES_PER_HABIT: u64 = 7;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub today_habits_completed: u64,
    pub today_habits_total: u64,
    pub weekly_habits_completed: u64,
    pub weekly_habits_total: u64,
    pub pending_todos: u64,
    pub completed_todos: u64,
}

impl DashboardStats {
    pub fn today_percent(&self) -> f64 {
        percent(self.today_habits_completed, self.today_habits_total)
    }

    pub fn weekly_percent(&self) -> f64 {
        percent(self.weekly_habits_completed, self.weekly_habits_total)
    }

    /// Share of completed todos among pending plus completed ones.
    pub fn todo_percent(&self) -> f64 {
        percent(
            self.completed_todos,
            self.pending_todos + self.completed_todos,
        )
    }

    pub fn weekly_percent_rounded(&self) -> u64 {
        self.weekly_percent().round() as u64
    }
}

/// `completed / total * 100`, or `0.0` when `total` is zero.
pub fn percent(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

/// Habits that have an occurrence on `reference_date`, in input order.
pub fn due_habits<'a>(
    habits: &'a [Habit],
    reference_date: NaiveDate,
    week_start: Weekday,
) -> Result<Vec<&'a Habit>, DashboardError> {
    let mut due = Vec::new();
    for habit in habits {
        if habit.parsed_frequency()?.is_due_on(reference_date, week_start) {
            due.push(habit);
        }
    }
    Ok(due)
}

/// Rolls habits and todo counts up into the dashboard counters.
///
/// `weekly_habits_total` is `habits.len() * 7` regardless of frequency, while
/// `weekly_habits_completed` counts completed entries in each habit's fetched
/// log window. The two figures are not computed over the same window.
pub fn compute_stats(
    habits: &[Habit],
    todos: &[Todo],
    completed_todo_count: u64,
    reference_date: NaiveDate,
    week_start: Weekday,
) -> Result<DashboardStats, DashboardError> {
    let due = due_habits(habits, reference_date, week_start)?;
    let today_habits_completed = due
        .iter()
        .filter(|habit| is_completed_on(&habit.log_entries, reference_date))
        .count() as u64;

    let weekly_habits_completed = habits
        .iter()
        .map(|habit| habit.completed_entry_count() as u64)
        .sum();

    Ok(DashboardStats {
        today_habits_completed,
        today_habits_total: due.len() as u64,
        weekly_habits_completed,
        weekly_habits_total: habits.len() as u64 * WEEKLY_OCCURRENCES_PER_HABIT,
        pending_todos: todos.len() as u64,
        completed_todos: completed_todo_count,
    })
}
