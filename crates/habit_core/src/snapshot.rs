use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::habit::{Habit, HabitFrequency};
use crate::schedule::is_completed_on;
use crate::stats::{compute_stats, due_habits, DashboardStats};
use crate::todo::{Category, Todo};

/// Aggregated dashboard state produced by one refresh. Never patched in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub habits: Vec<Habit>,
    pub todos: Vec<Todo>,
    pub categories: Vec<Category>,
    pub stats: DashboardStats,
    /// Calendar day the stats were computed for. `None` before the first load.
    pub reference_date: Option<NaiveDate>,
    pub week_start: Option<Weekday>,
}

/// Row of the "today's habits" preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodayHabit {
    pub id: String,
    pub name: String,
    pub frequency: HabitFrequency,
    pub color_code: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodayPreview {
    pub habits: Vec<TodayHabit>,
    /// More habits are due than the preview shows.
    pub has_more: bool,
}

impl DashboardSnapshot {
    pub fn build(
        habits: Vec<Habit>,
        todos: Vec<Todo>,
        categories: Vec<Category>,
        completed_todo_count: u64,
        reference_date: NaiveDate,
        week_start: Weekday,
    ) -> Result<Self, DashboardError> {
        let stats = compute_stats(
            &habits,
            &todos,
            completed_todo_count,
            reference_date,
            week_start,
        )?;
        Ok(Self {
            habits,
            todos,
            categories,
            stats,
            reference_date: Some(reference_date),
            week_start: Some(week_start),
        })
    }

    /// First `limit` habits due on the snapshot's reference date.
    pub fn today_preview(&self, limit: usize) -> TodayPreview {
        let (Some(date), Some(week_start)) = (self.reference_date, self.week_start) else {
            return TodayPreview::default();
        };
        // Frequencies were validated when the snapshot was built.
        let Ok(due) = due_habits(&self.habits, date, week_start) else {
            return TodayPreview::default();
        };
        let habits = due
            .iter()
            .take(limit)
            .filter_map(|habit| {
                let frequency = habit.parsed_frequency().ok()?;
                Some(TodayHabit {
                    id: habit.id.clone(),
                    name: habit.name.clone(),
                    frequency,
                    color_code: self.category_color(habit.category_id.as_deref()),
                    completed: is_completed_on(&habit.log_entries, date),
                })
            })
            .collect();
        TodayPreview {
            habits,
            has_more: due.len() > limit,
        }
    }

    /// First `limit` pending todos and whether more were fetched.
    pub fn upcoming_todos(&self, limit: usize) -> (&[Todo], bool) {
        let shown = limit.min(self.todos.len());
        (&self.todos[..shown], self.todos.len() > limit)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Color of a category by id, preferring the category list and falling
    /// back to categories attached to habits and todos.
    pub fn category_color(&self, id: Option<&str>) -> Option<String> {
        let id = id?;
        if let Some(category) = self.category(id) {
            return Some(category.color_code.clone());
        }
        self.habits
            .iter()
            .filter_map(|habit| habit.category.as_ref())
            .chain(self.todos.iter().filter_map(|todo| todo.category.as_ref()))
            .find(|category| category.id == id)
            .map(|category| category.color_code.clone())
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}
