use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::todo::Category;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    /// Raw frequency as persisted. Parsed on use so malformed rows surface as
    /// [`DashboardError::InvalidFrequency`] instead of being dropped on load.
    pub frequency: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    /// Most recent first, truncated to the fetch window.
    #[serde(default)]
    pub log_entries: Vec<LogEntry>,
}

impl Habit {
    pub fn new(id: impl Into<String>, name: impl Into<String>, frequency: HabitFrequency) -> Self {
        Self {
            id: id.into(),
            user_id: String::new(),
            name: name.into(),
            frequency: frequency.as_str().to_string(),
            category_id: None,
            category: None,
            log_entries: Vec::new(),
        }
    }

    pub fn owned_by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn parsed_frequency(&self) -> Result<HabitFrequency, DashboardError> {
        self.frequency.parse()
    }

    pub fn completed_entry_count(&self) -> usize {
        self.log_entries
            .iter()
            .filter(|entry| entry.is_completed)
            .count()
    }
}

/// Append-only completion record for a habit or a todo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub id: String,
    pub owner_id: String,
    pub date: NaiveDateTime,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLogEntry {
    pub owner_id: String,
    pub date: NaiveDateTime,
    pub is_completed: bool,
}

impl NewLogEntry {
    pub fn completed(owner_id: impl Into<String>, date: NaiveDateTime) -> Self {
        Self {
            owner_id: owner_id.into(),
            date,
            is_completed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HabitFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl HabitFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            HabitFrequency::Daily => "DAILY",
            HabitFrequency::Weekly => "WEEKLY",
            HabitFrequency::Monthly => "MONTHLY",
        }
    }

    /// Display label, e.g. `Daily`.
    pub fn label(self) -> &'static str {
        match self {
            HabitFrequency::Daily => "Daily",
            HabitFrequency::Weekly => "Weekly",
            HabitFrequency::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for HabitFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HabitFrequency {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(HabitFrequency::Daily),
            "WEEKLY" => Ok(HabitFrequency::Weekly),
            "MONTHLY" => Ok(HabitFrequency::Monthly),
            other => Err(DashboardError::InvalidFrequency(other.to_string())),
        }
    }
}
