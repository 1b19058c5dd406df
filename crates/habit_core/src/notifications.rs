use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-visible outcome of a dashboard action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
        }
    }
}

pub const HABIT_COMPLETED: &str = "Habit marked as complete";
pub const TODO_COMPLETED: &str = "Task completed!";
pub const HABIT_UPDATE_FAILED: &str = "Error updating habit";
pub const TODO_UPDATE_FAILED: &str = "Error updating task";
pub const LOAD_FAILED: &str = "Error loading dashboard data";

/// Presentation adapters (toasts, terminal output) implement this trait.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Sink that records every notice, for headless front-ends and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: parking_lot::Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
