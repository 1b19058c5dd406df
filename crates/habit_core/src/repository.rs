use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;
use crate::habit::{Habit, LogEntry, NewLogEntry};
use crate::todo::{Category, Todo};

pub type RepoResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitQuery {
    pub user_id: String,
    /// Number of most recent log entries attached to each habit.
    pub log_window: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTodoQuery {
    pub user_id: String,
    /// Only todos due at or after this instant are returned.
    pub due_from: NaiveDateTime,
    pub limit: usize,
}

/// Data access used by the dashboard. Implementations own persistence; the
/// dashboard never reaches past this contract.
#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Habits of the user with their newest `log_window` entries (newest
    /// first) and their category attached.
    async fn list_habits(&self, query: &HabitQuery) -> RepoResult<Vec<Habit>>;

    /// Incomplete todos due at or after `due_from`, soonest first, at most
    /// `limit`, with their category attached.
    async fn list_pending_todos(&self, query: &PendingTodoQuery) -> RepoResult<Vec<Todo>>;

    async fn list_categories(&self, user_id: &str) -> RepoResult<Vec<Category>>;

    async fn count_completed_todos(&self, user_id: &str) -> RepoResult<u64>;

    async fn create_habit_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry>;

    async fn update_todo_completion(&self, todo_id: &str, is_completed: bool) -> RepoResult<Todo>;

    async fn create_todo_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry>;
}

/// Flat record set held by [`InMemoryRepository`]. Habit and todo logs are
/// stored apart from their owners and joined on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryRecords {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub habit_logs: Vec<LogEntry>,
    #[serde(default)]
    pub todos: Vec<Todo>,
    #[serde(default)]
    pub todo_logs: Vec<LogEntry>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub next_log_id: u64,
}

impl MemoryRecords {
    fn category(&self, id: Option<&str>) -> Option<Category> {
        let id = id?;
        self.categories
            .iter()
            .find(|category| category.id == id)
            .cloned()
    }

    fn allocate_log_id(&mut self, prefix: &str) -> String {
        self.next_log_id += 1;
        format!("{prefix}-{}", self.next_log_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: RwLock<MemoryRecords>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: MemoryRecords) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn records(&self) -> MemoryRecords {
        self.records.read().clone()
    }

    /// Swaps in a whole record set at once.
    pub fn replace_records(&self, records: MemoryRecords) {
        *self.records.write() = records;
    }

    pub fn insert_habit(&self, mut habit: Habit) {
        let mut records = self.records.write();
        // Attached logs move into the shared log table.
        for entry in habit.log_entries.drain(..) {
            records.habit_logs.push(entry);
        }
        records.habits.push(habit);
    }

    pub fn insert_habit_log(&self, owner_id: &str, date: NaiveDateTime, is_completed: bool) -> LogEntry {
        let mut records = self.records.write();
        let entry = LogEntry {
            id: records.allocate_log_id("habit-log"),
            owner_id: owner_id.to_string(),
            date,
            is_completed,
        };
        records.habit_logs.push(entry.clone());
        entry
    }

    pub fn insert_todo(&self, todo: Todo) {
        self.records.write().todos.push(todo);
    }

    pub fn insert_category(&self, category: Category) {
        self.records.write().categories.push(category);
    }

    pub fn habit_log_count(&self, habit_id: &str) -> usize {
        self.records
            .read()
            .habit_logs
            .iter()
            .filter(|entry| entry.owner_id == habit_id)
            .count()
    }

    pub fn todo_log_count(&self, todo_id: &str) -> usize {
        self.records
            .read()
            .todo_logs
            .iter()
            .filter(|entry| entry.owner_id == todo_id)
            .count()
    }

    pub fn todo(&self, todo_id: &str) -> Option<Todo> {
        self.records
            .read()
            .todos
            .iter()
            .find(|todo| todo.id == todo_id)
            .cloned()
    }
}

#[async_trait]
impl DashboardRepository for InMemoryRepository {
    async fn list_habits(&self, query: &HabitQuery) -> RepoResult<Vec<Habit>> {
        let records = self.records.read();
        let habits = records
            .habits
            .iter()
            .filter(|habit| habit.user_id == query.user_id)
            .map(|habit| {
                // Newest first; among equal dates the later append wins.
                let mut logs: Vec<LogEntry> = records
                    .habit_logs
                    .iter()
                    .rev()
                    .filter(|entry| entry.owner_id == habit.id)
                    .cloned()
                    .collect();
                logs.sort_by(|a, b| b.date.cmp(&a.date));
                logs.truncate(query.log_window);

                let mut habit = habit.clone();
                habit.category = records.category(habit.category_id.as_deref());
                habit.log_entries = logs;
                habit
            })
            .collect();
        Ok(habits)
    }

    async fn list_pending_todos(&self, query: &PendingTodoQuery) -> RepoResult<Vec<Todo>> {
        let records = self.records.read();
        let mut todos: Vec<Todo> = records
            .todos
            .iter()
            .filter(|todo| todo.user_id == query.user_id && !todo.is_completed)
            .filter(|todo| matches!(todo.due_date, Some(due) if due >= query.due_from))
            .cloned()
            .collect();
        todos.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        todos.truncate(query.limit);
        for todo in &mut todos {
            todo.category = records.category(todo.category_id.as_deref());
        }
        Ok(todos)
    }

    async fn list_categories(&self, user_id: &str) -> RepoResult<Vec<Category>> {
        Ok(self
            .records
            .read()
            .categories
            .iter()
            .filter(|category| category.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_completed_todos(&self, user_id: &str) -> RepoResult<u64> {
        Ok(self
            .records
            .read()
            .todos
            .iter()
            .filter(|todo| todo.user_id == user_id && todo.is_completed)
            .count() as u64)
    }

    async fn create_habit_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        let mut records = self.records.write();
        if !records.habits.iter().any(|habit| habit.id == entry.owner_id) {
            return Err(RepositoryError::NotFound {
                kind: "habit",
                id: entry.owner_id,
            });
        }
        let created = LogEntry {
            id: records.allocate_log_id("habit-log"),
            owner_id: entry.owner_id,
            date: entry.date,
            is_completed: entry.is_completed,
        };
        records.habit_logs.push(created.clone());
        Ok(created)
    }

    async fn update_todo_completion(&self, todo_id: &str, is_completed: bool) -> RepoResult<Todo> {
        let mut records = self.records.write();
        let todo = records
            .todos
            .iter_mut()
            .find(|todo| todo.id == todo_id)
            .ok_or_else(|| RepositoryError::NotFound {
                kind: "todo",
                id: todo_id.to_string(),
            })?;
        todo.is_completed = is_completed;
        Ok(todo.clone())
    }

    async fn create_todo_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        let mut records = self.records.write();
        if !records.todos.iter().any(|todo| todo.id == entry.owner_id) {
            return Err(RepositoryError::NotFound {
                kind: "todo",
                id: entry.owner_id,
            });
        }
        let created = LogEntry {
            id: records.allocate_log_id("todo-log"),
            owner_id: entry.owner_id,
            date: entry.date,
            is_completed: entry.is_completed,
        };
        records.todo_logs.push(created.clone());
        Ok(created)
    }
}
