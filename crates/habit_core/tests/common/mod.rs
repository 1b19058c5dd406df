#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use habit_core::clock::FixedClock;
use habit_core::habit::{Habit, LogEntry, NewLogEntry};
use habit_core::repository::{
    DashboardRepository, HabitQuery, InMemoryRepository, PendingTodoQuery, RepoResult,
};
use habit_core::todo::{Category, Todo};
use habit_core::RepositoryError;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

pub const USER: &str = "user-1";

/// Wednesday 2025-10-22.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 22).unwrap()
}

pub fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0).unwrap()
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(at(today(), 9)))
}

/// Delegates to an [`InMemoryRepository`] and fails selected calls on demand.
#[derive(Default)]
pub struct FaultyRepository {
    pub inner: InMemoryRepository,
    pub fail_reads: AtomicBool,
    pub fail_habit_log: AtomicBool,
    pub fail_todo_update: AtomicBool,
    pub fail_todo_log: AtomicBool,
}

impl FaultyRepository {
    pub fn new(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    fn check(flag: &AtomicBool, what: &str) -> RepoResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(RepositoryError::backend(format!("{what} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl DashboardRepository for FaultyRepository {
    async fn list_habits(&self, query: &HabitQuery) -> RepoResult<Vec<Habit>> {
        Self::check(&self.fail_reads, "habits")?;
        self.inner.list_habits(query).await
    }

    async fn list_pending_todos(&self, query: &PendingTodoQuery) -> RepoResult<Vec<Todo>> {
        Self::check(&self.fail_reads, "todos")?;
        self.inner.list_pending_todos(query).await
    }

    async fn list_categories(&self, user_id: &str) -> RepoResult<Vec<Category>> {
        Self::check(&self.fail_reads, "categories")?;
        self.inner.list_categories(user_id).await
    }

    async fn count_completed_todos(&self, user_id: &str) -> RepoResult<u64> {
        Self::check(&self.fail_reads, "todo count")?;
        self.inner.count_completed_todos(user_id).await
    }

    async fn create_habit_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        Self::check(&self.fail_habit_log, "habit log")?;
        self.inner.create_habit_log_entry(entry).await
    }

    async fn update_todo_completion(&self, todo_id: &str, is_completed: bool) -> RepoResult<Todo> {
        Self::check(&self.fail_todo_update, "todo update")?;
        self.inner.update_todo_completion(todo_id, is_completed).await
    }

    async fn create_todo_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        Self::check(&self.fail_todo_log, "todo log")?;
        self.inner.create_todo_log_entry(entry).await
    }
}

struct CallGate {
    entered: Notify,
    permit: Semaphore,
}

/// Holds the first `gated` `list_habits` calls until each is released, and
/// fails the calls marked with [`GatedRepository::fail_call`]. Calls are
/// numbered from 0 in arrival order.
pub struct GatedRepository {
    pub inner: Arc<InMemoryRepository>,
    gates: Vec<CallGate>,
    failing: Mutex<HashSet<usize>>,
    calls: AtomicUsize,
}

impl GatedRepository {
    pub fn new(inner: Arc<InMemoryRepository>, gated: usize) -> Self {
        Self {
            inner,
            gates: (0..gated)
                .map(|_| CallGate {
                    entered: Notify::new(),
                    permit: Semaphore::new(0),
                })
                .collect(),
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Resolves once call `call` has reached its gate.
    pub async fn entered(&self, call: usize) {
        self.gates[call].entered.notified().await;
    }

    pub fn release(&self, call: usize) {
        self.gates[call].permit.add_permits(1);
    }

    pub fn fail_call(&self, call: usize) {
        self.failing.lock().insert(call);
    }
}

#[async_trait]
impl DashboardRepository for GatedRepository {
    async fn list_habits(&self, query: &HabitQuery) -> RepoResult<Vec<Habit>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gates.get(call) {
            gate.entered.notify_one();
            gate.permit
                .acquire()
                .await
                .map_err(|err| RepositoryError::backend(err.to_string()))?
                .forget();
        }
        if self.failing.lock().contains(&call) {
            return Err(RepositoryError::backend(format!("habits call {call} unavailable")));
        }
        self.inner.list_habits(query).await
    }

    async fn list_pending_todos(&self, query: &PendingTodoQuery) -> RepoResult<Vec<Todo>> {
        self.inner.list_pending_todos(query).await
    }

    async fn list_categories(&self, user_id: &str) -> RepoResult<Vec<Category>> {
        self.inner.list_categories(user_id).await
    }

    async fn count_completed_todos(&self, user_id: &str) -> RepoResult<u64> {
        self.inner.count_completed_todos(user_id).await
    }

    async fn create_habit_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        self.inner.create_habit_log_entry(entry).await
    }

    async fn update_todo_completion(&self, todo_id: &str, is_completed: bool) -> RepoResult<Todo> {
        self.inner.update_todo_completion(todo_id, is_completed).await
    }

    async fn create_todo_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        self.inner.create_todo_log_entry(entry).await
    }
}
