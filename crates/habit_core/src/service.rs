use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Weekday;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::{
    clock::{Clock, SystemClock},
    error::{DashboardError, DashboardResult, MutationAction, MutationState},
    habit::NewLogEntry,
    notifications::{self, Notice, NotificationSink},
    repository::{DashboardRepository, HabitQuery, PendingTodoQuery},
    snapshot::{DashboardSnapshot, TodayPreview},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Day on which weekly habits are due.
    pub week_start: Weekday,
    /// Log entries fetched per habit.
    pub log_window: usize,
    pub pending_todo_limit: usize,
    /// Habits shown in the today preview.
    pub preview_limit: usize,
    /// Pending todos listed before collapsing into "see more".
    pub upcoming_todo_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            week_start: Weekday::Sun,
            log_window: 7,
            pending_todo_limit: 5,
            preview_limit: 3,
            upcoming_todo_limit: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The load was the latest issued one and replaced the snapshot.
    Applied { generation: u64 },
    /// A newer refresh was issued while this one was in flight; its result
    /// was dropped.
    Stale { generation: u64, latest: u64 },
}

#[derive(Debug, Default)]
struct DashboardState {
    snapshot: DashboardSnapshot,
    loading: bool,
    last_error: Option<DashboardError>,
}

pub struct DashboardService {
    repository: Arc<dyn DashboardRepository>,
    clock: Arc<dyn Clock>,
    notification_sink: Option<Arc<dyn NotificationSink>>,
    config: DashboardConfig,
    user_id: RwLock<Option<String>>,
    state: RwLock<DashboardState>,
    generation: AtomicU64,
}

pub struct DashboardServiceBuilder {
    repository: Arc<dyn DashboardRepository>,
    clock: Arc<dyn Clock>,
    notification_sink: Option<Arc<dyn NotificationSink>>,
    config: DashboardConfig,
    user_id: Option<String>,
}

impl DashboardServiceBuilder {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
            notification_sink: None,
            config: DashboardConfig::default(),
            user_id: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn with_config(mut self, config: DashboardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Builds an idle service holding an empty snapshot. Call
    /// [`DashboardService::refresh`] to perform the initial load.
    pub fn build(self) -> DashboardService {
        DashboardService {
            repository: self.repository,
            clock: self.clock,
            notification_sink: self.notification_sink,
            config: self.config,
            user_id: RwLock::new(self.user_id),
            state: RwLock::new(DashboardState::default()),
            generation: AtomicU64::new(0),
        }
    }
}

impl DashboardService {
    pub fn builder(repository: Arc<dyn DashboardRepository>) -> DashboardServiceBuilder {
        DashboardServiceBuilder::new(repository)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().clone()
    }

    /// Switches the dashboard to another user. The snapshot is left as-is
    /// until the next refresh.
    pub fn set_user(&self, user_id: Option<String>) {
        *self.user_id.write() = user_id;
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.read().snapshot.clone()
    }

    pub fn today_preview(&self) -> TodayPreview {
        self.state
            .read()
            .snapshot
            .today_preview(self.config.preview_limit)
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn last_error(&self) -> Option<DashboardError> {
        self.state.read().last_error.clone()
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Re-runs the fetch-and-aggregate pipeline from scratch.
    ///
    /// Each call takes a new generation number. Only the result of the most
    /// recently issued call is applied; results of older calls that resolve
    /// later are discarded. On failure the previous snapshot is kept and the
    /// error is recorded in [`DashboardService::last_error`].
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> DashboardResult<RefreshOutcome> {
        // The generation only moves, and is only checked, under the state lock.
        let generation = {
            let mut state = self.state.write();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
            generation
        };
        debug!(generation, "dashboard refresh started");

        let result = self.load().await;

        let mut state = self.state.write();
        let latest = self.latest_generation();
        if generation != latest {
            drop(state);
            debug!(generation, latest, "discarding stale dashboard load");
            return Ok(RefreshOutcome::Stale { generation, latest });
        }
        state.loading = false;
        match result {
            Ok(snapshot) => {
                info!(
                    generation,
                    habits = snapshot.habits.len(),
                    todos = snapshot.todos.len(),
                    "dashboard snapshot applied"
                );
                state.snapshot = snapshot;
                state.last_error = None;
                Ok(RefreshOutcome::Applied { generation })
            }
            Err(err) => {
                warn!(generation, %err, "dashboard refresh failed");
                state.last_error = Some(err.clone());
                drop(state);
                self.notify(Notice::error(notifications::LOAD_FAILED));
                Err(err)
            }
        }
    }

    /// Appends a completed log entry for the habit dated now, then reloads.
    ///
    /// No same-day check is made: completing twice appends two entries.
    #[instrument(skip(self))]
    pub async fn complete_habit(&self, habit_id: &str) -> DashboardResult<()> {
        let entry = NewLogEntry::completed(habit_id, self.clock.now());
        if let Err(source) = self.repository.create_habit_log_entry(entry).await {
            return Err(self.mutation_failed(
                DashboardError::Mutation {
                    action: MutationAction::CompleteHabit,
                    target: habit_id.to_string(),
                    state: MutationState::NotApplied,
                    source,
                },
                notifications::HABIT_UPDATE_FAILED,
            ));
        }

        self.notify(Notice::success(notifications::HABIT_COMPLETED));
        self.recompute().await;
        Ok(())
    }

    /// Marks the todo completed, then appends its log entry, then reloads.
    ///
    /// The two writes are independent. When the second one fails the todo
    /// stays completed without a log entry and the error reports
    /// [`MutationState::Partial`].
    #[instrument(skip(self))]
    pub async fn complete_todo(&self, todo_id: &str) -> DashboardResult<()> {
        if let Err(source) = self.repository.update_todo_completion(todo_id, true).await {
            return Err(self.mutation_failed(
                DashboardError::Mutation {
                    action: MutationAction::CompleteTodo,
                    target: todo_id.to_string(),
                    state: MutationState::NotApplied,
                    source,
                },
                notifications::TODO_UPDATE_FAILED,
            ));
        }

        let entry = NewLogEntry::completed(todo_id, self.clock.now());
        if let Err(source) = self.repository.create_todo_log_entry(entry).await {
            return Err(self.mutation_failed(
                DashboardError::Mutation {
                    action: MutationAction::CompleteTodo,
                    target: todo_id.to_string(),
                    state: MutationState::Partial,
                    source,
                },
                notifications::TODO_UPDATE_FAILED,
            ));
        }

        self.notify(Notice::success(notifications::TODO_COMPLETED));
        self.recompute().await;
        Ok(())
    }
}

impl DashboardService {
    async fn load(&self) -> DashboardResult<DashboardSnapshot> {
        let now = self.clock.now();
        let Some(user_id) = self.user_id() else {
            debug!("no active user; publishing an empty dashboard");
            return DashboardSnapshot::build(
                Vec::new(),
                Vec::new(),
                Vec::new(),
                0,
                now.date(),
                self.config.week_start,
            );
        };

        let habits = self
            .repository
            .list_habits(&HabitQuery {
                user_id: user_id.clone(),
                log_window: self.config.log_window,
            })
            .await
            .map_err(DashboardError::Fetch)?;
        let todos = self
            .repository
            .list_pending_todos(&PendingTodoQuery {
                user_id: user_id.clone(),
                due_from: now,
                limit: self.config.pending_todo_limit,
            })
            .await
            .map_err(DashboardError::Fetch)?;
        let categories = self
            .repository
            .list_categories(&user_id)
            .await
            .map_err(DashboardError::Fetch)?;
        let completed_todos = self
            .repository
            .count_completed_todos(&user_id)
            .await
            .map_err(DashboardError::Fetch)?;
        debug!(
            habits = habits.len(),
            todos = todos.len(),
            categories = categories.len(),
            completed_todos,
            "dashboard data fetched"
        );

        DashboardSnapshot::build(
            habits,
            todos,
            categories,
            completed_todos,
            now.date(),
            self.config.week_start,
        )
    }

    async fn recompute(&self) {
        // Failures are already recorded and notified by `refresh`.
        if let Err(err) = self.refresh().await {
            debug!(%err, "recompute after mutation failed");
        }
    }

    fn mutation_failed(&self, err: DashboardError, title: &str) -> DashboardError {
        warn!(%err, "dashboard mutation failed");
        self.state.write().last_error = Some(err.clone());
        self.notify(Notice::error(title));
        err
    }

    fn notify(&self, notice: Notice) {
        if let Some(sink) = &self.notification_sink {
            sink.notify(notice);
        }
    }
}
