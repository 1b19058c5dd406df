use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Weekday};
use habit_core::session::{SessionStore, User, UserSession, SESSION_KEY};
use habit_core::store::{FileStorage, KeyValueStorage};
use habit_core::{DashboardConfig, DashboardService};
use tracing::{info, warn};

use crate::file_repository::JsonFileRepository;
use crate::render::{render_dashboard, TerminalSink};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub state_dir: PathBuf,
    /// Overrides the user of the persisted session.
    pub user_id: Option<String>,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from `lookup`. An unusable value is logged and
    /// skipped; every other setting still applies.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("HABIT_DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("HABIT_STATE_DIR") {
            config.state_dir = PathBuf::from(path);
        }
        if let Some(user) = lookup("HABIT_USER_ID") {
            let user = user.trim();
            if !user.is_empty() {
                config.user_id = Some(user.to_string());
            }
        }
        if let Some(day) = lookup("HABIT_WEEK_START") {
            match parse_weekday(&day) {
                Ok(week_start) => config.dashboard.week_start = week_start,
                Err(err) => warn!(%err, "ignoring HABIT_WEEK_START"),
            }
        }
        if let Some(limit) = lookup("HABIT_PREVIEW_LIMIT") {
            if let Ok(value) = limit.trim().parse::<usize>() {
                if value > 0 {
                    config.dashboard.preview_limit = value;
                }
            }
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("habits.json"),
            state_dir: PathBuf::from(".habit-state"),
            user_id: None,
            dashboard: DashboardConfig::default(),
        }
    }
}

pub fn parse_weekday(value: &str) -> Result<Weekday> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow::anyhow!("unrecognised week start `{value}`"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Show,
    CompleteHabit(String),
    CompleteTodo(String),
    SignIn {
        user_id: String,
        username: String,
        email: String,
    },
    SignOut,
}

/// Loads the dashboard, applies `action`, and returns the rendered result.
pub async fn run(config: AppConfig, action: Action) -> Result<String> {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(
        FileStorage::new(&config.state_dir)
            .with_context(|| format!("opening state dir {}", config.state_dir.display()))?,
    );
    let session = SessionStore::open(storage, SESSION_KEY).context("loading session")?;

    let repository = Arc::new(
        JsonFileRepository::open(&config.data_file)
            .with_context(|| format!("loading data file {}", config.data_file.display()))?,
    );
    let service = Arc::new(
        DashboardService::builder(repository)
            .with_config(config.dashboard.clone())
            .with_notification_sink(Arc::new(TerminalSink))
            .build(),
    );

    let session_user = session.get().user_id().map(str::to_string);
    service.set_user(config.user_id.clone().or(session_user));
    if config.user_id.is_none() {
        let follower = service.clone();
        session.subscribe(move |state: &UserSession| {
            follower.set_user(state.user_id().map(str::to_string));
        });
    }

    match &action {
        Action::SignIn {
            user_id,
            username,
            email,
        } => {
            session
                .set(UserSession::signed_in(User {
                    id: user_id.clone(),
                    username: username.clone(),
                    email: email.clone(),
                    created_at: Local::now().naive_local(),
                }))
                .context("saving session")?;
            info!(%user_id, "session user switched");
        }
        Action::SignOut => {
            session.clear().context("clearing session")?;
            info!("session cleared");
        }
        _ => {}
    }

    if let Err(err) = service.refresh().await {
        warn!(%err, "initial dashboard load failed");
    }

    match &action {
        Action::CompleteHabit(id) => service
            .complete_habit(id)
            .await
            .with_context(|| format!("completing habit {id}"))?,
        Action::CompleteTodo(id) => service
            .complete_todo(id)
            .await
            .with_context(|| format!("completing todo {id}"))?,
        _ => {}
    }

    let mut rendered = render_dashboard(&service.snapshot(), service.config());
    if let Some(err) = service.last_error() {
        rendered.push_str(&format!("\nlast error: {err}\n"));
    }
    session.close().context("flushing session")?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_core::habit::{Habit, HabitFrequency};
    use habit_core::repository::MemoryRecords;

    fn config_in(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            data_file: dir.join("habits.json"),
            state_dir: dir.join("state"),
            user_id: None,
            dashboard: DashboardConfig::default(),
        }
    }

    fn seed(path: &std::path::Path) {
        let records = MemoryRecords {
            habits: vec![Habit::new("h1", "Read", HabitFrequency::Daily).owned_by("u1")],
            ..MemoryRecords::default()
        };
        std::fs::write(path, serde_json::to_string(&records).unwrap()).unwrap();
    }

    #[test]
    fn invalid_week_start_keeps_the_other_settings() {
        let vars = std::collections::HashMap::from([
            ("HABIT_DATA_FILE", "/srv/habits/data.json"),
            ("HABIT_STATE_DIR", "/srv/habits/state"),
            ("HABIT_USER_ID", "u7"),
            ("HABIT_WEEK_START", "someday"),
        ]);
        let config = AppConfig::from_lookup(|name| vars.get(name).map(|value| value.to_string()));

        assert_eq!(config.data_file, PathBuf::from("/srv/habits/data.json"));
        assert_eq!(config.state_dir, PathBuf::from("/srv/habits/state"));
        assert_eq!(config.user_id.as_deref(), Some("u7"));
        assert_eq!(config.dashboard.week_start, Weekday::Sun);
    }

    #[test]
    fn week_start_is_read_from_the_environment() {
        let config = AppConfig::from_lookup(|name| {
            (name == "HABIT_WEEK_START").then(|| "Mon".to_string())
        });
        assert_eq!(config.dashboard.week_start, Weekday::Mon);
        assert_eq!(config.data_file, PathBuf::from("habits.json"));
    }

    #[test]
    fn parses_week_start_names() {
        assert_eq!(parse_weekday("Mon").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday(" sunday ").unwrap(), Weekday::Sun);
        assert!(parse_weekday("someday").is_err());
    }

    #[tokio::test]
    async fn signed_in_user_sees_and_completes_habits() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        seed(&config.data_file);

        let anonymous = run(config.clone(), Action::Show).await.unwrap();
        assert!(anonymous.contains("No habits found"));

        let signed_in = run(
            config.clone(),
            Action::SignIn {
                user_id: "u1".into(),
                username: "ada".into(),
                email: "ada@example.com".into(),
            },
        )
        .await
        .unwrap();
        assert!(signed_in.contains("[ ] Read (Daily)"));

        let completed = run(config.clone(), Action::CompleteHabit("h1".into()))
            .await
            .unwrap();
        assert!(completed.contains("[x] Read (Daily) - Done"));

        let signed_out = run(config, Action::SignOut).await.unwrap();
        assert!(signed_out.contains("No habits found"));
    }

    #[tokio::test]
    async fn completing_an_unknown_todo_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.user_id = Some("u1".into());
        seed(&config.data_file);

        let err = run(config, Action::CompleteTodo("nope".into()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("completing todo nope"));
    }
}
