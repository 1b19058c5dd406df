use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use habit_core::habit::{Habit, LogEntry, NewLogEntry};
use habit_core::repository::{
    DashboardRepository, HabitQuery, InMemoryRepository, MemoryRecords, PendingTodoQuery,
    RepoResult,
};
use habit_core::todo::{Category, Todo};
use habit_core::RepositoryError;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

/// Repository over a single JSON document. Reads are served from memory.
/// A write is applied to a staged copy of the records, written to disk, and
/// only then becomes visible, so a failed write changes nothing.
pub struct JsonFileRepository {
    path: PathBuf,
    records: InMemoryRepository,
    writer: Mutex<()>,
}

impl JsonFileRepository {
    /// Loads `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<MemoryRecords>(&raw)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => MemoryRecords::default(),
            Err(err) => return Err(err.into()),
        };
        debug!(
            path = %path.display(),
            habits = records.habits.len(),
            todos = records.todos.len(),
            "data file loaded"
        );
        Ok(Self {
            path,
            records: InMemoryRepository::from_records(records),
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> MemoryRecords {
        self.records.records()
    }

    fn staged(&self) -> InMemoryRepository {
        InMemoryRepository::from_records(self.records.records())
    }

    /// Writes `next` to disk and then publishes it to readers.
    async fn commit(&self, next: MemoryRecords) -> RepoResult<()> {
        let raw = serde_json::to_string_pretty(&next)
            .map_err(|err| RepositoryError::backend(err.to_string()))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_replacing(&path, &raw))
            .await
            .map_err(|err| RepositoryError::backend(err.to_string()))??;
        self.records.replace_records(next);
        Ok(())
    }
}

/// Writes through a temporary file in the target directory and renames it
/// over `path`, so readers never observe a half-written document.
fn write_replacing(path: &Path, raw: &str) -> RepoResult<()> {
    let backend = |err: io::Error| RepositoryError::backend(err.to_string());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(backend)?;
    let mut file = NamedTempFile::new_in(&dir).map_err(backend)?;
    file.write_all(raw.as_bytes()).map_err(backend)?;
    file.as_file().sync_all().map_err(backend)?;
    file.persist(path).map_err(|err| backend(err.error))?;
    Ok(())
}

#[async_trait]
impl DashboardRepository for JsonFileRepository {
    async fn list_habits(&self, query: &HabitQuery) -> RepoResult<Vec<Habit>> {
        self.records.list_habits(query).await
    }

    async fn list_pending_todos(&self, query: &PendingTodoQuery) -> RepoResult<Vec<Todo>> {
        self.records.list_pending_todos(query).await
    }

    async fn list_categories(&self, user_id: &str) -> RepoResult<Vec<Category>> {
        self.records.list_categories(user_id).await
    }

    async fn count_completed_todos(&self, user_id: &str) -> RepoResult<u64> {
        self.records.count_completed_todos(user_id).await
    }

    async fn create_habit_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        let _writer = self.writer.lock().await;
        let staged = self.staged();
        let created = staged.create_habit_log_entry(entry).await?;
        self.commit(staged.records()).await?;
        Ok(created)
    }

    async fn update_todo_completion(&self, todo_id: &str, is_completed: bool) -> RepoResult<Todo> {
        let _writer = self.writer.lock().await;
        let staged = self.staged();
        let updated = staged.update_todo_completion(todo_id, is_completed).await?;
        self.commit(staged.records()).await?;
        Ok(updated)
    }

    async fn create_todo_log_entry(&self, entry: NewLogEntry) -> RepoResult<LogEntry> {
        let _writer = self.writer.lock().await;
        let staged = self.staged();
        let created = staged.create_todo_log_entry(entry).await?;
        self.commit(staged.records()).await?;
        Ok(created)
    }
}
