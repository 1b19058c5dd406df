//! Explicit state container persisted through a pluggable key-value storage.
//!
//! A container is hydrated from storage in [`StateContainer::open`], writes
//! through on every `set`, and flushes once more in [`StateContainer::close`].
//! Listeners registered with `subscribe` observe every committed value.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failure: {0}")]
    Io(#[from] io::Error),
    #[error("stored value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
}

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct StateContainer<T> {
    key: String,
    storage: Arc<dyn KeyValueStorage>,
    state: RwLock<T>,
    /// Serializes commits so storage and memory see writes in one order.
    commit: Mutex<()>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_subscription: AtomicU64,
}

impl<T> StateContainer<T>
where
    T: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Hydrates the container from `storage[key]`, falling back to
    /// `T::default()` when nothing is stored yet.
    pub fn open(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Result<Self, StorageError> {
        let key = key.into();
        let state = match storage.get(&key)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => T::default(),
        };
        tracing::debug!(%key, "state container hydrated");
        Ok(Self {
            key,
            storage,
            state: RwLock::new(state),
            commit: Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> T {
        self.state.read().clone()
    }

    /// Persists `value`, then publishes it. Storage failures leave the
    /// in-memory state untouched.
    pub fn set(&self, value: T) -> Result<(), StorageError> {
        {
            let _commit = self.commit.lock();
            self.store(&value)?;
        }
        self.publish(&value);
        Ok(())
    }

    /// Applies `apply` to the current value and commits the result. Concurrent
    /// updates are applied one after another.
    pub fn update(&self, apply: impl FnOnce(&mut T)) -> Result<(), StorageError> {
        let next = {
            let _commit = self.commit.lock();
            let mut next = self.state.read().clone();
            apply(&mut next);
            self.store(&next)?;
            next
        };
        self.publish(&next);
        Ok(())
    }

    /// Removes the persisted value and resets to `T::default()`.
    pub fn clear(&self) -> Result<(), StorageError> {
        let value = T::default();
        {
            let _commit = self.commit.lock();
            self.storage.delete(&self.key)?;
            *self.state.write() = value.clone();
        }
        self.publish(&value);
        Ok(())
    }

    fn store(&self, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.storage.set(&self.key, &raw)?;
        *self.state.write() = value.clone();
        Ok(())
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(candidate, _)| *candidate != id);
        listeners.len() != before
    }

    /// Writes the current state one last time and drops all listeners.
    pub fn close(self) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&*self.state.read())?;
        self.storage.set(&self.key, &raw)?;
        tracing::debug!(key = %self.key, "state container closed");
        Ok(())
    }

    fn publish(&self, value: &T) {
        // Listeners run outside the lock so they may (un)subscribe.
        let listeners: Vec<Listener<T>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct Counter {
        value: u32,
    }

    #[test]
    fn open_falls_back_to_default_and_hydrates_existing_value() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let fresh = StateContainer::<Counter>::open(storage.clone(), "counter").unwrap();
        assert_eq!(fresh.get(), Counter::default());
        fresh.set(Counter { value: 4 }).unwrap();

        let reopened = StateContainer::<Counter>::open(storage, "counter").unwrap();
        assert_eq!(reopened.get().value, 4);
    }

    #[test]
    fn subscribers_see_updates_until_unsubscribed() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let container = StateContainer::<Counter>::open(storage, "counter").unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_listener = seen.clone();
        let id = container.subscribe(move |counter: &Counter| {
            seen_in_listener.store(counter.value as usize, Ordering::SeqCst);
        });

        container.update(|counter| counter.value += 2).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        assert!(container.unsubscribe(id));
        assert!(!container.unsubscribe(id));
        container.set(Counter { value: 9 }).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_deletes_the_persisted_value() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let container = StateContainer::<Counter>::open(storage.clone(), "counter").unwrap();
        container.set(Counter { value: 1 }).unwrap();
        container.clear().unwrap();
        assert_eq!(container.get(), Counter::default());
        assert!(storage.get("counter").unwrap().is_none());
    }

    #[test]
    fn file_storage_round_trips_and_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state")).unwrap();
        assert!(storage.get("session").unwrap().is_none());
        storage.set("session", "{\"value\":1}").unwrap();
        assert_eq!(storage.get("session").unwrap().as_deref(), Some("{\"value\":1}"));
        storage.delete("session").unwrap();
        storage.delete("session").unwrap();
        assert!(storage.get("session").unwrap().is_none());

        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn close_flushes_state() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(dir.path()).unwrap());
        let container = StateContainer::<Counter>::open(storage.clone(), "counter").unwrap();
        container.set(Counter { value: 3 }).unwrap();
        container.close().unwrap();

        let raw = storage.get("counter").unwrap().unwrap();
        let stored: Counter = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.value, 3);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let container = StateContainer::<Counter>::open(storage.clone(), "counter").unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        container.update(|counter| counter.value += 1).unwrap();
                    }
                });
            }
        });

        assert_eq!(container.get().value, 400);
        let stored: Counter = serde_json::from_str(&storage.get("counter").unwrap().unwrap()).unwrap();
        assert_eq!(stored.value, 400);
    }
}
