//! Remote settings store.
//!
//! Records are keyed by user id with update-or-insert semantics, and a write
//! only replaces the fields present in the update.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    error::StoreError,
    platform::Connectivity,
    sync::update::{PersistedSettings, SettingsUpdate},
};

pub trait SettingsStore: Send + Sync {
    fn read_settings(&self, user_id: &str) -> Result<Option<PersistedSettings>, StoreError>;

    fn write_settings(&self, user_id: &str, update: &SettingsUpdate) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    records: HashMap<String, PersistedSettings>,
    /// Every write attempt, successful or not
    attempts: Vec<(String, SettingsUpdate)>,
    failures: VecDeque<StoreError>,
}

/// In-memory store with an attempt log and injectable failures
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<Mutex<MemoryInner>>,
    connectivity: Option<Arc<dyn Connectivity>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with a network error while `connectivity` is offline
    pub fn with_connectivity(connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            inner: Arc::default(),
            connectivity: Some(connectivity),
        }
    }

    /// Make the next write attempt fail with `error`
    pub fn fail_next(&self, error: StoreError) {
        self.inner.lock().failures.push_back(error);
    }

    pub fn attempts(&self) -> Vec<(String, SettingsUpdate)> {
        self.inner.lock().attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.inner.lock().attempts.len()
    }

    pub fn record(&self, user_id: &str) -> Option<PersistedSettings> {
        self.inner.lock().records.get(user_id).cloned()
    }

    pub fn insert(&self, user_id: &str, record: PersistedSettings) {
        self.inner.lock().records.insert(user_id.to_string(), record);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        match &self.connectivity {
            Some(net) if !net.is_online() => Err(StoreError::Network("offline".into())),
            _ => Ok(()),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn read_settings(&self, user_id: &str) -> Result<Option<PersistedSettings>, StoreError> {
        self.check_online()?;
        Ok(self.record(user_id))
    }

    fn write_settings(&self, user_id: &str, update: &SettingsUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.attempts.push((user_id.to_string(), update.clone()));

        self.check_online()?;
        if let Some(error) = inner.failures.pop_front() {
            return Err(error);
        }
        update.validate()?;

        inner
            .records
            .entry(user_id.to_string())
            .or_default()
            .apply(update);
        Ok(())
    }
}

/// All users' records in one JSON file
pub struct FileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, PersistedSettings>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| StoreError::Storage(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::Storage(e.to_string())),
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn read_settings(&self, user_id: &str) -> Result<Option<PersistedSettings>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(user_id))
    }

    fn write_settings(&self, user_id: &str, update: &SettingsUpdate) -> Result<(), StoreError> {
        update.validate()?;

        let _guard = self.lock.lock();
        let mut records = self.load()?;
        records.entry(user_id.to_string()).or_default().apply(update);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        let text =
            serde_json::to_string_pretty(&records).map_err(|e| StoreError::Storage(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| StoreError::Storage(e.to_string()))
    }
}
