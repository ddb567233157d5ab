//! Offline queue of settings not yet persisted remotely.
//!
//! The queue lives in durable local storage under one key, as a JSON array
//! with at most one item per user. Every change is a read-merge-write of
//! that array, so two sessions racing on it lose at most a field overwrite
//! and never a whole item.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{error::StoreError, platform::KeyValueStore, sync::update::SettingsUpdate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub user_id: String,
    pub pending_updates: SettingsUpdate,
    /// Milliseconds since the Unix epoch of the latest merge
    pub timestamp: u64,
}

pub struct OfflineQueue {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl OfflineQueue {
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn load(&self) -> Result<Vec<SyncQueueItem>, StoreError> {
        let Some(text) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&text) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("discarding unreadable offline queue: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn store(&self, items: &[SyncQueueItem]) -> Result<(), StoreError> {
        if items.is_empty() {
            return self.storage.remove(&self.key);
        }
        let text = serde_json::to_string(items).map_err(|e| StoreError::Storage(e.to_string()))?;
        self.storage.set(&self.key, &text)
    }

    /// Queue `update` for `user_id`, merging into that user's existing item
    pub fn enqueue(&self, user_id: &str, update: SettingsUpdate, timestamp: u64) -> Result<(), StoreError> {
        let mut items = self.load()?;
        match items.iter_mut().find(|item| item.user_id == user_id) {
            Some(item) => {
                item.pending_updates.merge(update);
                item.timestamp = timestamp;
            }
            None => items.push(SyncQueueItem {
                user_id: user_id.to_string(),
                pending_updates: update,
                timestamp,
            }),
        }
        self.store(&items)
    }

    /// Remove and return every queued item
    pub fn take_all(&self) -> Result<Vec<SyncQueueItem>, StoreError> {
        let items = self.load()?;
        if !items.is_empty() {
            self.storage.remove(&self.key)?;
        }
        Ok(items)
    }

    /// Remove and return the item of one user, leaving the others queued
    pub fn take(&self, user_id: &str) -> Result<Option<SyncQueueItem>, StoreError> {
        let mut items = self.load()?;
        let Some(index) = items.iter().position(|item| item.user_id == user_id) else {
            return Ok(None);
        };
        let item = items.remove(index);
        self.store(&items)?;
        Ok(Some(item))
    }

    pub fn get(&self, user_id: &str) -> Result<Option<SyncQueueItem>, StoreError> {
        Ok(self.load()?.into_iter().find(|item| item.user_id == user_id))
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
