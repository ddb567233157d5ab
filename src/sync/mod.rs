//! Settings Sync Engine
//!
//! Persists user-adjustable settings out of band from the audio path. The
//! engine is a small state machine driven by [`SyncEngine::tick`]; time comes
//! from an injected [`Clock`] so every transition is testable without real
//! timers.
//!
//! ```text
//!            save()                 debounce elapsed / flush()
//!   Idle ───────────► Pending ─────────────────────────────► Saving
//!    ▲                   ▲                                     │
//!    │                   │ offline: queued                     ├─ ok ──► Saved ──(display)──► Idle
//!    │                   └─────────────────────────────────────┤
//!    │                                                         ├─ failed, retries left: wait backoff, retry
//!    │                                                         └─ retries exhausted ──► Error
//! ```
//!
//! Writes for one user are strictly serialized: while a write is waiting for
//! its retry, a debounce that fires is re-armed instead of starting a second
//! write.

pub mod queue;
pub mod update;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

pub use queue::{OfflineQueue, SyncQueueItem};
pub use update::{PersistedSettings, SettingsUpdate, VolumeSettings};

use crate::{
    error::StoreError,
    platform::{Clock, Connectivity, KeyValueStore, SettingsStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    Idle,
    Pending,
    Saving,
    Saved,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub debounce_ms: u64,
    pub max_retries: u32,
    /// First retry delay; doubles with every further attempt
    pub backoff_base_ms: u64,
    /// How long `Saved` is shown before falling back to `Idle`
    pub saved_display_ms: u64,
    /// Storage key of the offline queue
    pub queue_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            max_retries: 2,
            backoff_base_ms: 1_000,
            saved_display_ms: 1_500,
            queue_key: "soundstage.sync-queue".to_string(),
        }
    }
}

/// Collaborators of a sync engine
#[derive(Clone)]
pub struct SyncDeps {
    pub store: Arc<dyn SettingsStore>,
    pub storage: Arc<dyn KeyValueStore>,
    pub connectivity: Arc<dyn Connectivity>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(SyncStatus) + Send>;

/// A write waiting for its next retry
struct InFlight {
    update: SettingsUpdate,
    attempt: u32,
    retry_at: Duration,
}

pub struct SyncEngine {
    user_id: String,
    config: SyncConfig,
    deps: SyncDeps,
    queue: OfflineQueue,
    status: SyncStatus,
    last_error: Option<StoreError>,
    pending: Option<SettingsUpdate>,
    debounce_at: Option<Duration>,
    in_flight: Option<InFlight>,
    saved_until: Option<Duration>,
    was_online: bool,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl SyncEngine {
    pub fn new(user_id: impl Into<String>, config: SyncConfig, deps: SyncDeps) -> Self {
        let queue = OfflineQueue::new(deps.storage.clone(), config.queue_key.clone());
        Self {
            user_id: user_id.into(),
            config,
            deps,
            queue,
            status: SyncStatus::Idle,
            last_error: None,
            pending: None,
            debounce_at: None,
            in_flight: None,
            saved_until: None,
            // the first online tick replays whatever earlier sessions queued
            was_online: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Last persistence failure, cleared by the next successful write
    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    pub fn has_pending_work(&self) -> bool {
        self.pending.is_some() || self.in_flight.is_some()
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Observe status transitions. The listener is called right away with
    /// the current status.
    pub fn subscribe(&mut self, mut listener: impl FnMut(SyncStatus) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        listener(self.status);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Merge `update` into the pending buffer and restart the debounce
    pub fn save(&mut self, update: SettingsUpdate) {
        if update.is_empty() {
            return;
        }
        match &mut self.pending {
            Some(pending) => pending.merge(update),
            None => self.pending = Some(update),
        }
        self.debounce_at = Some(self.deps.clock.now() + self.debounce());
        if self.status != SyncStatus::Saving {
            self.set_status(SyncStatus::Pending);
        }
    }

    /// Advance timers: reconnect detection, retries, the debounce and the
    /// saved display window
    pub fn tick(&mut self) {
        let online = self.deps.connectivity.is_online();
        if online && !self.was_online {
            debug!("connection available, replaying offline queue");
            self.was_online = true;
            self.flush_offline_queue();
        } else if !online {
            self.was_online = false;
        }

        let now = self.deps.clock.now();

        if self.in_flight.as_ref().is_some_and(|f| now >= f.retry_at) {
            if let Some(in_flight) = self.in_flight.take() {
                self.attempt(in_flight.update, in_flight.attempt);
            }
        }

        if self.debounce_at.is_some_and(|at| now >= at) {
            if self.in_flight.is_some() {
                self.debounce_at = Some(now + self.debounce());
            } else {
                self.debounce_at = None;
                if let Some(update) = self.pending.take() {
                    self.persist(update);
                }
            }
        }

        if self.status == SyncStatus::Saved && self.saved_until.is_some_and(|until| now >= until) {
            self.saved_until = None;
            self.set_status(SyncStatus::Idle);
        }
    }

    /// Cancel the debounce and persist whatever is pending right away. A
    /// write waiting for its retry absorbs the pending buffer and is retried
    /// immediately.
    pub fn flush(&mut self) {
        self.debounce_at = None;
        let pending = self.pending.take();

        match (self.in_flight.take(), pending) {
            (Some(mut in_flight), pending) => {
                if let Some(update) = pending {
                    in_flight.update.merge(update);
                }
                self.attempt(in_flight.update, in_flight.attempt);
            }
            (None, Some(update)) => self.persist(update),
            (None, None) => {}
        }
    }

    /// Drop pending and retrying work without persisting it. The offline
    /// queue is left alone.
    pub fn cancel(&mut self) {
        if self.has_pending_work() {
            debug!("dropping unsaved settings for {}", self.user_id);
        }
        self.pending = None;
        self.debounce_at = None;
        self.in_flight = None;
        self.saved_until = None;
        self.set_status(SyncStatus::Idle);
    }

    /// Move pending and retrying work into the offline queue, so it is
    /// replayed by a later session instead of being lost with this engine
    pub fn park(&mut self) {
        let mut parked = self.in_flight.take().map(|f| f.update);
        if let Some(update) = self.pending.take() {
            match &mut parked {
                Some(parked) => parked.merge(update),
                None => parked = Some(update),
            }
        }
        self.debounce_at = None;
        if let Some(update) = parked {
            self.enqueue(update);
        }
    }

    /// Replay every queued item once; failures go back into the queue
    pub fn flush_offline_queue(&mut self) {
        if !self.deps.connectivity.is_online() {
            return;
        }
        let items = match self.queue.take_all() {
            Ok(items) => items,
            Err(e) => {
                error!("failed to read offline queue: {}", e);
                return;
            }
        };
        if items.is_empty() {
            return;
        }

        info!("replaying {} queued settings update(s)", items.len());
        self.set_status(SyncStatus::Saving);

        let mut failure = None;
        for item in items {
            if let Err(e) = self.deps.store.write_settings(&item.user_id, &item.pending_updates) {
                warn!("replay for {} failed, requeueing: {}", item.user_id, e);
                if let Err(e) = self.queue.enqueue(&item.user_id, item.pending_updates, item.timestamp) {
                    error!("failed to requeue settings for {}: {}", item.user_id, e);
                }
                failure = Some(e);
            }
        }

        match failure {
            // a write waiting for its retry still owns the status
            None if self.in_flight.is_some() => self.set_status(SyncStatus::Saving),
            None => self.mark_saved(),
            Some(e) if e.is_network() => {
                self.last_error = Some(e);
                self.set_status(SyncStatus::Pending);
            }
            Some(e) => {
                self.last_error = Some(e);
                self.set_status(SyncStatus::Error);
            }
        }
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.config.debounce_ms)
    }

    fn persist(&mut self, update: SettingsUpdate) {
        self.attempt(update, 0);
    }

    fn attempt(&mut self, update: SettingsUpdate, attempt: u32) {
        if !self.deps.connectivity.is_online() {
            self.requeue(update);
            return;
        }

        let update = self.with_queued(update);
        self.set_status(SyncStatus::Saving);
        match self.deps.store.write_settings(&self.user_id, &update) {
            Ok(()) => {
                info!("settings saved for {}", self.user_id);
                self.last_error = None;
                self.mark_saved();
                self.flush_offline_queue();
            }
            Err(e) if attempt < self.config.max_retries => {
                let delay = self
                    .config
                    .backoff_base_ms
                    .saturating_mul(2u64.saturating_pow(attempt));
                debug!("save attempt {} failed ({}), retrying in {} ms", attempt + 1, e, delay);
                self.last_error = Some(e);
                self.in_flight = Some(InFlight {
                    update,
                    attempt: attempt + 1,
                    retry_at: self.deps.clock.now() + Duration::from_millis(delay),
                });
            }
            Err(e) if e.is_network() => {
                self.last_error = Some(e);
                self.requeue(update);
            }
            Err(e) => {
                error!("failed to save settings for {}: {}", self.user_id, e);
                self.last_error = Some(e);
                self.set_status(SyncStatus::Error);
            }
        }
    }

    /// This user's queued edits with `update` laid on top, taken out of the
    /// queue so an older item can never land after a newer write
    fn with_queued(&mut self, update: SettingsUpdate) -> SettingsUpdate {
        match self.queue.take(&self.user_id) {
            Ok(Some(mut item)) => {
                debug!("folding queued settings for {} into this write", self.user_id);
                item.pending_updates.merge(update);
                item.pending_updates
            }
            Ok(None) => update,
            Err(e) => {
                warn!("offline queue unreadable, writing without it: {}", e);
                update
            }
        }
    }

    /// Queue a write that could not reach the store; the next online tick
    /// replays it even if no disconnect was observed in between
    fn requeue(&mut self, update: SettingsUpdate) {
        self.was_online = false;
        self.enqueue(update);
    }

    fn enqueue(&mut self, update: SettingsUpdate) {
        let timestamp = self.deps.clock.timestamp_ms();
        match self.queue.enqueue(&self.user_id, update, timestamp) {
            Ok(()) => {
                warn!("offline, settings for {} queued", self.user_id);
                self.set_status(SyncStatus::Pending);
            }
            Err(e) => {
                error!("failed to queue settings for {}: {}", self.user_id, e);
                self.last_error = Some(e);
                self.set_status(SyncStatus::Error);
            }
        }
    }

    fn mark_saved(&mut self) {
        self.saved_until =
            Some(self.deps.clock.now() + Duration::from_millis(self.config.saved_display_ms));
        self.set_status(SyncStatus::Saved);
    }

    fn set_status(&mut self, status: SyncStatus) {
        if self.status == status {
            return;
        }
        debug!("sync {}: {:?} -> {:?}", self.user_id, self.status, status);
        self.status = status;
        for (_, listener) in self.listeners.iter_mut() {
            listener(status);
        }
    }
}
