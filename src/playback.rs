//! Playback controller.
//!
//! One object owns "what is playing": the playlist, the current track and
//! position, and whether playback is running. Components that want to start
//! or skip a track call it directly; commands reach the source through the
//! context's [`TransportHandle`].
//!
//! The current track and position are kept in durable local storage and
//! restored when a controller is created, so a session picks up where the
//! last one stopped.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{error::GraphError, graph::handles::TransportHandle, platform::KeyValueStore};

pub const PLAYER_STATE_KEY: &str = "soundstage.player";

/// Seconds into a track after which "previous" restarts it instead
const RESTART_THRESHOLD_SECS: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerState {
    pub track_index: usize,
    pub position_secs: f64,
}

pub struct PlaybackController {
    tracks: Vec<Track>,
    state: PlayerState,
    playing: bool,
    transport: Option<TransportHandle>,
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl PlaybackController {
    pub fn new(tracks: Vec<Track>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(tracks, storage, PLAYER_STATE_KEY)
    }

    pub fn with_key(tracks: Vec<Track>, storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let mut state = restore(storage.as_ref(), &key);
        if state.track_index >= tracks.len() {
            state = PlayerState::default();
        }

        Self {
            tracks,
            state,
            playing: false,
            transport: None,
            storage,
            key,
        }
    }

    /// Route commands to a source's transport and move it to the restored
    /// track and position
    pub fn connect(&mut self, transport: TransportHandle) -> Result<(), GraphError> {
        transport.select(self.state.track_index)?;
        transport.seek(self.state.position_secs)?;
        if self.playing {
            transport.play()?;
        }
        self.transport = Some(transport);
        Ok(())
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.state.track_index)
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) -> Result<(), GraphError> {
        if self.tracks.is_empty() {
            return Ok(());
        }
        self.playing = true;
        self.send(|t| t.play())
    }

    pub fn pause(&mut self) -> Result<(), GraphError> {
        self.playing = false;
        self.persist();
        self.send(|t| t.pause())
    }

    pub fn toggle(&mut self) -> Result<(), GraphError> {
        if self.playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn next(&mut self) -> Result<(), GraphError> {
        if self.tracks.is_empty() {
            return Ok(());
        }
        let index = (self.state.track_index + 1) % self.tracks.len();
        self.select(index)
    }

    pub fn previous(&mut self) -> Result<(), GraphError> {
        if self.tracks.is_empty() {
            return Ok(());
        }
        if self.state.position_secs > RESTART_THRESHOLD_SECS {
            return self.seek(0.0);
        }
        let len = self.tracks.len();
        self.select((self.state.track_index + len - 1) % len)
    }

    /// Jump to the track at `index`, keeping the play/pause state
    pub fn select(&mut self, index: usize) -> Result<(), GraphError> {
        if index >= self.tracks.len() {
            return Ok(());
        }
        self.state = PlayerState {
            track_index: index,
            position_secs: 0.0,
        };
        self.persist();
        debug!("selected track {}", index);
        self.send(|t| t.select(index))
    }

    pub fn seek(&mut self, seconds: f64) -> Result<(), GraphError> {
        self.state.position_secs = seconds.max(0.0);
        self.persist();
        self.send(|t| t.seek(seconds.max(0.0)))
    }

    /// Record the position reported by the source. Not persisted on every
    /// call; pause, seek and track changes write it out.
    pub fn update_position(&mut self, seconds: f64) {
        self.state.position_secs = seconds.max(0.0);
    }

    fn send(&self, f: impl FnOnce(&TransportHandle) -> Result<(), GraphError>) -> Result<(), GraphError> {
        match &self.transport {
            Some(transport) => f(transport),
            None => Ok(()),
        }
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.state)
            .map_err(|e| e.to_string())
            .and_then(|text| self.storage.set(&self.key, &text).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("could not save player state: {}", e);
        }
    }
}

fn restore(storage: &dyn KeyValueStore, key: &str) -> PlayerState {
    match storage.get(key) {
        Ok(Some(text)) => serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("ignoring unreadable player state: {}", e);
            PlayerState::default()
        }),
        Ok(None) => PlayerState::default(),
        Err(e) => {
            warn!("could not read player state: {}", e);
            PlayerState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{AudioContext, OfflineBackend},
        graph::source::{BufferSource, MediaSource, StereoBuffer},
        platform::MemoryStorage,
    };

    fn tracks() -> Vec<Track> {
        vec![
            Track::new("a", "Opening"),
            Track::new("b", "Interview"),
            Track::new("c", "Outro"),
        ]
    }

    #[test]
    fn next_and_previous_wrap() {
        let mut player = PlaybackController::new(tracks(), Arc::new(MemoryStorage::new()));
        player.previous().unwrap();
        assert_eq!(player.state().track_index, 2);
        player.next().unwrap();
        player.next().unwrap();
        assert_eq!(player.current().unwrap().id, "b");
    }

    #[test]
    fn previous_restarts_a_track_in_progress() {
        let mut player = PlaybackController::new(tracks(), Arc::new(MemoryStorage::new()));
        player.next().unwrap();
        player.update_position(42.0);
        player.previous().unwrap();
        assert_eq!(player.state(), PlayerState {
            track_index: 1,
            position_secs: 0.0
        });
    }

    #[test]
    fn state_survives_a_new_controller() {
        let storage = MemoryStorage::new();
        let mut player = PlaybackController::new(tracks(), Arc::new(storage.clone()));
        player.select(2).unwrap();
        player.seek(12.5).unwrap();

        let restored = PlaybackController::new(tracks(), Arc::new(storage));
        assert_eq!(restored.state(), PlayerState {
            track_index: 2,
            position_secs: 12.5
        });
    }

    #[test]
    fn stale_index_falls_back_to_start() {
        let storage = MemoryStorage::new();
        storage
            .set(PLAYER_STATE_KEY, r#"{"track_index":9,"position_secs":1.0}"#)
            .unwrap();
        let player = PlaybackController::new(tracks(), Arc::new(storage));
        assert_eq!(player.state(), PlayerState::default());
    }

    #[test]
    fn commands_reach_the_source() {
        const SR: f32 = 48_000.0;
        let (backend, output) = OfflineBackend::new(SR);
        let mut context = AudioContext::new(Box::new(backend));
        let quiet = StereoBuffer::new(vec![0.1; 4_800], vec![0.1; 4_800], SR);
        let loud = StereoBuffer::new(vec![0.8; 4_800], vec![0.8; 4_800], SR);
        context
            .attach(Box::new(BufferSource::with_tracks(vec![quiet, loud])))
            .unwrap();
        context.resume().unwrap();

        let mut player = PlaybackController::new(tracks(), Arc::new(MemoryStorage::new()));
        player.connect(context.transport().unwrap()).unwrap();
        player.next().unwrap();
        player.play().unwrap();

        let (l, _) = output.render(64);
        assert!(l.iter().all(|&s| (s - 0.8).abs() < 1e-6));
        let current = context.inspect(|chain| chain.source().is_playing());
        assert_eq!(current, Some(true));
    }
}
