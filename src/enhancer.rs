//! Enhancement session.
//!
//! An [`Enhancer`] is one explicitly owned pipeline for one player: it owns
//! the context, the control-side engines, the analysis tap and the sync
//! engine of the signed-in user. Components that need it borrow it.
//!
//! Graph and parameter failures stop here. They are logged and turned into
//! [`Capabilities`] so the player degrades to plain playback instead of
//! failing. Persistence failures only show up on the sync status channel.

use std::{collections::VecDeque, sync::Arc};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::{
    config::EnhancerConfig,
    context::{AudioContext, ContextState},
    equalizer::{EqualizerEngine, BAND_COUNT},
    error::{ContextError, ControlError, GraphError, PresetError},
    graph::{
        analyser::AnalysisTap,
        builder::{GraphBuilder, GraphConfig},
        handles::TransportHandle,
        source::{MediaSource, SourceId},
    },
    platform::{AuthSubscription, IdentityProvider},
    spatial::{CompressionState, Position, SpatialEngine},
    sync::{update::MAX_MASTER_VOLUME, SettingsUpdate, SyncDeps, SyncEngine, SyncStatus, VolumeSettings},
};

/// Features that are actually live. All false until a source is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub has_equalizer: bool,
    pub has_compression: bool,
    pub has_spatial_audio: bool,
    pub has_visualizer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncSubscription(u64);

type StatusListener = Box<dyn FnMut(SyncStatus) + Send>;
type SharedListeners = Arc<Mutex<Vec<(SyncSubscription, StatusListener)>>>;
type AuthEvents = Arc<Mutex<VecDeque<Option<String>>>>;

pub struct Enhancer {
    context: AudioContext,
    config: EnhancerConfig,
    deps: SyncDeps,
    equalizer: EqualizerEngine,
    spatial: SpatialEngine,
    volume: VolumeSettings,
    capabilities: Capabilities,
    analysis: Option<AnalysisTap>,
    built: bool,
    sync: Option<SyncEngine>,
    listeners: SharedListeners,
    next_listener: u64,
    identity: Option<(Arc<dyn IdentityProvider>, AuthSubscription)>,
    auth_events: AuthEvents,
}

impl Enhancer {
    /// A session with no source and no signed-in user
    pub fn new(context: AudioContext, config: EnhancerConfig, deps: SyncDeps) -> Self {
        Self {
            context,
            config,
            deps,
            equalizer: EqualizerEngine::new(),
            spatial: SpatialEngine::new(),
            volume: VolumeSettings::default(),
            capabilities: Capabilities::default(),
            analysis: None,
            built: false,
            sync: None,
            listeners: Arc::default(),
            next_listener: 0,
            identity: None,
            auth_events: Arc::default(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    pub fn equalizer(&self) -> &EqualizerEngine {
        &self.equalizer
    }

    pub fn spatial(&self) -> &SpatialEngine {
        &self.spatial
    }

    pub fn master_volume(&self) -> u8 {
        self.volume.master
    }

    pub fn transport(&self) -> Option<TransportHandle> {
        self.context.transport()
    }

    /// Hand the analysis tap to a visualizer. There is only one.
    pub fn take_analysis_tap(&mut self) -> Option<AnalysisTap> {
        self.analysis.take()
    }

    /// Give a tap back after the visualizer stopped
    pub fn return_analysis_tap(&mut self, tap: AnalysisTap) {
        self.analysis = Some(tap);
    }

    pub fn user_id(&self) -> Option<&str> {
        self.sync.as_ref().map(|sync| sync.user_id())
    }

    /// Bind the player's source and build the enhancement graph around it.
    ///
    /// A conflicting source is refused and the current one keeps playing.
    /// A graph that cannot be built leaves plain playback running with every
    /// capability off.
    pub fn attach(&mut self, source: Box<dyn MediaSource>) -> Result<SourceId, ContextError> {
        let id = self.context.attach(source)?;
        if !self.built {
            self.build_graph();
            self.apply_volume();
        }
        Ok(id)
    }

    pub fn resume(&mut self) -> Result<(), ContextError> {
        self.context.resume()
    }

    pub fn suspend(&mut self) -> Result<(), ContextError> {
        self.context.suspend()
    }

    pub fn state(&self) -> ContextState {
        self.context.state()
    }

    /// Save outstanding settings and release the audio resources
    pub fn teardown(&mut self) {
        self.unfollow_identity();
        if let Some(sync) = self.sync.as_mut() {
            sync.flush();
            if sync.has_pending_work() {
                sync.park();
            }
        }
        self.analysis = None;
        self.equalizer.mark_unavailable();
        self.spatial.mark_compressor_unavailable();
        self.spatial.mark_panner_unavailable();
        self.capabilities = Capabilities::default();
        self.context.teardown();
    }

    fn build_graph(&mut self) {
        let stages = self.config.stages;
        let graph = GraphConfig {
            equalizer: stages.equalizer.then(|| self.equalizer.band_specs()),
            compression: stages.compression.then(|| self.spatial.compression()),
            spatial: stages.spatial.then(|| self.spatial.position()),
            analysis: stages.analysis.then_some(self.config.analysis),
            smoothing: self.config.smoothing,
        };

        match GraphBuilder::new(graph).build(&self.context) {
            Ok(handles) => {
                match handles.equalizer {
                    Some(handle) => self.equalizer.attach(handle),
                    None => self.equalizer.mark_unavailable(),
                }
                match handles.compressor {
                    Some(handle) => self.spatial.attach_compressor(handle),
                    None => self.spatial.mark_compressor_unavailable(),
                }
                match handles.panner {
                    Some(handle) => self.spatial.attach_panner(handle),
                    None => self.spatial.mark_panner_unavailable(),
                }
                self.capabilities.has_visualizer = handles.analysis.is_some();
                self.analysis = handles.analysis;
            }
            Err(e) => {
                warn!("audio enhancement unavailable, plain playback only: {}", e);
                self.equalizer.mark_unavailable();
                self.spatial.mark_compressor_unavailable();
                self.spatial.mark_panner_unavailable();
                self.capabilities.has_visualizer = false;
            }
        }
        self.built = true;
        self.refresh_capabilities();
    }

    fn refresh_capabilities(&mut self) {
        if !self.built {
            return;
        }
        self.capabilities.has_equalizer = self.equalizer.is_available();
        self.capabilities.has_compression = self.spatial.has_compression();
        self.capabilities.has_spatial_audio = self.spatial.has_spatial();
    }

    /// Swallow a stage error, keeping the capability flags in step
    fn absorb(&mut self, error: GraphError) {
        match error {
            GraphError::Unavailable(stage) => {
                debug!("{} change not heard: stage unavailable", stage);
            }
            other => warn!("parameter change not applied: {}", other),
        }
        self.refresh_capabilities();
    }

    fn absorb_control(&mut self, error: ControlError) -> Result<(), PresetError> {
        match error {
            ControlError::Preset(e) => Err(e),
            ControlError::Graph(e) => {
                self.absorb(e);
                Ok(())
            }
        }
    }

    /// Set one equalizer band; returns the stored (clamped) gain, or `None`
    /// for a band that does not exist
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Option<f32> {
        match self.equalizer.set_band_gain(index, gain_db) {
            Ok(_) => {}
            Err(GraphError::BandOutOfRange { index, bands }) => {
                warn!("ignoring gain for band {} of {}", index, bands);
                return None;
            }
            Err(e) => self.absorb(e),
        }
        self.save_gains();
        self.equalizer.gain(index)
    }

    pub fn apply_preset(&mut self, name: &str) -> Result<(), PresetError> {
        if let Err(e) = self.equalizer.apply_preset(name) {
            self.absorb_control(e)?;
        }
        self.save_gains();
        Ok(())
    }

    pub fn reset_equalizer(&mut self) {
        if let Err(e) = self.equalizer.reset() {
            // the flat preset is always in the catalog
            let _ = self.absorb_control(e);
        }
        self.save_gains();
    }

    pub fn set_position(&mut self, position: Position) -> Position {
        match self.spatial.set_position(position) {
            Ok(position) => position,
            Err(e) => {
                self.absorb(e);
                self.spatial.position()
            }
        }
    }

    pub fn apply_spatial_preset(&mut self, name: &str) -> Result<(), PresetError> {
        match self.spatial.apply_spatial_preset(name) {
            Ok(()) => Ok(()),
            Err(e) => self.absorb_control(e),
        }
    }

    pub fn set_compression(&mut self, threshold_db: f32, ratio: f32) -> CompressionState {
        match self.spatial.set_compression(threshold_db, ratio) {
            Ok(state) => state,
            Err(e) => {
                self.absorb(e);
                self.spatial.compression()
            }
        }
    }

    /// Output level 0-100; larger values are clamped
    pub fn set_master_volume(&mut self, master: u8) -> u8 {
        self.volume = VolumeSettings {
            master: master.min(MAX_MASTER_VOLUME),
        };
        self.apply_volume();
        if let Some(sync) = self.sync.as_mut() {
            sync.save(SettingsUpdate::volume(self.volume.master));
        }
        self.volume.master
    }

    fn apply_volume(&mut self) {
        if let Some(transport) = self.context.transport() {
            if let Err(e) = transport.set_master_gain(self.volume.gain()) {
                warn!("volume change not applied: {}", e);
            }
        }
    }

    fn save_gains(&mut self) {
        if let Some(sync) = self.sync.as_mut() {
            sync.save(SettingsUpdate::gains(self.equalizer.gains()));
        }
    }

    /// Apply identity changes reported since the last tick, then drive the
    /// sync engine's timers
    pub fn tick(&mut self) {
        loop {
            let event = self.auth_events.lock().pop_front();
            match event {
                Some(user_id) => self.handle_auth_change(user_id),
                None => break,
            }
        }
        if let Some(sync) = self.sync.as_mut() {
            sync.tick();
        }
    }

    /// Persist pending settings right away
    pub fn flush(&mut self) {
        if let Some(sync) = self.sync.as_mut() {
            sync.flush();
        }
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync.as_ref().map_or(SyncStatus::Idle, |sync| sync.status())
    }

    pub fn sync_engine(&self) -> Option<&SyncEngine> {
        self.sync.as_ref()
    }

    /// Observe sync status across identity changes. Called right away with
    /// the current status.
    pub fn subscribe_sync(&mut self, mut listener: impl FnMut(SyncStatus) + Send + 'static) -> SyncSubscription {
        let id = SyncSubscription(self.next_listener);
        self.next_listener += 1;
        listener(self.sync_status());
        self.listeners.lock().push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe_sync(&mut self, id: SyncSubscription) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }

    /// Adopt the provider's current user once
    pub fn sync_identity(&mut self, identity: &dyn IdentityProvider) {
        self.handle_auth_change(identity.current_user_id());
    }

    /// Adopt the provider's current user and keep following it.
    ///
    /// Sign-ins and sign-outs reported by the provider's callback may come
    /// from any thread; they are queued and applied in order on the next
    /// [`tick`](Self::tick).
    pub fn follow_identity(&mut self, identity: Arc<dyn IdentityProvider>) {
        self.unfollow_identity();
        self.handle_auth_change(identity.current_user_id());
        let events = self.auth_events.clone();
        let subscription = identity.on_auth_state_change(Arc::new(move |user_id: Option<&str>| {
            events.lock().push_back(user_id.map(str::to_string));
        }));
        self.identity = Some((identity, subscription));
    }

    /// Stop following the provider. The current user stays signed in.
    pub fn unfollow_identity(&mut self) {
        if let Some((identity, subscription)) = self.identity.take() {
            identity.remove_auth_listener(subscription);
        }
        self.auth_events.lock().clear();
    }

    /// Switch the session to another user, or to none.
    ///
    /// The previous user's edits are saved (or queued) when switching and
    /// dropped on sign-out. A newly signed-in user's stored settings are
    /// loaded into the engines.
    pub fn handle_auth_change(&mut self, user_id: Option<String>) {
        if self.user_id() == user_id.as_deref() {
            return;
        }

        if let Some(mut previous) = self.sync.take() {
            if user_id.is_some() {
                previous.flush();
                if previous.has_pending_work() {
                    previous.park();
                }
            } else {
                previous.cancel();
            }
        }

        let Some(user_id) = user_id else {
            self.notify(SyncStatus::Idle);
            return;
        };

        let mut sync = SyncEngine::new(user_id.clone(), self.config.sync.clone(), self.deps.clone());
        let listeners = self.listeners.clone();
        sync.subscribe(move |status| {
            for (_, listener) in listeners.lock().iter_mut() {
                listener(status);
            }
        });
        self.sync = Some(sync);
        self.restore_settings(&user_id);
    }

    fn notify(&self, status: SyncStatus) {
        for (_, listener) in self.listeners.lock().iter_mut() {
            listener(status);
        }
    }

    /// Load the user's stored record, with anything still waiting in the
    /// offline queue laid on top
    fn restore_settings(&mut self, user_id: &str) {
        let stored = match self.deps.store.read_settings(user_id) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("could not load settings for {}: {}", user_id, e);
                None
            }
        };
        let queued = self
            .sync
            .as_ref()
            .and_then(|sync| sync.queue().get(user_id).ok().flatten());
        if stored.is_none() && queued.is_none() {
            return;
        }

        let mut record = stored.unwrap_or_default();
        if let Some(item) = queued {
            record.apply(&item.pending_updates);
        }

        if let Some(gains) = record.gains {
            if gains.len() == BAND_COUNT {
                if let Err(e) = self.equalizer.restore(&gains) {
                    self.absorb(e);
                }
            } else {
                warn!("ignoring stored gains with {} bands", gains.len());
            }
        }
        if let Some(volume) = record.volume_settings {
            self.volume = VolumeSettings {
                master: volume.master.min(MAX_MASTER_VOLUME),
            };
            self.apply_volume();
        }
        info!("restored settings for {}", user_id);
    }
}

impl Drop for Enhancer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::StageToggles,
        context::{OfflineBackend, OfflineOutput},
        graph::source::{BufferSource, StereoBuffer},
        platform::{ManualClock, ManualConnectivity, MemorySettingsStore, MemoryStorage, SessionIdentity},
        sync::{PersistedSettings, VolumeSettings},
    };

    const SR: f32 = 48_000.0;

    struct Session {
        enhancer: Enhancer,
        output: OfflineOutput,
        store: MemorySettingsStore,
        clock: ManualClock,
    }

    fn session(config: EnhancerConfig) -> Session {
        let (backend, output) = OfflineBackend::new(SR);
        let store = MemorySettingsStore::new();
        let clock = ManualClock::new();
        let deps = SyncDeps {
            store: Arc::new(store.clone()),
            storage: Arc::new(MemoryStorage::new()),
            connectivity: Arc::new(ManualConnectivity::new(true)),
            clock: Arc::new(clock.clone()),
        };
        let enhancer = Enhancer::new(AudioContext::new(Box::new(backend)), config, deps);
        Session {
            enhancer,
            output,
            store,
            clock,
        }
    }

    fn source() -> Box<dyn MediaSource> {
        let buffer = StereoBuffer::new(vec![0.25; 9_600], vec![0.25; 9_600], SR);
        Box::new(BufferSource::new(buffer).looping(true))
    }

    #[test]
    fn capabilities_follow_the_built_stages() {
        let mut config = EnhancerConfig::default();
        config.stages = StageToggles {
            spatial: false,
            ..StageToggles::default()
        };
        let mut s = session(config);
        assert_eq!(s.enhancer.capabilities(), Capabilities::default());

        s.enhancer.attach(source()).unwrap();
        assert_eq!(
            s.enhancer.capabilities(),
            Capabilities {
                has_equalizer: true,
                has_compression: true,
                has_spatial_audio: false,
                has_visualizer: true,
            }
        );

        let moved = s.enhancer.set_position(Position::new(2.0, 0.0, -1.0));
        assert_eq!(moved, Position::new(2.0, 0.0, -1.0));
    }

    #[test]
    fn gains_are_saved_for_the_signed_in_user() {
        let mut s = session(EnhancerConfig::default());
        s.enhancer.handle_auth_change(Some("ada".into()));
        s.enhancer.attach(source()).unwrap();

        assert_eq!(s.enhancer.set_band_gain(3, 30.0), Some(12.0));
        assert_eq!(s.enhancer.set_band_gain(10, 1.0), None);
        assert_eq!(s.enhancer.sync_status(), SyncStatus::Pending);

        s.clock.advance_ms(500);
        s.enhancer.tick();
        let record = s.store.record("ada").unwrap();
        assert_eq!(record.gains.unwrap()[3], 12.0);
    }

    #[test]
    fn unknown_preset_is_reported() {
        let mut s = session(EnhancerConfig::default());
        s.enhancer.attach(source()).unwrap();
        assert_eq!(
            s.enhancer.apply_preset("Polka"),
            Err(PresetError::UnknownPreset("Polka".into()))
        );
        assert!(s.enhancer.apply_preset("Rock").is_ok());
        assert_eq!(s.enhancer.equalizer().selected_preset(), "Rock");
    }

    #[test]
    fn stored_settings_are_restored_on_sign_in() {
        let mut s = session(EnhancerConfig::default());
        let mut gains = vec![0.0; BAND_COUNT];
        gains[0] = 6.0;
        s.store.insert("ada", PersistedSettings {
            gains: Some(gains.clone()),
            volume_settings: Some(VolumeSettings { master: 40 }),
        });

        s.enhancer.handle_auth_change(Some("ada".into()));
        assert_eq!(s.enhancer.equalizer().gains(), gains);
        assert_eq!(s.enhancer.equalizer().selected_preset(), "Custom");
        assert_eq!(s.enhancer.master_volume(), 40);
        assert_eq!(s.store.attempt_count(), 0);
    }

    #[test]
    fn sign_out_drops_unsaved_edits() {
        let mut s = session(EnhancerConfig::default());
        s.enhancer.handle_auth_change(Some("ada".into()));
        s.enhancer.set_master_volume(30);
        s.enhancer.handle_auth_change(None);

        s.clock.advance_ms(1_000);
        s.enhancer.tick();
        assert_eq!(s.store.attempt_count(), 0);
        assert_eq!(s.enhancer.sync_status(), SyncStatus::Idle);
        assert_eq!(s.enhancer.user_id(), None);
    }

    #[test]
    fn switching_users_saves_the_previous_one() {
        let mut s = session(EnhancerConfig::default());
        s.enhancer.handle_auth_change(Some("ada".into()));
        s.enhancer.set_master_volume(30);
        s.enhancer.handle_auth_change(Some("bob".into()));

        assert_eq!(s.store.record("ada").unwrap().volume_settings, Some(VolumeSettings { master: 30 }));
        assert_eq!(s.enhancer.user_id(), Some("bob"));
    }

    #[test]
    fn volume_scales_output() {
        let mut s = session(EnhancerConfig::default());
        s.enhancer.attach(source()).unwrap();
        s.enhancer.transport().unwrap().play().unwrap();
        s.enhancer.resume().unwrap();
        s.enhancer.set_master_volume(50);

        let peak = |samples: &[f32]| samples.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        let (half, _) = s.output.render(48_000);
        s.enhancer.set_master_volume(100);
        let (full, _) = s.output.render(48_000);
        let ratio = peak(&half[47_000..]) / peak(&full[47_000..]);
        assert!((ratio - 0.5).abs() < 0.05);
    }

    #[test]
    fn sign_in_reported_by_the_provider_is_applied_on_tick() {
        let mut s = session(EnhancerConfig::default());
        s.store.insert(
            "ada",
            PersistedSettings {
                gains: None,
                volume_settings: Some(VolumeSettings { master: 35 }),
            },
        );
        let identity = SessionIdentity::default();
        s.enhancer.follow_identity(Arc::new(identity.clone()));
        s.enhancer.attach(source()).unwrap();
        assert_eq!(s.enhancer.user_id(), None);

        identity.sign_in("ada");
        s.enhancer.tick();
        assert_eq!(s.enhancer.user_id(), Some("ada"));
        assert_eq!(s.enhancer.master_volume(), 35);

        s.enhancer.set_band_gain(0, 4.0);
        s.clock.advance_ms(500);
        s.enhancer.tick();
        assert_eq!(s.store.record("ada").unwrap().gains.unwrap()[0], 4.0);

        identity.sign_out();
        s.enhancer.tick();
        assert_eq!(s.enhancer.user_id(), None);

        s.enhancer.unfollow_identity();
        identity.sign_in("bob");
        s.enhancer.tick();
        assert_eq!(s.enhancer.user_id(), None);
    }
}
