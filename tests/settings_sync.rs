use std::sync::Arc;

use parking_lot::Mutex;

use soundstage::{
    context::OfflineBackend,
    equalizer::BAND_COUNT,
    error::StoreError,
    graph::source::{BufferSource, StereoBuffer},
    platform::{
        KeyValueStore, ManualClock, ManualConnectivity, MemorySettingsStore, MemoryStorage,
        SessionIdentity,
    },
    sync::{PersistedSettings, SettingsUpdate, SyncConfig, VolumeSettings},
    AudioContext, Enhancer, EnhancerConfig, SyncDeps, SyncStatus,
};

struct Session {
    enhancer: Enhancer,
    clock: ManualClock,
    net: ManualConnectivity,
    store: MemorySettingsStore,
    storage: MemoryStorage,
    statuses: Arc<Mutex<Vec<SyncStatus>>>,
}

impl Session {
    fn new(online: bool) -> Self {
        Self::with_store(online, MemorySettingsStore::new(), MemoryStorage::new())
    }

    fn with_store(online: bool, store: MemorySettingsStore, storage: MemoryStorage) -> Self {
        let clock = ManualClock::new();
        let net = ManualConnectivity::new(online);
        let deps = SyncDeps {
            store: Arc::new(store.clone()),
            storage: Arc::new(storage.clone()),
            connectivity: Arc::new(net.clone()),
            clock: Arc::new(clock.clone()),
        };
        let (backend, _output) = OfflineBackend::new(48_000.0);
        let mut enhancer = Enhancer::new(
            AudioContext::new(Box::new(backend)),
            EnhancerConfig::default(),
            deps,
        );
        let buffer = StereoBuffer::new(vec![0.1; 4_800], vec![0.1; 4_800], 48_000.0);
        enhancer.attach(Box::new(BufferSource::new(buffer))).unwrap();

        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = statuses.clone();
        enhancer.subscribe_sync(move |status| sink.lock().push(status));

        Self {
            enhancer,
            clock,
            net,
            store,
            storage,
            statuses,
        }
    }

    fn sign_in(mut self, user: &str) -> Self {
        self.enhancer
            .sync_identity(&SessionIdentity::new(Some(user.to_string())));
        self
    }

    fn advance(&mut self, ms: u64) {
        self.clock.advance_ms(ms);
        self.enhancer.tick();
    }

    fn statuses(&self) -> Vec<SyncStatus> {
        self.statuses.lock().clone()
    }
}

#[test]
fn band_edits_and_volume_land_in_one_record() {
    let mut session = Session::new(true).sign_in("ada");

    for band in 0..BAND_COUNT {
        session.enhancer.set_band_gain(band, (band + 1) as f32);
    }
    session.advance(100);
    assert_eq!(session.enhancer.set_master_volume(80), 80);
    assert_eq!(session.enhancer.sync_status(), SyncStatus::Pending);

    session.advance(499);
    assert_eq!(session.store.attempt_count(), 0);
    session.advance(1);
    assert_eq!(session.store.attempt_count(), 1);

    let expected: Vec<f32> = (1..=10).map(|v| v as f32).collect();
    assert_eq!(
        session.store.record("ada"),
        Some(PersistedSettings {
            gains: Some(expected),
            volume_settings: Some(VolumeSettings { master: 80 }),
        })
    );
    assert_eq!(session.enhancer.sync_status(), SyncStatus::Saved);
}

#[test]
fn presets_are_saved_as_gain_vectors() {
    let mut session = Session::new(true).sign_in("ada");
    session.enhancer.apply_preset("Rock").unwrap();
    session.enhancer.apply_preset("Bass Boost").unwrap();
    session.advance(500);

    let (user, update) = session.store.attempts().remove(0);
    assert_eq!(user, "ada");
    assert_eq!(
        update,
        SettingsUpdate::gains(vec![8.0, 6.0, 5.0, 3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0])
    );
}

#[test]
fn nothing_is_saved_without_a_user() {
    let mut session = Session::new(true);
    session.enhancer.set_band_gain(0, 3.0);
    session.enhancer.set_master_volume(40);
    session.advance(5_000);

    assert_eq!(session.store.attempt_count(), 0);
    assert_eq!(session.enhancer.sync_status(), SyncStatus::Idle);
    // the edit is still heard
    assert_eq!(session.enhancer.equalizer().gain(0), Some(3.0));
}

#[test]
fn offline_edits_wait_in_the_queue_until_reconnect() {
    let mut session = Session::new(false).sign_in("ada");
    session.enhancer.set_master_volume(30);
    session.advance(500);

    assert_eq!(session.store.attempt_count(), 0);
    assert_eq!(session.enhancer.sync_status(), SyncStatus::Pending);
    let queue = session.enhancer.sync_engine().unwrap().queue();
    assert_eq!(
        queue.get("ada").unwrap().map(|item| item.pending_updates),
        Some(SettingsUpdate::volume(30))
    );

    session.statuses.lock().clear();
    session.net.set_online(true);
    session.advance(10);
    assert_eq!(session.store.attempt_count(), 1);
    session.advance(1_500);

    assert_eq!(
        session.statuses(),
        vec![SyncStatus::Saving, SyncStatus::Saved, SyncStatus::Idle]
    );
    assert_eq!(
        session.store.record("ada").unwrap().volume_settings,
        Some(VolumeSettings { master: 30 })
    );
    assert!(session
        .enhancer
        .sync_engine()
        .unwrap()
        .queue()
        .is_empty()
        .unwrap());
}

#[test]
fn flush_skips_the_debounce() {
    let mut session = Session::new(true).sign_in("ada");
    session.enhancer.set_band_gain(3, -4.0);
    session.advance(50);
    session.enhancer.flush();

    assert_eq!(session.store.attempt_count(), 1);
    session.advance(1_000);
    assert_eq!(session.store.attempt_count(), 1);
}

#[test]
fn rejected_writes_surface_as_error_status_only() {
    let mut session = Session::new(true).sign_in("ada");
    for _ in 0..3 {
        session
            .store
            .fail_next(StoreError::Validation("rejected".into()));
    }
    assert_eq!(session.enhancer.set_band_gain(0, 6.0), Some(6.0));
    session.advance(500);
    session.advance(1_000);
    session.advance(2_000);

    assert_eq!(session.store.attempt_count(), 3);
    assert_eq!(session.enhancer.sync_status(), SyncStatus::Error);
    // the audible state is untouched by persistence failures
    assert_eq!(session.enhancer.equalizer().gain(0), Some(6.0));
    assert!(session.enhancer.capabilities().has_equalizer);
}

#[test]
fn queued_edits_from_a_previous_session_win_on_sign_in() {
    let store = MemorySettingsStore::new();
    let storage = MemoryStorage::new();
    store.insert(
        "ada",
        PersistedSettings {
            gains: Some(vec![2.0; BAND_COUNT]),
            volume_settings: Some(VolumeSettings { master: 90 }),
        },
    );

    {
        let mut earlier = Session::with_store(false, store.clone(), storage.clone()).sign_in("ada");
        earlier.enhancer.set_master_volume(25);
        earlier.advance(500);
        assert_eq!(store.attempt_count(), 0);
    }

    let session = Session::with_store(true, store, storage).sign_in("ada");
    assert_eq!(session.enhancer.equalizer().gains(), vec![2.0; BAND_COUNT]);
    assert_eq!(session.enhancer.master_volume(), 25);
    // replayed on the first online tick, not before
    let queue_key = SyncConfig::default().queue_key;
    assert!(session.storage.get(&queue_key).unwrap().is_some());
}

#[test]
fn signing_out_stops_saving() {
    let mut session = Session::new(true).sign_in("ada");
    session.enhancer.set_master_volume(55);
    session.enhancer.handle_auth_change(None);
    session.advance(2_000);

    assert_eq!(session.store.attempt_count(), 0);
    assert_eq!(session.enhancer.user_id(), None);
    assert_eq!(session.statuses().last(), Some(&SyncStatus::Idle));
}

#[test]
fn sign_in_from_another_thread_is_followed_on_tick() {
    let mut session = Session::new(true);
    let identity = SessionIdentity::default();
    session.enhancer.follow_identity(Arc::new(identity.clone()));

    let remote = identity.clone();
    std::thread::spawn(move || remote.sign_in("ada"))
        .join()
        .unwrap();
    assert_eq!(session.enhancer.user_id(), None);

    session.enhancer.set_master_volume(60);
    session.advance(0);
    assert_eq!(session.enhancer.user_id(), Some("ada"));

    session.enhancer.set_master_volume(45);
    session.advance(500);
    assert_eq!(
        session.store.record("ada").unwrap().volume_settings,
        Some(VolumeSettings { master: 45 })
    );
}
