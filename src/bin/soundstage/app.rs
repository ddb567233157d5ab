//! Player - wires the enhancement session to a real output device

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result as EyreResult, WrapErr};

use soundstage::{
    context::{AudioContext, CpalBackend},
    equalizer::{validate_preset_names, BAND_COUNT},
    graph::{
        panner::Position,
        source::{BufferSource, MediaSource, StereoBuffer},
    },
    platform::{
        Connectivity, FileSettingsStore, FileStorage, IdentityProvider, ManualConnectivity,
        SessionIdentity, SystemClock,
    },
    playback::{PlaybackController, Track},
    spatial::validate_spatial_preset_names,
    visualizer::{self, terminal::SharedCanvas, StopHandle, VisualMode},
    Enhancer, EnhancerConfig, SyncDeps,
};

use super::cli::Args;

/// Presets reachable with the `e` key, in cycling order
pub const EQ_CYCLE: [&str; 8] = [
    "Flat",
    "Rock",
    "Pop",
    "Jazz",
    "Classical",
    "Vocal",
    "Bass Boost",
    "Late Night",
];

/// Spatial presets reachable with the `s` key
pub const SPATIAL_CYCLE: [&str; 6] = [
    "Center",
    "Wide",
    "Concert Hall",
    "Intimate",
    "Left Stage",
    "Right Stage",
];

/// Threshold/ratio pairs reachable with the `c` key
pub const COMPRESSION_CYCLE: [(f32, f32); 4] = [(-24.0, 4.0), (-18.0, 6.0), (-30.0, 2.0), (-12.0, 10.0)];

const SEEK_STEP_SECS: f64 = 5.0;
const VOLUME_STEP: u8 = 5;
const TEST_SIGNAL_SECS: f32 = 8.0;
const TEST_SIGNAL_RATE: f32 = 44_100.0;

pub struct Player {
    pub enhancer: Enhancer,
    pub playback: PlaybackController,
    pub connectivity: ManualConnectivity,
    pub identity: SessionIdentity,
    pub canvas: SharedCanvas,
    pub mode: VisualMode,
    pub selected_band: usize,
    pub message: Option<String>,
    visualizer: Option<StopHandle<SharedCanvas>>,
    user: Option<String>,
    eq_index: usize,
    spatial_index: usize,
    compression_index: usize,
}

impl Player {
    pub fn from_args(args: &Args) -> EyreResult<Self> {
        validate_preset_names(EQ_CYCLE).wrap_err("equalizer key bindings")?;
        validate_spatial_preset_names(SPATIAL_CYCLE).wrap_err("spatial key bindings")?;

        let config = match &args.config {
            Some(path) => EnhancerConfig::load(path)?,
            None => EnhancerConfig::load_default()?,
        };

        let (buffers, tracks) = load_tracks(&args.wav)?;

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("soundstage");
        let storage = Arc::new(FileStorage::new(data_dir.join("local")).wrap_err("local storage")?);
        let connectivity = ManualConnectivity::new(!args.offline);
        let deps = SyncDeps {
            store: Arc::new(FileSettingsStore::new(data_dir.join("settings.json"))),
            storage: storage.clone(),
            connectivity: Arc::new(connectivity.clone()),
            clock: Arc::new(SystemClock::new()),
        };

        let backend = CpalBackend::new().wrap_err("failed to open the output device")?;
        let context = AudioContext::new(Box::new(backend));
        let frame_interval = Duration::from_millis(config.visualizer.frame_interval_ms);
        let mut enhancer = Enhancer::new(context, config, deps);

        let identity = SessionIdentity::new(args.user.clone());
        enhancer.follow_identity(Arc::new(identity.clone()));

        let source: Box<dyn MediaSource> = Box::new(BufferSource::with_tracks(buffers));
        enhancer.attach(source).wrap_err("failed to attach the player source")?;

        let mut playback = PlaybackController::new(tracks, storage);
        if let Some(transport) = enhancer.transport() {
            playback.connect(transport).wrap_err("transport")?;
        }

        let canvas = SharedCanvas::new(100.0, 40.0);
        let mode = args.visual_mode();
        let visualizer = Some(visualizer::render(
            canvas.clone(),
            enhancer.take_analysis_tap(),
            mode,
            frame_interval,
        ));

        Ok(Self {
            enhancer,
            playback,
            connectivity,
            identity,
            canvas,
            mode,
            selected_band: 0,
            message: None,
            visualizer,
            user: args.user.clone(),
            eq_index: 0,
            spatial_index: 0,
            compression_index: 0,
        })
    }

    /// Once per UI frame
    pub fn tick(&mut self) {
        self.enhancer.tick();
        if let Some(position) = self.enhancer.context().inspect(|chain| chain.source().position()) {
            self.playback.update_position(position);
        }
    }

    pub fn toggle_play(&mut self) {
        let result = if self.playback.is_playing() {
            self.playback.pause().map_err(|e| e.to_string()).and_then(|_| {
                self.enhancer.suspend().map_err(|e| e.to_string())
            })
        } else {
            // the device only opens on the first play
            self.enhancer
                .resume()
                .map_err(|e| e.to_string())
                .and_then(|_| self.playback.play().map_err(|e| e.to_string()))
        };
        self.report(result);
    }

    pub fn next_track(&mut self) {
        let result = self.playback.next().map_err(|e| e.to_string());
        self.report(result);
    }

    pub fn previous_track(&mut self) {
        let result = self.playback.previous().map_err(|e| e.to_string());
        self.report(result);
    }

    pub fn seek_by(&mut self, delta: f64) {
        let target = self.playback.state().position_secs + delta * SEEK_STEP_SECS;
        let result = self.playback.seek(target).map_err(|e| e.to_string());
        self.report(result);
    }

    pub fn select_band(&mut self, delta: isize) {
        let bands = BAND_COUNT as isize;
        self.selected_band = (self.selected_band as isize + delta).rem_euclid(bands) as usize;
    }

    pub fn nudge_band(&mut self, delta_db: f32) {
        let band = self.selected_band;
        let current = self.enhancer.equalizer().gain(band).unwrap_or(0.0);
        self.enhancer.set_band_gain(band, current + delta_db);
    }

    pub fn cycle_eq_preset(&mut self) {
        self.eq_index = (self.eq_index + 1) % EQ_CYCLE.len();
        let result = self
            .enhancer
            .apply_preset(EQ_CYCLE[self.eq_index])
            .map_err(|e| e.to_string());
        self.report(result);
    }

    pub fn reset_eq(&mut self) {
        self.eq_index = 0;
        self.enhancer.reset_equalizer();
    }

    pub fn cycle_spatial_preset(&mut self) {
        self.spatial_index = (self.spatial_index + 1) % SPATIAL_CYCLE.len();
        let result = self
            .enhancer
            .apply_spatial_preset(SPATIAL_CYCLE[self.spatial_index])
            .map_err(|e| e.to_string());
        self.report(result);
    }

    pub fn move_source(&mut self, dx: f32) {
        let current = self.enhancer.spatial().position();
        self.enhancer
            .set_position(Position::new(current.x + dx, current.y, current.z));
    }

    pub fn cycle_compression(&mut self) {
        self.compression_index = (self.compression_index + 1) % COMPRESSION_CYCLE.len();
        let (threshold, ratio) = COMPRESSION_CYCLE[self.compression_index];
        self.enhancer.set_compression(threshold, ratio);
    }

    pub fn change_volume(&mut self, up: bool) {
        let current = self.enhancer.master_volume();
        let next = if up {
            current.saturating_add(VOLUME_STEP)
        } else {
            current.saturating_sub(VOLUME_STEP)
        };
        self.enhancer.set_master_volume(next);
    }

    pub fn cycle_visual_mode(&mut self) {
        self.mode = self.mode.next();
        if let Some(handle) = self.visualizer.take() {
            self.visualizer = handle.restart(self.mode);
        }
    }

    pub fn toggle_online(&mut self) {
        let online = !self.connectivity.is_online();
        self.connectivity.set_online(online);
    }

    pub fn toggle_sign_in(&mut self) {
        match (self.identity.current_user_id(), &self.user) {
            (Some(_), _) => self.identity.sign_out(),
            (None, Some(user)) => self.identity.sign_in(user.clone()),
            (None, None) => {
                self.message = Some("start with --user to sign in".into());
            }
        }
    }

    pub fn flush(&mut self) {
        self.enhancer.flush();
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.visualizer.take() {
            if let Some((_, Some(tap))) = handle.stop() {
                self.enhancer.return_analysis_tap(tap);
            }
        }
        if self.playback.is_playing() {
            let _ = self.playback.pause();
        }
        self.enhancer.teardown();
    }

    fn report(&mut self, result: Result<(), String>) {
        self.message = result.err();
    }
}

fn load_tracks(paths: &[PathBuf]) -> EyreResult<(Vec<StereoBuffer>, Vec<Track>)> {
    if paths.is_empty() {
        return Ok((vec![test_signal()], vec![Track::new("test-signal", "Test signal")]));
    }

    let mut buffers = Vec::with_capacity(paths.len());
    let mut tracks = Vec::with_capacity(paths.len());
    for path in paths {
        buffers.push(load_wav(path)?);
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracks.push(Track::new(path.display().to_string(), title));
    }
    Ok((buffers, tracks))
}

fn load_wav(path: &Path) -> EyreResult<StereoBuffer> {
    let mut reader = hound::WavReader::open(path)
        .wrap_err_with(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .wrap_err_with(|| format!("failed to decode {}", path.display()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()
                .wrap_err_with(|| format!("failed to decode {}", path.display()))?
        }
    };

    Ok(StereoBuffer::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate as f32,
    ))
}

/// A major chord with a slow swell, slightly wider on the right
fn test_signal() -> StereoBuffer {
    let frames = (TEST_SIGNAL_SECS * TEST_SIGNAL_RATE) as usize;
    let notes = [220.0f32, 277.18, 329.63, 55.0];
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);

    for i in 0..frames {
        let t = i as f32 / TEST_SIGNAL_RATE;
        let swell = 0.6 + 0.4 * (TAU * 0.25 * t).sin();
        let chord: f32 = notes.iter().map(|&f| (TAU * f * t).sin()).sum::<f32>() / notes.len() as f32;
        let shimmer = 0.15 * (TAU * 1_760.0 * t).sin() * (TAU * 2.0 * t).sin().max(0.0);
        left.push(0.5 * swell * chord);
        right.push(0.5 * swell * chord + shimmer * 0.5);
    }

    StereoBuffer::new(left, right, TEST_SIGNAL_RATE)
}
