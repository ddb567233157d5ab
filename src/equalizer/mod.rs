//! Equalizer Engine
//!
//! Owns the band layout, the current gains and the selected preset name.
//! The engine is the source of truth: the live stage only ever mirrors it,
//! and an engine whose stage is still being built keeps accepting edits and
//! replays them once the stage is ready.

pub mod presets;

use log::warn;
use serde::{Deserialize, Serialize};

pub use presets::{find_preset, validate_preset_names, EqPreset, CUSTOM_PRESET, PRESETS};

use crate::{
    error::{ControlError, GraphError, PresetError},
    graph::{
        equalizer::{BandSpec, MAX_GAIN_DB, MIN_GAIN_DB},
        handles::{EqualizerHandle, StageLink},
    },
};

pub const BAND_COUNT: usize = 10;

/// Center frequencies of the bands, ascending
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1_000.0, 2_000.0, 4_000.0, 8_000.0, 16_000.0,
];

const STAGE: &str = "equalizer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerState {
    pub bands: Vec<BandSpec>,
    pub selected_preset: String,
}

impl Default for EqualizerState {
    fn default() -> Self {
        let bands = BAND_FREQUENCIES
            .iter()
            .enumerate()
            .map(|(i, &freq)| BandSpec {
                center_frequency_hz: freq,
                gain_db: 0.0,
                shape: BandSpec::shape_for(i, BAND_COUNT),
            })
            .collect();
        Self {
            bands,
            selected_preset: "Flat".to_string(),
        }
    }
}

fn clamp_gain(gain_db: f32) -> f32 {
    if gain_db.is_nan() {
        0.0
    } else {
        gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
    }
}

#[derive(Default)]
pub struct EqualizerEngine {
    state: EqualizerState,
    link: StageLink<EqualizerHandle>,
}

impl EqualizerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EqualizerState {
        &self.state
    }

    pub fn gains(&self) -> Vec<f32> {
        self.state.bands.iter().map(|band| band.gain_db).collect()
    }

    pub fn gain(&self, index: usize) -> Option<f32> {
        self.state.bands.get(index).map(|band| band.gain_db)
    }

    pub fn selected_preset(&self) -> &str {
        &self.state.selected_preset
    }

    pub fn band_count(&self) -> usize {
        self.state.bands.len()
    }

    /// Band layout to build the stage from
    pub fn band_specs(&self) -> Vec<BandSpec> {
        self.state.bands.clone()
    }

    /// False once the stage is known to be missing
    pub fn is_available(&self) -> bool {
        !self.link.is_unavailable()
    }

    /// Connect the built stage and bring it up to date with every edit made
    /// while it was pending
    pub fn attach(&mut self, handle: EqualizerHandle) {
        if let Err(e) = handle.set_gains(&self.gains()) {
            warn!("equalizer replay incomplete: {}", e);
        }
        self.link = StageLink::Ready(handle);
    }

    pub fn mark_unavailable(&mut self) {
        self.link = StageLink::Unavailable;
    }

    /// Set one band, clamped into range. The selected preset becomes
    /// [`CUSTOM_PRESET`]. Returns the stored gain.
    ///
    /// State is updated even when the stage is unavailable; the error only
    /// reports that nothing will be heard.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<f32, GraphError> {
        let bands = self.band_count();
        let band = self
            .state
            .bands
            .get_mut(index)
            .ok_or(GraphError::BandOutOfRange { index, bands })?;

        let gain = clamp_gain(gain_db);
        band.gain_db = gain;
        self.state.selected_preset = CUSTOM_PRESET.to_string();

        self.link
            .apply(STAGE, |handle| handle.set_band_gain(index, gain))?;
        Ok(gain)
    }

    /// Apply a catalog preset to every band at once. Unknown names fail
    /// without touching the state.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), ControlError> {
        let preset = find_preset(name).ok_or_else(|| PresetError::UnknownPreset(name.to_string()))?;

        for (band, &gain) in self.state.bands.iter_mut().zip(preset.gains.iter()) {
            band.gain_db = gain;
        }
        self.state.selected_preset = preset.name.to_string();

        let gains = self.gains();
        self.link.apply(STAGE, |handle| handle.set_gains(&gains))?;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), ControlError> {
        self.apply_preset("Flat")
    }

    /// Load persisted gains. The preset name is recovered when the gains
    /// match a catalog entry exactly.
    pub fn restore(&mut self, gains: &[f32]) -> Result<(), GraphError> {
        for (band, &gain) in self.state.bands.iter_mut().zip(gains.iter()) {
            band.gain_db = clamp_gain(gain);
        }
        let current = self.gains();
        self.state.selected_preset = presets::matching_preset(&current)
            .map(|preset| preset.name)
            .unwrap_or(CUSTOM_PRESET)
            .to_string();

        self.link.apply(STAGE, |handle| handle.set_gains(&current))
    }
}
