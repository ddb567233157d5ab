use serde::{Deserialize, Serialize};

use crate::{
    equalizer::BAND_COUNT,
    error::StoreError,
    graph::equalizer::{MAX_GAIN_DB, MIN_GAIN_DB},
};

pub const MAX_MASTER_VOLUME: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSettings {
    /// Output level, 0-100
    pub master: u8,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            master: MAX_MASTER_VOLUME,
        }
    }
}

impl VolumeSettings {
    /// Linear output gain for this level
    pub fn gain(&self) -> f32 {
        self.master.min(MAX_MASTER_VOLUME) as f32 / MAX_MASTER_VOLUME as f32
    }
}

/// Partial settings change. Absent fields are left untouched wherever the
/// update is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gains: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_settings: Option<VolumeSettings>,
}

impl SettingsUpdate {
    pub fn gains(gains: Vec<f32>) -> Self {
        Self {
            gains: Some(gains),
            ..Self::default()
        }
    }

    pub fn volume(master: u8) -> Self {
        Self {
            volume_settings: Some(VolumeSettings { master }),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gains.is_none() && self.volume_settings.is_none()
    }

    /// Fold a later update into this one; fields present in `later` win
    pub fn merge(&mut self, later: SettingsUpdate) {
        if later.gains.is_some() {
            self.gains = later.gains;
        }
        if later.volume_settings.is_some() {
            self.volume_settings = later.volume_settings;
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(gains) = &self.gains {
            if gains.len() != BAND_COUNT {
                return Err(StoreError::Validation(format!(
                    "expected {} gains, got {}",
                    BAND_COUNT,
                    gains.len()
                )));
            }
            if let Some(bad) = gains
                .iter()
                .find(|g| !(MIN_GAIN_DB..=MAX_GAIN_DB).contains(*g))
            {
                return Err(StoreError::Validation(format!("gain {} out of range", bad)));
            }
        }
        if let Some(volume) = &self.volume_settings {
            if volume.master > MAX_MASTER_VOLUME {
                return Err(StoreError::Validation(format!(
                    "master volume {} out of range",
                    volume.master
                )));
            }
        }
        Ok(())
    }
}

/// Stored settings of one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gains: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_settings: Option<VolumeSettings>,
}

impl PersistedSettings {
    /// Overwrite only the fields present in `update`
    pub fn apply(&mut self, update: &SettingsUpdate) {
        if let Some(gains) = &update.gains {
            self.gains = Some(gains.clone());
        }
        if let Some(volume) = update.volume_settings {
            self.volume_settings = Some(volume);
        }
    }
}
