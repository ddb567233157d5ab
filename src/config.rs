//! Enhancer configuration, read from and written to JSON.
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    graph::{analyser::AnalysisConfig, builder::SmoothingConfig},
    sync::SyncConfig,
    visualizer::VisualizerConfig,
};

const CONFIG_DIR: &str = "soundstage";
const CONFIG_FILE: &str = "config.json";

/// Stages built into the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    pub equalizer: bool,
    pub compression: bool,
    pub spatial: bool,
    pub analysis: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            equalizer: true,
            compression: true,
            spatial: true,
            analysis: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub stages: StageToggles,
    pub analysis: AnalysisConfig,
    pub smoothing: SmoothingConfig,
    pub sync: SyncConfig,
    pub visualizer: VisualizerConfig,
}

impl EnhancerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<config dir>/soundstage/config.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from [`default_path`](Self::default_path), or defaults when
    /// there is no file
    pub fn load_default() -> Result<Self, ConfigError> {
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        match Self::load(&path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("soundstage-config-{}-{}", name, std::process::id()))
            .join(CONFIG_FILE)
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: EnhancerConfig =
            serde_json::from_str(r#"{ "stages": { "spatial": false }, "sync": { "debounce_ms": 250 } }"#)
                .unwrap();
        assert!(!config.stages.spatial);
        assert!(config.stages.equalizer);
        assert_eq!(config.sync.debounce_ms, 250);
        assert_eq!(config.sync.max_retries, 2);
        assert_eq!(config.analysis.fft_size, 2048);
        assert_eq!(config.visualizer.frame_interval_ms, 16);
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("roundtrip");
        let mut config = EnhancerConfig::default();
        config.stages.compression = false;
        config.smoothing.gain_sec = 0.05;
        config.save(&path).unwrap();

        assert_eq!(EnhancerConfig::load(&path).unwrap(), config);
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn errors_name_the_file() {
        let path = temp_path("missing");
        let err = EnhancerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("config.json"));

        let bad = temp_path("bad");
        fs::create_dir_all(bad.parent().unwrap()).unwrap();
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(EnhancerConfig::load(&bad), Err(ConfigError::Parse { .. })));
        let _ = fs::remove_dir_all(bad.parent().unwrap());
    }
}
