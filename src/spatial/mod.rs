//! Spatial/Compression Module
//!
//! Two independent sub-graphs on the same chain: the panner that places the
//! source around the listener and the compressor ahead of the equalizer.
//! Every change is scheduled as a transition starting at the next rendered
//! sample, so moving the source or retuning dynamics never clicks.

pub mod presets;

use log::warn;
use serde::{Deserialize, Serialize};

pub use crate::graph::{compressor::CompressionState, panner::Position};
pub use presets::{find_spatial_preset, validate_spatial_preset_names, SpatialPreset, SPATIAL_PRESETS};

use crate::{
    error::{ControlError, GraphError, PresetError},
    graph::handles::{CompressorHandle, PannerHandle, StageLink},
};

/// Preset name once the position was set by hand
pub const CUSTOM_POSITION: &str = "Custom";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialState {
    pub position: Position,
    pub preset: String,
}

impl Default for SpatialState {
    fn default() -> Self {
        Self {
            position: Position::new(0.0, 0.0, -1.0),
            preset: "Center".to_string(),
        }
    }
}

#[derive(Default)]
pub struct SpatialEngine {
    spatial: SpatialState,
    compression: CompressionState,
    panner: StageLink<PannerHandle>,
    compressor: StageLink<CompressorHandle>,
}

impl SpatialEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(compression: CompressionState) -> Self {
        Self {
            compression: compression.clamped(),
            ..Self::default()
        }
    }

    pub fn position(&self) -> Position {
        self.spatial.position
    }

    pub fn spatial_preset(&self) -> &str {
        &self.spatial.preset
    }

    pub fn compression(&self) -> CompressionState {
        self.compression
    }

    pub fn has_spatial(&self) -> bool {
        !self.panner.is_unavailable()
    }

    pub fn has_compression(&self) -> bool {
        !self.compressor.is_unavailable()
    }

    pub fn attach_panner(&mut self, handle: PannerHandle) {
        if let Err(e) = handle.set_position(self.spatial.position) {
            warn!("panner replay incomplete: {}", e);
        }
        self.panner = StageLink::Ready(handle);
    }

    pub fn attach_compressor(&mut self, handle: CompressorHandle) {
        let replay = handle
            .set_threshold(self.compression.threshold_db)
            .and_then(|_| handle.set_ratio(self.compression.ratio));
        if let Err(e) = replay {
            warn!("compressor replay incomplete: {}", e);
        }
        self.compressor = StageLink::Ready(handle);
    }

    pub fn mark_panner_unavailable(&mut self) {
        self.panner = StageLink::Unavailable;
    }

    pub fn mark_compressor_unavailable(&mut self) {
        self.compressor = StageLink::Unavailable;
    }

    /// Move the source; coordinates are clamped into the positioning cube
    pub fn set_position(&mut self, position: Position) -> Result<Position, GraphError> {
        let position = position.clamped();
        self.spatial.position = position;
        self.spatial.preset = CUSTOM_POSITION.to_string();
        self.panner.apply("spatial audio", |h| h.set_position(position))?;
        Ok(position)
    }

    pub fn apply_spatial_preset(&mut self, name: &str) -> Result<(), ControlError> {
        let preset =
            find_spatial_preset(name).ok_or_else(|| PresetError::UnknownPreset(name.to_string()))?;
        self.spatial = SpatialState {
            position: preset.position,
            preset: preset.name.to_string(),
        };
        self.panner
            .apply("spatial audio", |h| h.set_position(preset.position))?;
        Ok(())
    }

    /// Retune threshold and ratio; knee and timing stay fixed
    pub fn set_compression(&mut self, threshold_db: f32, ratio: f32) -> Result<CompressionState, GraphError> {
        self.compression = CompressionState {
            threshold_db,
            ratio,
            ..self.compression
        }
        .clamped();

        let state = self.compression;
        self.compressor.apply("compression", |h| {
            h.set_threshold(state.threshold_db)?;
            h.set_ratio(state.ratio)
        })?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        builder::{GraphBuilder, GraphConfig},
        chain::ProcessingChain,
        node::Param,
        source::{BufferSource, MediaSource, StereoBuffer},
    };

    fn live_chain(engine: &SpatialEngine) -> (ProcessingChain, PannerHandle, CompressorHandle) {
        let buffer = StereoBuffer::new(vec![0.0; 64], vec![0.0; 64], 48_000.0);
        let source: Box<dyn MediaSource> = Box::new(BufferSource::new(buffer));
        let (mut chain, tx) = ProcessingChain::new(source, 48_000.0, 1.0, 0.01, 64);
        let config = GraphConfig {
            compression: Some(engine.compression()),
            spatial: Some(engine.position()),
            ..GraphConfig::default()
        };
        let handles = GraphBuilder::new(config).install(&mut chain, &tx).unwrap();
        (chain, handles.panner.unwrap(), handles.compressor.unwrap())
    }

    fn pump(chain: &mut ProcessingChain) {
        let (mut l, mut r) = (vec![0.0; 32], vec![0.0; 32]);
        chain.process_block(&mut l, &mut r);
    }

    #[test]
    fn presets_set_position_and_name() {
        let mut engine = SpatialEngine::new();
        engine.apply_spatial_preset("Concert Hall").unwrap();
        assert_eq!(engine.position(), Position::new(0.0, 2.0, -8.0));
        assert_eq!(engine.spatial_preset(), "Concert Hall");

        engine.set_position(Position::new(1.0, 0.0, -1.0)).unwrap();
        assert_eq!(engine.spatial_preset(), CUSTOM_POSITION);
    }

    #[test]
    fn unknown_spatial_preset_fails_fast() {
        let mut engine = SpatialEngine::new();
        assert!(engine.apply_spatial_preset("Stadium").is_err());
        assert_eq!(engine.spatial_preset(), "Center");
    }

    #[test]
    fn compression_is_clamped() {
        let mut engine = SpatialEngine::new();
        let state = engine.set_compression(-200.0, 50.0).unwrap();
        assert_eq!(state.threshold_db, -100.0);
        assert_eq!(state.ratio, 20.0);
        assert_eq!(state.knee_db, CompressionState::default().knee_db);
    }

    #[test]
    fn live_stages_follow_edits() {
        let mut engine = SpatialEngine::new();
        engine.set_compression(-18.0, 3.0).unwrap();

        let (mut chain, panner, compressor) = live_chain(&engine);
        engine.attach_panner(panner);
        engine.attach_compressor(compressor);

        engine.apply_spatial_preset("Left Stage").unwrap();
        engine.set_compression(-30.0, 6.0).unwrap();
        pump(&mut chain);

        assert_eq!(chain.param(Param::PositionX), Some(-3.0));
        assert_eq!(chain.param(Param::PositionZ), Some(-2.0));
        assert_eq!(chain.param(Param::Threshold), Some(-30.0));
        assert_eq!(chain.param(Param::Ratio), Some(6.0));
    }

    #[test]
    fn unavailable_stages_report() {
        let mut engine = SpatialEngine::new();
        engine.mark_panner_unavailable();
        engine.mark_compressor_unavailable();
        assert!(!engine.has_spatial());
        assert!(!engine.has_compression());

        assert_eq!(
            engine.set_position(Position::new(1.0, 0.0, 0.0)),
            Err(GraphError::Unavailable("spatial audio"))
        );
        assert_eq!(engine.position(), Position::new(1.0, 0.0, 0.0));
        assert!(engine.set_compression(-20.0, 2.0).is_err());
    }
}
