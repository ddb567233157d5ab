//! Filter Graph Builder
//!
//! Wires the configured stages into the chain of an attached context:
//!
//! ```text
//! source → [compression] → [equalizer bands, ascending] → [spatial] → [analysis] → output
//! ```
//!
//! Compression comes first so the equalizer never chases its own loudness
//! peaks, and spatial positioning comes last so it never interacts with
//! tonal shaping. Every stage is optional; absent stages are simply skipped.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    context::AudioContext,
    error::GraphError,
    graph::{
        analyser::{AnalyserNode, AnalysisConfig, AnalysisTap},
        chain::{ControlSender, ProcessingChain, StageKind},
        compressor::{CompressionState, CompressorNode},
        equalizer::{BandSpec, EqualizerNode},
        handles::{CompressorHandle, EqualizerHandle, PannerHandle},
        panner::{PannerNode, Position},
    },
};

/// Transition time constants for live parameters, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub gain_sec: f32,
    pub dynamics_sec: f32,
    pub position_sec: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            gain_sec: 0.01,
            dynamics_sec: 0.02,
            position_sec: 0.05,
        }
    }
}

/// Which stages to build and their initial settings. `None` skips a stage.
#[derive(Debug, Clone, Default)]
pub struct GraphConfig {
    pub equalizer: Option<Vec<BandSpec>>,
    pub compression: Option<CompressionState>,
    pub spatial: Option<Position>,
    pub analysis: Option<AnalysisConfig>,
    pub smoothing: SmoothingConfig,
}

/// Handles to the stages that were built
#[derive(Default)]
pub struct GraphHandles {
    pub equalizer: Option<EqualizerHandle>,
    pub compressor: Option<CompressorHandle>,
    pub panner: Option<PannerHandle>,
    pub analysis: Option<AnalysisTap>,
}

pub struct GraphBuilder {
    config: GraphConfig,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Build the stages into the chain of an attached context
    pub fn build(&self, context: &AudioContext) -> Result<GraphHandles, GraphError> {
        context.with_chain(|chain, control| self.install(chain, control))?
    }

    /// Build the stages into a bare chain
    pub fn install(
        &self,
        chain: &mut ProcessingChain,
        control: &ControlSender,
    ) -> Result<GraphHandles, GraphError> {
        if !chain.stage_order().is_empty() {
            return Err(GraphError::AlreadyBuilt);
        }

        let smoothing = &self.config.smoothing;
        let sample_rate = chain.sample_rate();
        let mut handles = GraphHandles::default();

        if let Some(state) = &self.config.compression {
            let node = CompressorNode::from_state(&state.clamped(), smoothing.dynamics_sec);
            chain.push_stage(StageKind::Compression, Box::new(node))?;
            handles.compressor = Some(CompressorHandle::new(control.clone()));
        }

        if let Some(bands) = &self.config.equalizer {
            let node = EqualizerNode::new(bands, smoothing.gain_sec);
            let count = node.band_count();
            chain.push_stage(StageKind::Equalizer, Box::new(node))?;
            handles.equalizer = Some(EqualizerHandle::new(control.clone(), count));
        }

        if let Some(position) = self.config.spatial {
            let node = PannerNode::at(position.clamped(), smoothing.position_sec);
            chain.push_stage(StageKind::Spatial, Box::new(node))?;
            handles.panner = Some(PannerHandle::new(control.clone()));
        }

        if let Some(analysis) = &self.config.analysis {
            let (node, tap) = AnalyserNode::new(analysis, sample_rate);
            chain.push_stage(StageKind::Analysis, Box::new(node))?;
            handles.analysis = Some(tap);
        }

        debug!("graph built: {:?}", chain.stage_order());
        Ok(handles)
    }
}
