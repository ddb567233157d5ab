use serde::{Deserialize, Serialize};

use crate::{
    dsp::{
        compressor::{
            Compressor, DEFAULT_ATTACK_SEC, DEFAULT_KNEE_DB, DEFAULT_RELEASE_SEC, MAX_RATIO,
            MAX_THRESHOLD_DB, MIN_RATIO, MIN_THRESHOLD_DB,
        },
        param::AudioParam,
    },
    graph::node::{GraphNode, Param, RenderCtx},
};

/// Compressor settings. Only threshold and ratio are tuned at runtime; knee
/// and timing stay at their mastering defaults unless configured up front.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionState {
    pub threshold_db: f32,
    pub ratio: f32,
    pub knee_db: f32,
    pub attack_sec: f32,
    pub release_sec: f32,
}

impl Default for CompressionState {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            ratio: 4.0,
            knee_db: DEFAULT_KNEE_DB,
            attack_sec: DEFAULT_ATTACK_SEC,
            release_sec: DEFAULT_RELEASE_SEC,
        }
    }
}

impl CompressionState {
    /// Copy with threshold and ratio forced into their legal ranges. NaN
    /// falls back to the default setting.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        self.threshold_db = sanitize(self.threshold_db, defaults.threshold_db)
            .clamp(MIN_THRESHOLD_DB, MAX_THRESHOLD_DB);
        self.ratio = sanitize(self.ratio, defaults.ratio).clamp(MIN_RATIO, MAX_RATIO);
        self
    }
}

fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value
    }
}

/// Dynamics stage placed first in the chain so the equalizer sees a
/// level-controlled signal
pub struct CompressorNode {
    compressor: Compressor,
    threshold: AudioParam,
    ratio: AudioParam,
}

impl CompressorNode {
    pub fn new(threshold_db: f32, ratio: f32, time_constant: f32) -> Self {
        Self::with_compressor(Compressor::new(), threshold_db, ratio, time_constant)
    }

    pub fn from_state(state: &CompressionState, time_constant: f32) -> Self {
        Self::with_compressor(
            Compressor::with_timing(state.knee_db, state.attack_sec, state.release_sec),
            state.threshold_db,
            state.ratio,
            time_constant,
        )
    }

    pub fn with_compressor(
        compressor: Compressor,
        threshold_db: f32,
        ratio: f32,
        time_constant: f32,
    ) -> Self {
        Self {
            compressor,
            threshold: AudioParam::new(threshold_db, MIN_THRESHOLD_DB, MAX_THRESHOLD_DB, time_constant),
            ratio: AudioParam::new(ratio, MIN_RATIO, MAX_RATIO, time_constant),
        }
    }

    /// Current gain reduction in dB
    pub fn reduction_db(&self) -> f32 {
        self.compressor.reduction_db()
    }
}

impl GraphNode for CompressorNode {
    fn render_block(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        self.compressor.prepare(ctx.sample_rate);
        let threshold_coeff = self.threshold.coefficient(ctx.sample_rate);
        let ratio_coeff = self.ratio.coefficient(ctx.sample_rate);

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let threshold = self.threshold.next_value(threshold_coeff);
            let ratio = self.ratio.next_value(ratio_coeff);
            self.compressor.process_frame(l, r, threshold, ratio);
        }
    }

    fn schedule(&mut self, param: Param, value: f32) -> bool {
        match param {
            Param::Threshold => self.threshold.set_target(value),
            Param::Ratio => self.ratio.set_target(value),
            _ => return false,
        }
        true
    }

    fn param(&self, param: Param) -> Option<f32> {
        match param {
            Param::Threshold => Some(self.threshold.target()),
            Param::Ratio => Some(self.ratio.target()),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.compressor.reset();
        self.threshold.set_immediate(self.threshold.target());
        self.ratio.set_immediate(self.ratio.target());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_constant(node: &mut CompressorNode, level: f32, blocks: usize) -> f32 {
        let ctx = RenderCtx::new(48_000.0);
        let mut last = 0.0;
        for _ in 0..blocks {
            let (mut l, mut r) = (vec![level; 512], vec![level; 512]);
            node.render_block(&mut l, &mut r, &ctx);
            last = l[511];
        }
        last
    }

    #[test]
    fn loud_input_is_reduced() {
        let mut node = CompressorNode::new(-24.0, 4.0, 0.02);
        let out = render_constant(&mut node, 1.0, 100);
        assert!(out < 0.2, "output {}", out);
        assert!(node.reduction_db() < -15.0);
    }

    #[test]
    fn raising_ratio_reduces_more() {
        let mut gentle = CompressorNode::new(-24.0, 2.0, 0.02);
        let mut hard = CompressorNode::new(-24.0, 2.0, 0.02);
        hard.schedule(Param::Ratio, 20.0);

        let soft_out = render_constant(&mut gentle, 1.0, 100);
        let hard_out = render_constant(&mut hard, 1.0, 100);
        assert!(hard_out < soft_out);
    }

    #[test]
    fn state_is_clamped() {
        let state = CompressionState {
            threshold_db: 12.0,
            ratio: 0.5,
            ..CompressionState::default()
        }
        .clamped();
        assert_eq!(state.threshold_db, MAX_THRESHOLD_DB);
        assert_eq!(state.ratio, MIN_RATIO);
    }

    #[test]
    fn nan_settings_fall_back_to_defaults() {
        let state = CompressionState {
            threshold_db: f32::NAN,
            ratio: f32::NAN,
            ..CompressionState::default()
        }
        .clamped();
        assert_eq!(state, CompressionState::default());
    }

    #[test]
    fn schedule_only_touches_dynamics() {
        let mut node = CompressorNode::new(-24.0, 4.0, 0.02);
        assert!(node.schedule(Param::Threshold, -200.0));
        assert_eq!(node.param(Param::Threshold), Some(MIN_THRESHOLD_DB));
        assert!(!node.schedule(Param::PositionX, 1.0));
        assert_eq!(node.param(Param::BandGain(0)), None);
    }
}
