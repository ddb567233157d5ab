use serde::{Deserialize, Serialize};

use crate::{
    dsp::{
        panner::{OnePole, SpatialGains, SHADOW_CUTOFF_HZ},
        param::AudioParam,
    },
    graph::node::{GraphNode, Param, RenderCtx},
};

/// Positions are limited to a cube around the listener
pub const MAX_COORDINATE: f32 = 50.0;

/// Source position around the listener (facing -z, +x right, +y up)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Clamp into the positioning cube; NaN coordinates fall back to 0
    pub fn clamped(self) -> Self {
        let c = |v: f32| {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(-MAX_COORDINATE, MAX_COORDINATE)
            }
        };
        Self::new(c(self.x), c(self.y), c(self.z))
    }
}

/// Last stage before the analysis tap, so positioning never interacts with
/// tonal shaping upstream
pub struct PannerNode {
    x: AudioParam,
    y: AudioParam,
    z: AudioParam,
    /// Gains at the end of the previous block, interpolated from
    current: SpatialGains,
    shadow: [OnePole; 2],
}

impl PannerNode {
    pub fn new(x: f32, y: f32, z: f32, time_constant: f32) -> Self {
        let param = |v| AudioParam::new(v, -MAX_COORDINATE, MAX_COORDINATE, time_constant);
        let (x, y, z) = (param(x), param(y), param(z));
        let current = SpatialGains::from_position(x.value(), y.value(), z.value());
        Self {
            x,
            y,
            z,
            current,
            shadow: [OnePole::default(); 2],
        }
    }

    pub fn at(position: Position, time_constant: f32) -> Self {
        Self::new(position.x, position.y, position.z, time_constant)
    }

    /// Smoothed position as rendered right now
    pub fn position(&self) -> Position {
        Position::new(self.x.value(), self.y.value(), self.z.value())
    }
}

impl GraphNode for PannerNode {
    fn render_block(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        let frames = left.len().min(right.len());
        if frames == 0 {
            return;
        }

        let start = self.current;
        let end = SpatialGains::from_position(
            self.x.advance(frames, ctx.sample_rate),
            self.y.advance(frames, ctx.sample_rate),
            self.z.advance(frames, ctx.sample_rate),
        );

        let shadow_coeff = OnePole::coefficient(SHADOW_CUTOFF_HZ, ctx.sample_rate);

        let step = 1.0 / frames as f32;
        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let t = (i + 1) as f32 * step;
            let gains = SpatialGains {
                pan: start.pan + (end.pan - start.pan) * t,
                distance_gain: start.distance_gain + (end.distance_gain - start.distance_gain) * t,
            };
            let (out_l, out_r) = gains.apply(*l, *r);
            let (mix_l, mix_r) = gains.shadow_mix();

            let dull_l = self.shadow[0].process(out_l, shadow_coeff);
            let dull_r = self.shadow[1].process(out_r, shadow_coeff);
            *l = out_l + mix_l * (dull_l - out_l);
            *r = out_r + mix_r * (dull_r - out_r);
        }

        self.current = end;
    }

    fn schedule(&mut self, param: Param, value: f32) -> bool {
        match param {
            Param::PositionX => self.x.set_target(value),
            Param::PositionY => self.y.set_target(value),
            Param::PositionZ => self.z.set_target(value),
            _ => return false,
        }
        true
    }

    fn param(&self, param: Param) -> Option<f32> {
        match param {
            Param::PositionX => Some(self.x.target()),
            Param::PositionY => Some(self.y.target()),
            Param::PositionZ => Some(self.z.target()),
            _ => None,
        }
    }

    fn reset(&mut self) {
        for p in [&mut self.x, &mut self.y, &mut self.z] {
            p.set_immediate(p.target());
        }
        self.current = SpatialGains::from_position(self.x.value(), self.y.value(), self.z.value());
        self.shadow = [OnePole::default(); 2];
    }
}
