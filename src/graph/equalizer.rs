use serde::{Deserialize, Serialize};

use crate::{
    dsp::{
        biquad::{BiquadCoeffs, BiquadState, FilterShape},
        param::AudioParam,
    },
    graph::node::{GraphNode, Param, RenderCtx},
};

/*
Graphic Equalizer
=================

A bank of biquad filters in series, one per band, in ascending frequency
order. The lowest band is a low-shelf, the highest a high-shelf, and every
band in between is a peaking bell:

  gain dB
   +12 ┤
       │ ___                                   ___
     0 ┼────\_____/‾‾‾\_____/‾‾‾\_____/‾‾‾\───/────
       │
   -12 ┤
       └─┬────┬────┬────┬────┬────┬────┬────┬────┬─→ Hz
         32   64  125  250  500  1k   2k   4k   8k 16k
       shelf       peaking ...                  shelf

Gains glide towards their target. While a band is moving, its coefficients are
redesigned every SUB_BLOCK samples; once settled, the band runs on cached
coefficients with no per-block cost beyond the filter itself.
*/

/// Q used by interior peaking bands
pub const PEAKING_Q: f32 = 1.0;
pub const MIN_GAIN_DB: f32 = -12.0;
pub const MAX_GAIN_DB: f32 = 12.0;

/// Coefficient refresh interval while a gain is in transition
const SUB_BLOCK: usize = 32;

/// One band descriptor: where it sits, how it's shaped, how much it boosts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    pub center_frequency_hz: f32,
    pub gain_db: f32,
    pub shape: FilterShape,
}

impl BandSpec {
    /// Shape for band `index` out of `count` ascending bands
    pub fn shape_for(index: usize, count: usize) -> FilterShape {
        if index == 0 {
            FilterShape::LowShelf
        } else if index + 1 == count {
            FilterShape::HighShelf
        } else {
            FilterShape::Peaking
        }
    }
}

struct Band {
    frequency_hz: f32,
    shape: FilterShape,
    gain: AudioParam,
    coeffs: BiquadCoeffs,
    designed_gain: f32,
    designed_rate: f32,
    state: [BiquadState; 2],
}

impl Band {
    fn redesign(&mut self, sample_rate: f32) {
        let gain = self.gain.value();
        if gain != self.designed_gain || sample_rate != self.designed_rate {
            self.coeffs =
                BiquadCoeffs::design(self.shape, self.frequency_hz, gain, PEAKING_Q, sample_rate);
            self.designed_gain = gain;
            self.designed_rate = sample_rate;
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], sample_rate: f32) {
        if self.gain.is_settled() {
            self.redesign(sample_rate);
            if self.designed_gain.abs() < 0.01 {
                // Flat band, skip the filter but keep its memory consistent
                self.state = [BiquadState::default(); 2];
                return;
            }
            self.state[0].render(left, &self.coeffs);
            self.state[1].render(right, &self.coeffs);
            return;
        }

        for (l, r) in left.chunks_mut(SUB_BLOCK).zip(right.chunks_mut(SUB_BLOCK)) {
            self.gain.advance(l.len(), sample_rate);
            self.redesign(sample_rate);
            self.state[0].render(l, &self.coeffs);
            self.state[1].render(r, &self.coeffs);
        }
    }
}

pub struct EqualizerNode {
    bands: Vec<Band>,
}

impl EqualizerNode {
    /// Build the filter bank; bands are sorted into ascending frequency order
    pub fn new(specs: &[BandSpec], time_constant: f32) -> Self {
        let mut specs = specs.to_vec();
        specs.sort_by(|a, b| a.center_frequency_hz.total_cmp(&b.center_frequency_hz));

        let bands = specs
            .iter()
            .map(|spec| Band {
                frequency_hz: spec.center_frequency_hz,
                shape: spec.shape,
                gain: AudioParam::new(spec.gain_db, MIN_GAIN_DB, MAX_GAIN_DB, time_constant),
                coeffs: BiquadCoeffs::identity(),
                designed_gain: f32::NAN,
                designed_rate: 0.0,
                state: [BiquadState::default(); 2],
            })
            .collect();

        Self { bands }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Magnitude response of the whole bank at `freq`, using current gains
    pub fn response_db(&self, freq: f32, sample_rate: f32) -> f32 {
        self.bands
            .iter()
            .map(|band| {
                BiquadCoeffs::design(band.shape, band.frequency_hz, band.gain.value(), PEAKING_Q, sample_rate)
                    .magnitude_db(freq, sample_rate)
            })
            .sum()
    }
}

impl GraphNode for EqualizerNode {
    fn render_block(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        for band in self.bands.iter_mut() {
            band.render(left, right, ctx.sample_rate);
        }
    }

    fn schedule(&mut self, param: Param, value: f32) -> bool {
        match param {
            Param::BandGain(index) => match self.bands.get_mut(index) {
                Some(band) => {
                    band.gain.set_target(value);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn param(&self, param: Param) -> Option<f32> {
        match param {
            Param::BandGain(index) => self.bands.get(index).map(|band| band.gain.target()),
            _ => None,
        }
    }

    fn reset(&mut self) {
        for band in self.bands.iter_mut() {
            let target = band.gain.target();
            band.gain.set_immediate(target);
            band.state = [BiquadState::default(); 2];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: f32 = 48_000.0;

    fn ten_band(gain_db: f32) -> Vec<BandSpec> {
        let freqs = [32.0, 64.0, 125.0, 250.0, 500.0, 1_000.0, 2_000.0, 4_000.0, 8_000.0, 16_000.0];
        freqs
            .iter()
            .enumerate()
            .map(|(i, &f)| BandSpec {
                center_frequency_hz: f,
                gain_db,
                shape: BandSpec::shape_for(i, freqs.len()),
            })
            .collect()
    }

    fn sine_block(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / SR).sin() * 0.1)
            .collect()
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer[buffer.len() / 2..]
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn shapes_follow_band_position() {
        assert_eq!(BandSpec::shape_for(0, 10), FilterShape::LowShelf);
        assert_eq!(BandSpec::shape_for(5, 10), FilterShape::Peaking);
        assert_eq!(BandSpec::shape_for(9, 10), FilterShape::HighShelf);
    }

    #[test]
    fn flat_bank_is_transparent() {
        let mut node = EqualizerNode::new(&ten_band(0.0), 0.01);
        let input = sine_block(440.0, 1_024);
        let (mut l, mut r) = (input.clone(), input.clone());
        node.render_block(&mut l, &mut r, &RenderCtx::new(SR));
        assert_eq!(l, input);
        assert_eq!(r, input);
    }

    #[test]
    fn bands_are_sorted_ascending() {
        let mut specs = ten_band(0.0);
        specs.reverse();
        let node = EqualizerNode::new(&specs, 0.01);
        let freqs: Vec<f32> = node.bands.iter().map(|b| b.frequency_hz).collect();
        assert!(freqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn scheduled_boost_glides_in() {
        let mut node = EqualizerNode::new(&ten_band(0.0), 0.01);
        assert!(node.schedule(Param::BandGain(5), 12.0));
        assert_eq!(node.param(Param::BandGain(5)), Some(12.0));

        let ctx = RenderCtx::new(SR);
        let (mut l, mut r) = (sine_block(1_000.0, 256), sine_block(1_000.0, 256));
        node.render_block(&mut l, &mut r, &ctx);
        let early = node.bands[5].gain.value();
        assert!(early > 0.0 && early < 12.0, "gain jumped to {}", early);

        for _ in 0..40 {
            let (mut l, mut r) = (sine_block(1_000.0, 1_024), sine_block(1_000.0, 1_024));
            node.render_block(&mut l, &mut r, &ctx);
        }
        assert_eq!(node.bands[5].gain.value(), 12.0);

        let (mut l, mut r) = (sine_block(1_000.0, 4_096), sine_block(1_000.0, 4_096));
        node.render_block(&mut l, &mut r, &ctx);
        assert!(peak(&l) > 0.1 * 3.0, "boosted peak {}", peak(&l));
    }

    #[test]
    fn out_of_range_band_is_ignored() {
        let mut node = EqualizerNode::new(&ten_band(0.0), 0.01);
        assert!(!node.schedule(Param::BandGain(10), 3.0));
        assert!(!node.schedule(Param::Threshold, -10.0));
    }

    #[test]
    fn gains_are_clamped() {
        let mut node = EqualizerNode::new(&ten_band(0.0), 0.01);
        node.schedule(Param::BandGain(0), 40.0);
        assert_eq!(node.param(Param::BandGain(0)), Some(MAX_GAIN_DB));
    }

    #[test]
    fn response_reflects_gains() {
        let node = EqualizerNode::new(&ten_band(6.0), 0.01);
        assert!(node.response_db(1_000.0, SR) > 6.0);
    }
}
