use std::f32::consts::{FRAC_PI_2, PI};

/*
3D Positioning
==============

The listener sits at the origin facing -z, with +x to the right and +y up.
A source position is turned into three cues:

  azimuth     Horizontal angle of the source. Drives an equal-power pan:
              a source straight ahead keeps the stereo image intact, a source
              hard left folds the right channel into the left ear.

  distance    Inverse distance attenuation (reference distance 1, rolloff 1):
                gain = 1 / (1 + (max(d, 1) - 1))
              Sources closer than the reference are not boosted.

  head shadow The ear facing away from the source hears it through the head,
              which dulls high frequencies. That ear is blended towards a
              one-pole lowpassed copy as the source moves to the side.

Equal-Power Pan for Stereo Input
--------------------------------

    pan ≤ 0:  L' = L + R·cos(θ)    R' = R·sin(θ)     θ = (pan + 1)·π/2
    pan > 0:  L' = L·cos(θ)        R' = R + L·sin(θ) θ = pan·π/2

At pan = 0 this is the identity, so "Center" never colors the mix.
*/

pub const REFERENCE_DISTANCE: f32 = 1.0;
pub const ROLLOFF_FACTOR: f32 = 1.0;

/// Lowpass cutoff heard by the shadowed ear
pub const SHADOW_CUTOFF_HZ: f32 = 2_500.0;
/// Blend towards the lowpassed copy when the source is fully to one side
const SHADOW_DEPTH: f32 = 0.6;

/// Gains derived from one source position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialGains {
    /// Pan position, -1.0 (hard left) to 1.0 (hard right)
    pub pan: f32,
    /// Distance attenuation, 0.0-1.0
    pub distance_gain: f32,
}

impl SpatialGains {
    pub fn from_position(x: f32, y: f32, z: f32) -> Self {
        let horizontal = (x * x + z * z).sqrt();
        let pan = if horizontal > 1e-6 {
            let azimuth = x.atan2(-z);
            azimuth.sin().clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let distance = (x * x + y * y + z * z).sqrt();
        let distance_gain = REFERENCE_DISTANCE
            / (REFERENCE_DISTANCE
                + ROLLOFF_FACTOR * (distance.max(REFERENCE_DISTANCE) - REFERENCE_DISTANCE));

        Self { pan, distance_gain }
    }

    /// Apply the equal-power pan and distance gain to one frame
    #[inline]
    pub fn apply(&self, left: f32, right: f32) -> (f32, f32) {
        let (l, r) = if self.pan <= 0.0 {
            let theta = (self.pan + 1.0) * FRAC_PI_2;
            (left + right * theta.cos(), right * theta.sin())
        } else {
            let theta = self.pan * FRAC_PI_2;
            (left * theta.cos(), right + left * theta.sin())
        };
        (l * self.distance_gain, r * self.distance_gain)
    }

    /// Head-shadow blend for (left ear, right ear), 0.0 = unshadowed
    pub fn shadow_mix(&self) -> (f32, f32) {
        (
            SHADOW_DEPTH * self.pan.max(0.0),
            SHADOW_DEPTH * (-self.pan).max(0.0),
        )
    }
}

/// One-pole lowpass used for the head shadow
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePole {
    z1: f32,
}

impl OnePole {
    #[inline]
    pub fn coefficient(cutoff_hz: f32, sample_rate: f32) -> f32 {
        let cutoff = cutoff_hz.clamp(10.0, sample_rate * 0.49);
        1.0 - (-2.0 * PI * cutoff / sample_rate).exp()
    }

    #[inline]
    pub fn process(&mut self, input: f32, coeff: f32) -> f32 {
        self.z1 += coeff * (input - self.z1);
        self.z1
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
    }
}
