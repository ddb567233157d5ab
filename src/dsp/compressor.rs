/*
Dynamic Range Compression
=========================

A compressor turns loud passages down so the quiet and loud parts of a track
sit closer together. It listens to the signal level and, once the level
crosses a threshold, reduces gain by a ratio.

Vocabulary
----------

  threshold   Level in dBFS above which gain reduction starts.
  ratio       How strongly levels above the threshold are squashed.
              4:1 means 4 dB over the threshold comes out as 1 dB over.
  knee        Width in dB of the region around the threshold where the curve
              bends gradually instead of switching abruptly.
  attack      How quickly gain reduction engages when the level rises.
  release     How quickly gain reduction recovers when the level falls.

Static Curve (soft knee)
------------------------

  out dB
    │            ╱ 1:1
    │          ╱
    │        ╱ ___----  1:ratio
    │      ╱.-'
    │    ╱'  ← knee
    │  ╱
    └─────────────────→ in dB
           T

    x < T - W/2:   y = x
    |x - T| ≤ W/2: y = x + (1/R - 1) * (x - T + W/2)² / (2W)
    x > T + W/2:   y = T + (x - T) / R

Detection is stereo-linked (the louder channel drives both) so the stereo
image doesn't wander when one side is louder.
*/

use crate::MIN_TIME;

/// Knee width used by the mastering chain
pub const DEFAULT_KNEE_DB: f32 = 6.0;
/// Attack time in seconds
pub const DEFAULT_ATTACK_SEC: f32 = 0.003;
/// Release time in seconds
pub const DEFAULT_RELEASE_SEC: f32 = 0.25;

pub const MIN_THRESHOLD_DB: f32 = -100.0;
pub const MAX_THRESHOLD_DB: f32 = 0.0;
pub const MIN_RATIO: f32 = 1.0;
pub const MAX_RATIO: f32 = 20.0;

/// Floor used when converting silence to dB
const SILENCE_DB: f32 = -120.0;

/// Gain change in dB produced by the static curve (always ≤ 0)
#[inline]
pub fn gain_reduction_db(input_db: f32, threshold_db: f32, ratio: f32, knee_db: f32) -> f32 {
    let ratio = ratio.max(MIN_RATIO);
    let over = input_db - threshold_db;

    let output_db = if knee_db > 0.0 && 2.0 * over.abs() <= knee_db {
        let k = over + knee_db / 2.0;
        input_db + (1.0 / ratio - 1.0) * k * k / (2.0 * knee_db)
    } else if over > 0.0 {
        threshold_db + over / ratio
    } else {
        input_db
    };

    (output_db - input_db).min(0.0)
}

#[inline]
fn time_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 {
        0.0
    } else {
        (-1.0 / (seconds * sample_rate)).exp()
    }
}

pub struct Compressor {
    /// Smoothed gain reduction in dB (≤ 0)
    reduction_db: f32,

    pub knee_db: f32,
    pub attack_sec: f32,
    pub release_sec: f32,

    attack_coeff: f32,
    release_coeff: f32,
    coeff_rate: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor {
    pub fn new() -> Self {
        Self::with_timing(DEFAULT_KNEE_DB, DEFAULT_ATTACK_SEC, DEFAULT_RELEASE_SEC)
    }

    pub fn with_timing(knee_db: f32, attack_sec: f32, release_sec: f32) -> Self {
        Self {
            reduction_db: 0.0,
            knee_db: knee_db.max(0.0),
            attack_sec: attack_sec.max(MIN_TIME),
            release_sec: release_sec.max(MIN_TIME),
            attack_coeff: 0.0,
            release_coeff: 0.0,
            coeff_rate: 0.0,
        }
    }

    /// Recompute the attack/release smoothing for a sample rate
    pub fn prepare(&mut self, sample_rate: f32) {
        if self.coeff_rate != sample_rate {
            self.attack_coeff = time_coefficient(self.attack_sec, sample_rate);
            self.release_coeff = time_coefficient(self.release_sec, sample_rate);
            self.coeff_rate = sample_rate;
        }
    }

    /// Process one stereo frame in place and return the applied linear gain
    ///
    /// `prepare` must have been called for the current sample rate.
    #[inline]
    pub fn process_frame(&mut self, left: &mut f32, right: &mut f32, threshold_db: f32, ratio: f32) -> f32 {
        let level = left.abs().max(right.abs());
        let level_db = if level > 1e-6 {
            20.0 * level.log10()
        } else {
            SILENCE_DB
        };

        let target = gain_reduction_db(level_db, threshold_db, ratio, self.knee_db);
        let coeff = if target < self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = coeff * self.reduction_db + (1.0 - coeff) * target;

        let gain = 10.0_f32.powf(self.reduction_db / 20.0);
        *left *= gain;
        *right *= gain;
        gain
    }

    /// Current gain reduction in dB (for metering)
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }

    pub fn reset(&mut self) {
        self.reduction_db = 0.0;
    }
}
