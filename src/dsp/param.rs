/*
Scheduled Parameter Transitions
===============================

Changing a gain or a cutoff from one sample to the next produces a step in the
signal, which is heard as a click ("zipper noise"). Instead of jumping, every
live parameter glides towards its new target.

  value       What the DSP code reads right now.
  target      Where the value is heading. A new write replaces the target.
  tau         Time constant in seconds. After one tau the value has covered
              ~63% of the distance, after five tau it is within 1%.

The Math: One-Pole Approach
---------------------------

    value[n] = value[n-1] + coeff * (target - value[n-1])

    coeff = 1 - e^(-1 / (tau * sample_rate))

  Value
  target ┐          ___________
         │      _.-'
         │    .'
         │   /
   start └──/──────────────────→ Time
           now

Because a write only swaps the target, two writes to the same parameter are
applied in call order and the last one wins, and a write never rewinds what
already played.
*/

/// Relative distance below which a parameter snaps onto its target
const SETTLE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct AudioParam {
    value: f32,
    target: f32,
    min: f32,
    max: f32,
    time_constant: f32,
}

impl AudioParam {
    pub fn new(value: f32, min: f32, max: f32, time_constant: f32) -> Self {
        let value = value.clamp(min, max);
        Self {
            value,
            target: value,
            min,
            max,
            time_constant: time_constant.max(0.0),
        }
    }

    /// Start a transition towards `target` (clamped into range)
    pub fn set_target(&mut self, target: f32) {
        self.target = target.clamp(self.min, self.max);
    }

    /// Jump straight to `value` without a transition
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value.clamp(self.min, self.max);
        self.value = self.target;
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.value == self.target
    }

    /// Per-sample smoothing coefficient at the given sample rate
    #[inline]
    pub fn coefficient(&self, sample_rate: f32) -> f32 {
        if self.time_constant <= 0.0 || sample_rate <= 0.0 {
            1.0
        } else {
            1.0 - (-1.0 / (self.time_constant * sample_rate)).exp()
        }
    }

    /// Advance by one sample and return the new value
    #[inline]
    pub fn next_value(&mut self, coeff: f32) -> f32 {
        if self.value != self.target {
            self.value += coeff * (self.target - self.value);
            self.snap();
        }
        self.value
    }

    /// Advance by `frames` samples at once and return the new value
    pub fn advance(&mut self, frames: usize, sample_rate: f32) -> f32 {
        if self.value != self.target {
            let remaining = (1.0 - self.coefficient(sample_rate)).powi(frames as i32);
            self.value = self.target + (self.value - self.target) * remaining;
            self.snap();
        }
        self.value
    }

    #[inline]
    fn snap(&mut self) {
        let scale = self.target.abs().max(1.0);
        if (self.target - self.value).abs() <= SETTLE_EPSILON * scale {
            self.value = self.target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_is_clamped_into_range() {
        let mut param = AudioParam::new(0.0, -12.0, 12.0, 0.01);
        param.set_target(30.0);
        assert_eq!(param.target(), 12.0);
        param.set_target(-30.0);
        assert_eq!(param.target(), -12.0);
    }

    #[test]
    fn value_glides_instead_of_jumping() {
        let mut param = AudioParam::new(0.0, -12.0, 12.0, 0.01);
        param.set_target(12.0);
        let coeff = param.coefficient(48_000.0);

        let first = param.next_value(coeff);
        assert!(first > 0.0 && first < 1.0, "first step too large: {}", first);

        for _ in 0..48_000 {
            param.next_value(coeff);
        }
        assert!(param.is_settled());
        assert_eq!(param.value(), 12.0);
    }

    #[test]
    fn last_write_wins() {
        let mut param = AudioParam::new(0.0, 0.0, 1.0, 0.01);
        param.set_target(1.0);
        param.set_target(0.25);
        param.advance(48_000, 48_000.0);
        assert_eq!(param.value(), 0.25);
    }

    #[test]
    fn advance_matches_per_sample_stepping() {
        let mut stepped = AudioParam::new(0.0, 0.0, 1.0, 0.02);
        let mut jumped = stepped;
        stepped.set_target(1.0);
        jumped.set_target(1.0);

        let coeff = stepped.coefficient(48_000.0);
        for _ in 0..256 {
            stepped.next_value(coeff);
        }
        jumped.advance(256, 48_000.0);

        assert!((stepped.value() - jumped.value()).abs() < 1e-3);
    }

    #[test]
    fn zero_time_constant_is_instant() {
        let mut param = AudioParam::new(0.0, 0.0, 1.0, 0.0);
        param.set_target(1.0);
        let coeff = param.coefficient(48_000.0);
        assert_eq!(param.next_value(coeff), 1.0);
    }
}
