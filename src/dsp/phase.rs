//! Phase Rate Limiter
//!
//! Turns successive phase estimates into per-sample frequency offsets for
//! the synthesizer. The phase difference is always taken modulo one turn
//! and kept non-negative, so the carrier never swings to the opposite
//! sideband. The step is capped by the bandwidth setting; the part over the
//! cap is carried into the next sample instead of being dropped.

use crate::config::{HZ_PER_UNIT_ANGLE, UNIT_ANGLE};
use crate::types::{Bandwidth, Mode};

/// Bounded phase-difference tracker
#[derive(Clone, Copy, Debug)]
pub struct PhaseRateLimiter {
    /// Reference phase for the next difference, `0..UNIT_ANGLE`
    prev: i32,
    /// Step cap in unit-angle ticks
    max_step: i32,
    /// Phase still owed from the last clamped step
    carry: i32,
}

impl PhaseRateLimiter {
    /// Create a limiter with the given bandwidth
    #[must_use]
    pub const fn new(bandwidth: Bandwidth) -> Self {
        Self {
            prev: 0,
            max_step: bandwidth.max_phase_step(),
            carry: 0,
        }
    }

    /// Change the step cap; takes effect on the next sample
    pub fn set_bandwidth(&mut self, bandwidth: Bandwidth) {
        self.max_step = bandwidth.max_phase_step();
    }

    /// Current step cap in unit-angle ticks
    #[must_use]
    pub const fn max_step(&self) -> i32 {
        self.max_step
    }

    /// Phase carried forward by the last clamped step
    #[must_use]
    pub const fn carry(&self) -> i32 {
        self.carry
    }

    /// Advance to a new phase estimate and return the bounded step
    ///
    /// The result is always in `0..=max_step`.
    pub fn advance(&mut self, phase: i16) -> i32 {
        let phase = i32::from(phase);
        let mut dp = (phase - self.prev).rem_euclid(UNIT_ANGLE);

        if dp > self.max_step {
            self.carry = dp - self.max_step;
            self.prev = (phase - self.carry).rem_euclid(UNIT_ANGLE);
            dp = self.max_step;
        } else {
            self.carry = 0;
            self.prev = phase.rem_euclid(UNIT_ANGLE);
        }
        dp
    }

    /// Advance and convert the step to a frequency offset for `mode`
    pub fn process(&mut self, phase: i16, mode: Mode) -> i32 {
        let dp = self.advance(phase);
        frequency_offset(dp, mode)
    }

    /// Forget the phase history
    pub fn reset(&mut self) {
        self.prev = 0;
        self.carry = 0;
    }
}

impl Default for PhaseRateLimiter {
    fn default() -> Self {
        Self::new(Bandwidth::default())
    }
}

/// Frequency offset in Hz for a phase step, negated for lower sideband
#[must_use]
pub const fn frequency_offset(step: i32, mode: Mode) -> i32 {
    let df = step * HZ_PER_UNIT_ANGLE;
    if matches!(mode, Mode::Lsb) {
        -df
    } else {
        df
    }
}
