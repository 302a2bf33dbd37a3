//! Amplitude Shaping
//!
//! Maps computed amplitudes (0-255) onto the PA supply PWM level range,
//! applies the drive shift, and shapes the rising edge of keyed carriers.
//!
//! The level table is built once at start-up and never mutated afterwards;
//! changing levels means building a new table and swapping it in whole.

use crate::config::{PWM_MAX_LEVEL, PWM_MIN_LEVEL};
use crate::types::Drive;
#[cfg(feature = "embedded")]
use micromath::F32Ext;

/// Full-scale computed amplitude
pub const FULL_SCALE: u8 = u8::MAX;

/// Raised-cosine key-click ramp: `255 * cos²(π/2 * i/32)`
///
/// Walked from the last entry to the first while the carrier rises.
pub const RAMP: [u8; 31] = [
    255, 254, 252, 249, 245, 239, 233, 226, 217, 208, 198, 187, 176, 164, 152, 139, 127, 115, 102,
    90, 78, 67, 56, 46, 37, 28, 21, 15, 9, 5, 2,
];

/// Lookup table from computed amplitude to PWM level
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AmplitudeLut {
    levels: [u8; 256],
}

impl AmplitudeLut {
    /// Linear table between `min` and `max`
    ///
    /// `table[0] == min`, `table[255] == max`, non-decreasing in between.
    #[must_use]
    pub const fn linear(min: u8, max: u8) -> Self {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let span = (hi - lo) as u32;
        let mut levels = [0u8; 256];
        let mut i = 0;
        while i < 256 {
            levels[i] = ((i as u32 * span) / 255 + lo as u32) as u8;
            i += 1;
        }
        Self { levels }
    }

    /// Logarithmic (compressed) table: `min(max, 106·ln(i) + min)`
    ///
    /// Suited to a compressed microphone response with drive 0.
    #[must_use]
    pub fn compressed(min: u8, max: u8) -> Self {
        let mut levels = [min; 256];
        for (i, level) in levels.iter_mut().enumerate().skip(1) {
            let value = 106.0 * (i as f32).ln() + f32::from(min);
            *level = value.clamp(f32::from(min), f32::from(max)) as u8;
        }
        Self { levels }
    }

    /// Look up the PWM level for an amplitude
    #[must_use]
    #[inline]
    pub const fn level(&self, amplitude: u8) -> u8 {
        self.levels[amplitude as usize]
    }

    /// Level at full scale
    #[must_use]
    pub const fn full_scale(&self) -> u8 {
        self.level(FULL_SCALE)
    }

    /// All 256 entries
    #[must_use]
    pub const fn as_slice(&self) -> &[u8; 256] {
        &self.levels
    }
}

impl Default for AmplitudeLut {
    fn default() -> Self {
        Self::linear(PWM_MIN_LEVEL, PWM_MAX_LEVEL)
    }
}

impl core::fmt::Debug for AmplitudeLut {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "AmplitudeLut({}..={})",
            self.levels[0],
            self.levels[usize::from(FULL_SCALE)]
        )
    }
}

/// Rising-edge envelope for keyed carriers
///
/// Armed, it counts down through [`RAMP`] one entry per sample and then
/// holds at full scale until re-armed. There is no falling edge: key-up
/// drops the level to zero at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopeRamp {
    /// Remaining ramp steps; 0 means fully open
    index: usize,
}

impl EnvelopeRamp {
    /// Steps in a complete rise
    pub const STEPS: usize = RAMP.len();

    /// Create an armed ramp
    #[must_use]
    pub const fn new() -> Self {
        Self { index: Self::STEPS }
    }

    /// Re-arm for the next rising edge
    pub fn rearm(&mut self) {
        self.index = Self::STEPS;
    }

    /// Remaining steps before full scale
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.index
    }

    /// Whether the rise has completed
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.index == 0
    }

    /// Amplitude weight for this sample, advancing the ramp
    pub fn next_weight(&mut self) -> u8 {
        if self.index > 0 {
            let weight = RAMP[self.index - 1];
            self.index -= 1;
            weight
        } else {
            FULL_SCALE
        }
    }
}

impl Default for EnvelopeRamp {
    fn default() -> Self {
        Self::new()
    }
}

/// Computed amplitude to PWM level, with drive and gating
#[derive(Clone, Copy, Debug)]
pub struct AmplitudeShaper {
    lut: AmplitudeLut,
    ramp: EnvelopeRamp,
}

impl AmplitudeShaper {
    /// Create a shaper around a level table
    #[must_use]
    pub const fn new(lut: AmplitudeLut) -> Self {
        Self {
            lut,
            ramp: EnvelopeRamp::new(),
        }
    }

    /// Swap in a new level table
    pub fn set_lut(&mut self, lut: AmplitudeLut) {
        self.lut = lut;
    }

    /// The active level table
    #[must_use]
    pub const fn lut(&self) -> &AmplitudeLut {
        &self.lut
    }

    /// The keyed-carrier ramp
    #[must_use]
    pub const fn ramp(&self) -> &EnvelopeRamp {
        &self.ramp
    }

    /// Apply the drive shift and clip to full scale
    ///
    /// Maximum drive pins the result at full scale.
    #[must_use]
    pub fn drive(amplitude: u16, drive: Drive) -> u8 {
        if drive.is_full_scale() {
            return FULL_SCALE;
        }
        let shifted = u32::from(amplitude) << drive.shift();
        shifted.min(u32::from(FULL_SCALE)) as u8
    }

    /// SSB level: drive, clip, look up; zero while the carrier is gated off
    #[must_use]
    pub fn voice_level(&self, amplitude: u16, drive: Drive, carrier_on: bool) -> u8 {
        if carrier_on {
            self.lut.level(Self::drive(amplitude, drive))
        } else {
            0
        }
    }

    /// Keyed-carrier level: ramped rise, then full scale
    pub fn keyed_level(&mut self) -> u8 {
        let weight = self.ramp.next_weight();
        self.lut.level(weight)
    }

    /// Full-scale level (FM carrier)
    #[must_use]
    pub const fn full_level(&self) -> u8 {
        self.lut.full_scale()
    }

    /// Re-arm the rising edge
    pub fn rearm(&mut self) {
        self.ramp.rearm();
    }
}

impl Default for AmplitudeShaper {
    fn default() -> Self {
        Self::new(AmplitudeLut::default())
    }
}
