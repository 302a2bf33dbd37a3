//! Side-Tone Oscillator
//!
//! Minsky circle oscillator (HAKMEM item 149) for the CW monitor tone:
//!
//! ```text
//! sin += alpha * cos / 127
//! cos -= alpha * sin / 127
//! ```
//!
//! with `alpha = 2π · f / fs` scaled by 127. Two multiplies and two
//! divides per sample, no tables. The amplitude wobbles slightly with the
//! integer truncation but stays bounded; it only ever drives the local
//! monitor output.

use crate::config::TX_SAMPLE_RATE;
use crate::types::{SidetonePitch, SidetoneVolume};

/// Initial cosine amplitude
const INITIAL_COS: i16 = 448 / 4;

/// `2π · 127`, rounded
const TWO_PI_SCALED: u32 = 798;

/// Fixed-point Minsky oscillator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToneOscillator {
    /// Sine proxy
    sin: i16,
    /// Cosine proxy
    cos: i16,
    /// Angular step scaled by 127
    alpha: i16,
}

impl ToneOscillator {
    /// Create an oscillator for the given pitch
    #[must_use]
    pub const fn new(pitch: SidetonePitch) -> Self {
        Self {
            sin: 0,
            cos: INITIAL_COS,
            alpha: Self::alpha_for(pitch),
        }
    }

    /// Scaled angular step for a pitch at the transmit sample rate
    #[must_use]
    pub const fn alpha_for(pitch: SidetonePitch) -> i16 {
        (pitch.as_hz() * TWO_PI_SCALED / TX_SAMPLE_RATE) as i16
    }

    /// Change pitch without disturbing the running phase
    pub fn set_pitch(&mut self, pitch: SidetonePitch) {
        self.alpha = Self::alpha_for(pitch);
    }

    /// Scaled angular step in use
    #[must_use]
    pub const fn alpha(&self) -> i16 {
        self.alpha
    }

    /// Advance one sample and return the sine output
    pub fn step(&mut self) -> i16 {
        let alpha = i32::from(self.alpha);
        self.sin = (i32::from(self.sin) + alpha * i32::from(self.cos) / 127) as i16;
        self.cos = (i32::from(self.cos) - alpha * i32::from(self.sin) / 127) as i16;
        self.sin
    }

    /// Current sine output
    #[must_use]
    pub const fn sin(&self) -> i16 {
        self.sin
    }

    /// Current cosine output
    #[must_use]
    pub const fn cos(&self) -> i16 {
        self.cos
    }

    /// Advance one sample and return the monitor PWM level
    pub fn next_level(&mut self, volume: SidetoneVolume) -> u8 {
        let sin = self.step();
        sidetone_level(sin, volume)
    }
}

impl Default for ToneOscillator {
    fn default() -> Self {
        Self::new(SidetonePitch::default())
    }
}

/// Monitor PWM level for an oscillator output: `(sin >> (16 - volume)) + 128`
#[must_use]
pub fn sidetone_level(sin: i16, volume: SidetoneVolume) -> u8 {
    let scaled = i32::from(sin) >> volume.attenuation_shift();
    (scaled + 128).clamp(0, 255) as u8
}
