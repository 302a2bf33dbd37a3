//! Shared types used across the transmit firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

use core::fmt;

/// Carrier frequency in Hertz with validation
///
/// Represents a valid carrier frequency within the range covered by the
/// band-pass filter bank. The frequency is stored in Hz for precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u32);

impl Frequency {
    /// Minimum supported frequency (bottom of the `<2.5 MHz` filter)
    pub const MIN_HZ: u32 = 1_000_000;

    /// Maximum supported frequency (top of the `20-40 MHz` filter)
    pub const MAX_HZ: u32 = 40_000_000;

    /// Create a new Frequency from Hz, returns None if out of range
    #[must_use]
    pub const fn from_hz(hz: u32) -> Option<Self> {
        if hz >= Self::MIN_HZ && hz <= Self::MAX_HZ {
            Some(Self(hz))
        } else {
            None
        }
    }

    /// Create a new Frequency from kHz
    #[must_use]
    pub const fn from_khz(khz: u32) -> Option<Self> {
        Self::from_hz(khz * 1000)
    }

    /// Get the frequency in Hz
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        self.0
    }

    /// Get the frequency in kHz (truncated)
    #[must_use]
    pub const fn as_khz(self) -> u32 {
        self.0 / 1000
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({} Hz)", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Frequency {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} Hz", self.0);
    }
}

/// Operating mode of the transmitter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    /// Lower Sideband
    Lsb,
    /// Upper Sideband
    #[default]
    Usb,
    /// Continuous Wave (keyed carrier)
    Cw,
    /// Frequency Modulation (narrow)
    Fm,
    /// Amplitude Modulation
    Am,
}

impl Mode {
    /// Packed representation used by the config handoff
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Lsb => 0,
            Self::Usb => 1,
            Self::Cw => 2,
            Self::Fm => 3,
            Self::Am => 4,
        }
    }

    /// Decode a packed mode; unknown codes fall back to USB
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Lsb,
            2 => Self::Cw,
            3 => Self::Fm,
            4 => Self::Am,
            _ => Self::Usb,
        }
    }

    /// Single sideband voice modes (phase + amplitude encoding)
    #[must_use]
    pub const fn is_ssb(self) -> bool {
        matches!(self, Self::Lsb | Self::Usb)
    }

    /// Modes whose carrier is gated by the VOX hang-time machine.
    ///
    /// Every other mode follows the transmit gate directly.
    #[must_use]
    pub const fn uses_vox(self) -> bool {
        self.is_ssb()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Mode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Lsb => defmt::write!(f, "LSB"),
            Self::Usb => defmt::write!(f, "USB"),
            Self::Cw => defmt::write!(f, "CW"),
            Self::Fm => defmt::write!(f, "FM"),
            Self::Am => defmt::write!(f, "AM"),
        }
    }
}

/// Microphone drive, applied as a left shift of the computed amplitude
///
/// The maximum shift is special: it pins the SSB amplitude at full scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Drive(u8);

impl Drive {
    /// No extra gain
    pub const MIN: Self = Self(0);

    /// Full scale regardless of input
    pub const MAX: Self = Self(8);

    /// Create a drive level, clamped to `0..=8`
    #[must_use]
    pub const fn from_shift(shift: u8) -> Self {
        if shift > Self::MAX.0 {
            Self::MAX
        } else {
            Self(shift)
        }
    }

    /// Get the shift amount
    #[must_use]
    pub const fn shift(self) -> u8 {
        self.0
    }

    /// Whether this drive pins the amplitude at full scale
    #[must_use]
    pub const fn is_full_scale(self) -> bool {
        self.0 == Self::MAX.0
    }
}

impl Default for Drive {
    fn default() -> Self {
        Self(crate::config::DEFAULT_DRIVE)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Drive {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "<<{}", self.0);
    }
}

/// VOX trigger threshold on the magnitude estimate
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VoxThreshold(u8);

impl VoxThreshold {
    /// Create a threshold
    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    /// Get the raw threshold level
    #[must_use]
    pub const fn level(self) -> u8 {
        self.0
    }

    /// Check whether a magnitude estimate triggers the VOX
    #[must_use]
    pub const fn is_triggered_by(self, magnitude: u16) -> bool {
        magnitude > self.0 as u16
    }
}

impl Default for VoxThreshold {
    fn default() -> Self {
        Self(crate::config::DEFAULT_VOX_THRESHOLD)
    }
}

/// Occupied-bandwidth setting; limits the phase change per sample
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Bandwidth {
    /// Up to a full unit angle per sample
    #[default]
    Full,
    /// Half a unit angle per sample
    Half,
    /// A quarter unit angle per sample
    Quarter,
}

impl Bandwidth {
    /// Packed representation used by the config handoff
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Full => 0,
            Self::Half => 1,
            Self::Quarter => 2,
        }
    }

    /// Decode a packed setting; unknown codes fall back to `Half`
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Full,
            2 => Self::Quarter,
            _ => Self::Half,
        }
    }

    /// Largest phase step per sample, in unit-angle ticks
    #[must_use]
    pub const fn max_phase_step(self) -> i32 {
        let ua = crate::config::UNIT_ANGLE;
        match self {
            Self::Full => ua,
            Self::Half => ua / 2,
            Self::Quarter => ua / 4,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Bandwidth {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Full => defmt::write!(f, "BW full"),
            Self::Half => defmt::write!(f, "BW 1/2"),
            Self::Quarter => defmt::write!(f, "BW 1/4"),
        }
    }
}

/// CW side-tone pitch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SidetonePitch {
    /// 600 Hz
    #[default]
    Hz600,
    /// 700 Hz
    Hz700,
}

impl SidetonePitch {
    /// Get the pitch in Hz
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        match self {
            Self::Hz600 => 600,
            Self::Hz700 => 700,
        }
    }
}

/// Side-tone monitor volume (`0..=16`, each step is 6 dB)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SidetoneVolume(u8);

impl SidetoneVolume {
    /// Loudest setting
    pub const MAX: Self = Self(16);

    /// Create a volume, clamped to `0..=16`
    #[must_use]
    pub const fn new(volume: u8) -> Self {
        if volume > Self::MAX.0 {
            Self::MAX
        } else {
            Self(volume)
        }
    }

    /// Get the raw volume
    #[must_use]
    pub const fn level(self) -> u8 {
        self.0
    }

    /// Right shift applied to the oscillator output
    #[must_use]
    pub const fn attenuation_shift(self) -> u32 {
        (Self::MAX.0 - self.0) as u32
    }
}

impl Default for SidetoneVolume {
    fn default() -> Self {
        Self(crate::config::DEFAULT_SIDETONE_VOLUME)
    }
}

/// Transmit/Receive state as seen by the rest of the radio
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TxRxState {
    /// Receiving
    #[default]
    Rx,
    /// Transmitting
    Tx,
}

#[cfg(feature = "embedded")]
impl defmt::Format for TxRxState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Rx => defmt::write!(f, "RX"),
            Self::Tx => defmt::write!(f, "TX"),
        }
    }
}
