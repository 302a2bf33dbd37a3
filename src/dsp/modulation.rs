//! Per-Mode Sample Encoders
//!
//! One microphone sample in, one transmit command out:
//!
//! | Mode    | Output                                                   |
//! |---------|----------------------------------------------------------|
//! | USB/LSB | magnitude and phase of the analytic signal               |
//! | AM      | PWM level straight from the sample (no phase path)       |
//! | FM      | carrier offset straight from the sample (full amplitude) |
//! | CW      | no microphone; side-tone level for the local monitor     |
//!
//! SSB uses polar (envelope elimination and restoration) encoding: the
//! phase drives the synthesizer, the magnitude drives the PA supply.

use super::filter::SsbFrontEnd;
use super::oscillator::ToneOscillator;
use super::polar::{arctan3, magnitude};
use crate::config::{AM_BASE, FAST_TUNING_SPAN_HZ};
use crate::types::{Drive, Mode, SidetonePitch, SidetoneVolume};

/// Shift applied to AM samples at zero drive
const AM_DRIVE_OFFSET: i32 = 4;

/// Magnitude and phase of one analytic sample
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Polar {
    /// Magnitude estimate (6 dB down from the I/Q gain)
    pub magnitude: u16,
    /// Phase in unit-angle ticks
    pub phase: i16,
}

/// Encoder output for one sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoded {
    /// SSB: polar sample for gating, shaping and phase limiting
    Voice(Polar),
    /// AM: PWM level, written without the lookup table
    Envelope(u8),
    /// FM: carrier offset in Hz
    Deviation(i32),
    /// CW: side-tone monitor level
    Keyed {
        /// Monitor PWM level
        sidetone: u8,
    },
}

/// Mode-dispatching sample encoder
#[derive(Clone, Copy, Debug)]
pub struct SampleProcessor {
    front_end: SsbFrontEnd,
    tone: ToneOscillator,
}

impl SampleProcessor {
    /// Create an encoder; `pitch` sets the CW side tone
    #[must_use]
    pub const fn new(pitch: SidetonePitch) -> Self {
        Self {
            front_end: SsbFrontEnd::new(),
            tone: ToneOscillator::new(pitch),
        }
    }

    /// SSB: front end, then magnitude and phase estimates
    pub fn ssb(&mut self, sample: i16) -> Polar {
        let iq = self.front_end.process(sample);
        let half = iq.halved();
        Polar {
            magnitude: magnitude(half.i, half.q),
            phase: arctan3(iq.q, iq.i),
        }
    }

    /// AM: sample scaled by drive around the carrier pedestal
    #[must_use]
    pub fn am(sample: i16, drive: Drive) -> u8 {
        let shift = i32::from(drive.shift()) - AM_DRIVE_OFFSET;
        let sample = i32::from(sample);
        let scaled = if shift >= 0 {
            sample << shift
        } else {
            sample >> -shift
        };
        (scaled + AM_BASE).clamp(0, 255) as u8
    }

    /// FM: sample scaled by drive, saturated to the fast-tuning span
    #[must_use]
    pub fn fm(sample: i16, drive: Drive) -> i32 {
        (i32::from(sample) << drive.shift()).clamp(-FAST_TUNING_SPAN_HZ, FAST_TUNING_SPAN_HZ)
    }

    /// CW: advance the side tone and return its monitor level
    pub fn cw(&mut self, volume: SidetoneVolume) -> u8 {
        self.tone.next_level(volume)
    }

    /// Encode one sample for `mode`
    ///
    /// `sample` is ignored in CW.
    pub fn encode(&mut self, mode: Mode, sample: i16, drive: Drive, volume: SidetoneVolume) -> Encoded {
        match mode {
            Mode::Usb | Mode::Lsb => Encoded::Voice(self.ssb(sample)),
            Mode::Am => Encoded::Envelope(Self::am(sample, drive)),
            Mode::Fm => Encoded::Deviation(Self::fm(sample, drive)),
            Mode::Cw => Encoded::Keyed {
                sidetone: self.cw(volume),
            },
        }
    }

    /// Change the side-tone pitch
    pub fn set_pitch(&mut self, pitch: SidetonePitch) {
        self.tone.set_pitch(pitch);
    }

    /// Side-tone oscillator
    #[must_use]
    pub const fn tone(&self) -> &ToneOscillator {
        &self.tone
    }

    /// Clear the SSB filter history
    ///
    /// The side-tone oscillator is left running.
    pub fn reset(&mut self) {
        self.front_end.reset();
    }
}

impl Default for SampleProcessor {
    fn default() -> Self {
        Self::new(SidetonePitch::default())
    }
}
