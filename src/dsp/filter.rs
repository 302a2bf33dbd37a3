//! Microphone Front End
//!
//! Integer filters that turn raw microphone samples into an I/Q pair for
//! the polar SSB encoder:
//! - a two-pole conditioner: Fs/2 notch (alias rejection) followed by a
//!   slow-average high-pass (DC decoupling)
//! - a 15-tap approximate Hilbert transformer, good for ~40 dB sideband
//!   rejection across 400-1900 Hz
//!
//! Everything is fixed point. The delay line is a plain shifted array; at
//! 16 entries a shift is cheaper than circular indexing on the target.

/// In-phase / quadrature sample pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IqSample {
    /// In-phase component
    pub i: i16,
    /// Quadrature component
    pub q: i16,
}

impl IqSample {
    /// Create a new IQ sample
    #[must_use]
    pub const fn new(i: i16, q: i16) -> Self {
        Self { i, q }
    }

    /// The pair scaled down by 6 dB, as used for the magnitude estimate
    #[must_use]
    pub const fn halved(self) -> Self {
        Self {
            i: self.i / 2,
            q: self.q / 2,
        }
    }
}

/// Saturate an intermediate result into the sample range
#[inline]
fn saturate(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Microphone conditioner: Fs/2 notch then DC-blocking high-pass
///
/// Adds 6 dB of gain up front to make up for the losses of the two
/// sections.
#[derive(Clone, Copy, Debug, Default)]
pub struct MicConditioner {
    /// Low-pass state
    z1: i32,
    /// Slow average (DC estimate)
    dc: i32,
}

impl MicConditioner {
    /// Create a conditioner with cleared state
    #[must_use]
    pub const fn new() -> Self {
        Self { z1: 0, dc: 0 }
    }

    /// Process one sample
    pub fn process(&mut self, input: i16) -> i16 {
        let input = i32::from(input);
        let ac = input * 2 + self.z1;
        self.z1 = (input - 2 * self.z1) / 3;
        self.dc = (ac + 2 * self.dc) / 3;
        saturate(ac - self.dc)
    }

    /// Clear the filter state
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Number of taps in the Hilbert delay line
pub const HILBERT_TAPS: usize = 15;

/// Approximate Hilbert transformer
///
/// The in-phase output is the centre tap (7 samples of delay, doubled);
/// the quadrature output is an antisymmetric weighted sum of the taps
/// around it. Both carry 6 dB of gain to keep quantization noise out of
/// the phase estimate.
#[derive(Clone, Copy, Debug)]
pub struct HilbertTransform {
    /// Delay line, oldest sample first
    taps: [i16; HILBERT_TAPS + 1],
}

impl HilbertTransform {
    /// Create a transformer with an empty delay line
    #[must_use]
    pub const fn new() -> Self {
        Self {
            taps: [0; HILBERT_TAPS + 1],
        }
    }

    /// Push one sample and return the resulting I/Q pair
    pub fn process(&mut self, input: i16) -> IqSample {
        self.taps.copy_within(1.., 0);
        self.taps[HILBERT_TAPS] = input;

        let v = |n: usize| i32::from(self.taps[n]);
        let i = v(7) * 2;
        let q = ((v(0) - v(14)) * 2 + (v(2) - v(12)) * 8 + (v(4) - v(10)) * 21 + (v(6) - v(8)) * 16)
            / 64
            + (v(6) - v(8));

        IqSample::new(saturate(i), saturate(q))
    }

    /// Clear the delay line
    pub fn reset(&mut self) {
        self.taps = [0; HILBERT_TAPS + 1];
    }
}

impl Default for HilbertTransform {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete SSB front end: conditioner followed by the Hilbert transformer
#[derive(Clone, Copy, Debug, Default)]
pub struct SsbFrontEnd {
    conditioner: MicConditioner,
    hilbert: HilbertTransform,
}

impl SsbFrontEnd {
    /// Create a front end with cleared state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditioner: MicConditioner::new(),
            hilbert: HilbertTransform::new(),
        }
    }

    /// Process one microphone sample into an I/Q pair
    pub fn process(&mut self, input: i16) -> IqSample {
        let conditioned = self.conditioner.process(input);
        self.hilbert.process(conditioned)
    }

    /// Clear all filter state
    pub fn reset(&mut self) {
        self.conditioner.reset();
        self.hilbert.reset();
    }
}
