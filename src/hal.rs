//! Hardware Abstraction Layer
//!
//! The transmit chain only sees `embedded-hal` traits plus
//! [`SampleSource`]; the STM32G474 glue behind them is built with the
//! `embedded` feature.

pub mod i2c;

#[cfg(feature = "embedded")]
pub mod adc;
#[cfg(feature = "embedded")]
pub mod timer;

/// Source of microphone samples, one per transmit tick
///
/// Implementations must not block: the sample is read from the sample
/// interrupt.
pub trait SampleSource {
    /// Latest signed sample, bias removed
    fn read_sample(&mut self) -> i16;
}

impl<F: FnMut() -> i16> SampleSource for F {
    fn read_sample(&mut self) -> i16 {
        self()
    }
}

/// Fixed-rate tick schedule on a timer of coarser resolution
///
/// Deadlines are derived from the tick count instead of adding a rounded
/// period each time, so the average rate is exact even when one period is
/// not a whole number of timer ticks (5336 Hz on a 1 MHz timer alternates
/// 187 and 188 µs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleSchedule {
    timer_hz: u64,
    rate_hz: u32,
}

impl SampleSchedule {
    /// Schedule `rate_hz` ticks per second on a `timer_hz` time base
    #[must_use]
    pub const fn new(timer_hz: u64, rate_hz: u32) -> Self {
        Self {
            timer_hz,
            rate_hz: if rate_hz == 0 { 1 } else { rate_hz },
        }
    }

    /// Tick rate in Hz
    #[must_use]
    pub const fn rate_hz(&self) -> u32 {
        self.rate_hz
    }

    /// Timer ticks from the origin to the deadline of tick `n`
    #[must_use]
    pub const fn offset(&self, n: u64) -> u64 {
        (n as u128 * self.timer_hz as u128 / self.rate_hz as u128) as u64
    }

    /// Shortest interval between two deadlines, in timer ticks
    #[must_use]
    pub const fn min_period(&self) -> u64 {
        self.timer_hz / self.rate_hz as u64
    }
}
