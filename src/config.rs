//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the transmitter hardware.
//! All pin mappings, clock frequencies, and signal-chain scale factors are
//! centralized here.

use crate::types::{Frequency, Mode};

/// System clock frequency (STM32G474 @ 170MHz)
pub const SYSTEM_CLOCK_HZ: u32 = 170_000_000;

/// Transmit sample rate; one synthesizer update per sample
///
/// Bounded by the bulk transfer (~64 bits on the bus) plus the PLL
/// settle time, which together must fit in one sample period.
pub const TX_SAMPLE_RATE: u32 = 5_336;

/// Unit angle: integer representation of one full turn
///
/// Must divide [`TX_SAMPLE_RATE`] exactly and is kept low so the
/// polynomial arctangent cannot overflow.
pub const UNIT_ANGLE: i32 = 667;

/// Frequency step represented by one unit-angle tick per sample
pub const HZ_PER_UNIT_ANGLE: i32 = TX_SAMPLE_RATE as i32 / UNIT_ANGLE;

/// PWM level at which the PA reaches its minimum output
pub const PWM_MIN_LEVEL: u8 = 29;

/// PWM level at which the PA reaches its maximum output
pub const PWM_MAX_LEVEL: u8 = 255;

/// Pedestal added to the AM envelope before clamping
pub const AM_BASE: i32 = 32;

/// Default VOX threshold on the magnitude estimate
pub const DEFAULT_VOX_THRESHOLD: u8 = 50;

/// Default microphone drive shift
pub const DEFAULT_DRIVE: u8 = 2;

/// Default side-tone monitor volume
pub const DEFAULT_SIDETONE_VOLUME: u8 = 12;

/// Mid-scale of the 12-bit microphone ADC
pub const ADC_BIAS: i16 = 2048;

/// Bus clock for the synthesizer link (Fast-mode Plus)
pub const I2C_FREQUENCY_HZ: u32 = 1_000_000;

/// `Si5351A` I2C address
pub const SI5351_I2C_ADDR: u8 = 0x60;

/// `Si5351A` crystal frequency (25 MHz standard)
pub const SI5351_XTAL_FREQ: u32 = 25_000_000;

/// Fast-tuning span around the programmed carrier, in Hz
///
/// The PLL integer part is kept constant across this span so each sample
/// only rewrites the fractional numerator.
pub const FAST_TUNING_SPAN_HZ: i32 = 10_000;

/// Bulk writes checked by the start-up bit-error test
pub const SELF_TEST_BER_ITERATIONS: u16 = 10_000;

/// Bulk writes timed by the start-up throughput test
pub const SELF_TEST_SPEED_ITERATIONS: u16 = 1_000;

/// PWM carrier frequency for the amplitude and side-tone outputs
pub const PWM_FREQUENCY_HZ: u32 = 250_000;

/// PTT debounce interval in milliseconds
pub const PTT_DEBOUNCE_MS: u64 = 10;

/// Default startup carrier frequency (40m band)
pub const DEFAULT_FREQUENCY_HZ: u32 = 7_100_000;

/// Default operating mode
pub const DEFAULT_MODE: Mode = Mode::Usb;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic

    /// I2C1 SCL (Si5351)
    pub const I2C1_SCL: &str = "PB8";

    /// I2C1 SDA (Si5351)
    pub const I2C1_SDA: &str = "PB9";

    /// PTT input (active low)
    pub const PTT_IN: &str = "PA3";

    /// Microphone ADC input
    pub const MIC_ADC: &str = "PA1";

    /// PA amplitude PWM output (TIM1 CH1)
    pub const PA_AMPLITUDE: &str = "PA8";

    /// Side-tone PWM output (TIM1 CH2)
    pub const SIDETONE: &str = "PA9";
}

/// Timer assignments
pub mod timers {
    //! Hardware timer assignments

    /// Amplitude and side-tone PWM timer
    pub const PWM: u8 = 1;

    /// Sample clock interrupt priority executor
    pub const SAMPLE_CLOCK_SWI: &str = "UART4";
}

/// Build the default startup frequency
#[must_use]
pub const fn default_frequency() -> Option<Frequency> {
    Frequency::from_hz(DEFAULT_FREQUENCY_HZ)
}
