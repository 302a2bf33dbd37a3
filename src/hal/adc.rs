//! ADC Driver
//!
//! Microphone input for the transmit chain. One blocking conversion per
//! sample tick; at the configured sample time it completes well inside the
//! sample period.

use embassy_stm32::adc::{Adc, AdcChannel, SampleTime};
use embassy_stm32::peripherals::ADC1;

use super::SampleSource;
use crate::config::ADC_BIAS;

/// ADC reading result
#[derive(Clone, Copy, Debug)]
pub struct AdcReading {
    /// Raw 12-bit ADC value (0-4095)
    raw: u16,
}

impl AdcReading {
    /// Create a new ADC reading from raw value
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    /// Get the raw 12-bit value
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.raw
    }

    /// Signed sample with the mid-scale bias removed
    #[must_use]
    pub fn as_mic_sample(self) -> i16 {
        (i32::from(self.raw) - i32::from(ADC_BIAS)) as i16
    }
}

impl defmt::Format for AdcReading {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ADC({})", self.raw);
    }
}

/// Microphone ADC bound to one input channel
pub struct MicInput<'d, C> {
    adc: Adc<'d, ADC1>,
    channel: C,
}

impl<'d, C: AdcChannel<ADC1>> MicInput<'d, C> {
    /// Create the microphone input and configure its sample time
    #[must_use]
    pub fn new(adc: ADC1, channel: C) -> Self {
        let mut adc = Adc::new(adc);
        adc.set_sample_time(SampleTime::CYCLES47_5);
        Self { adc, channel }
    }

    /// Read one raw conversion
    pub fn read(&mut self) -> AdcReading {
        AdcReading::from_raw(self.adc.blocking_read(&mut self.channel))
    }
}

impl<C: AdcChannel<ADC1>> SampleSource for MicInput<'_, C> {
    fn read_sample(&mut self) -> i16 {
        self.read().as_mic_sample()
    }
}
