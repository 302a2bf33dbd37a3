//! Host test doubles for the transmit chain
//!
//! - [`FakeSynthBus`]: a register file behind `embedded_hal::i2c::I2c`
//! - [`FakePwm`]: records every duty cycle written
//! - [`ScriptedMic`]: plays back a sample script

#![allow(dead_code)]

use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, Operation};
use embedded_hal::pwm::{self, SetDutyCycle};
use phase_ampl_tx::drivers::si5351::reg;
use phase_ampl_tx::hal::SampleSource;

/// One write transaction seen on the bus
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusWrite {
    pub reg: u8,
    pub data: Vec<u8>,
}

/// `Si5351A` register file with fault injection
pub struct FakeSynthBus {
    pub regs: [u8; 256],
    pointer: u8,
    pub writes: Vec<BusWrite>,
    /// Fail every write to this register
    pub fail_reg: Option<u8>,
    /// Fail this many transactions, then recover
    pub fail_next: usize,
    /// XOR mask applied to every byte read
    pub read_corruption: u8,
    pub transactions: usize,
}

impl FakeSynthBus {
    pub fn new() -> Self {
        Self {
            regs: [0; 256],
            pointer: 0,
            writes: Vec::new(),
            fail_reg: None,
            fail_next: 0,
            read_corruption: 0,
            transactions: 0,
        }
    }

    /// Values written to the output-enable register, in order
    pub fn output_enable_writes(&self) -> Vec<u8> {
        self.writes_to(reg::OUTPUT_ENABLE)
            .map(|w| w.data[0])
            .collect()
    }

    /// Bulk writes of the PLLA block
    pub fn bulk_writes(&self) -> Vec<&BusWrite> {
        self.writes_to(reg::PLLA_PARAMS)
            .filter(|w| w.data.len() == 8)
            .collect()
    }

    pub fn writes_to(&self, reg: u8) -> impl Iterator<Item = &BusWrite> {
        self.writes.iter().filter(move |w| w.reg == reg)
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
    }
}

impl Default for FakeSynthBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for FakeSynthBus {
    type Error = ErrorKind;
}

impl I2c for FakeSynthBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transactions += 1;
        if address != 0x60 {
            return Err(ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address));
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(ErrorKind::ArbitrationLoss);
        }

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    if self.fail_reg == Some(reg) && !data.is_empty() {
                        return Err(ErrorKind::Other);
                    }
                    self.pointer = reg;
                    for &b in data {
                        self.regs[usize::from(self.pointer)] = b;
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                    if !data.is_empty() {
                        self.writes.push(BusWrite {
                            reg,
                            data: data.to_vec(),
                        });
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.regs[usize::from(self.pointer)] ^ self.read_corruption;
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

/// PWM channel that records duty cycles (8-bit full scale)
#[derive(Default)]
pub struct FakePwm {
    pub levels: Vec<u16>,
    pub fail: bool,
}

impl FakePwm {
    pub fn last(&self) -> Option<u16> {
        self.levels.last().copied()
    }
}

impl pwm::ErrorType for FakePwm {
    type Error = pwm::ErrorKind;
}

impl SetDutyCycle for FakePwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if self.fail {
            return Err(pwm::ErrorKind::Other);
        }
        self.levels.push(duty);
        Ok(())
    }
}

/// Microphone playing back a script, then silence
#[derive(Default)]
pub struct ScriptedMic {
    samples: Vec<i16>,
    pos: usize,
    pub reads: usize,
}

impl ScriptedMic {
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples,
            pos: 0,
            reads: 0,
        }
    }

    pub fn silent() -> Self {
        Self::new(Vec::new())
    }
}

impl SampleSource for ScriptedMic {
    fn read_sample(&mut self) -> i16 {
        self.reads += 1;
        let sample = self.samples.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        sample
    }
}

/// `len` samples of a sine tone at `freq_hz` for sample rate `rate`
pub fn tone(freq_hz: f64, amplitude: f64, rate: u32, len: usize) -> Vec<i16> {
    (0..len)
        .map(|n| {
            let t = n as f64 / f64::from(rate);
            (amplitude * (2.0 * std::f64::consts::PI * freq_hz * t).sin()).round() as i16
        })
        .collect()
}
