//! `Si5351A` Clock Synthesizer Driver
//!
//! Drives the transmit carrier on CLK2 from PLLA. The carrier is planned
//! once per frequency change; after that every sample only rewrites the
//! 8-byte PLLA block, which is the one bus transfer that has to fit inside
//! the sample period.
//!
//! Blocking and generic over any `embedded-hal` I2C bus so the same code
//! runs in the sample interrupt and against host test doubles.

use core::fmt;

use embedded_hal::i2c::I2c;

use crate::config::{
    FAST_TUNING_SPAN_HZ, SELF_TEST_BER_ITERATIONS, SELF_TEST_SPEED_ITERATIONS, SI5351_XTAL_FREQ,
};
use crate::dsp::si5351_calc::{FastTuning, SynthRegisters, BLOCK_LEN};
use crate::hal::i2c::{I2cAddress, RegisterBus};
use crate::types::Frequency;

/// `Si5351A` register addresses
pub mod reg {
    /// Device status (bit 7: `SYS_INIT`)
    pub const DEVICE_STATUS: u8 = 0;
    /// Output enable control (1 = disabled)
    pub const OUTPUT_ENABLE: u8 = 3;
    /// CLK0 control
    pub const CLK0_CONTROL: u8 = 16;
    /// CLK1 control
    pub const CLK1_CONTROL: u8 = 17;
    /// CLK2 control
    pub const CLK2_CONTROL: u8 = 18;
    /// PLLA parameter block
    pub const PLLA_PARAMS: u8 = 26;
    /// Multisynth 2 parameter block
    pub const MS2_PARAMS: u8 = 58;
    /// PLL soft reset
    pub const PLL_RESET: u8 = 177;
    /// Crystal load capacitance
    pub const CRYSTAL_LOAD: u8 = 183;
}

/// Output-enable value with only CLK2 running
pub const OE_CARRIER_ON: u8 = 0b1111_1011;

/// Output-enable value with every output stopped
pub const OE_ALL_OFF: u8 = 0xFF;

/// CLK control: output powered down
const CLK_POWER_DOWN: u8 = 0x80;
/// CLK control: multisynth in integer mode
const CLK_MS_INT: u8 = 0x40;
/// CLK control: source is the local multisynth
const CLK_SRC_MS: u8 = 0x0C;
/// PLL reset: PLLA
const PLLA_RESET: u8 = 0x20;

/// `SYS_INIT` polls before giving up and carrying on
const READY_POLLS: u16 = 1_000;

/// Bytes of the PLL block compared by the bit-error test
const READBACK: core::ops::Range<usize> = 4..BLOCK_LEN;

/// Drive strength setting
#[derive(Clone, Copy, Debug, Default)]
pub enum DriveStrength {
    /// 2mA drive
    Drive2mA,
    /// 4mA drive
    Drive4mA,
    /// 6mA drive
    Drive6mA,
    /// 8mA drive (maximum)
    #[default]
    Drive8mA,
}

impl DriveStrength {
    /// Get register value
    const fn as_reg(self) -> u8 {
        match self {
            Self::Drive2mA => 0,
            Self::Drive4mA => 1,
            Self::Drive6mA => 2,
            Self::Drive8mA => 3,
        }
    }
}

/// Crystal load capacitance
#[derive(Clone, Copy, Debug, Default)]
pub enum CrystalLoad {
    /// 6 pF load
    Load6pF,
    /// 8 pF load
    Load8pF,
    /// 10 pF load
    #[default]
    Load10pF,
}

impl CrystalLoad {
    const fn as_reg(self) -> u8 {
        match self {
            Self::Load6pF => 0b0100_0000,
            Self::Load8pF => 0b1000_0000,
            Self::Load10pF => 0b1100_0000,
        }
    }
}

/// Synthesizer driver error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthError<E> {
    /// Bus transaction failed
    Bus(E),
    /// No divider plan reaches the requested carrier, or none has been set
    NoSolution,
}

impl<E: embedded_hal::i2c::Error> fmt::Display for SynthError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "synthesizer bus error: {:?}", e.kind()),
            Self::NoSolution => write!(f, "no synthesizer plan for carrier"),
        }
    }
}

#[cfg(feature = "embedded")]
impl<E> defmt::Format for SynthError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Bus(_) => defmt::write!(f, "synth bus error"),
            Self::NoSolution => defmt::write!(f, "synth no solution"),
        }
    }
}

/// Start-up bus self-test results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusReport {
    /// Bytes that failed to read back (or whose transfer failed)
    pub bit_errors: u32,
    /// Bulk writes checked for errors
    pub transfers: u16,
    /// Measured bulk-write throughput in kbit/s (0 if unmeasurable)
    pub throughput_kbps: u32,
    /// Time taken by the throughput run in microseconds
    pub elapsed_us: u32,
}

impl BusReport {
    /// No errors seen
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.bit_errors == 0
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for BusReport {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{} errors / {} writes, {} kbit/s",
            self.bit_errors,
            self.transfers,
            self.throughput_kbps
        );
    }
}

/// `Si5351A` driver
pub struct Si5351<B> {
    bus: RegisterBus<B>,
    xtal_hz: u32,
    drive: DriveStrength,
    tuning: Option<FastTuning>,
    output_enable: u8,
}

impl<B: I2c> Si5351<B> {
    /// Create a driver with the default 25 MHz crystal
    #[must_use]
    pub const fn new(i2c: B) -> Self {
        Self::with_xtal(i2c, SI5351_XTAL_FREQ)
    }

    /// Create a driver for a specific crystal frequency
    #[must_use]
    pub const fn with_xtal(i2c: B, xtal_hz: u32) -> Self {
        Self {
            bus: RegisterBus::new(i2c, I2cAddress::SI5351),
            xtal_hz,
            drive: DriveStrength::Drive8mA,
            tuning: None,
            output_enable: OE_ALL_OFF,
        }
    }

    /// Set the CLK2 drive strength used by the next [`set_carrier`](Self::set_carrier)
    pub fn set_drive_strength(&mut self, drive: DriveStrength) {
        self.drive = drive;
    }

    /// Initialize the `Si5351A`: all outputs off and powered down
    pub fn init(&mut self, load: CrystalLoad) -> Result<(), SynthError<B::Error>> {
        self.wait_ready()?;
        self.power_down()?;
        self.bus
            .write_reg(reg::CRYSTAL_LOAD, load.as_reg())
            .map_err(SynthError::Bus)?;

        #[cfg(feature = "embedded")]
        defmt::info!("Si5351 initialized");
        Ok(())
    }

    /// Wait for device to be ready (`SYS_INIT` cleared)
    fn wait_ready(&mut self) -> Result<(), SynthError<B::Error>> {
        for _ in 0..READY_POLLS {
            let status = self
                .bus
                .read_reg(reg::DEVICE_STATUS)
                .map_err(SynthError::Bus)?;
            if status & 0x80 == 0 {
                return Ok(());
            }
        }
        // Timeout, but continue anyway
        #[cfg(feature = "embedded")]
        defmt::warn!("Si5351 SYS_INIT still set");
        Ok(())
    }

    /// Disable and power down CLK0-CLK2
    ///
    /// Some variants boot with CLK2 running.
    pub fn power_down(&mut self) -> Result<(), SynthError<B::Error>> {
        self.write_output_enable(OE_ALL_OFF)?;
        for control in [reg::CLK0_CONTROL, reg::CLK1_CONTROL, reg::CLK2_CONTROL] {
            self.bus
                .write_reg(control, CLK_POWER_DOWN)
                .map_err(SynthError::Bus)?;
        }
        Ok(())
    }

    /// Program the transmit carrier on CLK2 and plan fast tuning around it
    pub fn set_carrier(&mut self, freq: Frequency) -> Result<(), SynthError<B::Error>> {
        let span = FAST_TUNING_SPAN_HZ.unsigned_abs();
        let tuning =
            FastTuning::plan(self.xtal_hz, freq.as_hz(), span).ok_or(SynthError::NoSolution)?;

        let ms = SynthRegisters::from_ms(&tuning.divider());
        self.bus
            .write_regs(reg::MS2_PARAMS, ms.as_bytes())
            .map_err(SynthError::Bus)?;

        let control = CLK_MS_INT | CLK_SRC_MS | self.drive.as_reg();
        self.bus
            .write_reg(reg::CLK2_CONTROL, control)
            .map_err(SynthError::Bus)?;

        self.write_bulk(&tuning.registers(0))?;
        self.bus
            .write_reg(reg::PLL_RESET, PLLA_RESET)
            .map_err(SynthError::Bus)?;

        self.tuning = Some(tuning);

        #[cfg(feature = "embedded")]
        defmt::info!("Carrier {} (MS2 /{})", freq, tuning.divider().a);
        Ok(())
    }

    /// Active fast-tuning plan, if a carrier has been set
    #[must_use]
    pub const fn tuning(&self) -> Option<&FastTuning> {
        self.tuning.as_ref()
    }

    /// Register block for a carrier offset of `df` Hz
    ///
    /// Pure calculation; `None` until a carrier has been set.
    #[must_use]
    pub fn compute_registers(&self, df: i32) -> Option<SynthRegisters> {
        self.tuning.as_ref().map(|t| t.registers(df))
    }

    /// Send a PLLA block as one bus transaction
    pub fn write_bulk(&mut self, regs: &SynthRegisters) -> Result<(), SynthError<B::Error>> {
        self.bus
            .write_regs(reg::PLLA_PARAMS, regs.as_bytes())
            .map_err(SynthError::Bus)
    }

    /// Enable CLK2 alone, or stop every output
    pub fn set_output_enabled(&mut self, enabled: bool) -> Result<(), SynthError<B::Error>> {
        self.write_output_enable(if enabled { OE_CARRIER_ON } else { OE_ALL_OFF })
    }

    /// Whether the last output-enable write turned the carrier on
    #[must_use]
    pub const fn is_output_enabled(&self) -> bool {
        self.output_enable == OE_CARRIER_ON
    }

    fn write_output_enable(&mut self, value: u8) -> Result<(), SynthError<B::Error>> {
        self.bus
            .write_reg(reg::OUTPUT_ENABLE, value)
            .map_err(SynthError::Bus)?;
        self.output_enable = value;
        Ok(())
    }

    /// Bus bit-error and throughput test
    ///
    /// Writes successive fast-tuning blocks and reads back their last four
    /// bytes, then times a run of bulk writes with `now_us`, a free-running
    /// microsecond clock. Errors are counted, never returned; the only
    /// failure is calling this before a carrier has been set. The carrier
    /// block is restored afterwards.
    pub fn self_test(
        &mut self,
        mut now_us: impl FnMut() -> u32,
    ) -> Result<BusReport, SynthError<B::Error>> {
        let tuning = self.tuning.ok_or(SynthError::NoSolution)?;
        let mut report = BusReport {
            transfers: SELF_TEST_BER_ITERATIONS,
            ..BusReport::default()
        };

        for i in 0..SELF_TEST_BER_ITERATIONS {
            let regs = tuning.registers(i32::from(i));
            report.bit_errors += self.check_transfer(&regs);
        }

        let regs = tuning.registers(0);
        let start = now_us();
        for _ in 0..SELF_TEST_SPEED_ITERATIONS {
            // Errors were counted above
            let _ = self.write_bulk(&regs);
        }
        let elapsed = now_us().wrapping_sub(start);
        report.elapsed_us = elapsed;
        report.throughput_kbps = throughput_kbps(SELF_TEST_SPEED_ITERATIONS, elapsed);

        // Best effort; the caller retunes before transmitting anyway
        let _ = self.write_bulk(&regs);

        if report.is_clean() {
            #[cfg(feature = "embedded")]
            defmt::info!("I2C self-test: {}", report);
        } else {
            #[cfg(feature = "embedded")]
            defmt::warn!("I2C self-test: {}", report);
        }
        Ok(report)
    }

    /// Write one block and count the bytes that fail to read back
    fn check_transfer(&mut self, regs: &SynthRegisters) -> u32 {
        let expected = &regs.as_bytes()[READBACK];
        if self.write_bulk(regs).is_err() {
            return expected.len() as u32;
        }
        let mut readback = [0u8; BLOCK_LEN - 4];
        match self
            .bus
            .read_regs(reg::PLLA_PARAMS + READBACK.start as u8, &mut readback)
        {
            Ok(()) => expected
                .iter()
                .zip(readback.iter())
                .filter(|(want, got)| want != got)
                .count() as u32,
            Err(_) => expected.len() as u32,
        }
    }

    /// Borrow the underlying bus
    pub fn bus(&self) -> &B {
        self.bus.bus()
    }

    /// Mutably borrow the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        self.bus.bus_mut()
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.bus.release()
    }
}

/// Throughput of `writes` bulk transfers taking `elapsed_us`, in kbit/s
///
/// Counts 7 bytes per transfer. Returns 0 when nothing measurable elapsed.
#[must_use]
pub fn throughput_kbps(writes: u16, elapsed_us: u32) -> u32 {
    if elapsed_us == 0 {
        return 0;
    }
    let bits = u64::from(writes) * 8 * 7;
    (bits * 1000 / u64::from(elapsed_us)).min(u64::from(u32::MAX)) as u32
}
