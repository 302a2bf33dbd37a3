//! I2C Register Access
//!
//! Register-oriented helpers over any blocking `embedded-hal` I2C bus. The
//! sample interrupt drives the synthesizer from here, so every call is a
//! single bus transaction with no allocation.

use embedded_hal::i2c::I2c;

/// Longest register burst sent in one transaction
pub const MAX_BURST: usize = 16;

/// I2C device address wrapper
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// `Si5351A` clock synthesizer address
    pub const SI5351: Self = Self(crate::config::SI5351_I2C_ADDR);

    /// Create from 7-bit address
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self(addr & 0x7F)
    }

    /// Get the 7-bit address
    #[must_use]
    pub const fn addr(self) -> u8 {
        self.0
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for I2cAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{:02X}", self.0);
    }
}

/// One device on a register-addressed bus
pub struct RegisterBus<B> {
    i2c: B,
    addr: I2cAddress,
}

impl<B: I2c> RegisterBus<B> {
    /// Wrap a bus for the device at `addr`
    #[must_use]
    pub const fn new(i2c: B, addr: I2cAddress) -> Self {
        Self { i2c, addr }
    }

    /// Device address
    #[must_use]
    pub const fn address(&self) -> I2cAddress {
        self.addr
    }

    /// Borrow the underlying bus
    pub fn bus(&self) -> &B {
        &self.i2c
    }

    /// Mutably borrow the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.i2c
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.i2c
    }

    /// Write a single register
    pub fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), B::Error> {
        self.i2c.write(self.addr.addr(), &[reg, value])
    }

    /// Read a single register
    pub fn read_reg(&mut self, reg: u8) -> Result<u8, B::Error> {
        let mut buf = [0u8];
        self.i2c.write_read(self.addr.addr(), &[reg], &mut buf)?;
        Ok(buf[0])
    }

    /// Write consecutive registers starting at `base_reg`
    ///
    /// Bursts up to [`MAX_BURST`] bytes go out as one transaction; longer
    /// runs fall back to single-register writes.
    pub fn write_regs(&mut self, base_reg: u8, values: &[u8]) -> Result<(), B::Error> {
        if values.len() <= MAX_BURST {
            let mut buf = [0u8; MAX_BURST + 1];
            buf[0] = base_reg;
            buf[1..=values.len()].copy_from_slice(values);
            self.i2c.write(self.addr.addr(), &buf[..=values.len()])
        } else {
            for (offset, &value) in (0u8..).zip(values) {
                self.write_reg(base_reg.wrapping_add(offset), value)?;
            }
            Ok(())
        }
    }

    /// Read consecutive registers starting at `base_reg`
    pub fn read_regs(&mut self, base_reg: u8, buffer: &mut [u8]) -> Result<(), B::Error> {
        self.i2c.write_read(self.addr.addr(), &[base_reg], buffer)
    }
}
