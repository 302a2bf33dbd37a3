//! Peripheral Drivers
//!
//! High-level drivers for external ICs, generic over the `embedded-hal`
//! bus traits.

pub mod si5351;
