//! Phase/Amplitude Transmitter Firmware Library
//!
//! Real-time transmit chain for an STM32G474 shortwave transceiver in the
//! uSDX style: microphone samples become a phase stream for an `Si5351A`
//! synthesizer and an envelope for the PA supply PWM, one sample at a time
//! under a fixed per-sample deadline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 CONTROL LOOP (thread priority)              │
//! │   PTT debounce  │  mode / drive / VOX  │  retune requests   │
//! ├──────────────── radio::handoff (atomic words) ──────────────┤
//! │               SAMPLE TICK (interrupt priority)              │
//! │  radio::transmit  →  dsp (encode, gate, shape, limit)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                        │
//! │  Si5351 over I2C  │  PWM amplitude + side tone  │  mic ADC  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                         │
//! │        embassy-rs (thread + interrupt executors)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Fixed point only** in the sample path; bounded work per tick
//! - **Type-driven design**: Custom types enforce invariants at compile time
//! - **No unsafe in application code**: All unsafe isolated in HAL/FFI layers
//! - **No error escapes the tick**: faults degrade to carrier off
//! - **Hardware behind `embedded-hal` traits**, so the chain runs on the host

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// Bus helpers, the sample-source seam and STM32G474 peripheral glue.
pub mod hal;

/// Peripheral Drivers
///
/// `Si5351A` synthesizer driver.
pub mod drivers;

/// Digital Signal Processing
///
/// Fixed-point encoders, shapers and register calculations.
pub mod dsp;

/// Radio Control Logic
///
/// Transmit state machine, VOX gate and control handoff.
pub mod radio;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    // Common traits
    pub use embedded_hal::i2c::I2c;
    pub use embedded_hal::pwm::SetDutyCycle;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
