//! Radio Control Logic
//!
//! Transmit state machines and the handoff between the control loop and
//! the sample interrupt.

pub mod handoff;
pub mod vox;
pub mod transmit;
