//! Digital Signal Processing
//!
//! Fixed-point transmit signal chain:
//! - Microphone conditioning and Hilbert transform for SSB
//! - Polar (magnitude/phase) estimates
//! - Phase rate limiting
//! - Amplitude lookup and key-click shaping
//! - Side-tone generation
//! - Per-mode sample encoders
//! - Si5351 register calculation

pub mod filter;
pub mod polar;
pub mod phase;
pub mod amplitude;
pub mod oscillator;
pub mod modulation;
pub mod si5351_calc;
