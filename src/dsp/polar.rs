//! Fixed-point Polar Estimates
//!
//! Converts an I/Q pair to magnitude and phase without floating point or
//! transcendental calls, so both fit inside one sample period.
//!
//! Angles are expressed in unit-angle ticks: [`UNIT_ANGLE`] ticks make a
//! full turn. Results lie in `-UNIT_ANGLE/2..=UNIT_ANGLE/2`.
//!
//! The arctangent uses the three-term polynomial from "Efficient
//! Approximations for the Arctangent Function" (Rajan et al., eq. 5),
//! folded into one octant. Its error stays below 0.8°.

use crate::config::UNIT_ANGLE;

/// One eighth of a turn: the `z` coefficient of the polynomial
const EIGHTH: i32 = UNIT_ANGLE / 8;

/// Correction coefficient of the polynomial
const CORR: i32 = UNIT_ANGLE / 22;

/// Quarter turn
const QUARTER: i32 = UNIT_ANGLE / 4;

/// Half turn
const HALF: i32 = UNIT_ANGLE / 2;

/// Arctangent of `num/den` for `0 <= num <= den`, `den > 0`
///
/// Evaluates `(EIGHTH + CORR - CORR * z) * z` with `z = num/den` while
/// keeping every division last so no precision is lost to integer `z`.
#[inline]
fn atan_octant(num: i32, den: i32) -> i32 {
    ((EIGHTH + CORR - CORR * num / den) * num) / den
}

/// Three-term polynomial arctangent of `q / i` (error ~0.8°)
///
/// Returns the angle of the vector `(i, q)` in unit-angle ticks.
/// `arctan3(0, 0)` is defined as 0.
#[must_use]
#[inline]
pub fn arctan3(q: i16, i: i16) -> i16 {
    let (q, i) = (i32::from(q), i32::from(i));
    let (abs_q, abs_i) = (q.abs(), i.abs());

    let mut r = if abs_q > abs_i {
        // arctan(z) = 90° - arctan(1/z)
        QUARTER - atan_octant(abs_i, abs_q)
    } else if i == 0 {
        0
    } else {
        atan_octant(abs_q, abs_i)
    };

    if i < 0 {
        r = HALF - r;
    }
    if q < 0 {
        r = -r;
    }
    // |r| <= HALF, always within i16
    r as i16
}

/// Sum-of-magnitudes approximation of `sqrt(i² + q²)` (error 0.95 dB)
///
/// `max + min/4`. Saturates at `u16::MAX`, which needs inputs far beyond
/// the 16-bit sample range.
#[must_use]
#[inline]
pub fn magnitude(i: i16, q: i16) -> u16 {
    let (abs_i, abs_q) = (i32::from(i).abs(), i32::from(q).abs());
    let mag = if abs_i > abs_q {
        abs_i + abs_q / 4
    } else {
        abs_q + abs_i / 4
    };
    mag.min(i32::from(u16::MAX)) as u16
}

/// Convert unit-angle ticks to degrees (diagnostics and tests)
#[must_use]
pub fn ticks_to_degrees(ticks: i32) -> f32 {
    ticks as f32 * 360.0 / UNIT_ANGLE as f32
}
