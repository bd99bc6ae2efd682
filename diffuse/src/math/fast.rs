//! Fast exp2/log2 approximations built on IEEE 754 bit manipulation.
//!
//! # Accuracy
//! - [`fast_exp2`]: relative error < 1e-4 over the clamped input range.
//! - [`fast_log2`]: absolute error < 1e-5 for normal positive inputs.
//!
//! # Algorithm
//! `exp2`: split `x = n + f` with `n = floor(x)`, evaluate `2^f` on `[0, 1)`
//! with a degree-5 polynomial, then add `n` to the exponent field.
//! `log2`: read the exponent field directly, map the mantissa `m ∈ [1, 2)` to
//! `z = (m - 1) / (m + 1)` and sum the odd `atanh` series to `z^9`.

use std::f32::consts::{LN_2, LOG2_E};

// 2^f = e^(f ln2), Taylor coefficients (ln2)^k / k!
const EXP2_C1: f32 = 0.693_147_2;
const EXP2_C2: f32 = 0.240_226_5;
const EXP2_C3: f32 = 0.055_504_11;
const EXP2_C4: f32 = 0.009_618_129;
const EXP2_C5: f32 = 0.001_333_355_8;

/// Clamp bounds keeping `2^n` a normal f32.
const EXP2_LO: f32 = -126.0;
const EXP2_HI: f32 = 127.0;

const MANTISSA_MASK: u32 = 0x007f_ffff;
const EXPONENT_ONE: u32 = 0x3f80_0000;

#[inline]
pub fn fast_exp2(x: f32) -> f32 {
    if x.is_nan() {
        return x;
    }
    let x = x.clamp(EXP2_LO, EXP2_HI);
    let n = x.floor();
    let f = x - n;

    let p = EXP2_C5;
    let p = p * f + EXP2_C4;
    let p = p * f + EXP2_C3;
    let p = p * f + EXP2_C2;
    let p = p * f + EXP2_C1;
    let p = p * f + 1.0;

    let pow2n = f32::from_bits(((127 + n as i32) as u32) << 23);
    p * pow2n
}

#[inline]
pub fn fast_log2(x: f32) -> f32 {
    if !x.is_normal() || x < 0.0 {
        // zero, negatives, subnormals, inf and NaN keep std semantics
        return x.log2();
    }
    let bits = x.to_bits();
    let exponent = ((bits >> 23) & 0xff) as i32 - 127;
    let m = f32::from_bits((bits & MANTISSA_MASK) | EXPONENT_ONE);

    let z = (m - 1.0) / (m + 1.0);
    let z2 = z * z;
    let ln_m = 2.0
        * z
        * (1.0 + z2 * (1.0 / 3.0 + z2 * (1.0 / 5.0 + z2 * (1.0 / 7.0 + z2 * (1.0 / 9.0)))));

    exponent as f32 + ln_m * LOG2_E
}

#[inline]
pub fn fast_exp(x: f32) -> f32 {
    fast_exp2(x * LOG2_E)
}

#[inline]
pub fn fast_ln(x: f32) -> f32 {
    fast_log2(x) * LN_2
}
