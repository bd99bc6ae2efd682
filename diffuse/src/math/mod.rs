//! Scalar math helpers.
//!
//! Transcendental functions used in per-pixel loops go through the
//! [`Transcendental`] trait so the bit-cast approximations in [`fast`] can be
//! swapped for the standard library implementations, e.g. when a test needs
//! reference accuracy.

pub mod fast;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

#[inline]
pub fn sq(x: f32) -> f32 {
    x * x
}

/// exp / ln provider for hot loops.
pub trait Transcendental: Send + Sync + 'static {
    fn exp(x: f32) -> f32;
    fn ln(x: f32) -> f32;
}

/// Bit-cast approximations from [`fast`]. Relative error below 2e-4.
#[derive(Debug)]
pub enum FastMath {}

/// Standard library implementations.
#[derive(Debug)]
pub enum ExactMath {}

impl Transcendental for FastMath {
    #[inline]
    fn exp(x: f32) -> f32 {
        fast::fast_exp(x)
    }

    #[inline]
    fn ln(x: f32) -> f32 {
        fast::fast_ln(x)
    }
}

impl Transcendental for ExactMath {
    #[inline]
    fn exp(x: f32) -> f32 {
        x.exp()
    }

    #[inline]
    fn ln(x: f32) -> f32 {
        x.ln()
    }
}

/// Runtime selector between [`FastMath`] and [`ExactMath`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Precision {
    #[default]
    Fast,
    Exact,
}
