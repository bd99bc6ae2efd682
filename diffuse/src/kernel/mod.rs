//! Direction-adaptive 3x3 Laplacian stencils.
//!
//! Each stencil discretizes `div(A grad u)` for a 2x2 diffusion tensor `A`
//! rotated onto the local structure direction: the LF gradient or the HF
//! curvature of a 3x3 neighbourhood. Depending on the [`Isotropy`] mode the
//! tensor diffuses along edges (isophote), across them (gradient) or equally
//! in every direction (isotrope).
//!
//! Neighbourhoods and kernels are row-major `[NW, N, NE, W, C, E, SW, S, SE]`
//! with `x` pointing right and `y` pointing down.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::math::{Transcendental, sq};

#[cfg(test)]
mod tests;

/// 3x3 stencil in `[NW, N, NE, W, C, E, SW, S, SE]` order.
pub type Kernel = [f32; 9];

/// 3x3 neighbourhood in the same order as [`Kernel`].
pub type Neighbourhood = [f32; 9];

pub const NW: usize = 0;
pub const N: usize = 1;
pub const NE: usize = 2;
pub const W: usize = 3;
pub const C: usize = 4;
pub const E: usize = 5;
pub const SW: usize = 6;
pub const S: usize = 7;
pub const SE: usize = 8;

/// Isotropic discrete Laplacian.
pub const ISOTROPE_KERNEL: Kernel = [0.25, 0.5, 0.25, 0.5, -3.0, 0.5, 0.25, 0.5, 0.25];

/// Magnitude below which a direction is treated as undefined.
const MIN_MAGNITUDE: f32 = 1e-12;

/// How the diffusion tensor relates to the local structure direction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Isotropy {
    /// Same diffusion in every direction.
    #[default]
    Isotrope,
    /// Diffuse along edges, preserving them.
    Isophote,
    /// Diffuse across edges.
    Gradient,
}

/// Per-order anisotropy resolved once from its signed user coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anisotropy {
    pub mode: Isotropy,
    /// Damping exponent applied to the direction magnitude, `raw²`.
    pub exponent: f32,
}

impl Anisotropy {
    /// `0` gives isotrope, positive isophote, negative gradient.
    pub fn from_raw(raw: f32) -> Self {
        let mode = if raw > 0.0 {
            Isotropy::Isophote
        } else if raw < 0.0 {
            Isotropy::Gradient
        } else {
            Isotropy::Isotrope
        };
        Self {
            mode,
            exponent: sq(raw),
        }
    }
}

/// Unit direction of a neighbourhood's structure plus its strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub cos: f32,
    pub sin: f32,
    pub magnitude: f32,
}

impl Orientation {
    /// Zero vectors map to `θ = 0`.
    pub fn from_vector(x: f32, y: f32) -> Self {
        let magnitude = (sq(x) + sq(y)).sqrt();
        if magnitude > MIN_MAGNITUDE {
            Self {
                cos: x / magnitude,
                sin: y / magnitude,
                magnitude,
            }
        } else {
            Self {
                cos: 1.0,
                sin: 0.0,
                magnitude: 0.0,
            }
        }
    }

    /// Central-difference gradient, used on LF neighbourhoods.
    #[inline]
    pub fn gradient(n: &Neighbourhood) -> Self {
        Self::from_vector((n[E] - n[W]) / 2.0, (n[S] - n[N]) / 2.0)
    }

    /// Second derivatives along each axis, used on HF neighbourhoods.
    #[inline]
    pub fn curvature(n: &Neighbourhood) -> Self {
        Self::from_vector(n[E] + n[W] - 2.0 * n[C], n[S] + n[N] - 2.0 * n[C])
    }
}

/// Build the rotated Laplacian for one derivative order.
///
/// Taps always sum to zero, so flat regions are left unchanged.
#[inline]
pub fn build_kernel<M: Transcendental>(anisotropy: Anisotropy, orientation: Orientation) -> Kernel {
    let (a11, a22, a12) = match anisotropy.mode {
        Isotropy::Isotrope => return ISOTROPE_KERNEL,
        Isotropy::Isophote => {
            let t = TensorTerms::new::<M>(anisotropy, orientation);
            (
                t.cos2 + t.c2 * t.sin2,
                t.c2 * t.cos2 + t.sin2,
                (t.c2 - 1.0) * t.cos_sin,
            )
        }
        Isotropy::Gradient => {
            let t = TensorTerms::new::<M>(anisotropy, orientation);
            (
                t.c2 * t.cos2 + t.sin2,
                t.cos2 + t.c2 * t.sin2,
                (1.0 - t.c2) * t.cos_sin,
            )
        }
    };

    let corner = a12 / 2.0;
    [
        corner,
        a11,
        -corner,
        a22,
        -2.0 * (a11 + a22),
        a22,
        -corner,
        a11,
        corner,
    ]
}

/// Squared rotation terms and the damping factor `c² = exp(-magnitude · exponent)`.
struct TensorTerms {
    c2: f32,
    cos2: f32,
    sin2: f32,
    cos_sin: f32,
}

impl TensorTerms {
    #[inline]
    fn new<M: Transcendental>(anisotropy: Anisotropy, orientation: Orientation) -> Self {
        Self {
            c2: M::exp(-orientation.magnitude * anisotropy.exponent),
            cos2: sq(orientation.cos),
            sin2: sq(orientation.sin),
            cos_sin: orientation.cos * orientation.sin,
        }
    }
}

/// Apply a stencil to a neighbourhood.
#[inline]
pub fn convolve(kernel: &Kernel, neighbourhood: &Neighbourhood) -> f32 {
    kernel
        .iter()
        .zip(neighbourhood.iter())
        .map(|(k, v)| k * v)
        .sum()
}
