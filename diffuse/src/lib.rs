//! Diffuse - anisotropic diffusion image restoration.
//!
//! This library runs a partial differential equation of heat diffusion over
//! the scales of an à trous wavelet pyramid. Depending on the parameters it:
//! - Sharpens or deblurs (negative speeds, reverse diffusion)
//! - Denoises (positive speeds on the fine scales)
//! - Adds local contrast or bloom (speeds on the coarse scales)
//! - Reconstructs clipped highlights (thresholded mask seeded with noise)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use diffuse::{DiffuseEngine, DiffuseParams, Roi};
//!
//! let engine = DiffuseEngine::new(DiffuseParams::lens_deblur());
//! let roi = Roi::full(image.width(), image.height());
//! let outcome = engine.run(&image, &roi, &roi);
//!
//! if !outcome.success {
//!     eprintln!("{}", outcome.message.unwrap_or_default());
//! }
//! ```

pub(crate) mod common;
mod config;
mod engine;
mod error;
mod image;
pub mod kernel;
pub(crate) mod mask;
pub mod math;
pub mod noise;
pub(crate) mod pde;
pub(crate) mod scheduler;
pub mod wavelet;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Core image types
// ============================================================================

pub use image::{
    COLOR_CHANNELS, PixelBuffer, Rgba, Roi, as_interleaved, as_interleaved_mut,
    pixel_buffer_from_interleaved,
};

// ============================================================================
// Configuration
// ============================================================================

pub use config::{DiffuseParams, MAX_ITERATIONS, MAX_RADIUS, MIN_RADIUS};
pub use kernel::Isotropy;
pub use math::Precision;
pub use noise::{NoiseDistribution, NoiseSeed};

// ============================================================================
// Engine
// ============================================================================

pub use engine::{DiffuseEngine, ProcessOutcome};
pub use error::DiffuseError;
pub use pde::KAPPA;
pub use scheduler::{MAX_SCALES, scales_for_radius};
pub use wavelet::B_SPLINE_SIGMA;
