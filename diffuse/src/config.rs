//! User-facing parameters for the diffusion engine.
//!
//! [`DiffuseParams`] is a flat, serde-serialisable struct. Missing fields in
//! serialized input fall back to [`Default`], which is a neutral setting that
//! leaves the image unchanged. Use the presets for common tasks, then adjust
//! individual fields.

use serde::{Deserialize, Serialize};

use crate::noise::NoiseDistribution;

/// Upper bound for outer iterations.
pub const MAX_ITERATIONS: u32 = 128;

/// Largest radius, in full-resolution pixels.
pub const MAX_RADIUS: f32 = 2048.0;

/// Smallest radius, in full-resolution pixels.
pub const MIN_RADIUS: f32 = 1.0;

/// Parameters of one diffusion run.
///
/// # Example
///
/// ```rust,ignore
/// use diffuse::DiffuseParams;
///
/// let mut params = DiffuseParams::denoise();
/// params.iterations = 8;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffuseParams {
    // -- Pyramid --
    /// Outer decompose/diffuse/reconstruct passes. 0 returns the input.
    pub iterations: u32,
    /// Spread of scales around `radius_center`, in full-resolution pixels.
    pub radius: f32,
    /// Scale that receives the strongest diffusion, in full-resolution pixels.
    pub radius_center: f32,

    // -- Diffusion --
    /// Extra gain on the HF layer; negative softens, positive sharpens.
    pub sharpness: f32,
    /// Decimal log of `1 + k` for the variance regularization factor.
    pub regularization: f32,
    /// Decimal log of the variance floor.
    pub variance_threshold: f32,
    /// Signed anisotropy per derivative order; 0 isotrope, >0 isophote, <0 gradient.
    pub anisotropy: [f32; 4],
    /// Speed per derivative order. Orders 1-2 act on LF, 3-4 on HF.
    /// Negative sharpens, positive blurs.
    pub speed: [f32; 4],

    // -- Inpainting --
    /// Pixels with any colour channel above this are masked and reconstructed.
    /// 0 disables masking.
    pub threshold: f32,
    /// Noise used to seed masked pixels.
    pub noise: NoiseDistribution,
}

impl Default for DiffuseParams {
    fn default() -> Self {
        Self {
            // Pyramid
            iterations: 1,
            radius: 8.0,
            radius_center: 0.0,

            // Diffusion
            sharpness: 0.0,
            regularization: 0.0,
            variance_threshold: 0.0,
            anisotropy: [0.0; 4],
            speed: [0.0; 4],

            // Inpainting
            threshold: 0.0,
            noise: NoiseDistribution::Gaussian,
        }
    }
}

impl DiffuseParams {
    /// Edge-aware sharpening of fine detail.
    pub fn sharpen() -> Self {
        Self {
            iterations: 1,
            radius: 8.0,
            sharpness: 0.0,
            regularization: 1.0,
            variance_threshold: 0.25,
            anisotropy: [1.0, 1.0, 1.0, 1.0],
            speed: [-0.25, -0.25, -0.25, -0.25],
            ..Self::default()
        }
    }

    /// Iterative deconvolution of a soft lens.
    pub fn lens_deblur() -> Self {
        Self {
            iterations: 8,
            radius: 8.0,
            regularization: 2.5,
            variance_threshold: 0.25,
            anisotropy: [1.0, 1.0, 1.0, 1.0],
            speed: [-0.15, -0.05, -0.15, -0.05],
            ..Self::default()
        }
    }

    /// Smoothing along edges, leaving them crisp.
    pub fn denoise() -> Self {
        Self {
            iterations: 5,
            radius: 32.0,
            sharpness: -0.1,
            regularization: 4.0,
            variance_threshold: -0.25,
            anisotropy: [2.0, 2.0, 2.0, 2.0],
            speed: [0.25, 0.25, 0.25, 0.25],
            ..Self::default()
        }
    }

    /// Midtone contrast on large structures.
    pub fn local_contrast() -> Self {
        Self {
            iterations: 1,
            radius: 64.0,
            radius_center: 256.0,
            sharpness: 0.0,
            regularization: 1.0,
            variance_threshold: 0.0,
            anisotropy: [-2.5, 0.0, -2.5, 0.0],
            speed: [-0.5, 0.0, -0.5, 0.0],
            ..Self::default()
        }
    }

    /// Rebuild clipped highlights from their surroundings.
    pub fn inpaint_highlights() -> Self {
        Self {
            iterations: 32,
            radius: 32.0,
            regularization: 0.0,
            variance_threshold: 0.0,
            anisotropy: [0.0, 0.0, 0.0, 0.0],
            speed: [1.0, 1.0, 1.0, 1.0],
            threshold: 0.99,
            noise: NoiseDistribution::Gaussian,
            ..Self::default()
        }
    }

    /// Soft glow around bright areas.
    pub fn bloom() -> Self {
        Self {
            iterations: 1,
            radius: 32.0,
            sharpness: 0.0,
            anisotropy: [0.0, 0.0, 0.0, 0.0],
            speed: [1.0, 1.0, 0.0, 0.0],
            ..Self::default()
        }
    }

    /// Clamp every field to its supported range.
    ///
    /// Non-finite values fall back to the default. Each change is logged at
    /// debug level.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut p = self.clone();

        if p.iterations > MAX_ITERATIONS {
            tracing::debug!(
                requested = p.iterations,
                max = MAX_ITERATIONS,
                "clamping iterations"
            );
            p.iterations = MAX_ITERATIONS;
        }
        p.radius = clamp_field("radius", p.radius, MIN_RADIUS, MAX_RADIUS, defaults.radius);
        p.radius_center = clamp_field(
            "radius_center",
            p.radius_center,
            0.0,
            MAX_RADIUS,
            defaults.radius_center,
        );
        p.sharpness = clamp_field("sharpness", p.sharpness, -1.0, 1.0, defaults.sharpness);
        p.regularization = clamp_field(
            "regularization",
            p.regularization,
            0.0,
            6.0,
            defaults.regularization,
        );
        p.variance_threshold = clamp_field(
            "variance_threshold",
            p.variance_threshold,
            -6.0,
            6.0,
            defaults.variance_threshold,
        );
        for k in 0..4 {
            p.anisotropy[k] = clamp_field("anisotropy", p.anisotropy[k], -10.0, 10.0, 0.0);
            p.speed[k] = clamp_field("speed", p.speed[k], -1.0, 1.0, 0.0);
        }
        p.threshold = clamp_field(
            "threshold",
            p.threshold,
            0.0,
            f32::MAX,
            defaults.threshold,
        );
        p
    }
}

fn clamp_field(name: &'static str, value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    let clamped = if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    };
    if clamped != value {
        tracing::debug!(field = name, requested = value, used = clamped, "clamping parameter");
    }
    clamped
}
