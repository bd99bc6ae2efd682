//! One anisotropic heat-diffusion relaxation pass at one wavelet scale.
//!
//! Four derivative orders are combined per pixel and channel:
//!
//! | order | field | steered by      |
//! |-------|-------|-----------------|
//! | 1     | LF    | LF gradient     |
//! | 2     | LF    | HF curvature    |
//! | 3     | HF    | LF gradient     |
//! | 4     | HF    | HF curvature    |
//!
//! The sum is divided by the regularised local HF variance, so textured
//! areas move less than smooth ones, and added to the sharpened HF plus LF.

use common::EPSILON;

use crate::common::for_each_row_interleaved;
use crate::config::DiffuseParams;
use crate::image::{COLOR_CHANNELS, PixelBuffer, Rgba};
use crate::kernel::{Anisotropy, Neighbourhood, Orientation, build_kernel, convolve};
use crate::mask::Mask;
use crate::math::{Transcendental, sq};
use crate::wavelet::{clamp_offset, equivalent_sigma};

#[cfg(test)]
mod tests;

/// Time step of the explicit scheme.
pub const KAPPA: f32 = 0.25;

/// Floor for the variance divisor.
const MIN_VARIANCE: f32 = EPSILON as f32;

/// Parameters resolved once per run from [`DiffuseParams`] and the render zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionSettings {
    pub anisotropy: [Anisotropy; 4],
    pub speed: [f32; 4],
    pub sharpness: f32,
    /// `10^regularization - 1`.
    pub regularization: f32,
    /// `10^variance_threshold`.
    pub variance_threshold: f32,
    /// Full-resolution pixels.
    pub radius: f32,
    /// Full-resolution pixels.
    pub radius_center: f32,
    /// Full-resolution pixels per buffer pixel, at least 1.
    pub zoom: f32,
}

impl DiffusionSettings {
    /// `params` is expected to be sanitized.
    pub fn from_params(params: &DiffuseParams, zoom: f32) -> Self {
        Self {
            anisotropy: params.anisotropy.map(Anisotropy::from_raw),
            speed: params.speed,
            sharpness: params.sharpness,
            regularization: 10f32.powf(params.regularization) - 1.0,
            variance_threshold: 10f32.powf(params.variance_threshold),
            radius: params.radius,
            radius_center: params.radius_center,
            zoom: zoom.max(1.0),
        }
    }

    /// Per-scale factors for scale `s`.
    pub fn scale_update(&self, s: u32) -> ScaleUpdate {
        let sigma = equivalent_sigma(s);
        let real_radius = sigma * self.zoom;
        let norm = (-sq(real_radius - self.radius_center) / sq(self.radius).max(MIN_VARIANCE)).exp();

        ScaleUpdate {
            mult: 1 << s,
            abcd: self.speed.map(|speed| speed * KAPPA * norm),
            strength: self.sharpness * norm + 1.0,
            regularization_factor: self.regularization * sq(sigma) / 9.0,
            variance_threshold: self.variance_threshold,
        }
    }
}

/// Factors applied at one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleUpdate {
    /// Neighbour spacing, `2^s`.
    pub mult: usize,
    /// `speed_k · KAPPA · norm(s)` per order.
    pub abcd: [f32; 4],
    /// HF gain, `sharpness · norm(s) + 1`.
    pub strength: f32,
    pub regularization_factor: f32,
    pub variance_threshold: f32,
}

/// Gather the 3x3 neighbourhood of column `xs[1]` for channel `c`.
#[inline]
fn gather(rows: &[&[Rgba]; 3], xs: &[usize; 3], c: usize) -> Neighbourhood {
    let mut n = [0.0; 9];
    for (j, row) in rows.iter().enumerate() {
        for (i, &x) in xs.iter().enumerate() {
            n[j * 3 + i] = row[x][c];
        }
    }
    n
}

/// Diffuse one scale: `out = max(0, HF · strength + Σ abcd_k · d_k / variance + LF)`.
///
/// Pixels outside the mask get `HF + LF`. All three buffers must share `out`'s size.
pub fn heat_diffusion_step<M: Transcendental>(
    hf: &PixelBuffer,
    lf: &PixelBuffer,
    mask: &Mask,
    settings: &DiffusionSettings,
    update: &ScaleUpdate,
    out: &mut PixelBuffer,
) {
    assert!(hf.same_size(lf), "HF and LF sizes differ");
    assert!(hf.same_size(out), "HF and output sizes differ");
    let width = out.width();
    let height = out.height();
    if width == 0 || height == 0 {
        return;
    }
    let m = update.mult as isize;

    for_each_row_interleaved(out, update.mult, || (), |_, y, out_row| {
        let ys = [
            clamp_offset(y, -m, height),
            y,
            clamp_offset(y, m, height),
        ];
        let lf_rows = ys.map(|yy| lf.row(yy));
        let hf_rows = ys.map(|yy| hf.row(yy));

        for (x, out_px) in out_row.iter_mut().enumerate() {
            let px_hf = hf_rows[1][x];
            let px_lf = lf_rows[1][x];
            let mut result: Rgba = std::array::from_fn(|c| px_hf[c] + px_lf[c]);
            if !mask.includes(x, y) {
                *out_px = result;
                continue;
            }

            let xs = [clamp_offset(x, -m, width), x, clamp_offset(x, m, width)];
            for c in 0..COLOR_CHANNELS {
                let n_lf = gather(&lf_rows, &xs, c);
                let n_hf = gather(&hf_rows, &xs, c);
                let gradient = Orientation::gradient(&n_lf);
                let curvature = Orientation::curvature(&n_hf);

                let orders = [
                    (gradient, &n_lf),
                    (curvature, &n_lf),
                    (gradient, &n_hf),
                    (curvature, &n_hf),
                ];
                let mut derivatives = 0.0;
                for (k, (orientation, field)) in orders.into_iter().enumerate() {
                    if update.abcd[k] != 0.0 {
                        let kernel = build_kernel::<M>(settings.anisotropy[k], orientation);
                        derivatives += update.abcd[k] * convolve(&kernel, field);
                    }
                }

                let variance: f32 = n_hf.iter().map(|&v| sq(v)).sum();
                let variance = (update.variance_threshold
                    + variance * update.regularization_factor)
                    .max(MIN_VARIANCE);

                let value = px_hf[c] * update.strength + derivatives / variance;
                result[c] = (value + px_lf[c]).max(0.0);
            }
            *out_px = result;
        }
    });
}
