//! Undecimated "à trous" B-spline wavelet decomposition.
//!
//! One level splits an image into a low-frequency layer (the input blurred by
//! the separable 5-tap filter `[1, 4, 6, 4, 1] / 16` with taps `mult = 2^s`
//! pixels apart) and a high-frequency residual `HF = input - LF`. Applying it
//! repeatedly to the LF layer builds the pyramid; the input is recovered
//! exactly as the sum of all HF layers plus the last LF.

use rayon::prelude::*;

use crate::common::for_each_row_interleaved;
use crate::image::{PixelBuffer, Rgba};


/// Standard deviation of the 5-tap B-spline filter at `mult = 1`.
pub const B_SPLINE_SIGMA: f32 = 1.055_365_1;

/// 1D B-spline filter taps.
pub const FILTER: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Scale index above which `2^s` stops being a meaningful pixel distance.
const MAX_SIGMA_STEPS: u32 = 30;

/// Clamp `i + offset` into `0..len`.
#[inline]
pub(crate) fn clamp_offset(i: usize, offset: isize, len: usize) -> usize {
    (i as isize + offset).clamp(0, len as isize - 1) as usize
}

#[inline]
fn add_scaled(acc: &mut Rgba, weight: f32, px: &Rgba) {
    for c in 0..4 {
        acc[c] += weight * px[c];
    }
}

/// Blur `input` into `lf` with the dilated B-spline filter.
///
/// Vertical pass first into a per-thread row, then the horizontal pass into
/// the output row. Out-of-range taps are clamped to the border. With `clip`,
/// negative results are raised to 0.
pub fn blur(input: &PixelBuffer, lf: &mut PixelBuffer, mult: usize, clip: bool) {
    assert!(input.same_size(lf), "blur: input and output sizes differ");
    let width = input.width();
    let height = input.height();
    if width == 0 || height == 0 {
        return;
    }
    let step = mult.max(1) as isize;

    for_each_row_interleaved(
        lf,
        mult,
        || vec![[0.0f32; 4]; width],
        |temp, y, out_row| {
            let rows: [&[Rgba]; 5] = std::array::from_fn(|k| {
                input.row(clamp_offset(y, (k as isize - 2) * step, height))
            });

            for (x, t) in temp.iter_mut().enumerate() {
                let mut acc = [0.0f32; 4];
                for (row, &w) in rows.iter().zip(FILTER.iter()) {
                    add_scaled(&mut acc, w, &row[x]);
                }
                *t = acc;
            }

            for (x, out) in out_row.iter_mut().enumerate() {
                let mut acc = [0.0f32; 4];
                for (k, &w) in FILTER.iter().enumerate() {
                    let xx = clamp_offset(x, (k as isize - 2) * step, width);
                    add_scaled(&mut acc, w, &temp[xx]);
                }
                if clip {
                    acc.iter_mut().for_each(|v| *v = v.max(0.0));
                }
                *out = acc;
            }
        },
    );
}

/// One pyramid level: `lf = blur(input)`, `hf = input - lf`.
///
/// `input` is left untouched; `hf` keeps its sign even when `lf` is clipped.
pub fn decompose(
    input: &PixelBuffer,
    hf: &mut PixelBuffer,
    lf: &mut PixelBuffer,
    mult: usize,
    clip: bool,
) {
    assert!(input.same_size(hf), "decompose: HF size differs from input");
    blur(input, lf, mult, clip);

    let width = input.width().max(1);
    hf.pixels_mut()
        .par_chunks_mut(width)
        .zip(input.pixels().par_chunks(width))
        .zip(lf.pixels().par_chunks(width))
        .for_each(|((hf_row, in_row), lf_row)| {
            for ((h, i), l) in hf_row.iter_mut().zip(in_row).zip(lf_row) {
                for c in 0..4 {
                    h[c] = i[c] - l[c];
                }
            }
        });
}

/// Blur radius (standard deviation) accumulated after scales `0..=s`.
pub fn equivalent_sigma(s: u32) -> f32 {
    let mut sigma = B_SPLINE_SIGMA;
    for step in 1..=s.min(MAX_SIGMA_STEPS) {
        let dilated = (step as f32).exp2() * B_SPLINE_SIGMA;
        sigma = (sigma * sigma + dilated * dilated).sqrt();
    }
    sigma
}

/// Number of scales whose combined blur reaches `target_sigma`, starting from
/// a filter of standard deviation `sigma_filter`.
///
/// Always at least 1. An infinite target stops at the step cap.
pub fn steps_to_reach_sigma(sigma_filter: f32, target_sigma: f32) -> u32 {
    let mut s = 0;
    let mut radius = sigma_filter;
    while radius < target_sigma && s < MAX_SIGMA_STEPS {
        s += 1;
        let dilated = (s as f32).exp2() * sigma_filter;
        radius = (radius * radius + dilated * dilated).sqrt();
    }
    s + 1
}
