//! Inpainting mask: which pixels are reconstructed by diffusion.
//!
//! A pixel is masked when any colour channel exceeds the threshold. Masked
//! pixels are first replaced by noise drawn around their own value, then
//! diffused; unmasked pixels pass through every scale unchanged.

use rayon::prelude::*;

use crate::common::{BitBuffer2, pack_bits};
use crate::error::DiffuseError;
use crate::image::{COLOR_CHANNELS, PixelBuffer};
use crate::math::Transcendental;
use crate::noise::{NoiseDistribution, NoiseSeed, NoiseState};


/// Optional per-pixel participation mask.
///
/// Without bits every pixel participates.
#[derive(Debug, Clone, Default)]
pub struct Mask {
    bits: Option<BitBuffer2>,
}

impl Mask {
    /// Mask that lets every pixel through.
    pub fn none() -> Self {
        Self { bits: None }
    }

    /// Threshold `image`. A threshold of 0 disables masking.
    pub fn build(image: &PixelBuffer, threshold: f32) -> Result<Self, DiffuseError> {
        if threshold <= 0.0 {
            return Ok(Self::none());
        }
        let bits = pack_bits(image.width(), image.height(), |i| {
            image.pixels()[i][..COLOR_CHANNELS]
                .iter()
                .any(|&v| v > threshold)
        })?;
        Ok(Self { bits: Some(bits) })
    }

    /// Whether a threshold was applied.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.bits.is_some()
    }

    /// Whether pixel `(x, y)` takes part in diffusion.
    #[inline]
    pub fn includes(&self, x: usize, y: usize) -> bool {
        match &self.bits {
            Some(bits) => bits.get_xy(x, y),
            None => true,
        }
    }

    /// Number of masked pixels, 0 when inactive.
    pub fn count(&self) -> usize {
        self.bits.as_ref().map_or(0, BitBuffer2::count_ones)
    }
}

/// Replace every masked pixel's colour channels by `|sample(v, v)|`.
///
/// Noise is seeded per pixel, so the result does not depend on thread layout.
/// Does nothing for an inactive mask.
pub fn seed_masked_region<M: Transcendental>(
    image: &mut PixelBuffer,
    mask: &Mask,
    distribution: NoiseDistribution,
    seed: NoiseSeed,
) {
    if !mask.is_active() {
        return;
    }
    let width = image.width().max(1);
    image
        .pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.iter_mut().enumerate() {
                if !mask.includes(x, y) {
                    continue;
                }
                let mut state = NoiseState::for_pixel(x, y, seed);
                let flip = x % 2 == 1 || y % 2 == 1;
                for v in px[..COLOR_CHANNELS].iter_mut() {
                    *v = state.sample::<M>(distribution, *v, *v, flip).abs();
                }
            }
        });
}
