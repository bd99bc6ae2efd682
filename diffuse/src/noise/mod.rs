//! Deterministic per-pixel pseudo-random noise.
//!
//! A xoshiro128+ generator whose 4-word state is seeded through splitmix32
//! from the pixel coordinates and two seed constants. Samples for a pixel
//! depend only on its position and the seed, never on visiting order or
//! thread scheduling, so the noise field is reproducible run to run.
//!
//! Used to fill the masked region with synthetic content before the
//! diffusion pass heals it.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::math::Transcendental;


/// Draws discarded right after seeding, so neighbouring pixels decorrelate.
const WARMUP_ROUNDS: usize = 4;

/// 2^-24: maps the top 24 bits of a draw onto the f32 mantissa.
const U24_TO_UNIT: f32 = 1.0 / (1u32 << 24) as f32;

/// Statistical shape of the samples used to seed masked pixels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum NoiseDistribution {
    /// Flat in `[mu - sigma, mu + sigma)`.
    Uniform,
    /// Box–Muller normal samples.
    #[default]
    Gaussian,
    /// Normal samples through the inverse Anscombe transform, variance grows with the mean.
    Poissonian,
}

/// The two constant words mixed into every pixel's generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseSeed {
    pub a: u64,
    pub b: u64,
}

impl Default for NoiseSeed {
    fn default() -> Self {
        Self { a: 1337, b: 666 }
    }
}

/// splitmix32 finalizer: spreads a small integer over all 32 output bits.
#[inline]
pub fn splitmix32(seed: u64) -> u32 {
    let mut result = (seed ^ (seed >> 33)).wrapping_mul(0x62a9_d9ed_7997_05f5);
    result = (result ^ (result >> 28)).wrapping_mul(0xcb24_d0a5_c88c_35b3);
    (result >> 32) as u32
}

/// xoshiro128+ state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseState {
    s: [u32; 4],
}

impl NoiseState {
    /// Generator for pixel `(x, y)`.
    pub fn for_pixel(x: usize, y: usize, seed: NoiseSeed) -> Self {
        let x = x as u64;
        let y = y as u64;
        let mut state = Self {
            s: [
                splitmix32(x + 1),
                splitmix32((x + 1).wrapping_mul(y + 3)),
                splitmix32(seed.a),
                splitmix32(seed.b),
            ],
        };
        for _ in 0..WARMUP_ROUNDS {
            state.next_u32();
        }
        state
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let s = &mut self.s;
        let result = s[0].wrapping_add(s[3]);
        let t = s[1] << 9;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(11);

        result
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * U24_TO_UNIT
    }

    #[inline]
    pub fn uniform(&mut self, mu: f32, sigma: f32) -> f32 {
        mu + 2.0 * (self.next_f32() - 0.5) * sigma
    }

    #[inline]
    pub fn gaussian<M: Transcendental>(&mut self, mu: f32, sigma: f32, flip: bool) -> f32 {
        mu + sigma * self.standard_normal::<M>(flip)
    }

    /// Gaussian noise pushed through the inverse Anscombe transform.
    ///
    /// The mean is exactly `mu`; the variance is about `mu + sigma² / 2`.
    #[inline]
    pub fn poisson<M: Transcendental>(&mut self, mu: f32, sigma: f32, flip: bool) -> f32 {
        let r = self.standard_normal::<M>(flip) * sigma + 2.0 * (mu + 0.375).max(0.0).sqrt();
        (r * r - sigma * sigma) / 4.0 - 0.375
    }

    #[inline]
    pub fn sample<M: Transcendental>(
        &mut self,
        distribution: NoiseDistribution,
        mu: f32,
        sigma: f32,
        flip: bool,
    ) -> f32 {
        match distribution {
            NoiseDistribution::Uniform => self.uniform(mu, sigma),
            NoiseDistribution::Gaussian => self.gaussian::<M>(mu, sigma, flip),
            NoiseDistribution::Poissonian => self.poisson::<M>(mu, sigma, flip),
        }
    }

    /// One Box–Muller output. `flip` picks the cosine branch, otherwise the sine
    /// branch; alternating it between neighbours uses both outputs of the transform.
    #[inline]
    fn standard_normal<M: Transcendental>(&mut self, flip: bool) -> f32 {
        let u1 = self.next_f32().max(f32::MIN_POSITIVE);
        let u2 = self.next_f32();
        let radius = (-2.0 * M::ln(u1)).max(0.0).sqrt();
        let angle = TAU * u2;
        if flip {
            radius * angle.cos()
        } else {
            radius * angle.sin()
        }
    }
}
