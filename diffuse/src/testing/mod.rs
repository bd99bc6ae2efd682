//! Testing utilities for diffuse.

#![allow(dead_code)]

use common::float_ext::FloatExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::image::{PixelBuffer, Rgba};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn flat_image(width: usize, height: usize, value: Rgba) -> PixelBuffer {
    PixelBuffer::new_filled(width, height, value)
}

/// Black image with `value` in the colour channels of pixel `(x, y)`.
pub fn impulse_image(width: usize, height: usize, x: usize, y: usize, value: f32) -> PixelBuffer {
    let mut image = PixelBuffer::new_default(width, height);
    image[(x, y)] = [value, value, value, 0.0];
    image
}

/// Reproducible colour channels in `[0, 1)`, padding 0.
pub fn random_image(width: usize, height: usize, seed: u64) -> PixelBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    let pixels: Vec<Rgba> = (0..width * height)
        .map(|_| [rng.random(), rng.random(), rng.random(), 0.0])
        .collect();
    PixelBuffer::new(width, height, pixels)
}

/// Assert two buffers match channel by channel within `tolerance`.
#[track_caller]
pub fn assert_buffers_close(actual: &PixelBuffer, expected: &PixelBuffer, tolerance: f32) {
    assert_eq!(
        (actual.width(), actual.height()),
        (expected.width(), expected.height()),
        "buffer dimensions differ"
    );
    for y in 0..actual.height() {
        for x in 0..actual.width() {
            let (a, e) = (actual[(x, y)], expected[(x, y)]);
            for c in 0..4 {
                assert!(
                    a[c].approximately_eq_within(e[c], tolerance),
                    "pixel ({x}, {y}) channel {c}: {} vs {} (tolerance {tolerance})",
                    a[c],
                    e[c]
                );
            }
        }
    }
}

/// Sum of one channel, accumulated in f64.
pub fn channel_sum(image: &PixelBuffer, c: usize) -> f64 {
    image.iter().map(|p| p[c] as f64).sum()
}
