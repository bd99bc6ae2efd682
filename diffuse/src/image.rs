//! Pixel buffers, regions of interest and conversions from the host layout.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::Buffer2;
use crate::error::DiffuseError;

/// One pixel: R, G, B and an unused padding channel.
pub type Rgba = [f32; 4];

/// Row-major RGBA image, one contiguous allocation.
pub type PixelBuffer = Buffer2<Rgba>;

/// Number of colour channels that take part in processing; the fourth is padding.
pub const COLOR_CHANNELS: usize = 3;

/// A rectangle of the full image plus the scale it is rendered at.
///
/// `scale < 1` means a downscaled preview: one buffer pixel covers `1 / scale`
/// pixels of the full-resolution image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
    pub scale: f32,
}

impl Roi {
    pub fn new(x: i64, y: i64, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            scale: 1.0,
        }
    }

    /// Region covering a whole `width` x `height` buffer.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Full-resolution pixels per buffer pixel, never below 1.
    ///
    /// Non-positive or non-finite scales are treated as 1.
    pub fn zoom(&self) -> f32 {
        if self.scale.is_finite() && self.scale > 0.0 {
            (1.0 / self.scale).max(1.0)
        } else {
            1.0
        }
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Roi) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width as i64 <= self.x + self.width as i64
            && other.y + other.height as i64 <= self.y + self.height as i64
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}@{}",
            self.width, self.height, self.x, self.y, self.scale
        )
    }
}

/// Allocate a buffer, reporting failure as [`DiffuseError::OutOfMemory`].
pub(crate) fn try_alloc<T: Clone>(
    what: &'static str,
    width: usize,
    height: usize,
    value: T,
) -> Result<Buffer2<T>, DiffuseError> {
    Buffer2::try_new_filled(width, height, value).map_err(|_| DiffuseError::OutOfMemory {
        what,
        bytes: width
            .saturating_mul(height)
            .saturating_mul(std::mem::size_of::<T>()),
    })
}

/// Fallible deep copy of a pixel buffer.
pub(crate) fn try_copy(what: &'static str, src: &PixelBuffer) -> Result<PixelBuffer, DiffuseError> {
    src.try_clone().map_err(|_| DiffuseError::OutOfMemory {
        what,
        bytes: src.len().saturating_mul(std::mem::size_of::<Rgba>()),
    })
}

/// Copy the `roi_out` part of a buffer covering `roi_in`.
pub(crate) fn crop(
    src: &PixelBuffer,
    roi_in: &Roi,
    roi_out: &Roi,
) -> Result<PixelBuffer, DiffuseError> {
    if !roi_in.contains(roi_out) {
        return Err(DiffuseError::RegionOutOfBounds {
            roi_in: *roi_in,
            roi_out: *roi_out,
        });
    }
    debug_assert_eq!(src.width(), roi_in.width);
    debug_assert_eq!(src.height(), roi_in.height);

    let dx = (roi_out.x - roi_in.x) as usize;
    let dy = (roi_out.y - roi_in.y) as usize;
    let mut out = try_alloc("output", roi_out.width, roi_out.height, [0.0; 4])?;
    for y in 0..roi_out.height {
        out.row_mut(y)
            .copy_from_slice(&src.row(y + dy)[dx..dx + roi_out.width]);
    }
    Ok(out)
}

/// Wrap a host buffer of interleaved `f32` RGBA values.
pub fn pixel_buffer_from_interleaved(
    width: usize,
    height: usize,
    data: &[f32],
) -> Result<PixelBuffer, DiffuseError> {
    let expected = width.checked_mul(height).and_then(|n| n.checked_mul(4));
    if expected != Some(data.len()) {
        return Err(DiffuseError::InterleavedLength {
            width,
            height,
            actual: data.len(),
        });
    }
    let pixels: &[Rgba] = bytemuck::cast_slice(data);
    Ok(PixelBuffer::new(width, height, pixels.to_vec()))
}

/// View a pixel buffer as flat interleaved `f32` RGBA values.
pub fn as_interleaved(buffer: &PixelBuffer) -> &[f32] {
    bytemuck::cast_slice(buffer.pixels())
}

/// Mutable flat view, for hosts that write results in place.
pub fn as_interleaved_mut(buffer: &mut PixelBuffer) -> &mut [f32] {
    bytemuck::cast_slice_mut(buffer.pixels_mut())
}
