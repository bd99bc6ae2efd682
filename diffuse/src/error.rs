use thiserror::Error;

use crate::image::Roi;

/// Errors that abort a diffusion run.
///
/// None of them are fatal for the host: [`crate::DiffuseEngine::run`] turns
/// every variant into a pass-through copy plus a message.
#[derive(Debug, Error)]
pub enum DiffuseError {
    #[error("Failed to allocate {bytes} bytes for {what}")]
    OutOfMemory { what: &'static str, bytes: usize },

    #[error("Pixel buffer holds {actual} pixels, region needs {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Interleaved buffer of {actual} values does not hold {width}x{height} RGBA pixels")]
    InterleavedLength {
        width: usize,
        height: usize,
        actual: usize,
    },

    #[error("Output region {roi_out} is not contained in input region {roi_in}")]
    RegionOutOfBounds { roi_in: Roi, roi_out: Roi },
}
