//! Top-level diffusion engine.
//!
//! Runs `iterations` decompose / diffuse / reconstruct passes over the input
//! region, optionally restricted to a thresholded mask whose pixels are
//! replaced by noise first, and crops the requested output region.

use crate::common::BitBuffer2;
use crate::config::DiffuseParams;
use crate::error::DiffuseError;
use crate::image::{PixelBuffer, Rgba, Roi, crop, try_copy};
use crate::mask::{Mask, seed_masked_region};
use crate::math::{ExactMath, FastMath, Precision, Transcendental};
use crate::noise::NoiseSeed;
use crate::pde::DiffusionSettings;
use crate::scheduler::{BufferPair, ScaleBuffers, WaveletScheduler, scales_for_radius};


/// Result of [`DiffuseEngine::run`]. Always carries an image.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub output: PixelBuffer,
    /// `false` when the run was aborted and `output` is the unprocessed input.
    pub success: bool,
    /// User-facing explanation of a degraded run.
    pub message: Option<String>,
}

/// Diffusion engine configured once, run on many regions.
///
/// # Example
///
/// ```rust,ignore
/// use diffuse::{DiffuseEngine, DiffuseParams, Roi};
///
/// let engine = DiffuseEngine::new(DiffuseParams::denoise());
/// let roi = Roi::full(image.width(), image.height());
/// let outcome = engine.run(&image, &roi, &roi);
/// ```
#[derive(Debug, Clone)]
pub struct DiffuseEngine {
    params: DiffuseParams,
    fast_preview: bool,
    precision: Precision,
    seed: NoiseSeed,
}

impl DiffuseEngine {
    /// Parameters are sanitized here; out-of-range values are clamped.
    pub fn new(params: DiffuseParams) -> Self {
        Self {
            params: params.sanitized(),
            fast_preview: false,
            precision: Precision::default(),
            seed: NoiseSeed::default(),
        }
    }

    /// Skip processing and pass the input region through.
    pub fn with_fast_preview(mut self, fast_preview: bool) -> Self {
        self.fast_preview = fast_preview;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_noise_seed(mut self, seed: NoiseSeed) -> Self {
        self.seed = seed;
        self
    }

    pub fn params(&self) -> &DiffuseParams {
        &self.params
    }

    /// Pyramid depth used for a region rendered at `roi.scale`.
    pub fn scales_for(&self, roi: &Roi) -> u32 {
        scales_for_radius(self.params.radius, self.params.radius_center, roi.zoom())
    }

    /// Bytes one full-resolution invocation on a `width` x `height` region
    /// allocates: the pyramid, the iteration pair, the output and the mask.
    pub fn memory_required(&self, width: usize, height: usize) -> usize {
        let scales = self.scales_for(&Roi::full(width, height));
        self.bytes_for(width, height, scales)
    }

    /// Pyramid buffers, the iteration pair and the cropped output.
    fn bytes_for(&self, width: usize, height: usize, scales: u32) -> usize {
        let pixels = width.saturating_mul(height);
        let buffers = ScaleBuffers::buffer_count(scales) + 3;
        let mask = if self.params.threshold > 0.0 {
            BitBuffer2::words_for(pixels) * std::mem::size_of::<u64>()
        } else {
            0
        };
        pixels
            .saturating_mul(std::mem::size_of::<Rgba>())
            .saturating_mul(buffers)
            .saturating_add(mask)
    }

    /// Diffuse the `roi_in` buffer and return its `roi_out` part.
    pub fn process(
        &self,
        input: &PixelBuffer,
        roi_in: &Roi,
        roi_out: &Roi,
    ) -> Result<PixelBuffer, DiffuseError> {
        if input.width() != roi_in.width || input.height() != roi_in.height {
            return Err(DiffuseError::BufferSize {
                expected: roi_in.pixel_count(),
                actual: input.len(),
            });
        }
        if !roi_in.contains(roi_out) {
            return Err(DiffuseError::RegionOutOfBounds {
                roi_in: *roi_in,
                roi_out: *roi_out,
            });
        }
        if self.fast_preview || self.params.iterations == 0 || input.is_empty() {
            return crop(input, roi_in, roi_out);
        }

        match self.precision {
            Precision::Fast => self.process_with::<FastMath>(input, roi_in, roi_out),
            Precision::Exact => self.process_with::<ExactMath>(input, roi_in, roi_out),
        }
    }

    /// Like [`DiffuseEngine::process`], but never fails: errors are logged
    /// and the input region is passed through with a message.
    pub fn run(&self, input: &PixelBuffer, roi_in: &Roi, roi_out: &Roi) -> ProcessOutcome {
        match self.process(input, roi_in, roi_out) {
            Ok(output) => ProcessOutcome {
                output,
                success: true,
                message: None,
            },
            Err(err) => {
                tracing::warn!(error = %err, "diffusion aborted, passing input through");
                ProcessOutcome {
                    output: passthrough(input, roi_in, roi_out),
                    success: false,
                    message: Some(format!("diffuse: {err}; image left unprocessed")),
                }
            }
        }
    }

    fn process_with<M: Transcendental>(
        &self,
        input: &PixelBuffer,
        roi_in: &Roi,
        roi_out: &Roi,
    ) -> Result<PixelBuffer, DiffuseError> {
        let params = &self.params;
        let (width, height) = (input.width(), input.height());
        let zoom = roi_in.zoom();
        let scales = self.scales_for(roi_in);
        let settings = DiffusionSettings::from_params(params, zoom);

        tracing::info!(
            width,
            height,
            scales,
            iterations = params.iterations,
            zoom,
            "diffusing region"
        );

        let mask = Mask::build(input, params.threshold)?;
        let mut state = BufferPair::try_new("iteration buffer", width, height)?;
        state.current_mut().copy_from(input);
        if mask.is_active() {
            seed_masked_region::<M>(state.current_mut(), &mask, params.noise, self.seed);
            tracing::debug!(masked = mask.count(), "seeded masked pixels");
        }
        let mut buffers = ScaleBuffers::try_new(width, height, scales)?;
        tracing::debug!(
            bytes = self.bytes_for(width, height, scales),
            "diffusion buffers allocated"
        );

        let scheduler = WaveletScheduler::new(&settings, &mask);
        for iteration in 0..params.iterations {
            let (current, next) = state.split();
            scheduler.run::<M>(current, next, &mut buffers);
            state.advance();
            tracing::debug!(iteration, "iteration done");
        }

        crop(state.current(), roi_in, roi_out)
    }
}

/// Best-effort unprocessed output for a failed run.
fn passthrough(input: &PixelBuffer, roi_in: &Roi, roi_out: &Roi) -> PixelBuffer {
    let matches_roi = input.width() == roi_in.width && input.height() == roi_in.height;
    let cropped = if matches_roi {
        crop(input, roi_in, roi_out)
    } else {
        try_copy("pass-through", input)
    };
    cropped
        .or_else(|_| try_copy("pass-through", input))
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "pass-through copy failed, returning empty image");
            PixelBuffer::new(0, 0, Vec::new())
        })
}
