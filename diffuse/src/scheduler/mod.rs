//! Scale selection, buffer management and the coarse-to-fine reconstruction
//! that drives [`heat_diffusion_step`] once per wavelet scale.

use crate::error::DiffuseError;
use crate::image::{PixelBuffer, try_alloc};
use crate::mask::Mask;
use crate::math::Transcendental;
use crate::pde::{DiffusionSettings, heat_diffusion_step};
use crate::wavelet::{B_SPLINE_SIGMA, decompose, steps_to_reach_sigma};


/// Hard limit on pyramid depth.
pub const MAX_SCALES: u32 = 10;

/// Scales needed so the coarsest one reaches `2 · (radius + radius_center)`
/// full-resolution pixels, expressed in buffer pixels at `zoom`.
///
/// Always within `[1, MAX_SCALES]`.
pub fn scales_for_radius(radius: f32, radius_center: f32, zoom: f32) -> u32 {
    let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
    let final_radius = (radius + radius_center) * 2.0 / zoom;
    steps_to_reach_sigma(B_SPLINE_SIGMA, final_radius).clamp(1, MAX_SCALES)
}

/// Two alternating buffers: one holds the current state, the other receives
/// the next one.
#[derive(Debug)]
pub struct BufferPair {
    slots: [PixelBuffer; 2],
    current: usize,
}

impl BufferPair {
    pub fn try_new(what: &'static str, width: usize, height: usize) -> Result<Self, DiffuseError> {
        Ok(Self {
            slots: [
                try_alloc(what, width, height, [0.0; 4])?,
                try_alloc(what, width, height, [0.0; 4])?,
            ],
            current: 0,
        })
    }

    #[inline]
    pub fn current(&self) -> &PixelBuffer {
        &self.slots[self.current]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut PixelBuffer {
        &mut self.slots[self.current]
    }

    /// `(current, next)`: read the first, write the second.
    #[inline]
    pub fn split(&mut self) -> (&PixelBuffer, &mut PixelBuffer) {
        let [a, b] = &mut self.slots;
        if self.current == 0 {
            (&*a, b)
        } else {
            (&*b, a)
        }
    }

    /// Make the buffer last written through [`BufferPair::split`] current.
    #[inline]
    pub fn advance(&mut self) {
        self.current ^= 1;
    }

    pub fn into_current(self) -> PixelBuffer {
        let [a, b] = self.slots;
        if self.current == 0 { a } else { b }
    }
}

/// Working set for one pyramid: one HF layer per scale plus the LF pair.
#[derive(Debug)]
pub struct ScaleBuffers {
    hf: Vec<PixelBuffer>,
    lf: BufferPair,
}

impl ScaleBuffers {
    pub fn try_new(width: usize, height: usize, scales: u32) -> Result<Self, DiffuseError> {
        let mut hf = Vec::new();
        hf.try_reserve_exact(scales as usize)
            .map_err(|_| DiffuseError::OutOfMemory {
                what: "HF layers",
                bytes: scales as usize * std::mem::size_of::<PixelBuffer>(),
            })?;
        for _ in 0..scales {
            hf.push(try_alloc("HF layer", width, height, [0.0; 4])?);
        }
        Ok(Self {
            hf,
            lf: BufferPair::try_new("LF layer", width, height)?,
        })
    }

    /// Full-size buffers held for `scales` scales.
    pub fn buffer_count(scales: u32) -> usize {
        scales as usize + 2
    }

    pub fn scales(&self) -> u32 {
        self.hf.len() as u32
    }
}

/// Runs one decompose / diffuse / reconstruct pass.
#[derive(Debug)]
pub struct WaveletScheduler<'a> {
    settings: &'a DiffusionSettings,
    mask: &'a Mask,
}

impl<'a> WaveletScheduler<'a> {
    pub fn new(settings: &'a DiffusionSettings, mask: &'a Mask) -> Self {
        Self { settings, mask }
    }

    /// Decompose `input` over every scale of `buffers`, then diffuse from the
    /// coarsest scale down. The finest scale writes into `output`.
    pub fn run<M: Transcendental>(
        &self,
        input: &PixelBuffer,
        output: &mut PixelBuffer,
        buffers: &mut ScaleBuffers,
    ) {
        let scales = buffers.scales();
        assert!(scales >= 1, "scheduler needs at least one scale");
        assert!(input.same_size(output), "input and output sizes differ");

        let ScaleBuffers { hf, lf } = buffers;

        // Forward: HF[s] = LF[s-1] - LF[s], LF[-1] = input.
        {
            let (_, next) = lf.split();
            decompose(input, &mut hf[0], next, 1, true);
            lf.advance();
        }
        for s in 1..scales {
            let (current, next) = lf.split();
            decompose(current, &mut hf[s as usize], next, 1 << s, true);
            lf.advance();
        }

        // Backward: diffuse each scale on top of the coarser reconstruction.
        for s in (0..scales).rev() {
            let update = self.settings.scale_update(s);
            let layer = &hf[s as usize];
            if s == 0 {
                heat_diffusion_step::<M>(
                    layer,
                    lf.current(),
                    self.mask,
                    self.settings,
                    &update,
                    output,
                );
            } else {
                let (current, next) = lf.split();
                heat_diffusion_step::<M>(layer, current, self.mask, self.settings, &update, next);
                lf.advance();
            }
            tracing::trace!(scale = s, mult = update.mult, "scale diffused");
        }
    }
}
