//! Tests for the per-scale diffusion update.

use super::*;
use crate::math::{ExactMath, FastMath};
use crate::testing::{assert_buffers_close, flat_image, impulse_image, random_image};
use crate::wavelet::{B_SPLINE_SIGMA, decompose};

fn split(input: &PixelBuffer, mult: usize) -> (PixelBuffer, PixelBuffer) {
    let mut hf = PixelBuffer::new_default(input.width(), input.height());
    let mut lf = PixelBuffer::new_default(input.width(), input.height());
    decompose(input, &mut hf, &mut lf, mult, true);
    (hf, lf)
}

fn sum_hf_lf(hf: &PixelBuffer, lf: &PixelBuffer) -> PixelBuffer {
    let pixels = hf
        .iter()
        .zip(lf.iter())
        .map(|(h, l)| std::array::from_fn(|c| h[c] + l[c]))
        .collect();
    PixelBuffer::new(hf.width(), hf.height(), pixels)
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_settings_decimal_log_mapping() {
    let params = DiffuseParams {
        regularization: 1.0,
        variance_threshold: -1.0,
        anisotropy: [1.0, 0.0, -2.0, 0.5],
        ..DiffuseParams::default()
    };
    let s = DiffusionSettings::from_params(&params, 1.0);
    assert!((s.regularization - 9.0).abs() < 1e-5);
    assert!((s.variance_threshold - 0.1).abs() < 1e-6);
    assert_eq!(s.anisotropy[2], Anisotropy::from_raw(-2.0));

    let neutral = DiffusionSettings::from_params(&DiffuseParams::default(), 1.0);
    assert_eq!(neutral.regularization, 0.0);
    assert_eq!(neutral.variance_threshold, 1.0);
}

#[test]
fn test_scale_update_at_radius_center_is_full_strength() {
    let params = DiffuseParams {
        radius: 4.0,
        radius_center: B_SPLINE_SIGMA,
        sharpness: 0.5,
        speed: [1.0, -0.5, 0.25, 0.0],
        regularization: 1.0,
        ..DiffuseParams::default()
    };
    let settings = DiffusionSettings::from_params(&params, 1.0);
    let update = settings.scale_update(0);

    assert_eq!(update.mult, 1);
    assert!((update.strength - 1.5).abs() < 1e-6);
    let expected = [0.25, -0.125, 0.0625, 0.0];
    for (a, e) in update.abcd.iter().zip(expected) {
        assert!((a - e).abs() < 1e-6, "{a} vs {e}");
    }
    let rf = 9.0 * B_SPLINE_SIGMA * B_SPLINE_SIGMA / 9.0;
    assert!((update.regularization_factor - rf).abs() < 1e-4);
}

#[test]
fn test_scale_update_weight_falls_off_with_scale() {
    let params = DiffuseParams {
        radius: 4.0,
        speed: [1.0; 4],
        ..DiffuseParams::default()
    };
    let settings = DiffusionSettings::from_params(&params, 1.0);
    let weights: Vec<f32> = (0..5).map(|s| settings.scale_update(s).abcd[0]).collect();
    for pair in weights.windows(2) {
        assert!(pair[1] < pair[0], "weights {weights:?} not decreasing");
    }
    assert_eq!(settings.scale_update(5).mult, 32);
}

#[test]
fn test_zoom_shifts_weight_to_finer_scales() {
    // At zoom 4 scale s of the preview covers what scale s + 2 covers at full size.
    let params = DiffuseParams {
        radius: 16.0,
        speed: [1.0; 4],
        ..DiffuseParams::default()
    };
    let full = DiffusionSettings::from_params(&params, 1.0);
    let preview = DiffusionSettings::from_params(&params, 4.0);
    assert!(preview.scale_update(1).abcd[0] < full.scale_update(1).abcd[0]);
    // Zoom below 1 is treated as 1.
    assert_eq!(DiffusionSettings::from_params(&params, 0.5).zoom, 1.0);
}

// ============================================================================
// Diffusion step
// ============================================================================

#[test]
fn test_zero_speed_zero_sharpness_reconstructs() {
    let input = random_image(40, 30, 3);
    let (hf, lf) = split(&input, 2);
    let params = DiffuseParams {
        anisotropy: [1.0, -1.0, 2.0, 0.0],
        regularization: 2.0,
        ..DiffuseParams::default()
    };
    let settings = DiffusionSettings::from_params(&params, 1.0);
    let update = settings.scale_update(1);

    let mut out = PixelBuffer::new_default(40, 30);
    heat_diffusion_step::<FastMath>(&hf, &lf, &Mask::none(), &settings, &update, &mut out);
    assert_buffers_close(&out, &input, 1e-6);
}

#[test]
fn test_flat_layer_is_unchanged() {
    let lf = flat_image(24, 24, [0.18, 0.4, 0.7, 0.0]);
    let hf = flat_image(24, 24, [0.0; 4]);
    let params = DiffuseParams {
        sharpness: 0.5,
        anisotropy: [1.0, 0.0, 1.0, 0.0],
        speed: [-0.25, 0.125, -0.5, 0.25],
        ..DiffuseParams::default()
    };
    let settings = DiffusionSettings::from_params(&params, 1.0);
    for s in 0..4 {
        let mut out = PixelBuffer::new_default(24, 24);
        heat_diffusion_step::<FastMath>(
            &hf,
            &lf,
            &Mask::none(),
            &settings,
            &settings.scale_update(s),
            &mut out,
        );
        assert_buffers_close(&out, &lf, 1e-6);
    }
}

#[test]
fn test_positive_speed_lowers_peak_and_raises_neighbours() {
    let lf = flat_image(21, 21, [1.0, 1.0, 1.0, 0.0]);
    let hf = impulse_image(21, 21, 10, 10, 1.0);
    let params = DiffuseParams {
        speed: [0.0, 0.0, 1.0, 0.0],
        ..DiffuseParams::default()
    };
    let settings = DiffusionSettings::from_params(&params, 1.0);
    let update = settings.scale_update(0);
    let mut out = PixelBuffer::new_default(21, 21);
    heat_diffusion_step::<ExactMath>(&hf, &lf, &Mask::none(), &settings, &update, &mut out);

    assert!(out[(10, 10)][0] < 2.0);
    assert!(out[(11, 10)][0] > 1.0);
    assert!(out[(10, 9)][0] > 1.0);
    assert!(out[(11, 11)][0] > 1.0);
    // Padding channel is passed through.
    assert_eq!(out[(10, 10)][3], 0.0);
}

#[test]
fn test_negative_speed_sharpens_peak() {
    let lf = flat_image(21, 21, [1.0, 1.0, 1.0, 0.0]);
    let hf = impulse_image(21, 21, 10, 10, 0.5);
    let params = DiffuseParams {
        speed: [0.0, 0.0, -1.0, 0.0],
        ..DiffuseParams::default()
    };
    let settings = DiffusionSettings::from_params(&params, 1.0);
    let mut out = PixelBuffer::new_default(21, 21);
    heat_diffusion_step::<ExactMath>(
        &hf,
        &lf,
        &Mask::none(),
        &settings,
        &settings.scale_update(0),
        &mut out,
    );
    assert!(out[(10, 10)][0] > 1.5);
}

#[test]
fn test_output_is_clipped_at_zero() {
    // Sharpening an isolated peak on a black background pushes its
    // neighbours below zero before the clip.
    let lf = flat_image(9, 9, [0.0; 4]);
    let hf = impulse_image(9, 9, 4, 4, 1.0);
    let params = DiffuseParams {
        speed: [0.0, 0.0, -1.0, 0.0],
        ..DiffuseParams::default()
    };
    let settings = DiffusionSettings::from_params(&params, 1.0);
    let mut out = PixelBuffer::new_default(9, 9);
    heat_diffusion_step::<ExactMath>(
        &hf,
        &lf,
        &Mask::none(),
        &settings,
        &settings.scale_update(0),
        &mut out,
    );
    assert!(out.iter().all(|p| p.iter().all(|&v| v >= 0.0)));
    assert_eq!(out[(5, 4)][0], 0.0);
    assert!(out[(4, 4)][0] > 1.0);
}

#[test]
fn test_unmasked_pixels_pass_through() {
    let input = random_image(16, 16, 8);
    let (hf, lf) = split(&input, 1);
    let mask = Mask::build(&input, 0.6).unwrap();
    assert!(mask.count() > 0);

    let params = DiffuseParams {
        sharpness: 0.8,
        speed: [1.0, 1.0, 1.0, 1.0],
        ..DiffuseParams::default()
    };
    let settings = DiffusionSettings::from_params(&params, 1.0);
    let mut out = PixelBuffer::new_default(16, 16);
    heat_diffusion_step::<FastMath>(&hf, &lf, &mask, &settings, &settings.scale_update(0), &mut out);

    let reference = sum_hf_lf(&hf, &lf);
    let mut moved = 0;
    for y in 0..16 {
        for x in 0..16 {
            if mask.includes(x, y) {
                if out[(x, y)] != reference[(x, y)] {
                    moved += 1;
                }
            } else {
                assert_eq!(out[(x, y)], reference[(x, y)], "pixel ({x}, {y})");
            }
        }
    }
    assert!(moved > 0);
}

#[test]
fn test_high_variance_threshold_damps_update() {
    let lf = flat_image(15, 15, [1.0, 1.0, 1.0, 0.0]);
    let hf = impulse_image(15, 15, 7, 7, 1.0);
    let run = |variance_threshold: f32| {
        let params = DiffuseParams {
            speed: [0.0, 0.0, 1.0, 0.0],
            variance_threshold,
            ..DiffuseParams::default()
        };
        let settings = DiffusionSettings::from_params(&params, 1.0);
        let mut out = PixelBuffer::new_default(15, 15);
        heat_diffusion_step::<ExactMath>(
            &hf,
            &lf,
            &Mask::none(),
            &settings,
            &settings.scale_update(0),
            &mut out,
        );
        2.0 - out[(7, 7)][0]
    };
    let loose = run(0.0);
    let tight = run(2.0);
    assert!(tight > 0.0);
    assert!(tight < loose / 50.0);
}
