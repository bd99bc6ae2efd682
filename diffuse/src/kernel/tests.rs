//! Tests for the anisotropic stencil builder.

use strum::IntoEnumIterator;

use super::*;
use crate::math::{ExactMath, FastMath};

fn kernel_sum(k: &Kernel) -> f32 {
    k.iter().sum()
}

/// Neighbourhood sampled from `f(x, y)` around the origin, `y` pointing down.
fn sample(f: impl Fn(f32, f32) -> f32) -> Neighbourhood {
    let mut n = [0.0; 9];
    for dy in -1..=1 {
        for dx in -1..=1 {
            n[((dy + 1) * 3 + dx + 1) as usize] = f(dx as f32, dy as f32);
        }
    }
    n
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_anisotropy_from_raw() {
    assert_eq!(
        Anisotropy::from_raw(0.0),
        Anisotropy {
            mode: Isotropy::Isotrope,
            exponent: 0.0
        }
    );
    assert_eq!(
        Anisotropy::from_raw(2.0),
        Anisotropy {
            mode: Isotropy::Isophote,
            exponent: 4.0
        }
    );
    assert_eq!(
        Anisotropy::from_raw(-1.5),
        Anisotropy {
            mode: Isotropy::Gradient,
            exponent: 2.25
        }
    );
}

#[test]
fn test_orientation_zero_vector_is_theta_zero() {
    let o = Orientation::from_vector(0.0, 0.0);
    assert_eq!((o.cos, o.sin, o.magnitude), (1.0, 0.0, 0.0));

    let flat = [0.3; 9];
    assert_eq!(Orientation::gradient(&flat).magnitude, 0.0);
    assert_eq!(Orientation::curvature(&flat).magnitude, 0.0);
}

#[test]
fn test_orientation_gradient_of_ramp() {
    // u = 2x - y: gradient (2, -1)
    let n = sample(|x, y| 2.0 * x - y);
    let o = Orientation::gradient(&n);
    let m = 5.0f32.sqrt();
    assert!((o.magnitude - m).abs() < 1e-6);
    assert!((o.cos - 2.0 / m).abs() < 1e-6);
    assert!((o.sin + 1.0 / m).abs() < 1e-6);
}

#[test]
fn test_orientation_curvature_of_parabola() {
    // u = x²: second difference 2 along x, 0 along y
    let n = sample(|x, _| x * x);
    let o = Orientation::curvature(&n);
    assert!((o.magnitude - 2.0).abs() < 1e-6);
    assert_eq!((o.cos, o.sin), (1.0, 0.0));
}

// ============================================================================
// Kernel construction
// ============================================================================

#[test]
fn test_kernels_sum_to_zero_in_every_mode() {
    let orientations = [
        Orientation::from_vector(0.0, 0.0),
        Orientation::from_vector(1.0, 0.0),
        Orientation::from_vector(0.3, -0.7),
        Orientation::from_vector(-5.0, 2.0),
        Orientation::from_vector(1e-3, 1e-3),
    ];
    for mode in Isotropy::iter() {
        for raw in [0.5f32, 1.0, 3.0, 10.0] {
            let anisotropy = Anisotropy {
                mode,
                exponent: raw * raw,
            };
            for o in orientations {
                let k = build_kernel::<FastMath>(anisotropy, o);
                assert!(
                    kernel_sum(&k).abs() < 1e-6,
                    "{mode} raw={raw} {o:?}: sum {}",
                    kernel_sum(&k)
                );
            }
        }
    }
}

#[test]
fn test_isotrope_ignores_orientation() {
    let a = Anisotropy::from_raw(0.0);
    let k = build_kernel::<ExactMath>(a, Orientation::from_vector(3.0, 4.0));
    assert_eq!(k, ISOTROPE_KERNEL);
}

#[test]
fn test_undamped_tensor_is_plain_laplacian() {
    // Zero magnitude gives c² = 1: the tensor is the identity for both modes.
    let o = Orientation::from_vector(0.0, 0.0);
    for raw in [1.0, -1.0] {
        let k = build_kernel::<ExactMath>(Anisotropy::from_raw(raw), o);
        assert_eq!(k, [0.0, 1.0, -0.0, 1.0, -4.0, 1.0, -0.0, 1.0, 0.0]);
    }
}

#[test]
fn test_isophote_follows_vertical_edge() {
    // Vertical edge: gradient points along x, the edge runs along y.
    let o = Orientation::from_vector(1.0, 0.0);
    let k = build_kernel::<ExactMath>(Anisotropy::from_raw(2.0), o);
    assert!(k[N] > k[E], "N {} should exceed E {}", k[N], k[E]);
    assert_eq!(k[N], k[S]);
    assert_eq!(k[E], k[W]);
    assert_eq!(k[NW], 0.0);
}

#[test]
fn test_gradient_mode_crosses_vertical_edge() {
    let o = Orientation::from_vector(1.0, 0.0);
    let k = build_kernel::<ExactMath>(Anisotropy::from_raw(-2.0), o);
    assert!(k[E] > k[N], "E {} should exceed N {}", k[E], k[N]);
}

#[test]
fn test_isophote_diagonal_favours_edge_direction() {
    // Gradient towards SE: the edge runs NE-SW.
    let o = Orientation::from_vector(1.0, 1.0);
    let k = build_kernel::<ExactMath>(Anisotropy::from_raw(2.0), o);
    assert!(k[NE] > 0.0 && k[SW] > 0.0);
    assert!(k[NW] < 0.0 && k[SE] < 0.0);
    assert_eq!(k[NE], k[SW]);
    assert_eq!(k[NW], k[SE]);

    let k = build_kernel::<ExactMath>(Anisotropy::from_raw(-2.0), o);
    assert!(k[NW] > 0.0 && k[SE] > 0.0);
    assert!(k[NE] < 0.0 && k[SW] < 0.0);
}

#[test]
fn test_stronger_anisotropy_damps_more() {
    let o = Orientation::from_vector(0.0, 0.5);
    let weak = build_kernel::<ExactMath>(Anisotropy::from_raw(0.5), o);
    let strong = build_kernel::<ExactMath>(Anisotropy::from_raw(4.0), o);
    // Horizontal edge: isophote keeps E/W at 1 and damps N/S.
    assert_eq!(weak[E], 1.0);
    assert_eq!(strong[E], 1.0);
    assert!(strong[N] < weak[N]);
}

#[test]
fn test_fast_and_exact_kernels_agree() {
    let o = Orientation::from_vector(0.8, -0.2);
    for raw in [-3.0, -0.5, 0.5, 3.0] {
        let a = Anisotropy::from_raw(raw);
        let fast = build_kernel::<FastMath>(a, o);
        let exact = build_kernel::<ExactMath>(a, o);
        for (f, e) in fast.iter().zip(exact.iter()) {
            assert!((f - e).abs() < 1e-3, "raw={raw}: {f} vs {e}");
        }
    }
}

// ============================================================================
// Convolution
// ============================================================================

#[test]
fn test_convolve_flat_is_zero() {
    let flat = [0.37; 9];
    for raw in [-2.0, 0.0, 2.0] {
        let k = build_kernel::<ExactMath>(
            Anisotropy::from_raw(raw),
            Orientation::from_vector(0.6, 0.8),
        );
        assert!(convolve(&k, &flat).abs() < 1e-6);
    }
}

#[test]
fn test_convolve_ramp_is_zero_for_symmetric_kernels() {
    // A Laplacian-type stencil has no response to linear ramps.
    let ramp = sample(|x, y| 0.5 + 0.1 * x - 0.2 * y);
    for raw in [-2.0, 0.0, 2.0] {
        let k = build_kernel::<ExactMath>(
            Anisotropy::from_raw(raw),
            Orientation::from_vector(1.0, 2.0),
        );
        assert!(convolve(&k, &ramp).abs() < 1e-5);
    }
}

#[test]
fn test_isotrope_response_to_peak_is_negative() {
    let mut peak = [0.0; 9];
    peak[C] = 1.0;
    assert_eq!(convolve(&ISOTROPE_KERNEL, &peak), -3.0);
}
