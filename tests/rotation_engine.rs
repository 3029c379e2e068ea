//! End-to-end rotation solves through the engine's byte-level API.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use puzzlematch::{Engine, EngineConfig, Parameter, SolveRequest};

/// Grayscale PNG whose value depends only on the angle about the center, with
/// the artwork advanced by `lead_deg`.
fn angular_png(size: u32, lead_deg: f32) -> Vec<u8> {
    let c = (size as f32 - 1.0) * 0.5;
    let lead = lead_deg.to_radians();
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let angle = (y as f32 - c).atan2(x as f32 - c);
            let v = (128.0 + 60.0 * (angle + lead).sin() + 35.0 * (3.0 * (angle + lead) + 1.0).cos())
                as u8;
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&pixels, size, size, ExtendedColorType::Rgba8)
        .unwrap();
    out
}

/// Narrower strips than the default keep unoptimized test runs quick.
fn test_engine() -> Engine {
    let mut config = EngineConfig::default();
    config.rotation.polar_width = 360;
    config.rotation.polar_height = 32;
    config.rotation.min_overlap = 64;
    Engine::new(config)
}

fn circular_diff(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

fn solved_angle(inner: &[u8], outer: &[u8]) -> (f32, f32) {
    let report = test_engine().solve(SolveRequest::Rotation { inner, outer });
    assert!(report.success, "report = {report:?}");
    let Some(Parameter::Angle(angle)) = report.parameter else {
        panic!("rotation reports an angle, got {:?}", report.parameter);
    };
    (angle, report.confidence)
}

#[test]
fn aligned_rings_solve_to_zero() {
    let inner = angular_png(160, 0.0);
    let outer = angular_png(240, 0.0);
    let (angle, confidence) = solved_angle(&inner, &outer);
    assert!(circular_diff(angle, 0.0) < 4.0, "angle = {angle}");
    assert!(confidence > 0.5, "confidence = {confidence}");
}

#[test]
fn known_lead_is_recovered_across_sizes() {
    let inner = angular_png(160, 40.0);
    let outer = angular_png(240, 0.0);
    let (angle, _) = solved_angle(&inner, &outer);
    assert!(circular_diff(angle, 40.0) < 4.0, "angle = {angle}");
}

#[test]
fn reported_angle_stays_in_range_near_the_seam() {
    let inner = angular_png(160, 357.0);
    let outer = angular_png(240, 0.0);
    let (angle, _) = solved_angle(&inner, &outer);
    assert!((0.0..360.0).contains(&angle), "angle = {angle}");
    assert!(circular_diff(angle, 357.0) < 4.0, "angle = {angle}");
}

#[test]
fn corrupt_inner_bytes_fail_with_decode_error() {
    let outer = angular_png(240, 0.0);
    let report = test_engine().solve(SolveRequest::Rotation {
        inner: b"garbage",
        outer: &outer,
    });
    assert!(!report.success);
    // Failed rotation reports still carry a numeric angle.
    assert_eq!(report.parameter, Some(Parameter::Angle(0.0)));
    assert!(report.error.unwrap().to_lowercase().contains("decode"));
}
