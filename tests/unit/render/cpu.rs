use super::*;
use kurbo::Shape;

use crate::foundation::core::{BezPath, Rect, Rgba8Premul};
use crate::scene::model::Style;

fn extent16() -> GeoExtent {
    GeoExtent::new(0.0, 0.0, 16.0, 16.0).unwrap()
}

fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    Rect::new(x0, y0, x1, y1).to_path(0.1)
}

fn draw_and_count(dev: &mut CpuTileDevice, features: &FeatureSet, extent: &GeoExtent) -> u64 {
    let mut q = dev.create_sample_query().unwrap();
    dev.begin_samples(&mut q).unwrap();
    dev.draw(features, extent).unwrap();
    dev.end_samples(&mut q).unwrap()
}

#[test]
fn west_half_polygon_fills_left_columns() {
    let mut dev = CpuTileDevice::new(16, 16).unwrap();
    let features = FeatureSet::from(vec![Feature::polygon(rect_path(0.0, 0.0, 8.0, 16.0))]);
    let samples = draw_and_count(&mut dev, &features, &extent16());
    assert!((128..=144).contains(&samples), "samples = {samples}");

    let mut out = vec![0u8; 16 * 16 * 4];
    dev.read_direct(&mut out).unwrap();
    let alpha = |s: usize, row: usize| out[(row * 16 + s) * 4 + 3];
    assert_eq!(alpha(2, 8), 255);
    assert_eq!(alpha(14, 8), 0);
}

#[test]
fn features_outside_extent_touch_nothing() {
    let mut dev = CpuTileDevice::new(8, 8).unwrap();
    let features = FeatureSet::from(vec![Feature::polygon(rect_path(100.0, 100.0, 110.0, 110.0))]);
    assert_eq!(draw_and_count(&mut dev, &features, &extent16()), 0);
}

#[test]
fn each_draw_starts_from_transparent() {
    let mut dev = CpuTileDevice::new(16, 16).unwrap();
    let full = FeatureSet::from(vec![Feature::polygon(rect_path(0.0, 0.0, 16.0, 16.0))]);
    assert_eq!(draw_and_count(&mut dev, &full, &extent16()), 256);
    assert_eq!(draw_and_count(&mut dev, &FeatureSet::new(), &extent16()), 0);
}

#[test]
fn end_without_begin_is_an_error() {
    let mut dev = CpuTileDevice::new(4, 4).unwrap();
    let mut q = dev.create_sample_query().unwrap();
    assert!(dev.end_samples(&mut q).is_err());
}

#[test]
fn device_has_no_transfer_buffer() {
    let mut dev = CpuTileDevice::new(4, 4).unwrap();
    assert!(!dev.supports_transfer_buffer());
    assert!(dev.create_transfer_buffer(64).is_err());
    assert_eq!(dev.size(), (4, 4));
}

#[test]
fn oversized_targets_are_rejected() {
    assert!(CpuTileDevice::new(70_000, 4).is_err());
    assert!(CpuTileDevice::new(0, 4).is_err());
}

#[test]
fn coverage_rows_run_south_up() {
    let features = FeatureSet::from(vec![Feature::polygon(rect_path(0.0, 0.0, 16.0, 4.0))]);
    let cov = rasterize_coverage(&features, 16, extent16()).unwrap();
    assert!(cov.is_covered(5, 0));
    assert!(cov.is_covered(5, 3));
    assert!(!cov.is_covered(5, 8));
    assert!(!cov.is_covered(5, 15));
}

#[test]
fn coverage_ignores_style_and_strokes_lines() {
    let mut line = BezPath::new();
    line.move_to((0.0, 8.5));
    line.line_to((16.0, 8.5));
    let faint = Style {
        color: Rgba8Premul::from_straight_rgba(255, 255, 255, 1),
        stroke_width_px: 0.1,
    };
    let features = FeatureSet::from(vec![Feature::line_string(line).with_style(faint)]);
    let cov = rasterize_coverage(&features, 16, extent16()).unwrap();
    assert!(cov.is_covered(3, 8));
    assert!(!cov.is_covered(3, 2));
}
