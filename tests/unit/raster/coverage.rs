use super::*;

#[test]
fn allocate_fills_with_farthest_distance() {
    let sdf = allocate_distance_field(8, GeoExtent::unit()).unwrap();
    assert_eq!(sdf.width(), 8);
    assert_eq!(sdf.height(), 8);
    assert!(sdf.data().iter().all(|&d| d == 1.0));
}

#[test]
fn rgba_rows_are_flipped_to_south_up() {
    // 2x2 image: only the top-left pixel is opaque.
    let mut rgba = vec![0u8; 16];
    rgba[3] = 255;
    let cov = CoverageRaster::from_rgba8_top_down(2, 2, &rgba, GeoExtent::unit()).unwrap();
    assert!(cov.is_covered(0, 1));
    assert!(!cov.is_covered(0, 0));
    assert_eq!(cov.covered_count(), 1);
}

#[test]
fn rgba_length_mismatch_is_rejected() {
    let rgba = vec![0u8; 15];
    assert!(CoverageRaster::from_rgba8_top_down(2, 2, &rgba, GeoExtent::unit()).is_err());
}

#[test]
fn gray8_export_is_top_down() {
    let sdf = Raster::from_vec(1, 2, GeoExtent::unit(), vec![0.0f32, 1.0]).unwrap();
    assert_eq!(sdf.to_gray8_top_down(), vec![255, 0]);
}
