use super::*;

#[test]
fn image_size_is_checked() {
    assert!(TileImage::new(2, 2, vec![0; 16]).is_ok());
    assert!(TileImage::new(2, 2, vec![0; 15]).is_err());
}

#[test]
fn coverage_flips_rows_south_up() {
    // Top row opaque, bottom row clear.
    let mut data = vec![0u8; 2 * 2 * 4];
    data[3] = 255;
    data[7] = 255;
    let img = TileImage::new(2, 2, data).unwrap();
    let cov = img.to_coverage(GeoExtent::unit()).unwrap();
    assert!(cov.is_covered(0, 1) && cov.is_covered(1, 1));
    assert!(!cov.is_covered(0, 0));
}

#[test]
fn output_accessors() {
    assert!(TileOutput::Empty.is_empty());
    assert!(TileOutput::Empty.into_image().is_none());
    let img = TileImage::new(1, 1, vec![128, 0, 0, 128]).unwrap();
    let out = TileOutput::Image(img);
    assert_eq!(out.image().map(|i| i.to_straight_rgba8()), Some(vec![255, 0, 0, 128]));
}
