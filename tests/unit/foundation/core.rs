use super::*;

#[test]
fn extent_rejects_empty_and_inverted_boxes() {
    assert!(GeoExtent::new(0.0, 0.0, 1.0, 1.0).is_ok());
    assert!(GeoExtent::new(0.0, 0.0, 0.0, 1.0).is_err());
    assert!(GeoExtent::new(2.0, 0.0, 1.0, 1.0).is_err());
    assert!(GeoExtent::new(0.0, f64::NAN, 1.0, 1.0).is_err());
}

#[test]
fn subdivide_covers_parent_row_major_from_south_west() {
    let e = GeoExtent::new(0.0, 0.0, 4.0, 2.0).unwrap();
    let cells = e.subdivide(2, 2);
    assert_eq!(cells.len(), 4);
    assert_eq!(cells[0], GeoExtent::new(0.0, 0.0, 2.0, 1.0).unwrap());
    assert_eq!(cells[3], GeoExtent::new(2.0, 1.0, 4.0, 2.0).unwrap());
    assert!(cells.iter().all(|c| e.contains_extent(c)));
}

#[test]
fn pixel_transform_flips_y() {
    let e = GeoExtent::new(10.0, 20.0, 30.0, 60.0).unwrap();
    let m = e.to_pixel_transform(100, 200);
    let top_left = m * Point::new(10.0, 60.0);
    let bottom_right = m * Point::new(30.0, 20.0);
    assert!((top_left.x - 0.0).abs() < 1e-9 && (top_left.y - 0.0).abs() < 1e-9);
    assert!((bottom_right.x - 100.0).abs() < 1e-9 && (bottom_right.y - 200.0).abs() < 1e-9);
}

#[test]
fn premul_rounds_half_up() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c.r, 128);
    assert_eq!(c.g, 64);
    assert_eq!(c.b, 0);
    assert_eq!(c.a, 128);
}

#[test]
fn straight_round_trip_is_exact_for_opaque_and_zero() {
    let opaque = Rgba8Premul::from_straight_rgba(12, 200, 77, 255);
    assert_eq!(opaque.to_straight_rgba(), [12, 200, 77, 255]);
    assert_eq!(Rgba8Premul::transparent().to_straight_rgba(), [0, 0, 0, 0]);

    let half = Rgba8Premul::from_straight_rgba(255, 0, 0, 128);
    assert_eq!(half.to_straight_rgba(), [255, 0, 0, 128]);
}
