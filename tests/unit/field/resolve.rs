use super::*;
use crate::field::jfa::flood_sequential;
use crate::foundation::core::GeoExtent;
use crate::raster::coverage::{CoverageRaster, allocate_distance_field};

fn flooded(size: u32, extent: GeoExtent, seeds: &[(u32, u32)]) -> NearestNeighborField {
    let mut c = CoverageRaster::new(size, size, extent, 0u8).unwrap();
    for &(s, t) in seeds {
        c.set(s, t, 255);
    }
    let mut nnf = NearestNeighborField::seeded(&c).unwrap();
    flood_sequential(&mut nnf).unwrap();
    nnf
}

#[test]
fn seed_pixels_resolve_to_zero_and_distance_grows() {
    let nnf = flooded(16, GeoExtent::unit(), &[(8, 8)]);
    let mut sdf = allocate_distance_field(16, GeoExtent::unit()).unwrap();
    resolve_distance_field(&nnf, &mut sdf, 1.0, 0.0, 1.0).unwrap();

    assert_eq!(*sdf.get(8, 8).unwrap(), 0.0);
    let near = *sdf.get(9, 8).unwrap();
    let far = *sdf.get(15, 8).unwrap();
    assert!(near > 0.0 && near < far);
    // 7 pixels at a cell size of 1/15 over a unit span.
    assert!((far - 7.0 / 15.0).abs() < 1e-6);
}

#[test]
fn second_pass_never_increases_values() {
    let nnf = flooded(32, GeoExtent::unit(), &[(3, 4), (20, 27)]);
    let mut sdf = allocate_distance_field(32, GeoExtent::unit()).unwrap();
    resolve_distance_field(&nnf, &mut sdf, 1.0, 0.0, 1.0).unwrap();
    let first = sdf.data().to_vec();

    resolve_distance_field(&nnf, &mut sdf, 1.0, 0.1, 0.3).unwrap();
    for (a, b) in first.iter().zip(sdf.data()) {
        assert!(b <= a);
    }
}

#[test]
fn values_outside_bounds_clamp() {
    let nnf = flooded(16, GeoExtent::unit(), &[(0, 0)]);
    let mut sdf = allocate_distance_field(16, GeoExtent::unit()).unwrap();
    resolve_distance_field(&nnf, &mut sdf, 10.0, 1.0, 2.0).unwrap();
    assert!(sdf.data().iter().all(|&d| (0.0..=1.0).contains(&d)));
    assert_eq!(*sdf.get(0, 0).unwrap(), 0.0);
    assert_eq!(*sdf.get(15, 15).unwrap(), 1.0);
}

#[test]
fn invalid_bounds_leave_target_untouched() {
    let nnf = flooded(16, GeoExtent::unit(), &[(0, 0)]);
    let mut sdf = allocate_distance_field(16, GeoExtent::unit()).unwrap();
    assert!(resolve_distance_field(&nnf, &mut sdf, 1.0, 0.5, 0.5).is_err());
    assert!(resolve_distance_field(&nnf, &mut sdf, f32::NAN, 0.0, 1.0).is_err());
    assert!(sdf.data().iter().all(|&d| d == 1.0));
}

#[test]
fn unreached_cells_do_not_write() {
    let mut c = CoverageRaster::new(8, 8, GeoExtent::unit(), 0u8).unwrap();
    c.set(0, 0, 255);
    let nnf = NearestNeighborField::seeded(&c).unwrap();
    let mut sdf = allocate_distance_field(8, GeoExtent::unit()).unwrap();
    sdf.assign(0.75);
    resolve_distance_field(&nnf, &mut sdf, 1.0, 0.0, 1.0).unwrap();
    assert_eq!(*sdf.get(0, 0).unwrap(), 0.0);
    assert_eq!(sdf.data().iter().filter(|&&d| d == 0.75).count(), 63);
}

#[test]
fn params_default_and_validate() {
    let p = ResolveParams::default();
    assert!(p.validate().is_ok());
    let bad = ResolveParams {
        lo: 2.0,
        hi: 1.0,
        ..p
    };
    assert!(bad.validate().is_err());
}
