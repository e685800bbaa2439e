use super::*;

fn coverage_with(w: u32, h: u32, covered: &[(u32, u32)]) -> CoverageRaster {
    let mut c = CoverageRaster::new(w, h, GeoExtent::unit(), 0u8).unwrap();
    for &(s, t) in covered {
        c.set(s, t, 255);
    }
    c
}

#[test]
fn seeded_points_covered_pixels_at_themselves() {
    let cov = coverage_with(4, 4, &[(1, 2), (3, 0)]);
    let nnf = NearestNeighborField::seeded(&cov).unwrap();
    assert_eq!(nnf.seed_at(1, 2), Some(Seed::new(1, 2)));
    assert_eq!(nnf.seed_at(3, 0), Some(Seed::new(3, 0)));
    assert_eq!(nnf.seed_at(0, 0), None);
    assert_eq!(nnf.unresolved_count(), 14);
}

#[test]
fn seeded_rejects_empty_coverage() {
    let cov = coverage_with(4, 4, &[]);
    let err = NearestNeighborField::seeded(&cov).unwrap_err();
    assert!(matches!(err, TilefieldError::InvalidArgument(_)));
}

#[test]
fn rg32f_encoding_uses_nodata_only_at_the_boundary() {
    let cov = coverage_with(2, 1, &[(1, 0)]);
    let mut nnf = NearestNeighborField::seeded(&cov).unwrap();
    let rg = nnf.encode_rg32f();
    assert_eq!(rg, vec![NODATA, NODATA, 1.0, 0.0]);

    nnf.decode_rg32f(&[1.0, 0.0, 1.0, 0.0]).unwrap();
    assert_eq!(nnf.seed_at(0, 0), Some(Seed::new(1, 0)));
    assert!(nnf.decode_rg32f(&[0.0]).is_err());
}

#[test]
fn seed_distance_is_squared_euclidean() {
    assert_eq!(Seed::new(0, 0).distance_squared_to(3, 4), 25.0);
}
