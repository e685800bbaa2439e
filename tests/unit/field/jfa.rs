use super::*;
use crate::foundation::core::GeoExtent;
use crate::foundation::error::TilefieldError;
use crate::raster::coverage::CoverageRaster;

fn field_with(w: u32, h: u32, seeds: &[(u32, u32)]) -> NearestNeighborField {
    let mut c = CoverageRaster::new(w, h, GeoExtent::unit(), 0u8).unwrap();
    for &(s, t) in seeds {
        c.set(s, t, 255);
    }
    NearestNeighborField::seeded(&c).unwrap()
}

fn brute_force_d2(seeds: &[(u32, u32)], s: u32, t: u32) -> f32 {
    seeds
        .iter()
        .map(|&(a, b)| Seed::new(a, b).distance_squared_to(s, t))
        .fold(f32::INFINITY, f32::min)
}

/// Small deterministic LCG so the test does not need an rng crate.
fn scattered_seeds(n: usize, size: u32, mut state: u64) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let s = ((state >> 33) % u64::from(size)) as u32;
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let t = ((state >> 33) % u64::from(size)) as u32;
        out.push((s, t));
    }
    out
}

#[test]
fn jump_steps_halve_down_to_one() {
    assert_eq!(jump_steps(16).collect::<Vec<_>>(), vec![8, 4, 2, 1]);
    assert_eq!(jump_steps(2).collect::<Vec<_>>(), vec![1]);
    assert_eq!(jump_steps(1).count(), 0);
}

#[test]
fn flood_rounds_end_with_an_extra_unit_step() {
    assert_eq!(flood_rounds(16).collect::<Vec<_>>(), vec![8, 4, 2, 1, 1]);
    assert_eq!(flood_rounds(2).collect::<Vec<_>>(), vec![1, 1]);
    assert_eq!(flood_rounds(1).count(), 0);
}

#[test]
fn non_power_of_two_is_reported_not_tolerated() {
    let mut nnf = field_with(12, 12, &[(3, 3)]);
    let err = flood_sequential(&mut nnf).unwrap_err();
    assert!(matches!(err, TilefieldError::InvalidArgument(_)));
    assert!(flood_parallel(&mut nnf).is_err());
    // Untouched on failure.
    assert_eq!(nnf.unresolved_count(), 143);
}

#[test]
fn single_seed_reaches_every_pixel() {
    for flood in [flood_sequential, flood_parallel] {
        let mut nnf = field_with(16, 16, &[(5, 11)]);
        flood(&mut nnf).unwrap();
        assert_eq!(nnf.unresolved_count(), 0);
        assert!(nnf.cells().data().iter().all(|&c| c == Some(Seed::new(5, 11))));
    }
}

#[test]
fn two_opposite_seeds_split_the_grid_exactly() {
    let seeds = [(0, 0), (31, 31)];
    for flood in [flood_sequential, flood_parallel] {
        let mut nnf = field_with(32, 32, &seeds);
        flood(&mut nnf).unwrap();
        for (s, t, cell) in nnf.cells().pixels() {
            let got = cell.expect("every pixel is reachable").distance_squared_to(s, t);
            assert_eq!(got, brute_force_d2(&seeds, s, t), "pixel ({s},{t})");
        }
    }
}

#[test]
fn covered_pixels_keep_their_own_seed() {
    let seeds = scattered_seeds(12, 32, 7);
    for flood in [flood_sequential, flood_parallel] {
        let mut nnf = field_with(32, 32, &seeds);
        flood(&mut nnf).unwrap();
        for &(s, t) in &seeds {
            assert_eq!(nnf.seed_at(s, t), Some(Seed::new(s, t)));
        }
    }
}

#[test]
fn scattered_seeds_converge_to_near_nearest() {
    let seeds = scattered_seeds(24, 64, 42);
    for flood in [flood_sequential, flood_parallel] {
        let mut nnf = field_with(64, 64, &seeds);
        flood(&mut nnf).unwrap();
        assert_eq!(nnf.unresolved_count(), 0);

        let mut off = 0usize;
        for (s, t, cell) in nnf.cells().pixels() {
            let got = cell.unwrap().distance_squared_to(s, t);
            let best = brute_force_d2(&seeds, s, t);
            assert!(got >= best);
            if got > best {
                off += 1;
            }
        }
        // Jump flood is approximate; misses are rare.
        assert!(off * 100 <= 64 * 64, "{off} pixels off the true nearest seed");
    }
}

#[test]
fn rectangular_fields_use_the_larger_dimension() {
    let mut nnf = field_with(16, 4, &[(0, 0)]);
    flood_sequential(&mut nnf).unwrap();
    assert_eq!(nnf.unresolved_count(), 0);
}

#[test]
fn strategies_agree_on_many_seeded_fields() {
    for round in 0..20u64 {
        let seeds = scattered_seeds(40, 64, 1000 + round);
        let mut seq = field_with(64, 64, &seeds);
        flood_sequential(&mut seq).unwrap();
        let mut par = field_with(64, 64, &seeds);
        flood_parallel(&mut par).unwrap();

        let mut unique_mismatch = 0usize;
        for (s, t, cell) in seq.cells().pixels() {
            let best = brute_force_d2(&seeds, s, t);
            let nearest: Vec<_> = seeds
                .iter()
                .filter(|&&(a, b)| Seed::new(a, b).distance_squared_to(s, t) == best)
                .collect();
            if nearest.len() == 1 && *cell != par.seed_at(s, t) {
                unique_mismatch += 1;
            }
        }
        assert_eq!(unique_mismatch, 0, "field {round}");
        assert_eq!(seq, par, "field {round}");
    }
}
