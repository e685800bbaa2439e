use rayon::prelude::*;

use crate::field::nnf::{NearestNeighborField, Seed};
use crate::foundation::error::{TilefieldResult, soft_assert};
use crate::foundation::math::is_positive_power_of_two;

/// Jump-flood step sizes for an `n`-wide grid: `n/2, n/4, ..., 1`.
///
/// Empty for `n < 2`.
pub fn jump_steps(n: u32) -> impl Iterator<Item = u32> {
    std::iter::successors(Some(n / 2).filter(|&l| l >= 1), |&l| (l > 1).then_some(l / 2))
}

/// Rounds every flood strategy runs: [`jump_steps`] followed by one extra `L = 1` round.
///
/// The trailing round repairs most of the pixels plain JFA leaves on a near-nearest seed.
pub fn flood_rounds(n: u32) -> impl Iterator<Item = u32> {
    let refine = (n >= 2).then_some(1);
    jump_steps(n).chain(refine)
}

/// Larger image dimension, which must be a positive power of two.
pub(crate) fn flood_extent(nnf: &NearestNeighborField, op: &str) -> TilefieldResult<u32> {
    let n = nnf.width().max(nnf.height());
    soft_assert(
        is_positive_power_of_two(n),
        op,
        "larger field dimension must be a positive power of two",
    )?;
    Ok(n)
}

/// Run the jump flood on the calling thread.
///
/// Every round reads a frozen snapshot of the previous round and writes into a second buffer, so
/// each pixel keeps its own seed or the strictly closest of its eight `+-L` neighbors. The result
/// is identical to [`flood_parallel`] and to the compute kernel.
pub fn flood_sequential(nnf: &mut NearestNeighborField) -> TilefieldResult<()> {
    let n = flood_extent(nnf, "flood_sequential")?;
    let w = nnf.width() as usize;
    let h = nnf.height() as usize;

    let mut src: Vec<Option<Seed>> = nnf.cells().data().to_vec();
    let mut dst: Vec<Option<Seed>> = vec![None; src.len()];

    for step in flood_rounds(n) {
        let l = i64::from(step);
        let mut changed = 0u64;
        for (t, row) in dst.chunks_mut(w).enumerate() {
            for (s, out) in row.iter_mut().enumerate() {
                *out = gather_cell(&src, w as i64, h as i64, s as i64, t as i64, l);
                if *out != src[t * w + s] {
                    changed += 1;
                }
            }
        }
        std::mem::swap(&mut src, &mut dst);
        tracing::trace!(step, changed, "jump flood round (sequential)");
    }

    nnf.cells_mut().data_mut().copy_from_slice(&src);
    Ok(())
}

/// Run the jump flood with one rayon task per row.
///
/// Rows are independent within a round, so the result does not depend on scheduling and matches
/// [`flood_sequential`] cell for cell.
pub fn flood_parallel(nnf: &mut NearestNeighborField) -> TilefieldResult<()> {
    let n = flood_extent(nnf, "flood_parallel")?;
    let w = nnf.width() as usize;
    let h = nnf.height() as usize;

    let mut src: Vec<Option<Seed>> = nnf.cells().data().to_vec();
    let mut dst: Vec<Option<Seed>> = vec![None; src.len()];

    for step in flood_rounds(n) {
        let l = i64::from(step);
        dst.par_chunks_mut(w).enumerate().for_each(|(t, row)| {
            for (s, out) in row.iter_mut().enumerate() {
                *out = gather_cell(&src, w as i64, h as i64, s as i64, t as i64, l);
            }
        });
        std::mem::swap(&mut src, &mut dst);
        tracing::trace!(step, "jump flood round (parallel)");
    }

    nnf.cells_mut().data_mut().copy_from_slice(&src);
    Ok(())
}

/// Best seed for `(s, t)` among its own cell and the eight `+-l` neighbors in `src`.
///
/// Candidates are visited column-major (`rs` outer, `rt` inner); ties keep the earlier one.
#[inline]
fn gather_cell(src: &[Option<Seed>], w: i64, h: i64, s: i64, t: i64, l: i64) -> Option<Seed> {
    let (qs, qt) = (s as u32, t as u32);
    let mut best = src[(t * w + s) as usize];
    for rs in [s - l, s, s + l] {
        if rs < 0 || rs >= w {
            continue;
        }
        for rt in [t - l, t, t + l] {
            if rt < 0 || rt >= h {
                continue;
            }
            if rs == s && rt == t {
                continue;
            }
            let Some(candidate) = src[(rt * w + rs) as usize] else {
                continue;
            };
            best = match best {
                Some(b)
                    if candidate.distance_squared_to(qs, qt) >= b.distance_squared_to(qs, qt) =>
                {
                    Some(b)
                }
                _ => Some(candidate),
            };
        }
    }
    best
}

#[cfg(test)]
#[path = "../../tests/unit/field/jfa.rs"]
mod tests;
