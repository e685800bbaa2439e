use crate::foundation::core::GeoExtent;
use crate::foundation::error::{TilefieldError, TilefieldResult, soft_assert};
use crate::foundation::math::distance_squared_2d;
use crate::raster::buffer::Raster;
use crate::raster::coverage::CoverageRaster;

/// "No seed reached yet" in the two-float GPU encoding.
///
/// Only used at the GPU boundary; in memory an unreached cell is `None`.
pub const NODATA: f32 = 32767.0;

/// Integer pixel coordinate of a covered source pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Seed {
    pub s: u32,
    pub t: u32,
}

impl Seed {
    pub fn new(s: u32, t: u32) -> Self {
        Self { s, t }
    }

    /// Squared distance from pixel `(s, t)` to this seed.
    #[inline]
    pub fn distance_squared_to(self, s: u32, t: u32) -> f32 {
        distance_squared_2d(s as f32, t as f32, self.s as f32, self.t as f32)
    }
}

/// Per-pixel record of the nearest known seed.
///
/// Cells start as their own coordinate when covered and `None` otherwise. During propagation a
/// cell only ever moves from `None` to a seed, or to a strictly closer seed.
#[derive(Clone, Debug, PartialEq)]
pub struct NearestNeighborField {
    cells: Raster<Option<Seed>>,
}

impl NearestNeighborField {
    /// Initialize from coverage: covered pixels seed themselves, the rest are unreached.
    ///
    /// Fails when nothing is covered; an all-unreached field is never produced.
    pub fn seeded(coverage: &CoverageRaster) -> TilefieldResult<Self> {
        let seeds = coverage.covered_count();
        soft_assert(
            seeds > 0,
            "NearestNeighborField::seeded",
            "coverage raster has no covered pixels",
        )?;

        let cells: Vec<Option<Seed>> = coverage
            .pixels()
            .map(|(s, t, &a)| (a > 0).then_some(Seed::new(s, t)))
            .collect();
        let cells = Raster::from_vec(
            coverage.width(),
            coverage.height(),
            *coverage.extent(),
            cells,
        )?;
        tracing::debug!(
            width = coverage.width(),
            height = coverage.height(),
            seeds,
            "seeded nearest-neighbor field"
        );
        Ok(Self { cells })
    }

    pub fn from_cells(cells: Raster<Option<Seed>>) -> Self {
        Self { cells }
    }

    pub fn width(&self) -> u32 {
        self.cells.width()
    }

    pub fn height(&self) -> u32 {
        self.cells.height()
    }

    pub fn extent(&self) -> &GeoExtent {
        self.cells.extent()
    }

    pub fn cells(&self) -> &Raster<Option<Seed>> {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut Raster<Option<Seed>> {
        &mut self.cells
    }

    pub fn seed_at(&self, s: u32, t: u32) -> Option<Seed> {
        self.cells.get(s, t).copied().flatten()
    }

    /// Cells no seed has reached.
    pub fn unresolved_count(&self) -> usize {
        self.cells.data().iter().filter(|c| c.is_none()).count()
    }

    /// Interleaved `[s, t]` floats per cell, `NODATA` for unreached cells.
    #[cfg_attr(not(feature = "gpu"), allow(dead_code))]
    pub(crate) fn encode_rg32f(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.cells.len() * 2);
        for cell in self.cells.data() {
            match cell {
                Some(seed) => {
                    out.push(seed.s as f32);
                    out.push(seed.t as f32);
                }
                None => {
                    out.push(NODATA);
                    out.push(NODATA);
                }
            }
        }
        out
    }

    #[cfg_attr(not(feature = "gpu"), allow(dead_code))]
    pub(crate) fn decode_rg32f(&mut self, rg: &[f32]) -> TilefieldResult<()> {
        if rg.len() != self.cells.len() * 2 {
            return Err(TilefieldError::gpu(format!(
                "nearest-neighbor readback expects {} floats, got {}",
                self.cells.len() * 2,
                rg.len()
            )));
        }
        for (cell, px) in self.cells.data_mut().iter_mut().zip(rg.chunks_exact(2)) {
            *cell = if px[0] == NODATA {
                None
            } else {
                Some(Seed::new(px[0] as u32, px[1] as u32))
            };
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/field/nnf.rs"]
mod tests;
