use crate::foundation::core::GeoExtent;
use crate::foundation::error::{TilefieldError, TilefieldResult};
use crate::raster::buffer::Raster;

/// Alpha-coded coverage: a pixel is covered when its value is non-zero.
pub type CoverageRaster = Raster<u8>;

/// Single-channel distance field, normalized to `[0, 1]`.
pub type DistanceField = Raster<f32>;

/// Allocate a `size x size` distance field filled with `1.0` (the farthest encodable distance).
pub fn allocate_distance_field(size: u32, extent: GeoExtent) -> TilefieldResult<DistanceField> {
    Raster::new(size, size, extent, 1.0f32)
}

impl Raster<u8> {
    /// Build coverage from top-down RGBA8 rows (row 0 = northern edge), keeping only alpha.
    pub fn from_rgba8_top_down(
        width: u32,
        height: u32,
        rgba: &[u8],
        extent: GeoExtent,
    ) -> TilefieldResult<Self> {
        let row_bytes = (width as usize)
            .checked_mul(4)
            .ok_or_else(|| TilefieldError::invalid_argument("coverage width overflow"))?;
        let expected = row_bytes
            .checked_mul(height as usize)
            .ok_or_else(|| TilefieldError::invalid_argument("coverage size overflow"))?;
        if rgba.len() != expected {
            return Err(TilefieldError::invalid_argument(format!(
                "coverage expects {expected} RGBA8 bytes, got {}",
                rgba.len()
            )));
        }

        let mut alpha = Vec::with_capacity((width as usize) * (height as usize));
        for row in rgba.chunks_exact(row_bytes.max(4)).rev() {
            alpha.extend(row.chunks_exact(4).map(|px| px[3]));
        }
        Raster::from_vec(width, height, extent, alpha)
    }

    pub fn is_covered(&self, s: u32, t: u32) -> bool {
        self.get(s, t).is_some_and(|&a| a > 0)
    }

    pub fn covered_count(&self) -> usize {
        self.data().iter().filter(|&&a| a > 0).count()
    }
}

impl Raster<f32> {
    /// Quantize to 8-bit grayscale rows, top-down, for image export.
    pub fn to_gray8_top_down(&self) -> Vec<u8> {
        let w = self.width() as usize;
        let mut out = Vec::with_capacity(self.len());
        for row in self.data().chunks_exact(w).rev() {
            out.extend(row.iter().map(|&d| (d.clamp(0.0, 1.0) * 255.0).round() as u8));
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/coverage.rs"]
mod tests;
