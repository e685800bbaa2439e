use crate::foundation::core::{GeoExtent, Rgba8Premul};
use crate::foundation::error::{TilefieldError, TilefieldResult};
use crate::raster::coverage::CoverageRaster;

/// Rendered tile pixels: premultiplied RGBA8, rows top-down (row 0 is the northern edge).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl TileImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> TilefieldResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| TilefieldError::invalid_argument("tile image size overflow"))?;
        if data.len() != expected {
            return Err(TilefieldError::invalid_argument(format!(
                "tile image expects {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Alpha channel as coverage over `extent`, flipped to south-up rows.
    pub fn to_coverage(&self, extent: GeoExtent) -> TilefieldResult<CoverageRaster> {
        CoverageRaster::from_rgba8_top_down(self.width, self.height, &self.data, extent)
    }

    /// Straight-alpha copy for image encoders.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let p = Rgba8Premul {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            };
            out.extend_from_slice(&p.to_straight_rgba());
        }
        out
    }
}

/// What a finished tile job delivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileOutput {
    /// Nothing was drawn inside the job's extent; no pixels were read back.
    Empty,
    Image(TileImage),
}

impl TileOutput {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn image(&self) -> Option<&TileImage> {
        match self {
            Self::Empty => None,
            Self::Image(img) => Some(img),
        }
    }

    pub fn into_image(self) -> Option<TileImage> {
        match self {
            Self::Empty => None,
            Self::Image(img) => Some(img),
        }
    }
}

/// The single shared render target a [`TileRasterizer`](crate::TileRasterizer) drives.
///
/// A device is owned by whichever thread ticks the rasterizer. Transfer buffers and sample
/// queries are created through the device on first use and handed back on every job; the
/// device itself does not cache them.
pub trait TileDevice {
    /// Renderable payload carried by each job.
    type Content: Send + 'static;
    /// Host-visible staging buffer for asynchronous readback.
    type TransferBuffer;
    /// Counter for pixels touched by a draw.
    type SampleQuery;

    /// Fixed output size in pixels.
    fn size(&self) -> (u32, u32);

    fn supports_transfer_buffer(&self) -> bool;

    fn create_transfer_buffer(&mut self, size_bytes: u64) -> TilefieldResult<Self::TransferBuffer>;

    fn create_sample_query(&mut self) -> TilefieldResult<Self::SampleQuery>;

    fn begin_samples(&mut self, query: &mut Self::SampleQuery) -> TilefieldResult<()>;

    /// Clear the target to transparent and draw `content` projected from `extent`.
    fn draw(&mut self, content: &Self::Content, extent: &GeoExtent) -> TilefieldResult<()>;

    /// Finish counting and return how many pixels the draw touched.
    fn end_samples(&mut self, query: &mut Self::SampleQuery) -> TilefieldResult<u64>;

    /// Copy the target into `out` (top-down premultiplied RGBA8) through `buffer`.
    fn read_via_transfer(
        &mut self,
        buffer: &mut Self::TransferBuffer,
        out: &mut [u8],
    ) -> TilefieldResult<()>;

    /// Copy the target into `out` without a persistent staging buffer.
    fn read_direct(&mut self, out: &mut [u8]) -> TilefieldResult<()>;
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
