use crate::foundation::core::{Affine, GeoExtent};
use crate::foundation::error::{TilefieldError, TilefieldResult, soft_assert};
use crate::raster::coverage::CoverageRaster;
use crate::render::backend::TileDevice;
use crate::scene::model::{Feature, FeatureSet, Geometry};

/// How features are colored when painted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PaintMode {
    /// Each feature's own color and stroke width.
    Styled,
    /// Opaque black, 1 px strokes.
    Coverage,
}

/// Tile device backed by a `vello_cpu` pixmap.
///
/// There is no staging buffer on the CPU: readback always copies the pixmap directly, and the
/// sample count is the number of pixels with non-zero alpha after the draw.
pub struct CpuTileDevice {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
}

/// Sample query for [`CpuTileDevice`].
#[derive(Debug, Default)]
pub struct CpuSampleQuery {
    active: bool,
}

impl CpuTileDevice {
    pub fn new(width: u32, height: u32) -> TilefieldResult<Self> {
        let (width, height) = target_size_u16(width, height)?;
        Ok(Self {
            width,
            height,
            ctx: vello_cpu::RenderContext::new(width, height),
            pixmap: vello_cpu::Pixmap::new(width, height),
        })
    }
}

impl std::fmt::Debug for CpuTileDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuTileDevice")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl TileDevice for CpuTileDevice {
    type Content = FeatureSet;
    type TransferBuffer = std::convert::Infallible;
    type SampleQuery = CpuSampleQuery;

    fn size(&self) -> (u32, u32) {
        (u32::from(self.width), u32::from(self.height))
    }

    fn supports_transfer_buffer(&self) -> bool {
        false
    }

    fn create_transfer_buffer(
        &mut self,
        _size_bytes: u64,
    ) -> TilefieldResult<Self::TransferBuffer> {
        Err(TilefieldError::render("cpu tile device has no transfer buffer"))
    }

    fn create_sample_query(&mut self) -> TilefieldResult<Self::SampleQuery> {
        Ok(CpuSampleQuery::default())
    }

    fn begin_samples(&mut self, query: &mut Self::SampleQuery) -> TilefieldResult<()> {
        query.active = true;
        Ok(())
    }

    fn draw(&mut self, content: &Self::Content, extent: &GeoExtent) -> TilefieldResult<()> {
        let to_pixel = extent.to_pixel_transform(u32::from(self.width), u32::from(self.height));
        clear_pixmap(&mut self.pixmap);
        self.ctx.reset();
        paint_features(&mut self.ctx, content, to_pixel, PaintMode::Styled);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        Ok(())
    }

    fn end_samples(&mut self, query: &mut Self::SampleQuery) -> TilefieldResult<u64> {
        if !std::mem::take(&mut query.active) {
            return Err(TilefieldError::render(
                "end_samples called without begin_samples",
            ));
        }
        let touched = self
            .pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .filter(|px| px[3] > 0)
            .count();
        Ok(touched as u64)
    }

    fn read_via_transfer(
        &mut self,
        buffer: &mut Self::TransferBuffer,
        _out: &mut [u8],
    ) -> TilefieldResult<()> {
        match *buffer {}
    }

    fn read_direct(&mut self, out: &mut [u8]) -> TilefieldResult<()> {
        let src = self.pixmap.data_as_u8_slice();
        if out.len() != src.len() {
            return Err(TilefieldError::render(format!(
                "readback expects {} bytes, got {}",
                src.len(),
                out.len()
            )));
        }
        out.copy_from_slice(src);
        Ok(())
    }
}

/// Rasterize `features` into a `resolution x resolution` coverage raster over `extent`.
///
/// Polygons are filled and line strings stroked at 1 px, all fully opaque, on a transparent
/// background.
pub fn rasterize_coverage(
    features: &FeatureSet,
    resolution: u32,
    extent: GeoExtent,
) -> TilefieldResult<CoverageRaster> {
    soft_assert(extent.is_valid(), "rasterize_coverage", "extent must be valid")?;
    let (w, h) = target_size_u16(resolution, resolution)?;

    let mut ctx = vello_cpu::RenderContext::new(w, h);
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    clear_pixmap(&mut pixmap);
    paint_features(
        &mut ctx,
        features,
        extent.to_pixel_transform(resolution, resolution),
        PaintMode::Coverage,
    );
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);

    CoverageRaster::from_rgba8_top_down(resolution, resolution, pixmap.data_as_u8_slice(), extent)
}

fn target_size_u16(width: u32, height: u32) -> TilefieldResult<(u16, u16)> {
    soft_assert(
        width > 0 && height > 0,
        "cpu render target",
        "dimensions must be > 0",
    )?;
    let w: u16 = width
        .try_into()
        .map_err(|_| TilefieldError::invalid_argument("render target width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| TilefieldError::invalid_argument("render target height exceeds u16"))?;
    Ok((w, h))
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

/// Encode every feature into `ctx`, with geometry pre-projected by `to_pixel`.
fn paint_features(
    ctx: &mut vello_cpu::RenderContext,
    features: &FeatureSet,
    to_pixel: Affine,
    mode: PaintMode,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    for feature in features {
        paint_feature(ctx, feature, to_pixel, mode);
    }
}

fn paint_feature(
    ctx: &mut vello_cpu::RenderContext,
    feature: &Feature,
    to_pixel: Affine,
    mode: PaintMode,
) {
    let [r, g, b, a] = match mode {
        PaintMode::Styled => feature.style.color.to_straight_rgba(),
        PaintMode::Coverage => [0, 0, 0, 255],
    };
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));

    let mut projected = feature.geometry.path().clone();
    projected.apply_affine(to_pixel);
    let path = bezpath_to_cpu(&projected);
    match &feature.geometry {
        Geometry::Polygon(_) => ctx.fill_path(&path),
        Geometry::LineString(_) => {
            let width = match mode {
                PaintMode::Styled => feature.style.stroke_width_px,
                PaintMode::Coverage => 1.0,
            };
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
            ctx.stroke_path(&path);
        }
    }
}

fn point_to_cpu(p: crate::foundation::core::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &crate::foundation::core::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
