use crate::field::nnf::NearestNeighborField;
use crate::foundation::error::{TilefieldResult, soft_assert};
use crate::foundation::math::unit_remap;
use crate::raster::coverage::DistanceField;

/// Physical span and normalization bounds for a resolve pass.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResolveParams {
    /// Physical length of the nearest-neighbor field's full width.
    pub span: f32,
    /// Physical distance mapped to `0.0`.
    pub lo: f32,
    /// Physical distance mapped to `1.0`.
    pub hi: f32,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            span: 1.0,
            lo: 0.0,
            hi: 1.0,
        }
    }
}

impl ResolveParams {
    pub fn validate(&self) -> TilefieldResult<()> {
        let op = "ResolveParams";
        soft_assert(self.span.is_finite(), op, "span must be finite")?;
        soft_assert(
            self.lo.is_finite() && self.hi.is_finite(),
            op,
            "lo and hi must be finite",
        )?;
        soft_assert(self.lo < self.hi, op, "lo must be < hi")
    }

    /// Shorthand for [`resolve_distance_field`] with these parameters.
    pub fn resolve(
        &self,
        nnf: &NearestNeighborField,
        target: &mut DistanceField,
    ) -> TilefieldResult<()> {
        resolve_distance_field(nnf, target, self.span, self.lo, self.hi)
    }
}

/// Write normalized distances from `nnf` into `target`, keeping the smaller value per pixel.
///
/// Each target pixel center is mapped into the field's normalized space through the two extents
/// (clamped to `[0, 1]` so partially overlapping extents are tolerated), the nearest field cell is
/// read without interpolation, and the pixel distance to its seed is scaled by
/// `span / (field_width - 1)` before remapping `[lo, hi]` onto `[0, 1]`. Cells no seed reached
/// leave the target untouched.
#[tracing::instrument(
    skip(nnf, target),
    fields(
        nnf_w = nnf.width(),
        nnf_h = nnf.height(),
        target_w = target.width(),
        target_h = target.height()
    )
)]
pub fn resolve_distance_field(
    nnf: &NearestNeighborField,
    target: &mut DistanceField,
    span: f32,
    lo: f32,
    hi: f32,
) -> TilefieldResult<()> {
    ResolveParams { span, lo, hi }.validate()?;

    let ne = *nnf.extent();
    let te = *target.extent();
    let bias_u = (te.x_min - ne.x_min) / ne.width();
    let bias_v = (te.y_min - ne.y_min) / ne.height();
    let scale_u = te.width() / ne.width();
    let scale_v = te.height() / ne.height();

    let cell_size = 1.0f32 / (nnf.width().saturating_sub(1).max(1) as f32);
    let cells = nnf.cells();

    let mut improved = 0usize;
    for c in target.centers() {
        let nu = (c.u * scale_u + bias_u).clamp(0.0, 1.0);
        let nv = (c.v * scale_v + bias_v).clamp(0.0, 1.0);
        let (ms, mt) = cells.nearest_pixel(nu, nv);
        let Some(closest) = nnf.seed_at(ms, mt) else {
            continue;
        };

        let d = closest.distance_squared_to(ms, mt).sqrt();
        let d = unit_remap(d * cell_size * span, lo, hi);
        if let Some(px) = target.get_mut(c.s, c.t)
            && d < *px
        {
            *px = d;
            improved += 1;
        }
    }

    tracing::debug!(improved, "resolved distance field");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/field/resolve.rs"]
mod tests;
