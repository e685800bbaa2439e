use crate::foundation::error::{TilefieldError, TilefieldResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Axis-aligned geospatial bounding box in map units.
///
/// `y` grows northward: `y_min` is the southern edge.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoExtent {
    /// Western edge.
    pub x_min: f64,
    /// Southern edge.
    pub y_min: f64,
    /// Eastern edge.
    pub x_max: f64,
    /// Northern edge.
    pub y_max: f64,
}

impl GeoExtent {
    /// Create a validated extent with finite bounds and positive area.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> TilefieldResult<Self> {
        let e = Self {
            x_min,
            y_min,
            x_max,
            y_max,
        };
        if !e.is_valid() {
            return Err(TilefieldError::invalid_argument(format!(
                "extent must be finite with x_min < x_max and y_min < y_max, got {e:?}"
            )));
        }
        Ok(e)
    }

    /// The unit square `[0,1] x [0,1]`.
    pub fn unit() -> Self {
        Self {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 1.0,
            y_max: 1.0,
        }
    }

    /// Return `true` when all bounds are finite and the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.x_min.is_finite()
            && self.y_min.is_finite()
            && self.x_max.is_finite()
            && self.y_max.is_finite()
            && self.x_min < self.x_max
            && self.y_min < self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Return `true` when `other` lies entirely inside this extent (edges inclusive).
    pub fn contains_extent(&self, other: &GeoExtent) -> bool {
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }

    /// Split into a `cols x rows` grid, row-major from the south-west corner.
    pub fn subdivide(&self, cols: u32, rows: u32) -> Vec<GeoExtent> {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let dx = self.width() / f64::from(cols);
        let dy = self.height() / f64::from(rows);
        let mut out = Vec::with_capacity((cols as usize) * (rows as usize));
        for r in 0..rows {
            for c in 0..cols {
                out.push(GeoExtent {
                    x_min: self.x_min + dx * f64::from(c),
                    y_min: self.y_min + dy * f64::from(r),
                    x_max: self.x_min + dx * f64::from(c + 1),
                    y_max: self.y_min + dy * f64::from(r + 1),
                });
            }
        }
        out
    }

    /// Orthographic map from this extent onto a `width x height` pixel grid.
    ///
    /// `(x_min, y_max)` lands on pixel origin (top-left); `y` is flipped so rows run southward.
    pub fn to_pixel_transform(&self, width: u32, height: u32) -> Affine {
        let sx = f64::from(width) / self.width();
        let sy = f64::from(height) / self.height();
        Affine::new([sx, 0.0, 0.0, -sy, -self.x_min * sx, self.y_max * sy])
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Opaque black, the coverage color for feature rasterization.
    pub fn opaque_black() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 255,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Undo premultiplication; fully transparent maps to `[0, 0, 0, 0]`.
    pub fn to_straight_rgba(self) -> [u8; 4] {
        if self.a == 0 {
            return [0, 0, 0, 0];
        }
        let a = u16::from(self.a);
        let unpremul = |c: u8| (((u16::from(c) * 255) + a / 2) / a).min(255) as u8;
        [unpremul(self.r), unpremul(self.g), unpremul(self.b), self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
