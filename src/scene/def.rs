use std::path::Path;

use crate::foundation::core::{BezPath, GeoExtent, Rgba8Premul};
use crate::foundation::error::{TilefieldError, TilefieldResult};
use crate::scene::model::{Feature, FeatureSet, Geometry, Style};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Polygon,
    Line,
}

/// One feature as written in a scene file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureDef {
    pub kind: GeometryKind,
    /// SVG path data in map units.
    pub svg_path_d: String,
    /// Straight-alpha RGBA8; white when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 4]>,
    #[serde(default = "default_stroke_width")]
    pub stroke_width_px: f64,
}

fn default_stroke_width() -> f64 {
    1.0
}

/// A scene file: a map extent and the features drawn over it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneDef {
    pub extent: GeoExtent,
    #[serde(default)]
    pub features: Vec<FeatureDef>,
}

impl SceneDef {
    pub fn from_json_str(s: &str) -> TilefieldResult<Self> {
        let scene: Self = serde_json::from_str(s)
            .map_err(|e| TilefieldError::serde(format!("scene parse failed: {e}")))?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn from_path(path: impl AsRef<Path>) -> TilefieldResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            TilefieldError::serde(format!("failed to read scene '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> TilefieldResult<()> {
        if !self.extent.is_valid() {
            return Err(TilefieldError::invalid_argument(format!(
                "scene extent is invalid: {:?}",
                self.extent
            )));
        }
        for (i, f) in self.features.iter().enumerate() {
            if f.svg_path_d.trim().is_empty() {
                return Err(TilefieldError::invalid_argument(format!(
                    "feature {i} has empty svg_path_d"
                )));
            }
            if !f.stroke_width_px.is_finite() || f.stroke_width_px <= 0.0 {
                return Err(TilefieldError::invalid_argument(format!(
                    "feature {i} stroke_width_px must be finite and > 0"
                )));
            }
        }
        Ok(())
    }

    /// Parse every feature's path into an in-memory [`FeatureSet`].
    pub fn to_feature_set(&self) -> TilefieldResult<FeatureSet> {
        let mut set = FeatureSet::new();
        for (i, def) in self.features.iter().enumerate() {
            let feature = def
                .to_feature()
                .map_err(|e| TilefieldError::invalid_argument(format!("feature {i}: {e}")))?;
            set.push(feature);
        }
        Ok(set)
    }
}

impl FeatureDef {
    pub fn to_feature(&self) -> TilefieldResult<Feature> {
        let path = parse_svg_path(&self.svg_path_d)?;
        let geometry = match self.kind {
            GeometryKind::Polygon => Geometry::Polygon(path),
            GeometryKind::Line => Geometry::LineString(path),
        };
        let color = match self.color {
            Some([r, g, b, a]) => Rgba8Premul::from_straight_rgba(r, g, b, a),
            None => Style::default().color,
        };
        Ok(Feature {
            geometry,
            style: Style {
                color,
                stroke_width_px: self.stroke_width_px,
            },
        })
    }
}

fn parse_svg_path(d: &str) -> TilefieldResult<BezPath> {
    BezPath::from_svg(d)
        .map_err(|e| TilefieldError::invalid_argument(format!("invalid svg_path_d: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/def.rs"]
mod tests;
