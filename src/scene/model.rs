use kurbo::Shape;

use crate::foundation::core::{BezPath, Rect, Rgba8Premul};

/// Vector geometry in map units.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// Closed ring(s), filled with the non-zero rule.
    Polygon(BezPath),
    /// Open polyline or curve, stroked.
    LineString(BezPath),
}

impl Geometry {
    pub fn path(&self) -> &BezPath {
        match self {
            Self::Polygon(p) | Self::LineString(p) => p,
        }
    }

    /// Bounding box in map units, `None` for an empty path.
    pub fn bounds(&self) -> Option<Rect> {
        let path = self.path();
        if path.elements().is_empty() {
            return None;
        }
        Some(path.bounding_box())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub color: Rgba8Premul,
    /// Stroke width for line strings, in output pixels.
    pub stroke_width_px: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Rgba8Premul::from_straight_rgba(255, 255, 255, 255),
            stroke_width_px: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub style: Style,
}

impl Feature {
    pub fn polygon(path: BezPath) -> Self {
        Self {
            geometry: Geometry::Polygon(path),
            style: Style::default(),
        }
    }

    pub fn line_string(path: BezPath) -> Self {
        Self {
            geometry: Geometry::LineString(path),
            style: Style::default(),
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

/// Ordered collection of features; later features draw on top.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Union of all feature bounds, `None` when no feature has geometry.
    pub fn bounds(&self) -> Option<Rect> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounds())
            .reduce(|a, b| a.union(b))
    }
}

impl From<Vec<Feature>> for FeatureSet {
    fn from(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
