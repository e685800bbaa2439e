use super::*;

const SCENE: &str = r#"{
  "extent": { "x_min": 0.0, "y_min": 0.0, "x_max": 100.0, "y_max": 50.0 },
  "features": [
    { "kind": "polygon", "svg_path_d": "M10 10 L40 10 L40 40 Z", "color": [255, 0, 0, 128] },
    { "kind": "line", "svg_path_d": "M0 0 L100 50", "stroke_width_px": 2.5 }
  ]
}"#;

#[test]
fn parses_and_converts_features() {
    let scene = SceneDef::from_json_str(SCENE).unwrap();
    assert_eq!(scene.extent.width(), 100.0);
    assert_eq!(scene.features[0].stroke_width_px, 1.0);

    let set = scene.to_feature_set().unwrap();
    assert_eq!(set.len(), 2);
    let first = set.iter().next().unwrap();
    assert!(matches!(first.geometry, Geometry::Polygon(_)));
    // Premultiplied on conversion.
    assert_eq!(first.style.color, Rgba8Premul::from_straight_rgba(255, 0, 0, 128));
    assert_eq!(first.style.color.r, 128);

    let second = set.iter().nth(1).unwrap();
    assert!(matches!(second.geometry, Geometry::LineString(_)));
    assert_eq!(second.style.stroke_width_px, 2.5);
}

#[test]
fn rejects_inverted_extent() {
    let s = r#"{ "extent": { "x_min": 5.0, "y_min": 0.0, "x_max": 1.0, "y_max": 1.0 } }"#;
    let err = SceneDef::from_json_str(s).unwrap_err();
    assert!(matches!(err, TilefieldError::InvalidArgument(_)));
}

#[test]
fn rejects_bad_stroke_width() {
    let s = r#"{
      "extent": { "x_min": 0.0, "y_min": 0.0, "x_max": 1.0, "y_max": 1.0 },
      "features": [ { "kind": "line", "svg_path_d": "M0 0 L1 1", "stroke_width_px": 0.0 } ]
    }"#;
    assert!(SceneDef::from_json_str(s).is_err());
}

#[test]
fn bad_path_data_names_the_feature() {
    let scene = SceneDef {
        extent: GeoExtent::unit(),
        features: vec![FeatureDef {
            kind: GeometryKind::Polygon,
            svg_path_d: "M0 0 Q".to_string(),
            color: None,
            stroke_width_px: 1.0,
        }],
    };
    let err = scene.to_feature_set().unwrap_err().to_string();
    assert!(err.contains("feature 0"), "{err}");
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = SceneDef::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, TilefieldError::Serde(_)));
}
