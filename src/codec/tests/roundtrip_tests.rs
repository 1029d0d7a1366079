//! Round-trip tests: SVG annotation -> features -> SVG.

use crate::codec::{AnnotationRecord, FeatureRecord, ShapeRecord, features_to_svg, parse_annotation};

fn roundtrip(primitives: &str, width: f64, decimals: usize) -> String {
    let record = AnnotationRecord {
        name: Some("layer".to_string()),
        features: vec![FeatureRecord {
            name: "f".to_string(),
            multi_feature: true,
            shapes: vec![ShapeRecord::svg(format!(
                r#"<svg width="{}">{}</svg>"#,
                width, primitives
            ))],
            ..FeatureRecord::default()
        }],
        ..AnnotationRecord::default()
    };
    let features = parse_annotation(&record, width);
    features_to_svg(&features, width, decimals).unwrap()
}

#[test]
fn test_each_primitive_survives_roundtrip() {
    let cases = [
        r#"<rect x="10" y="15" width="20" height="10""#,
        r#"<polygon points="0,0 10,0 10,10""#,
        r#"<line x1="1" y1="2" x2="30" y2="40""#,
        r#"<polyline points="0,0 5,5 10,0""#,
        r#"<circle cx="50" cy="60" r="7""#,
        r#"<ellipse cx="40" cy="30" rx="8" ry="3""#,
    ];
    for case in cases {
        let svg = roundtrip(&format!("{}/>", case), 100.0, 0);
        assert!(svg.contains(case), "expected {} in {}", case, svg);
    }
}

#[test]
fn test_collection_roundtrip_keeps_order() {
    let svg = roundtrip(
        r#"<circle cx="5" cy="5" r="2"/><rect x="0" y="0" width="4" height="4"/>"#,
        10.0,
        0,
    );
    let circle = svg.find("<circle").unwrap();
    let rect = svg.find("<rect").unwrap();
    assert!(circle < rect);
}

#[test]
fn test_roundtrip_respects_precision() {
    let svg = roundtrip(r#"<circle cx="1.23456" cy="2.5" r="0.125"/>"#, 10.0, 3);
    assert!(svg.contains(r#"<circle cx="1.235" cy="2.500" r="0.125""#));
}

#[test]
fn test_scaled_roundtrip_uses_image_width() {
    let record = AnnotationRecord {
        features: vec![FeatureRecord {
            name: "r".to_string(),
            shapes: vec![ShapeRecord::svg(
                r#"<svg width="100"><rect x="10" y="10" width="20" height="10"/></svg>"#,
            )],
            ..FeatureRecord::default()
        }],
        ..AnnotationRecord::default()
    };
    let features = parse_annotation(&record, 200.0);
    let svg = features_to_svg(&features, 200.0, 0).unwrap();
    assert!(svg.contains(r#"width="200""#));
    assert!(svg.contains(r#"<rect x="20" y="20" width="40" height="20""#));
}

#[test]
fn test_y_inversion_is_self_inverse_on_features() {
    let record = AnnotationRecord {
        features: vec![FeatureRecord {
            name: "t".to_string(),
            shapes: vec![ShapeRecord::tei("3.5,7.25 10,2 4,9")],
            ..FeatureRecord::default()
        }],
        ..AnnotationRecord::default()
    };
    let original = parse_annotation(&record, 1.0).remove(0).geometry;
    let mut g = original.clone();
    g.invert_y();
    g.invert_y();
    assert_eq!(g, original);
}
