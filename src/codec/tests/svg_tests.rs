//! Tests for SVG primitive parsing.

use heiv_map::Geometry;

use crate::codec::{CodecError, parse_svg};
use crate::feature::ShapeKind;

const EPSILON: f64 = 1e-9;

#[test]
fn test_rect_is_scaled_to_target_width() {
    let shapes = parse_svg(
        r#"<svg width="100"><rect x="10" y="10" width="20" height="10"/></svg>"#,
        200.0,
    )
    .unwrap();

    assert_eq!(shapes.len(), 1);
    let (geometry, kind) = &shapes[0];
    assert_eq!(*kind, ShapeKind::Rect);
    assert_eq!(
        *geometry,
        Geometry::polygon(vec![
            [20.0, 20.0],
            [20.0, 40.0],
            [60.0, 40.0],
            [60.0, 20.0],
            [20.0, 20.0],
        ])
    );
}

#[test]
fn test_all_primitive_kinds() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="50px">
        <polygon points="0,0 10,0 10,10"/>
        <line x1="1" y1="2" x2="3" y2="4"/>
        <polyline points="0,0 1,1 2,0"/>
        <circle cx="5" cy="6" r="2"/>
        <ellipse cx="10" cy="10" rx="4" ry="2"/>
    </svg>"#;
    let shapes = parse_svg(svg, 50.0).unwrap();
    let kinds: Vec<_> = shapes.iter().map(|(_, k)| *k).collect();
    assert_eq!(
        kinds,
        vec![
            ShapeKind::Polygon,
            ShapeKind::Line,
            ShapeKind::Line,
            ShapeKind::Circle,
            ShapeKind::Ellipse,
        ]
    );
    assert_eq!(shapes[1].0, Geometry::line_string(vec![[1.0, 2.0], [3.0, 4.0]]));
    assert_eq!(shapes[3].0, Geometry::circle([5.0, 6.0], 2.0));
}

#[test]
fn test_ellipse_is_a_64_sided_polygon() {
    let shapes = parse_svg(
        r#"<svg width="10"><ellipse cx="5" cy="5" rx="4" ry="2"/></svg>"#,
        20.0,
    )
    .unwrap();
    let (geometry, _) = &shapes[0];
    let Geometry::Polygon { ring } = geometry else {
        panic!("Expected polygon");
    };
    assert_eq!(ring.len(), 65);
    let e = geometry.extent();
    assert!((e.min_x - 2.0).abs() < EPSILON);
    assert!((e.max_x - 18.0).abs() < EPSILON);
    assert!((e.min_y - 6.0).abs() < EPSILON);
    assert!((e.max_y - 14.0).abs() < EPSILON);
}

#[test]
fn test_unknown_primitive_is_skipped() {
    let shapes = parse_svg(
        r#"<svg width="10"><path d="M0 0 L1 1"/><circle cx="1" cy="1" r="1"/></svg>"#,
        10.0,
    )
    .unwrap();
    assert_eq!(shapes.len(), 1);
    assert_eq!(shapes[0].1, ShapeKind::Circle);
}

#[test]
fn test_nested_primitives_are_ignored() {
    let shapes = parse_svg(
        r#"<svg width="10"><g><rect x="0" y="0" width="1" height="1"/></g></svg>"#,
        10.0,
    )
    .unwrap();
    assert!(shapes.is_empty());
}

#[test]
fn test_malformed_number_skips_primitive() {
    let shapes = parse_svg(
        r#"<svg width="10"><circle cx="abc" cy="1" r="1"/><circle cx="2" cy="2" r="1"/></svg>"#,
        10.0,
    )
    .unwrap();
    assert_eq!(shapes.len(), 1);
    assert_eq!(shapes[0].0, Geometry::circle([2.0, 2.0], 1.0));
}

#[test]
fn test_missing_width_keeps_scale() {
    let shapes = parse_svg(r#"<svg><circle cx="3" cy="3" r="1"/></svg>"#, 1000.0).unwrap();
    assert_eq!(shapes[0].0, Geometry::circle([3.0, 3.0], 1.0));
}

#[test]
fn test_missing_root() {
    let result = parse_svg(r#"<g><rect/></g>"#, 10.0);
    assert!(matches!(result, Err(CodecError::MissingSvgRoot)));

    let result = parse_svg("", 10.0);
    assert!(matches!(result, Err(CodecError::MissingSvgRoot)));
}
