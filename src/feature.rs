//! Identified vector shapes placed on the image.

use heiv_map::{Color, Geometry};
use serde::{Deserialize, Serialize};

/// The annotation primitive a feature was created from, used to pick the
/// SVG element on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Polygon,
    Circle,
    Ellipse,
    Line,
    Collection,
}

impl ShapeKind {
    /// Map an SVG element name to a shape kind. `polyline` is a line.
    pub fn from_svg_element(name: &str) -> Option<Self> {
        match name {
            "rect" => Some(ShapeKind::Rect),
            "polygon" => Some(ShapeKind::Polygon),
            "circle" => Some(ShapeKind::Circle),
            "ellipse" => Some(ShapeKind::Ellipse),
            "line" | "polyline" => Some(ShapeKind::Line),
            _ => None,
        }
    }

    /// The kind a bare geometry exports as when nothing else is known.
    pub fn infer(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Polygon { .. } => ShapeKind::Polygon,
            Geometry::LineString { .. } => ShapeKind::Line,
            Geometry::Circle { .. } => ShapeKind::Circle,
            Geometry::Collection { .. } => ShapeKind::Collection,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Line => "line",
            ShapeKind::Collection => "collection",
        }
    }
}

/// A vector shape with its metadata.
///
/// The layer name is a back-reference only; the [`Layer`](crate::layer::Layer)
/// owns the feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
    pub kind: ShapeKind,
    /// Kinds of the collection members, in order. Empty for other kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_kinds: Vec<ShapeKind>,
    pub color: Color,
    pub layer_name: String,
    /// The `type` of the annotation record the feature came from.
    #[serde(default)]
    pub layer_kind: String,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Geometry, kind: ShapeKind, color: Color) -> Self {
        Self {
            id: id.into(),
            geometry,
            kind,
            sub_kinds: Vec::new(),
            color,
            layer_name: String::new(),
            layer_kind: String::new(),
        }
    }

    pub fn with_layer(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.layer_name = name.into();
        self.layer_kind = kind.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_element_names() {
        assert_eq!(ShapeKind::from_svg_element("polyline"), Some(ShapeKind::Line));
        assert_eq!(ShapeKind::from_svg_element("rect"), Some(ShapeKind::Rect));
        assert_eq!(ShapeKind::from_svg_element("path"), None);
    }

    #[test]
    fn test_feature_serializes_camel_case() {
        let f = Feature::new("a", Geometry::circle([0.0, 0.0], 1.0), ShapeKind::Circle, Color::RED)
            .with_layer("zones", "zone");
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["layerName"], "zones");
        assert_eq!(json["kind"], "circle");
        assert_eq!(json["color"], "#ff0000");
        assert!(json.get("subKinds").is_none());
    }
}
