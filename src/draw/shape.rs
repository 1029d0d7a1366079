//! Shapes the draw tool can produce.

use serde::{Deserialize, Serialize};

use crate::feature::ShapeKind;

/// A drawable shape kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawShape {
    Rectangle,
    Polygon,
    Circle,
    Ellipse,
    Line,
}

impl DrawShape {
    pub const ALL: [DrawShape; 5] = [
        DrawShape::Rectangle,
        DrawShape::Polygon,
        DrawShape::Circle,
        DrawShape::Ellipse,
        DrawShape::Line,
    ];

    /// Name used in drawn feature ids and as the feature type.
    pub fn short_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            DrawShape::Rectangle => ShapeKind::Rect,
            DrawShape::Polygon => ShapeKind::Polygon,
            DrawShape::Circle => ShapeKind::Circle,
            DrawShape::Ellipse => ShapeKind::Ellipse,
            DrawShape::Line => ShapeKind::Line,
        }
    }

    /// Accepts both the control name (`Rectangle`) and the short name (`rect`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shape| {
            shape.short_name().eq_ignore_ascii_case(name) || format!("{:?}", shape) == name
        })
    }

    /// Two-click shapes finish on their second point.
    pub fn is_two_point(&self) -> bool {
        matches!(
            self,
            DrawShape::Rectangle | DrawShape::Circle | DrawShape::Ellipse
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(DrawShape::Rectangle.short_name(), "rect");
        assert_eq!(DrawShape::from_name("rect"), Some(DrawShape::Rectangle));
        assert_eq!(DrawShape::from_name("Rectangle"), Some(DrawShape::Rectangle));
        assert_eq!(DrawShape::from_name("Ellipse"), Some(DrawShape::Ellipse));
        assert_eq!(DrawShape::from_name("star"), None);
    }
}
