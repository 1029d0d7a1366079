//! Axis-aligned extents in image coordinate space.

use serde::{Deserialize, Serialize};

/// A 2D coordinate `[x, y]` in image space.
///
/// Image space has its origin at the top-left corner of the image with Y
/// growing upwards, so every pixel of the image has a non-positive Y.
pub type Coordinate = [f64; 2];

/// An axis-aligned bounding box `[min_x, min_y, max_x, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The extent covered by an image of the given pixel size.
    ///
    /// The top-left corner of the image sits at `(0, 0)`.
    pub fn image(width: f64, height: f64) -> Self {
        Self::new(0.0, -height, width, 0.0)
    }

    /// An empty extent that any coordinate will extend.
    pub fn empty() -> Self {
        Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    /// Build the bounding box of a set of coordinates.
    pub fn from_coordinates<'a>(coords: impl IntoIterator<Item = &'a Coordinate>) -> Self {
        let mut extent = Self::empty();
        for c in coords {
            extent.extend(*c);
        }
        extent
    }

    /// Grow the extent so it contains `coord`.
    pub fn extend(&mut self, coord: Coordinate) {
        self.min_x = self.min_x.min(coord[0]);
        self.min_y = self.min_y.min(coord[1]);
        self.max_x = self.max_x.max(coord[0]);
        self.max_y = self.max_y.max(coord[1]);
    }

    /// Grow the extent so it contains `other`.
    pub fn merge(&mut self, other: &Extent) {
        if other.is_empty() {
            return;
        }
        self.extend([other.min_x, other.min_y]);
        self.extend([other.max_x, other.max_y]);
    }

    pub fn is_empty(&self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Coordinate {
        [
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        ]
    }

    /// Check whether a coordinate lies inside or on the border.
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord[0] >= self.min_x
            && coord[0] <= self.max_x
            && coord[1] >= self.min_y
            && coord[1] <= self.max_y
    }

    /// Check whether two extents overlap or touch.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Shrink or grow the extent around its center by `factor`.
    pub fn scaled(&self, factor: f64) -> Extent {
        let [cx, cy] = self.center();
        let hw = self.width() * factor / 2.0;
        let hh = self.height() * factor / 2.0;
        Extent::new(cx - hw, cy - hh, cx + hw, cy + hh)
    }

    /// Clamp a coordinate into the extent.
    pub fn clamp(&self, coord: Coordinate) -> Coordinate {
        [
            coord[0].clamp(self.min_x, self.max_x),
            coord[1].clamp(self.min_y, self.max_y),
        ]
    }

    /// The `[min_x, min_y, max_x, max_y]` array form.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extent_has_origin_top_left() {
        let e = Extent::image(200.0, 100.0);
        assert_eq!(e.to_array(), [0.0, -100.0, 200.0, 0.0]);
        assert_eq!(e.center(), [100.0, -50.0]);
    }

    #[test]
    fn test_from_coordinates() {
        let coords = [[1.0, 5.0], [-3.0, 2.0], [4.0, -1.0]];
        let e = Extent::from_coordinates(coords.iter());
        assert_eq!(e.to_array(), [-3.0, -1.0, 4.0, 5.0]);
    }

    #[test]
    fn test_intersects_and_contains() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(10.0, 5.0, 20.0, 20.0);
        let c = Extent::new(11.0, 11.0, 12.0, 12.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains([10.0, 0.0]));
        assert!(!a.contains([10.1, 0.0]));
    }

    #[test]
    fn test_scaled_keeps_center() {
        let e = Extent::new(0.0, 0.0, 10.0, 20.0).scaled(0.8);
        assert_eq!(e.center(), [5.0, 10.0]);
        assert!((e.width() - 8.0).abs() < 1e-9);
        assert!((e.height() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_extent() {
        let mut e = Extent::empty();
        assert!(e.is_empty());
        e.extend([2.0, 3.0]);
        assert!(!e.is_empty());
        assert_eq!(e.width(), 0.0);
    }
}
