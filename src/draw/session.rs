//! An in-progress drawing gesture.
//!
//! Points are added by clicks in image coordinates. Two-point shapes
//! (rectangle, circle, ellipse) finish on the second click. Polygons finish
//! when the first vertex is clicked again or [`DrawSession::finish`] is
//! called; lines only finish explicitly.

use heiv_map::{Coordinate, Geometry};

use super::shape::DrawShape;
use crate::constants::ELLIPSE_SEGMENTS;

#[derive(Debug, Clone, PartialEq)]
pub struct DrawSession {
    shape: DrawShape,
    points: Vec<Coordinate>,
    cursor: Option<Coordinate>,
}

impl DrawSession {
    pub fn new(shape: DrawShape) -> Self {
        Self {
            shape,
            points: Vec::new(),
            cursor: None,
        }
    }

    pub fn shape(&self) -> DrawShape {
        self.shape
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn is_started(&self) -> bool {
        !self.points.is_empty()
    }

    /// Add a point. `snap` is the distance, in image units, within which a
    /// click on the first polygon vertex closes the ring. Returns the
    /// finished geometry when the click completed the shape.
    pub fn add_point(&mut self, coord: Coordinate, snap: f64) -> Option<Geometry> {
        match self.shape {
            shape if shape.is_two_point() => {
                let Some(&first) = self.points.first() else {
                    self.points.push(coord);
                    return None;
                };
                if first == coord {
                    return None;
                }
                self.points.clear();
                self.cursor = None;
                Some(two_point_geometry(shape, first, coord))
            }
            DrawShape::Polygon => {
                if self.points.len() >= 3 && distance(self.points[0], coord) <= snap {
                    return self.finish();
                }
                self.points.push(coord);
                None
            }
            _ => {
                if self.points.last() != Some(&coord) {
                    self.points.push(coord);
                }
                None
            }
        }
    }

    pub fn move_cursor(&mut self, coord: Coordinate) {
        self.cursor = Some(coord);
    }

    /// The geometry that would result from the current points plus the
    /// cursor, for previewing.
    pub fn sketch(&self) -> Option<Geometry> {
        let cursor = self.cursor?;
        match self.shape {
            shape if shape.is_two_point() => {
                let first = *self.points.first()?;
                Some(two_point_geometry(shape, first, cursor))
            }
            DrawShape::Polygon => {
                let mut ring = self.points.clone();
                ring.push(cursor);
                ring.push(*ring.first()?);
                Some(Geometry::polygon(ring))
            }
            _ => {
                let mut coordinates = self.points.clone();
                coordinates.push(cursor);
                Some(Geometry::line_string(coordinates))
            }
        }
    }

    /// Complete a polygon or line from the points so far. Returns `None`
    /// and keeps the points when there are too few.
    pub fn finish(&mut self) -> Option<Geometry> {
        let geometry = match self.shape {
            DrawShape::Polygon if self.points.len() >= 3 => {
                let mut ring = std::mem::take(&mut self.points);
                ring.push(ring[0]);
                Geometry::polygon(ring)
            }
            DrawShape::Line if self.points.len() >= 2 => {
                Geometry::line_string(std::mem::take(&mut self.points))
            }
            _ => return None,
        };
        self.cursor = None;
        Some(geometry)
    }

    /// Drop the unfinished gesture.
    pub fn abort(&mut self) {
        if self.is_started() {
            log::debug!("Aborted {:?} drawing", self.shape);
        }
        self.points.clear();
        self.cursor = None;
    }
}

fn distance(a: Coordinate, b: Coordinate) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

fn two_point_geometry(shape: DrawShape, first: Coordinate, second: Coordinate) -> Geometry {
    match shape {
        DrawShape::Circle => Geometry::circle(first, distance(first, second)),
        DrawShape::Ellipse => Geometry::ellipse_polygon(
            first,
            (first[0] - second[0]).abs(),
            (first[1] - second[1]).abs(),
            ELLIPSE_SEGMENTS,
        ),
        _ => {
            let (min_x, max_x) = (first[0].min(second[0]), first[0].max(second[0]));
            let (min_y, max_y) = (first[1].min(second[1]), first[1].max(second[1]));
            Geometry::polygon(vec![
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
                [min_x, min_y],
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_from_two_corners() {
        let mut session = DrawSession::new(DrawShape::Rectangle);
        assert_eq!(session.add_point([10.0, -5.0], 1.0), None);
        let geometry = session.add_point([2.0, -1.0], 1.0).unwrap();
        assert_eq!(geometry.extent().to_array(), [2.0, -5.0, 10.0, -1.0]);
        assert!(!session.is_started());
    }

    #[test]
    fn test_repeated_click_does_not_finish_two_point_shape() {
        let mut session = DrawSession::new(DrawShape::Circle);
        session.add_point([1.0, 1.0], 1.0);
        assert_eq!(session.add_point([1.0, 1.0], 1.0), None);
        assert_eq!(
            session.add_point([4.0, 5.0], 1.0),
            Some(Geometry::circle([1.0, 1.0], 5.0))
        );
    }

    #[test]
    fn test_ellipse_uses_axis_distances() {
        let mut session = DrawSession::new(DrawShape::Ellipse);
        session.add_point([0.0, 0.0], 1.0);
        let geometry = session.add_point([-4.0, 2.0], 1.0).unwrap();
        let extent = geometry.extent();
        assert!((extent.width() - 8.0).abs() < 1e-9);
        assert!((extent.height() - 4.0).abs() < 1e-2);
    }

    #[test]
    fn test_polygon_closes_on_first_vertex() {
        let mut session = DrawSession::new(DrawShape::Polygon);
        for p in [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]] {
            assert_eq!(session.add_point(p, 0.5), None);
        }
        let geometry = session.add_point([0.2, 0.1], 0.5).unwrap();
        assert_eq!(
            geometry,
            Geometry::polygon(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]])
        );
    }

    #[test]
    fn test_line_needs_two_points_to_finish() {
        let mut session = DrawSession::new(DrawShape::Line);
        session.add_point([0.0, 0.0], 1.0);
        assert_eq!(session.finish(), None);
        session.add_point([3.0, 3.0], 1.0);
        assert_eq!(
            session.finish(),
            Some(Geometry::line_string(vec![[0.0, 0.0], [3.0, 3.0]]))
        );
    }

    #[test]
    fn test_sketch_follows_cursor_and_abort_clears() {
        let mut session = DrawSession::new(DrawShape::Line);
        session.add_point([0.0, 0.0], 1.0);
        session.move_cursor([2.0, 2.0]);
        assert_eq!(
            session.sketch(),
            Some(Geometry::line_string(vec![[0.0, 0.0], [2.0, 2.0]]))
        );
        session.abort();
        assert!(!session.is_started());
        assert_eq!(session.sketch(), None);
    }
}
