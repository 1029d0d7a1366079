//! Vector geometry in image coordinate space.
//!
//! Geometries are plain data: the viewer owns them, edits them through the
//! methods here and pushes the result to the render backend.

use serde::{Deserialize, Serialize};

use crate::extent::{Coordinate, Extent};

/// A vector shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Geometry {
    /// A single ring. The ring may or may not repeat its first coordinate
    /// at the end; both forms are treated as closed.
    Polygon { ring: Vec<Coordinate> },
    /// An open polyline with two or more coordinates.
    LineString { coordinates: Vec<Coordinate> },
    /// A true circle.
    Circle { center: Coordinate, radius: f64 },
    /// Several geometries forming one feature.
    Collection { geometries: Vec<Geometry> },
}

/// Address of an editable vertex: the leaf geometry (collections flattened
/// in order) and the vertex index inside it. For circles index 0 is the rim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRef {
    pub leaf: usize,
    pub index: usize,
}

impl Geometry {
    pub fn polygon(ring: Vec<Coordinate>) -> Self {
        Geometry::Polygon { ring }
    }

    pub fn line_string(coordinates: Vec<Coordinate>) -> Self {
        Geometry::LineString { coordinates }
    }

    pub fn circle(center: Coordinate, radius: f64) -> Self {
        Geometry::Circle { center, radius }
    }

    pub fn collection(geometries: Vec<Geometry>) -> Self {
        Geometry::Collection { geometries }
    }

    /// Approximate a circle by a closed regular polygon with `sides` edges,
    /// starting at angle 0.
    pub fn circle_polygon(center: Coordinate, radius: f64, sides: usize) -> Self {
        Self::ellipse_polygon(center, radius, radius, sides)
    }

    /// Approximate an axis-aligned ellipse by a closed polygon with `sides`
    /// edges, starting at angle 0.
    pub fn ellipse_polygon(center: Coordinate, rx: f64, ry: f64, sides: usize) -> Self {
        let sides = sides.max(3);
        let mut ring = Vec::with_capacity(sides + 1);
        for i in 0..sides {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / sides as f64;
            ring.push([center[0] + rx * angle.cos(), center[1] + ry * angle.sin()]);
        }
        ring.push(ring[0]);
        Geometry::Polygon { ring }
    }

    /// The bounding box of the geometry.
    pub fn extent(&self) -> Extent {
        match self {
            Geometry::Polygon { ring } => Extent::from_coordinates(ring.iter()),
            Geometry::LineString { coordinates } => Extent::from_coordinates(coordinates.iter()),
            Geometry::Circle { center, radius } => Extent::new(
                center[0] - radius,
                center[1] - radius,
                center[0] + radius,
                center[1] + radius,
            ),
            Geometry::Collection { geometries } => {
                let mut extent = Extent::empty();
                for g in geometries {
                    extent.merge(&g.extent());
                }
                extent
            }
        }
    }

    /// Check whether the geometry has no coordinates at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Polygon { ring } => ring.is_empty(),
            Geometry::LineString { coordinates } => coordinates.is_empty(),
            Geometry::Circle { .. } => false,
            Geometry::Collection { geometries } => geometries.iter().all(Geometry::is_empty),
        }
    }

    /// Number of non-collection geometries, collections flattened.
    pub fn leaf_count(&self) -> usize {
        match self {
            Geometry::Collection { geometries } => geometries.iter().map(Geometry::leaf_count).sum(),
            _ => 1,
        }
    }

    /// Get a leaf geometry by flattened index.
    pub fn leaf(&self, mut index: usize) -> Option<&Geometry> {
        match self {
            Geometry::Collection { geometries } => {
                for g in geometries {
                    let n = g.leaf_count();
                    if index < n {
                        return g.leaf(index);
                    }
                    index -= n;
                }
                None
            }
            _ => (index == 0).then_some(self),
        }
    }

    fn leaf_mut(&mut self, mut index: usize) -> Option<&mut Geometry> {
        match self {
            Geometry::Collection { geometries } => {
                for g in geometries.iter_mut() {
                    let n = g.leaf_count();
                    if index < n {
                        return g.leaf_mut(index);
                    }
                    index -= n;
                }
                None
            }
            _ => {
                if index == 0 {
                    Some(self)
                } else {
                    None
                }
            }
        }
    }

    /// Apply `f` to every stored coordinate. Circles only expose their
    /// center; the radius is left untouched.
    pub fn for_each_coordinate_mut(&mut self, f: &mut impl FnMut(&mut Coordinate)) {
        match self {
            Geometry::Polygon { ring } => ring.iter_mut().for_each(|c| f(c)),
            Geometry::LineString { coordinates } => coordinates.iter_mut().for_each(|c| f(c)),
            Geometry::Circle { center, .. } => f(center),
            Geometry::Collection { geometries } => {
                for g in geometries.iter_mut() {
                    g.for_each_coordinate_mut(f);
                }
            }
        }
    }

    /// Negate every Y coordinate.
    ///
    /// Converts between top-down (SVG) and bottom-up (image space) Y. The
    /// operation is its own inverse.
    pub fn invert_y(&mut self) {
        self.for_each_coordinate_mut(&mut |c| c[1] = -c[1]);
    }

    /// Scale around `anchor`, or around the extent center when `None`.
    pub fn scale(&mut self, sx: f64, sy: f64, anchor: Option<Coordinate>) {
        let anchor = anchor.unwrap_or_else(|| self.extent().center());
        self.scale_around(sx, sy, anchor);
    }

    fn scale_around(&mut self, sx: f64, sy: f64, anchor: Coordinate) {
        match self {
            Geometry::Circle { center, radius } => {
                center[0] = anchor[0] + (center[0] - anchor[0]) * sx;
                center[1] = anchor[1] + (center[1] - anchor[1]) * sy;
                *radius *= sx.abs();
            }
            Geometry::Collection { geometries } => {
                for g in geometries.iter_mut() {
                    g.scale_around(sx, sy, anchor);
                }
            }
            _ => self.for_each_coordinate_mut(&mut |c| {
                c[0] = anchor[0] + (c[0] - anchor[0]) * sx;
                c[1] = anchor[1] + (c[1] - anchor[1]) * sy;
            }),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.for_each_coordinate_mut(&mut |c| {
            c[0] += dx;
            c[1] += dy;
        });
    }

    /// Rotate counter-clockwise by `angle` radians around `anchor`.
    pub fn rotate(&mut self, angle: f64, anchor: Coordinate) {
        let (sin, cos) = angle.sin_cos();
        self.for_each_coordinate_mut(&mut |c| {
            let dx = c[0] - anchor[0];
            let dy = c[1] - anchor[1];
            c[0] = anchor[0] + dx * cos - dy * sin;
            c[1] = anchor[1] + dx * sin + dy * cos;
        });
    }

    /// Every coordinate that bounds the geometry. Circles contribute the
    /// corners of their extent.
    pub fn flat_coordinates(&self) -> Vec<Coordinate> {
        match self {
            Geometry::Polygon { ring } => ring.clone(),
            Geometry::LineString { coordinates } => coordinates.clone(),
            Geometry::Circle { .. } => {
                let e = self.extent();
                vec![
                    [e.min_x, e.min_y],
                    [e.max_x, e.min_y],
                    [e.max_x, e.max_y],
                    [e.min_x, e.max_y],
                ]
            }
            Geometry::Collection { geometries } => {
                geometries.iter().flat_map(Geometry::flat_coordinates).collect()
            }
        }
    }

    /// Hit-test a point with a tolerance in image units.
    ///
    /// Polygons hit on their interior or near their outline, lines near
    /// any segment, circles anywhere inside the rim plus tolerance.
    pub fn hits(&self, point: Coordinate, tolerance: f64) -> bool {
        match self {
            Geometry::Polygon { ring } => {
                ring_contains(ring, point)
                    || segments(ring, true).any(|(a, b)| segment_distance(point, a, b) <= tolerance)
            }
            Geometry::LineString { coordinates } => match coordinates.as_slice() {
                [] => false,
                [only] => distance(*only, point) <= tolerance,
                _ => segments(coordinates, false)
                    .any(|(a, b)| segment_distance(point, a, b) <= tolerance),
            },
            Geometry::Circle { center, radius } => distance(*center, point) <= radius + tolerance,
            Geometry::Collection { geometries } => {
                geometries.iter().any(|g| g.hits(point, tolerance))
            }
        }
    }

    /// Find the editable vertex closest to `point` within `tolerance`.
    pub fn nearest_vertex(&self, point: Coordinate, tolerance: f64) -> Option<VertexRef> {
        let mut best: Option<(f64, VertexRef)> = None;
        let mut consider = |d: f64, vertex: VertexRef| {
            if d <= tolerance && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, vertex));
            }
        };
        for leaf in 0..self.leaf_count() {
            match self.leaf(leaf) {
                Some(Geometry::Polygon { ring }) => {
                    for (index, c) in ring[..distinct_len(ring)].iter().enumerate() {
                        consider(distance(*c, point), VertexRef { leaf, index });
                    }
                }
                Some(Geometry::LineString { coordinates }) => {
                    for (index, c) in coordinates.iter().enumerate() {
                        consider(distance(*c, point), VertexRef { leaf, index });
                    }
                }
                Some(Geometry::Circle { center, radius }) => {
                    let d = (distance(*center, point) - radius).abs();
                    consider(d, VertexRef { leaf, index: 0 });
                }
                _ => {}
            }
        }
        best.map(|(_, v)| v)
    }

    /// Move a vertex. For circles this sets the radius so the rim passes
    /// through `coord`. Returns false when the vertex does not exist.
    pub fn set_vertex(&mut self, vertex: VertexRef, coord: Coordinate) -> bool {
        match self.leaf_mut(vertex.leaf) {
            Some(Geometry::Polygon { ring }) => {
                let closed = is_closed(ring);
                if vertex.index >= distinct_len(ring) {
                    return false;
                }
                ring[vertex.index] = coord;
                if closed && vertex.index == 0 {
                    if let Some(last) = ring.last_mut() {
                        *last = coord;
                    }
                }
                true
            }
            Some(Geometry::LineString { coordinates }) => match coordinates.get_mut(vertex.index) {
                Some(c) => {
                    *c = coord;
                    true
                }
                None => false,
            },
            Some(Geometry::Circle { center, radius }) => {
                *radius = distance(*center, coord);
                true
            }
            _ => false,
        }
    }

    /// Insert a vertex on the closest edge within `tolerance`, at the point
    /// of that edge nearest to `point`. Returns the new vertex.
    pub fn insert_vertex(&mut self, point: Coordinate, tolerance: f64) -> Option<VertexRef> {
        let mut best: Option<(f64, usize, usize, Coordinate)> = None;
        for leaf in 0..self.leaf_count() {
            let (coords, closed) = match self.leaf(leaf) {
                Some(Geometry::Polygon { ring }) => (ring.as_slice(), true),
                Some(Geometry::LineString { coordinates }) => (coordinates.as_slice(), false),
                _ => continue,
            };
            for (i, (a, b)) in segments(coords, closed).enumerate() {
                let d = segment_distance(point, a, b);
                if d <= tolerance && best.is_none_or(|(bd, ..)| d < bd) {
                    best = Some((d, leaf, i + 1, closest_on_segment(point, a, b)));
                }
            }
        }
        let (_, leaf, index, at) = best?;
        match self.leaf_mut(leaf) {
            Some(Geometry::Polygon { ring }) => ring.insert(index.min(ring.len()), at),
            Some(Geometry::LineString { coordinates }) => coordinates.insert(index, at),
            _ => return None,
        }
        Some(VertexRef { leaf, index })
    }

    /// Remove a vertex, keeping polygons at three distinct vertices and
    /// lines at two.
    pub fn remove_vertex(&mut self, vertex: VertexRef) -> bool {
        match self.leaf_mut(vertex.leaf) {
            Some(Geometry::Polygon { ring }) => {
                let closed = is_closed(ring);
                let n = distinct_len(ring);
                if n <= 3 || vertex.index >= n {
                    return false;
                }
                ring.remove(vertex.index);
                if closed && vertex.index == 0 {
                    let first = ring[0];
                    if let Some(last) = ring.last_mut() {
                        *last = first;
                    }
                }
                true
            }
            Some(Geometry::LineString { coordinates }) => {
                if coordinates.len() <= 2 || vertex.index >= coordinates.len() {
                    return false;
                }
                coordinates.remove(vertex.index);
                true
            }
            _ => false,
        }
    }
}

/// Check whether a ring repeats its first coordinate at the end.
pub fn is_closed(ring: &[Coordinate]) -> bool {
    ring.len() > 1 && ring.first() == ring.last()
}

/// Number of vertices excluding a closing duplicate.
pub fn distinct_len(ring: &[Coordinate]) -> usize {
    if is_closed(ring) {
        ring.len() - 1
    } else {
        ring.len()
    }
}

fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

fn closest_on_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> Coordinate {
    let abx = b[0] - a[0];
    let aby = b[1] - a[1];
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return a;
    }
    let t = (((p[0] - a[0]) * abx + (p[1] - a[1]) * aby) / len_sq).clamp(0.0, 1.0);
    [a[0] + t * abx, a[1] + t * aby]
}

fn segment_distance(p: Coordinate, a: Coordinate, b: Coordinate) -> f64 {
    distance(p, closest_on_segment(p, a, b))
}

/// Iterate over consecutive segments. Closed rings also yield the implicit
/// closing segment when the ring does not repeat its first coordinate.
fn segments(coords: &[Coordinate], closed: bool) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
    let closing = (closed && coords.len() > 2 && !is_closed(coords))
        .then(|| (coords[coords.len() - 1], coords[0]));
    coords.windows(2).map(|w| (w[0], w[1])).chain(closing)
}

/// Ray casting point-in-polygon test.
fn ring_contains(ring: &[Coordinate], point: Coordinate) -> bool {
    let n = distinct_len(ring);
    if n < 3 {
        return false;
    }
    let [x, y] = point;
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn square() -> Geometry {
        Geometry::polygon(vec![
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [0.0, 10.0],
            [0.0, 0.0],
        ])
    }

    #[test]
    fn test_invert_y_is_self_inverse() {
        let original = Geometry::collection(vec![
            square(),
            Geometry::line_string(vec![[1.5, -2.25], [3.0, 4.0]]),
            Geometry::circle([5.0, -7.5], 2.0),
        ]);
        let mut g = original.clone();
        g.invert_y();
        assert_ne!(g, original);
        g.invert_y();
        assert_eq!(g, original);
    }

    #[test]
    fn test_scale_around_origin() {
        let mut g = square();
        g.scale(2.0, 2.0, Some([0.0, 0.0]));
        assert_eq!(g.extent().to_array(), [0.0, 0.0, 20.0, 20.0]);

        let mut c = Geometry::circle([1.0, 1.0], 3.0);
        c.scale(2.0, 2.0, Some([0.0, 0.0]));
        assert_eq!(c, Geometry::circle([2.0, 2.0], 6.0));
    }

    #[test]
    fn test_scale_defaults_to_center() {
        let mut g = square();
        g.scale(0.5, 0.5, None);
        assert_eq!(g.extent().to_array(), [2.5, 2.5, 7.5, 7.5]);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let mut g = Geometry::line_string(vec![[1.0, 0.0]]);
        g.rotate(std::f64::consts::FRAC_PI_2, [0.0, 0.0]);
        let Geometry::LineString { coordinates } = g else {
            panic!("Expected line string");
        };
        assert!(coordinates[0][0].abs() < EPSILON);
        assert!((coordinates[0][1] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_ellipse_polygon_extremes() {
        let g = Geometry::ellipse_polygon([0.0, 0.0], 4.0, 2.0, 64);
        let Geometry::Polygon { ring } = &g else {
            panic!("Expected polygon");
        };
        assert_eq!(ring.len(), 65);
        assert!(is_closed(ring));
        let e = g.extent();
        assert!((e.max_x - 4.0).abs() < EPSILON);
        assert!((e.max_y - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_polygon_hits_inside_and_outline() {
        let g = square();
        assert!(g.hits([5.0, 5.0], 0.0));
        assert!(g.hits([10.5, 5.0], 1.0));
        assert!(!g.hits([12.0, 5.0], 1.0));
    }

    #[test]
    fn test_open_ring_hits_closing_edge() {
        let g = Geometry::polygon(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]);
        assert!(g.hits([-0.5, 5.0], 1.0));
    }

    #[test]
    fn test_line_and_circle_hits() {
        let line = Geometry::line_string(vec![[0.0, 0.0], [10.0, 0.0]]);
        assert!(line.hits([5.0, 0.8], 1.0));
        assert!(!line.hits([5.0, 2.0], 1.0));

        let circle = Geometry::circle([0.0, 0.0], 5.0);
        assert!(circle.hits([3.0, 3.0], 0.0));
        assert!(circle.hits([5.5, 0.0], 1.0));
        assert!(!circle.hits([7.0, 0.0], 1.0));
    }

    #[test]
    fn test_set_first_vertex_keeps_ring_closed() {
        let mut g = square();
        let v = g.nearest_vertex([0.2, 0.1], 1.0).expect("vertex within tolerance");
        assert_eq!(v, VertexRef { leaf: 0, index: 0 });
        assert!(g.set_vertex(v, [-1.0, -1.0]));
        let Geometry::Polygon { ring } = &g else {
            panic!("Expected polygon");
        };
        assert_eq!(ring[0], [-1.0, -1.0]);
        assert_eq!(ring[4], [-1.0, -1.0]);
    }

    #[test]
    fn test_circle_rim_drag_sets_radius() {
        let mut g = Geometry::circle([0.0, 0.0], 5.0);
        let v = g.nearest_vertex([5.2, 0.0], 0.5).expect("rim within tolerance");
        assert!(g.set_vertex(v, [0.0, 8.0]));
        assert_eq!(g, Geometry::circle([0.0, 0.0], 8.0));
    }

    #[test]
    fn test_insert_and_remove_vertex() {
        let mut g = square();
        let v = g.insert_vertex([5.0, 0.3], 1.0).expect("edge within tolerance");
        assert_eq!(v, VertexRef { leaf: 0, index: 1 });
        let Geometry::Polygon { ring } = &g else {
            panic!("Expected polygon");
        };
        assert_eq!(ring[1], [5.0, 0.0]);
        assert_eq!(ring.len(), 6);

        assert!(g.remove_vertex(v));
        assert_eq!(g, square());
    }

    #[test]
    fn test_remove_vertex_keeps_triangle() {
        let mut g = Geometry::polygon(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        assert!(!g.remove_vertex(VertexRef { leaf: 0, index: 1 }));
    }

    #[test]
    fn test_collection_leaves() {
        let g = Geometry::collection(vec![
            square(),
            Geometry::collection(vec![Geometry::circle([50.0, 50.0], 1.0)]),
        ]);
        assert_eq!(g.leaf_count(), 2);
        assert_eq!(g.leaf(1), Some(&Geometry::circle([50.0, 50.0], 1.0)));
        assert_eq!(g.leaf(2), None);
        assert!(g.hits([50.0, 50.5], 0.0));
    }
}
