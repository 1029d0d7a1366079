//! Features to SVG markup.

use std::io::Write;

use heiv_map::Geometry;
use heiv_map::geometry::distinct_len;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use super::error::CodecError;
use crate::feature::{Feature, ShapeKind};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Serialize features into one `<svg>` document.
///
/// Y is negated back to the top-down SVG convention and every number is
/// written with `decimals` fixed decimal places. Returns an empty string
/// when no feature produced a primitive.
pub fn features_to_svg<'a>(
    features: impl IntoIterator<Item = &'a Feature>,
    image_width: f64,
    decimals: usize,
) -> Result<String, CodecError> {
    let mut writer = Writer::new(Vec::new());
    let width = image_width.to_string();
    let root = BytesStart::new("svg").with_attributes([
        ("xmlns", SVG_NAMESPACE),
        ("version", "1.1"),
        ("width", width.as_str()),
    ]);
    writer
        .write_event(Event::Start(root))
        .map_err(|e| CodecError::Xml(e.into()))?;

    let exporter = Exporter { decimals };
    let mut written = 0;
    for feature in features {
        written += exporter.write_shape(&mut writer, &feature.geometry, feature.kind, &feature.sub_kinds)?;
    }
    if written == 0 {
        return Ok(String::new());
    }

    writer
        .write_event(Event::End(BytesEnd::new("svg")))
        .map_err(|e| CodecError::Xml(e.into()))?;

    String::from_utf8(writer.into_inner())
        .map_err(|_| CodecError::invalid_format("Invalid UTF-8 in SVG"))
}

/// Format a number with a fixed count of decimals. Negative zero is
/// written without its sign.
pub fn format_number(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    match s.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => s,
    }
}

struct Exporter {
    decimals: usize,
}

impl Exporter {
    fn num(&self, value: f64) -> String {
        format_number(value, self.decimals)
    }

    /// Write the primitives of one shape, returning how many were written.
    fn write_shape<W: Write>(
        &self,
        writer: &mut Writer<W>,
        geometry: &Geometry,
        kind: ShapeKind,
        sub_kinds: &[ShapeKind],
    ) -> Result<usize, CodecError> {
        match (kind, geometry) {
            (_, Geometry::Collection { geometries }) => {
                let mut written = 0;
                for (i, sub) in geometries.iter().enumerate() {
                    let sub_kind = sub_kinds
                        .get(i)
                        .copied()
                        .unwrap_or_else(|| ShapeKind::infer(sub));
                    written += self.write_shape(writer, sub, sub_kind, &[])?;
                }
                Ok(written)
            }
            (ShapeKind::Rect, Geometry::Polygon { ring }) if is_axis_aligned(ring) => {
                let extent = geometry.extent();
                self.element(
                    writer,
                    "rect",
                    &[
                        ("x", self.num(extent.min_x)),
                        ("y", self.num(-extent.max_y)),
                        ("width", self.num(extent.width())),
                        ("height", self.num(extent.height())),
                    ],
                )
            }
            (ShapeKind::Ellipse, Geometry::Polygon { ring }) if !ring.is_empty() => {
                let points = &ring[..distinct_len(ring)];
                let n = points.len() as f64;
                let cx = points.iter().map(|p| p[0]).sum::<f64>() / n;
                let cy = points.iter().map(|p| p[1]).sum::<f64>() / n;
                let rx = points.iter().map(|p| (p[0] - cx).abs()).fold(0.0, f64::max);
                let ry = points.iter().map(|p| (p[1] - cy).abs()).fold(0.0, f64::max);
                self.element(
                    writer,
                    "ellipse",
                    &[
                        ("cx", self.num(cx)),
                        ("cy", self.num(-cy)),
                        ("rx", self.num(rx)),
                        ("ry", self.num(ry)),
                    ],
                )
            }
            (_, Geometry::Polygon { ring }) if !ring.is_empty() => {
                self.element(writer, "polygon", &[("points", self.points(ring))])
            }
            (_, Geometry::LineString { coordinates }) if coordinates.len() == 2 => {
                let [a, b] = [coordinates[0], coordinates[1]];
                self.element(
                    writer,
                    "line",
                    &[
                        ("x1", self.num(a[0])),
                        ("y1", self.num(-a[1])),
                        ("x2", self.num(b[0])),
                        ("y2", self.num(-b[1])),
                    ],
                )
            }
            (_, Geometry::LineString { coordinates }) if !coordinates.is_empty() => {
                self.element(writer, "polyline", &[("points", self.points(coordinates))])
            }
            (_, Geometry::Circle { center, radius }) => self.element(
                writer,
                "circle",
                &[
                    ("cx", self.num(center[0])),
                    ("cy", self.num(-center[1])),
                    ("r", self.num(*radius)),
                ],
            ),
            _ => {
                log::warn!("Skipping empty {} geometry on export", kind.name());
                Ok(0)
            }
        }
    }

    fn points(&self, coords: &[[f64; 2]]) -> String {
        coords
            .iter()
            .map(|c| format!("{},{}", self.num(c[0]), self.num(-c[1])))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn element<W: Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        attrs: &[(&str, String)],
    ) -> Result<usize, CodecError> {
        let element = BytesStart::new(name)
            .with_attributes(attrs.iter().map(|(k, v)| (*k, v.as_str())));
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| CodecError::Xml(e.into()))?;
        Ok(1)
    }
}

/// Check whether a ring is an axis-aligned rectangle: four distinct
/// corners, every edge horizontal or vertical.
fn is_axis_aligned(ring: &[[f64; 2]]) -> bool {
    let n = distinct_len(ring);
    if n != 4 {
        return false;
    }
    (0..n).all(|i| {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        a[0] == b[0] || a[1] == b[1]
    })
}
