//! SVG markup to geometry.
//!
//! Only the direct children of the `<svg>` root are read. Coordinates stay
//! in the top-down SVG convention; Y inversion happens in the caller.

use std::collections::HashMap;

use heiv_map::Geometry;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::error::CodecError;
use super::tei::parse_points;
use crate::constants::ELLIPSE_SEGMENTS;
use crate::feature::ShapeKind;

/// Parse SVG markup into geometries, scaled by `target_width / svg width`
/// around the origin.
///
/// Unknown or malformed primitives are skipped with a warning.
pub fn parse_svg(source: &str, target_width: f64) -> Result<Vec<(Geometry, ShapeKind)>, CodecError> {
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);

    let mut depth = 0usize;
    let mut scale: Option<f64> = None;
    let mut shapes = Vec::new();

    loop {
        let (element, is_empty) = match reader.read_event()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        match depth {
            0 => {
                if local_name(&element) != "svg" {
                    return Err(CodecError::MissingSvgRoot);
                }
                scale = Some(scale_factor(&element, target_width)?);
            }
            1 => {
                let factor = scale.unwrap_or(1.0);
                match primitive(&element) {
                    Ok(Some((mut geometry, kind))) => {
                        geometry.scale(factor, factor, Some([0.0, 0.0]));
                        shapes.push((geometry, kind));
                    }
                    Ok(None) => log::warn!("Unknown svg primitive <{}>", local_name(&element)),
                    Err(e) => log::warn!("Skipping svg primitive <{}>: {}", local_name(&element), e),
                }
            }
            _ => {}
        }

        if !is_empty {
            depth += 1;
        }
    }

    if scale.is_none() {
        return Err(CodecError::MissingSvgRoot);
    }
    Ok(shapes)
}

fn scale_factor(root: &BytesStart<'_>, target_width: f64) -> Result<f64, CodecError> {
    let attrs = attributes(root)?;
    let declared = attrs.get("width").and_then(|w| parse_length(w));
    match declared {
        Some(width) if width > 0.0 => Ok(target_width / width),
        _ => {
            log::warn!("SVG root has no usable width, shapes are not scaled");
            Ok(1.0)
        }
    }
}

fn primitive(element: &BytesStart<'_>) -> Result<Option<(Geometry, ShapeKind)>, CodecError> {
    let name = local_name(element);
    let Some(kind) = ShapeKind::from_svg_element(&name) else {
        return Ok(None);
    };
    let attrs = attributes(element)?;
    let num = |key: &str| number(&attrs, key);

    let geometry = match name.as_str() {
        "rect" => {
            let (x, y, w, h) = (num("x")?, num("y")?, num("width")?, num("height")?);
            Geometry::polygon(vec![[x, y], [x, y + h], [x + w, y + h], [x + w, y], [x, y]])
        }
        "polygon" => Geometry::polygon(parse_points(points(&attrs))?),
        "polyline" => Geometry::line_string(parse_points(points(&attrs))?),
        "line" => Geometry::line_string(vec![[num("x1")?, num("y1")?], [num("x2")?, num("y2")?]]),
        "circle" => Geometry::circle([num("cx")?, num("cy")?], num("r")?),
        "ellipse" => Geometry::ellipse_polygon(
            [num("cx")?, num("cy")?],
            num("rx")?,
            num("ry")?,
            ELLIPSE_SEGMENTS,
        ),
        _ => return Ok(None),
    };
    Ok(Some((geometry, kind)))
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, CodecError> {
    let mut map = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| CodecError::Xml(e.into()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn points(attrs: &HashMap<String, String>) -> &str {
    attrs.get("points").map(String::as_str).unwrap_or_default()
}

/// A missing attribute reads as 0.
fn number(attrs: &HashMap<String, String>, key: &str) -> Result<f64, CodecError> {
    match attrs.get(key) {
        None => Ok(0.0),
        Some(raw) => parse_length(raw).ok_or_else(|| CodecError::invalid_number(key, raw)),
    }
}

/// Parse a plain or `px` suffixed number.
fn parse_length(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix("px").unwrap_or(trimmed);
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
