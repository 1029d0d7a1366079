//! TEI point lists.

use heiv_map::{Coordinate, Geometry};

use super::error::CodecError;

/// Parse a whitespace separated list of `x,y` pairs.
pub fn parse_points(points: &str) -> Result<Vec<Coordinate>, CodecError> {
    let coords = points
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| CodecError::invalid_points(format!("'{}' is not an x,y pair", pair)))?;
            let x = x
                .trim()
                .parse::<f64>()
                .map_err(|_| CodecError::invalid_points(format!("invalid x in '{}'", pair)))?;
            let y = y
                .trim()
                .parse::<f64>()
                .map_err(|_| CodecError::invalid_points(format!("invalid y in '{}'", pair)))?;
            Ok([x, y])
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    if coords.is_empty() {
        return Err(CodecError::invalid_points("no points"));
    }
    Ok(coords)
}

/// A TEI source is one polygon, in top-down image pixels.
pub fn parse_tei(source: &str) -> Result<Geometry, CodecError> {
    Ok(Geometry::polygon(parse_points(source)?))
}
