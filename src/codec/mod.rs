//! Shape codec: annotation records to features and features back to SVG.
//!
//! Annotation sources use top-down Y (SVG, TEI). Features live in image
//! space with bottom-up Y, so parsing negates Y after scaling and export
//! negates it again.

mod error;
mod export;
mod parse;
mod record;
mod svg;
mod tei;

#[cfg(test)]
mod tests;

pub use error::CodecError;
pub use export::{features_to_svg, format_number};
pub use parse::parse_annotation;
pub use record::{AnnotationRecord, FeatureRecord, ShapeRecord};
pub use svg::parse_svg;
pub use tei::{parse_points, parse_tei};
