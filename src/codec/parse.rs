//! Annotation records to features.

use heiv_map::{Color, Geometry};

use super::record::{AnnotationRecord, FeatureRecord};
use super::svg::parse_svg;
use super::tei::parse_tei;
use crate::constants::DEFAULT_FEATURE_COLOR;
use crate::feature::{Feature, ShapeKind};

/// Convert an annotation record into features in image space.
///
/// SVG shapes are scaled to `target_width`. Malformed shapes are skipped
/// with a warning; a feature descriptor that yields no geometry at all is
/// dropped and logged as an error.
pub fn parse_annotation(record: &AnnotationRecord, target_width: f64) -> Vec<Feature> {
    let layer_name = record.name.clone().unwrap_or_default();
    let layer_kind = record.kind.clone().unwrap_or_default();
    let default_color = record.color.unwrap_or(DEFAULT_FEATURE_COLOR);

    let mut features = Vec::new();
    for descriptor in &record.features {
        let color = descriptor.color.unwrap_or(default_color);
        for mut feature in create_features(descriptor, target_width, color) {
            feature.geometry.invert_y();
            features.push(feature.with_layer(layer_name.as_str(), layer_kind.as_str()));
        }
    }
    log::debug!(
        "Parsed {} feature(s) for layer '{}'",
        features.len(),
        layer_name
    );
    features
}

fn create_features(descriptor: &FeatureRecord, target_width: f64, color: Color) -> Vec<Feature> {
    let mut parts: Vec<(Geometry, ShapeKind)> = Vec::new();
    for shape in &descriptor.shapes {
        match shape.format.as_str() {
            "svg" => match parse_svg(&shape.source, target_width) {
                Ok(shapes) => parts.extend(shapes),
                Err(e) => log::warn!("Invalid svg shape in feature '{}': {}", descriptor.name, e),
            },
            "tei" => match parse_tei(&shape.source) {
                Ok(geometry) => parts.push((geometry, ShapeKind::Polygon)),
                Err(e) => log::warn!("Invalid tei shape in feature '{}': {}", descriptor.name, e),
            },
            other => log::warn!(
                "You are using an invalid format for your features to be drawn on canvas: \"{}\"",
                other
            ),
        }
    }

    match parts.len() {
        0 => {
            log::error!(
                "Feature '{}' has no geometry and is skipped",
                descriptor.name
            );
            Vec::new()
        }
        1 => {
            let (geometry, kind) = parts.remove(0);
            vec![Feature::new(descriptor.name.as_str(), geometry, kind, color)]
        }
        _ if descriptor.multi_feature => {
            let (geometries, sub_kinds): (Vec<_>, Vec<_>) = parts.into_iter().unzip();
            let mut feature = Feature::new(
                descriptor.name.as_str(),
                Geometry::collection(geometries),
                ShapeKind::Collection,
                color,
            );
            feature.sub_kinds = sub_kinds;
            vec![feature]
        }
        _ => parts
            .into_iter()
            .enumerate()
            .map(|(i, (geometry, kind))| {
                Feature::new(format!("{}_{}", descriptor.name, i), geometry, kind, color)
            })
            .collect(),
    }
}
