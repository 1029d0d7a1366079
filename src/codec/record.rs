//! External annotation records, as handed to `add_layer`.

use heiv_map::Color;
use serde::{Deserialize, Serialize};

use crate::layer::DisplayPolicy;

/// A layer of annotations.
///
/// ```json
/// { "name": "zones", "type": "zone", "color": "#00f", "display": "always",
///   "features": [{ "name": "z1", "shapes": [{ "format": "tei", "source": "0,0 10,0 10,10" }] }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    #[serde(default)]
    pub name: Option<String>,
    /// Layer type (`zone`, `line`, `search`, `annotation`, `custom`, ...)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub display: Option<DisplayPolicy>,
    #[serde(default)]
    pub base_opacity: Option<f64>,
    #[serde(default)]
    pub hover_opacity: Option<f64>,
    #[serde(default)]
    pub features: Vec<FeatureRecord>,
}

impl AnnotationRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// One feature of an annotation record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    pub name: String,
    #[serde(default)]
    pub color: Option<Color>,
    /// Merge several shapes into one collection feature.
    #[serde(default)]
    pub multi_feature: bool,
    #[serde(default)]
    pub shapes: Vec<ShapeRecord>,
}

/// A shape description: `svg` markup or a `tei` point list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub format: String,
    pub source: String,
}

impl ShapeRecord {
    pub fn svg(source: impl Into<String>) -> Self {
        Self {
            format: "svg".to_string(),
            source: source.into(),
        }
    }

    pub fn tei(source: impl Into<String>) -> Self {
        Self {
            format: "tei".to_string(),
            source: source.into(),
        }
    }
}
