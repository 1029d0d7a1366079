//! Named groups of features sharing a display policy.

use heiv_map::{Color, Geometry, LayerHandle, RenderBackend, RenderFeature, Style};
use serde::{Deserialize, Serialize};

use crate::codec::AnnotationRecord;
use crate::constants::{
    BASE_OPACITY, BASE_STROKE_WIDTH, DEFAULT_LAYER_COLOR, HOVER_OPACITY, STRONG_STROKE_WIDTH,
};
use crate::feature::Feature;

/// When a layer's features are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayPolicy {
    /// Always painted.
    Always,
    /// Never painted, not even on hover.
    Never,
    /// Invisible until hovered or highlighted.
    #[default]
    #[serde(rename = "default")]
    HoverOnly,
}

impl DisplayPolicy {
    /// The resting style of a feature.
    pub fn base_style(&self, color: Color, opacity: f64) -> Style {
        match self {
            DisplayPolicy::Always => Style::paint(color, opacity, BASE_STROKE_WIDTH),
            DisplayPolicy::Never | DisplayPolicy::HoverOnly => Style::Hidden,
        }
    }

    /// The style of a hovered or highlighted feature.
    pub fn strong_style(&self, color: Color, opacity: f64) -> Style {
        match self {
            DisplayPolicy::Always | DisplayPolicy::HoverOnly => {
                Style::paint(color, opacity, STRONG_STROKE_WIDTH)
            }
            DisplayPolicy::Never => Style::Hidden,
        }
    }
}

/// Layer types with a fixed stacking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Zone,
    Line,
    Search,
    Annotation,
    Custom,
    Other,
}

impl LayerKind {
    pub fn parse(kind: Option<&str>) -> Self {
        match kind {
            Some("zone") => LayerKind::Zone,
            Some("line") => LayerKind::Line,
            Some("search") => LayerKind::Search,
            Some("annotation") => LayerKind::Annotation,
            Some("custom") => LayerKind::Custom,
            _ => LayerKind::Other,
        }
    }

    pub fn z_index(&self) -> i32 {
        match self {
            LayerKind::Other => 100,
            LayerKind::Zone => 101,
            LayerKind::Line => 102,
            LayerKind::Search => 103,
            LayerKind::Annotation => 104,
            LayerKind::Custom => 105,
        }
    }
}

/// A named, colored collection of features bound to one render layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    color: Color,
    display: DisplayPolicy,
    base_opacity: f64,
    hover_opacity: f64,
    features: Vec<Feature>,
    #[serde(skip)]
    handle: Option<LayerHandle>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            color: DEFAULT_LAYER_COLOR,
            display: DisplayPolicy::default(),
            base_opacity: BASE_OPACITY,
            hover_opacity: HOVER_OPACITY,
            features: Vec::new(),
            handle: None,
        }
    }

    /// Build a layer from a record's metadata and already parsed features.
    pub fn from_record(name: impl Into<String>, record: &AnnotationRecord, features: Vec<Feature>) -> Self {
        Self {
            kind: record.kind.clone(),
            color: record.color.unwrap_or(DEFAULT_LAYER_COLOR),
            display: record.display.unwrap_or_default(),
            base_opacity: record.base_opacity.unwrap_or(BASE_OPACITY),
            hover_opacity: record.hover_opacity.unwrap_or(HOVER_OPACITY),
            features,
            ..Self::new(name)
        }
    }

    pub fn with_display(mut self, display: DisplayPolicy) -> Self {
        self.display = display;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn display(&self) -> DisplayPolicy {
        self.display
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.feature(id).is_some()
    }

    pub fn handle(&self) -> Option<LayerHandle> {
        self.handle
    }

    pub fn z_index(&self) -> i32 {
        LayerKind::parse(self.kind()).z_index()
    }

    pub fn base_style(&self, feature: &Feature) -> Style {
        self.display.base_style(feature.color, self.base_opacity)
    }

    /// Strong style at the layer's hover opacity, or at `opacity` when given.
    pub fn strong_style(&self, feature: &Feature, opacity: Option<f64>) -> Style {
        self.display
            .strong_style(feature.color, opacity.unwrap_or(self.hover_opacity))
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Drop the render layer, if any, and create it again with every
    /// feature in its base style.
    pub fn render<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(handle) = self.handle.take() {
            backend.remove_layer(handle);
        }
        let styles: Vec<Style> = self.features.iter().map(|f| self.base_style(f)).collect();
        let render_features: Vec<RenderFeature<'_>> = self
            .features
            .iter()
            .zip(&styles)
            .map(|(f, style)| RenderFeature {
                id: &f.id,
                geometry: &f.geometry,
                style,
            })
            .collect();
        self.handle = Some(backend.add_vector_layer(self.z_index(), &render_features));
        log::debug!(
            "Rendered layer '{}' with {} feature(s)",
            self.name,
            self.features.len()
        );
    }

    /// Remove the render layer.
    pub fn unrender<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(handle) = self.handle.take() {
            backend.remove_layer(handle);
        }
    }

    /// Append features and re-render the whole layer.
    pub fn add_features<B: RenderBackend + ?Sized>(&mut self, features: Vec<Feature>, backend: &mut B) {
        self.features.extend(features);
        self.render(backend);
    }

    /// Add a single feature to the live render layer with an explicit style.
    pub fn insert_feature<B: RenderBackend + ?Sized>(&mut self, feature: Feature, style: &Style, backend: &mut B) {
        if let Some(handle) = self.handle {
            backend.add_feature(
                handle,
                &RenderFeature {
                    id: &feature.id,
                    geometry: &feature.geometry,
                    style,
                },
            );
        }
        self.features.push(feature);
    }

    /// Remove a feature from the layer and its render source.
    pub fn delete_feature<B: RenderBackend + ?Sized>(&mut self, id: &str, backend: &mut B) -> Option<Feature> {
        let Some(index) = self.features.iter().position(|f| f.id == id) else {
            log::warn!("No feature '{}' in layer '{}'", id, self.name);
            return None;
        };
        if let Some(handle) = self.handle {
            backend.remove_feature(handle, id);
        }
        Some(self.features.remove(index))
    }

    /// Change the layer color and repaint every feature with it.
    pub fn set_color<B: RenderBackend + ?Sized>(&mut self, color: Color, backend: &mut B) {
        self.color = color;
        for feature in &mut self.features {
            feature.color = color;
        }
        self.restyle_all(backend);
    }

    /// Change the display policy and restyle every feature.
    pub fn set_display<B: RenderBackend + ?Sized>(&mut self, display: DisplayPolicy, backend: &mut B) {
        self.display = display;
        self.restyle_all(backend);
    }

    /// Change one feature's color and reset it to its base style.
    pub fn set_feature_color<B: RenderBackend + ?Sized>(&mut self, id: &str, color: Color, backend: &mut B) -> bool {
        let Some(feature) = self.features.iter_mut().find(|f| f.id == id) else {
            return false;
        };
        feature.color = color;
        let style = self.display.base_style(color, self.base_opacity);
        self.apply_style(id, &style, backend);
        true
    }

    /// Replace a feature's geometry.
    pub fn set_feature_geometry<B: RenderBackend + ?Sized>(&mut self, id: &str, geometry: Geometry, backend: &mut B) {
        if let Some(handle) = self.handle {
            backend.set_feature_geometry(handle, id, &geometry);
        }
        if let Some(feature) = self.features.iter_mut().find(|f| f.id == id) {
            feature.geometry = geometry;
        }
    }

    pub fn apply_style<B: RenderBackend + ?Sized>(&self, id: &str, style: &Style, backend: &mut B) {
        if let Some(handle) = self.handle {
            backend.set_feature_style(handle, id, style);
        }
    }

    fn restyle_all<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        for feature in &self.features {
            self.apply_style(&feature.id, &self.base_style(feature), backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::ShapeKind;
    use heiv_map::{RecordingBackend, Size};

    fn feature(id: &str) -> Feature {
        Feature::new(
            id,
            Geometry::circle([0.0, 0.0], 1.0),
            ShapeKind::Circle,
            Color::rgb(0, 0, 255),
        )
    }

    #[test]
    fn test_style_matrix() {
        let c = Color::RED;
        let cases = [
            (DisplayPolicy::Always, true, true),
            (DisplayPolicy::HoverOnly, false, true),
            (DisplayPolicy::Never, false, false),
        ];
        for (policy, base_visible, strong_visible) in cases {
            assert_eq!(policy.base_style(c, 0.0).is_visible(), base_visible, "{:?} base", policy);
            assert_eq!(policy.strong_style(c, 0.1).is_visible(), strong_visible, "{:?} strong", policy);
        }
    }

    #[test]
    fn test_display_policy_serde_names() {
        let p: DisplayPolicy = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(p, DisplayPolicy::HoverOnly);
        let p: DisplayPolicy = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(p, DisplayPolicy::Always);
        assert_eq!(serde_json::to_string(&DisplayPolicy::Never).unwrap(), "\"never\"");
    }

    #[test]
    fn test_z_index_by_kind() {
        assert_eq!(LayerKind::parse(Some("zone")).z_index(), 101);
        assert_eq!(LayerKind::parse(Some("line")).z_index(), 102);
        assert_eq!(LayerKind::parse(Some("search")).z_index(), 103);
        assert_eq!(LayerKind::parse(Some("annotation")).z_index(), 104);
        assert_eq!(LayerKind::parse(Some("custom")).z_index(), 105);
        assert_eq!(LayerKind::parse(Some("other")).z_index(), 100);
        assert_eq!(LayerKind::parse(None).z_index(), 100);
    }

    #[test]
    fn test_add_features_rerenders_layer() {
        let mut backend = RecordingBackend::new(Size::new(100.0, 100.0));
        let mut layer = Layer::new("l").with_display(DisplayPolicy::Always);
        layer.render(&mut backend);
        let first = layer.handle();

        layer.add_features(vec![feature("a"), feature("b")], &mut backend);
        assert_ne!(layer.handle(), first);
        assert_eq!(backend.layers().len(), 1);
        let recorded = &backend.layers()[0];
        assert_eq!(recorded.z_index, 100);
        assert_eq!(recorded.features.len(), 2);
        assert!(recorded.features[0].style.is_visible());
    }

    #[test]
    fn test_delete_feature() {
        let mut backend = RecordingBackend::default();
        let mut layer = Layer::new("l");
        layer.add_features(vec![feature("a")], &mut backend);

        assert!(layer.delete_feature("missing", &mut backend).is_none());
        let removed = layer.delete_feature("a", &mut backend).unwrap();
        assert_eq!(removed.id, "a");
        assert!(layer.features().is_empty());
        assert!(backend.layers()[0].features.is_empty());
    }

    #[test]
    fn test_set_display_restyles() {
        let mut backend = RecordingBackend::default();
        let mut layer = Layer::new("l");
        layer.add_features(vec![feature("a")], &mut backend);
        assert_eq!(backend.layers()[0].features[0].style, Style::Hidden);

        layer.set_display(DisplayPolicy::Always, &mut backend);
        assert!(backend.layers()[0].features[0].style.is_visible());

        layer.set_color(Color::RED, &mut backend);
        assert_eq!(layer.features()[0].color, Color::RED);
        assert_eq!(
            backend.layers()[0].features[0].style,
            Style::paint(Color::RED, BASE_OPACITY, BASE_STROKE_WIDTH)
        );
    }
}
