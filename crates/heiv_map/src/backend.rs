//! The command interface between the viewer and a mapping engine.
//!
//! The viewer never draws anything itself. It keeps the authoritative
//! state (features, styles, view) and tells a [`RenderBackend`] what to
//! show. An engine adapter translates these commands into its own layer
//! and source objects.

use std::collections::HashMap;

use serde::Serialize;

use crate::extent::Extent;
use crate::geometry::Geometry;
use crate::style::Style;
use crate::view::{Size, ViewState};

/// Opaque id of a layer created on a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LayerHandle(pub u32);

/// A feature as handed to the backend.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RenderFeature<'a> {
    pub id: &'a str,
    pub geometry: &'a Geometry,
    pub style: &'a Style,
}

/// Where the pixels of an image layer come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImageSource {
    /// One image file stretched over the layer extent.
    #[serde(rename_all = "camelCase")]
    Static { url: String },
    /// A IIIF image service, tiled.
    #[serde(rename_all = "camelCase")]
    Iiif {
        service_id: String,
        tile_size: u32,
        /// Image units per pixel for each pyramid level, largest first.
        resolutions: Vec<f64>,
        format: String,
        quality: String,
    },
}

/// An image layer of the pyramid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayerSpec {
    pub source: ImageSource,
    /// Pixel size of the image behind this layer.
    pub width: u32,
    pub height: u32,
    /// The image-space extent the layer covers.
    pub extent: Extent,
    /// The layer is hidden below this zoom level.
    pub min_zoom: Option<f64>,
    pub z_index: i32,
}

/// Controls drawn on top of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChromeElement {
    OverviewMap,
    ZoomSlider,
}

/// Command sink for a mapping engine.
pub trait RenderBackend {
    /// Current canvas size in pixels. Zero while not laid out.
    fn canvas_size(&self) -> Size;

    fn add_image_layer(&mut self, spec: &ImageLayerSpec) -> LayerHandle;

    fn add_vector_layer(&mut self, z_index: i32, features: &[RenderFeature<'_>]) -> LayerHandle;

    fn remove_layer(&mut self, layer: LayerHandle);

    fn add_feature(&mut self, layer: LayerHandle, feature: &RenderFeature<'_>);

    fn remove_feature(&mut self, layer: LayerHandle, id: &str);

    fn set_feature_style(&mut self, layer: LayerHandle, id: &str, style: &Style);

    fn set_feature_geometry(&mut self, layer: LayerHandle, id: &str, geometry: &Geometry);

    /// Show the map as seen through `view`.
    fn render_view(&mut self, view: &ViewState);

    /// Set the opacity of a chrome element. Invisible elements take no
    /// pointer input.
    fn set_chrome_opacity(&mut self, element: ChromeElement, opacity: f64, visible: bool);

    /// (Re)build the overview map from the smallest image.
    fn configure_overview(&mut self, layer: &ImageLayerSpec, resolution: f64, collapsed: bool);
}

// ============================================================================
// RecordingBackend
// ============================================================================

/// A feature stored by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFeature {
    pub id: String,
    pub geometry: Geometry,
    pub style: Style,
}

/// A layer stored by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLayer {
    pub handle: LayerHandle,
    pub z_index: i32,
    /// Set for image layers.
    pub image: Option<ImageLayerSpec>,
    pub features: Vec<RecordedFeature>,
}

impl RecordedLayer {
    pub fn feature(&self, id: &str) -> Option<&RecordedFeature> {
        self.features.iter().find(|f| f.id == id)
    }
}

/// The overview configuration last applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOverview {
    pub layer: ImageLayerSpec,
    pub resolution: f64,
    pub collapsed: bool,
}

/// An in-memory backend that keeps the latest state of every command.
///
/// Used headless (native CLI) and in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    size: Option<Size>,
    next_handle: u32,
    layers: Vec<RecordedLayer>,
    views: Vec<ViewState>,
    chrome: HashMap<ChromeElement, (f64, bool)>,
    overview: Option<RecordedOverview>,
}

impl RecordingBackend {
    pub fn new(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn set_canvas_size(&mut self, size: Size) {
        self.size = Some(size);
    }

    /// Layers in creation order.
    pub fn layers(&self) -> &[RecordedLayer] {
        &self.layers
    }

    pub fn layer(&self, handle: LayerHandle) -> Option<&RecordedLayer> {
        self.layers.iter().find(|l| l.handle == handle)
    }

    pub fn image_layers(&self) -> impl Iterator<Item = &RecordedLayer> {
        self.layers.iter().filter(|l| l.image.is_some())
    }

    /// Every view rendered so far.
    pub fn views(&self) -> &[ViewState] {
        &self.views
    }

    pub fn last_view(&self) -> Option<&ViewState> {
        self.views.last()
    }

    /// Opacity and visibility of a chrome element, if ever set.
    pub fn chrome(&self, element: ChromeElement) -> Option<(f64, bool)> {
        self.chrome.get(&element).copied()
    }

    pub fn overview(&self) -> Option<&RecordedOverview> {
        self.overview.as_ref()
    }

    fn allocate(&mut self) -> LayerHandle {
        self.next_handle += 1;
        LayerHandle(self.next_handle)
    }

    fn layer_mut(&mut self, handle: LayerHandle) -> Option<&mut RecordedLayer> {
        let layer = self.layers.iter_mut().find(|l| l.handle == handle);
        if layer.is_none() {
            log::warn!("Unknown layer handle {:?}", handle);
        }
        layer
    }

    fn record(feature: &RenderFeature<'_>) -> RecordedFeature {
        RecordedFeature {
            id: feature.id.to_string(),
            geometry: feature.geometry.clone(),
            style: *feature.style,
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn canvas_size(&self) -> Size {
        self.size.unwrap_or(Size::new(0.0, 0.0))
    }

    fn add_image_layer(&mut self, spec: &ImageLayerSpec) -> LayerHandle {
        let handle = self.allocate();
        self.layers.push(RecordedLayer {
            handle,
            z_index: spec.z_index,
            image: Some(spec.clone()),
            features: Vec::new(),
        });
        handle
    }

    fn add_vector_layer(&mut self, z_index: i32, features: &[RenderFeature<'_>]) -> LayerHandle {
        let handle = self.allocate();
        self.layers.push(RecordedLayer {
            handle,
            z_index,
            image: None,
            features: features.iter().map(Self::record).collect(),
        });
        handle
    }

    fn remove_layer(&mut self, layer: LayerHandle) {
        self.layers.retain(|l| l.handle != layer);
    }

    fn add_feature(&mut self, layer: LayerHandle, feature: &RenderFeature<'_>) {
        let recorded = Self::record(feature);
        if let Some(l) = self.layer_mut(layer) {
            l.features.retain(|f| f.id != recorded.id);
            l.features.push(recorded);
        }
    }

    fn remove_feature(&mut self, layer: LayerHandle, id: &str) {
        if let Some(l) = self.layer_mut(layer) {
            l.features.retain(|f| f.id != id);
        }
    }

    fn set_feature_style(&mut self, layer: LayerHandle, id: &str, style: &Style) {
        if let Some(f) = self
            .layer_mut(layer)
            .and_then(|l| l.features.iter_mut().find(|f| f.id == id))
        {
            f.style = *style;
        }
    }

    fn set_feature_geometry(&mut self, layer: LayerHandle, id: &str, geometry: &Geometry) {
        if let Some(f) = self
            .layer_mut(layer)
            .and_then(|l| l.features.iter_mut().find(|f| f.id == id))
        {
            f.geometry = geometry.clone();
        }
    }

    fn render_view(&mut self, view: &ViewState) {
        self.views.push(*view);
    }

    fn set_chrome_opacity(&mut self, element: ChromeElement, opacity: f64, visible: bool) {
        self.chrome.insert(element, (opacity, visible));
    }

    fn configure_overview(&mut self, layer: &ImageLayerSpec, resolution: f64, collapsed: bool) {
        self.overview = Some(RecordedOverview {
            layer: layer.clone(),
            resolution,
            collapsed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    #[test]
    fn test_recording_feature_lifecycle() {
        let mut backend = RecordingBackend::new(Size::new(800.0, 600.0));
        let geometry = Geometry::circle([1.0, -1.0], 2.0);
        let style = Style::Hidden;
        let layer = backend.add_vector_layer(
            104,
            &[RenderFeature {
                id: "a",
                geometry: &geometry,
                style: &style,
            }],
        );

        let red = Style::paint(Color::RED, 0.1, 1.75);
        backend.set_feature_style(layer, "a", &red);
        assert_eq!(backend.layer(layer).and_then(|l| l.feature("a")).map(|f| f.style), Some(red));

        backend.remove_feature(layer, "a");
        assert!(backend.layer(layer).is_some_and(|l| l.features.is_empty()));

        backend.remove_layer(layer);
        assert!(backend.layers().is_empty());
    }

    #[test]
    fn test_unknown_layer_is_ignored() {
        let mut backend = RecordingBackend::default();
        backend.remove_feature(LayerHandle(42), "x");
        assert_eq!(backend.canvas_size(), Size::new(0.0, 0.0));
    }
}
