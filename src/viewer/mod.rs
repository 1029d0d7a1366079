//! The viewer: image layers, annotation layers, view and interaction.
//!
//! A [`Viewer`] owns all application state and drives a [`RenderBackend`].
//! Input arrives through explicit handler calls (`pointer_move`, `wheel`,
//! `click`, ...) and time advances through [`Viewer::tick`], so the same
//! code runs headless, in tests and behind a browser event loop.
//!
//! Drawing and editing are an optional capability enabled by
//! `ViewerConfig::draw`; see the `edit` submodule.

mod chrome;
mod edit;
mod init;
mod input;

pub use chrome::ChromeFade;

use std::time::Duration;

use heiv_map::{
    ChromeElement, Color, Coordinate, Extent, ImageLayerSpec, LayerHandle, RenderBackend, Size,
    Style, View, ViewTarget,
};
use web_time::Instant;

use crate::codec::{AnnotationRecord, FeatureRecord, parse_annotation};
use crate::config::{ViewerConfig, ViewerProperties, WheelMode};
use crate::constants::{FOCUS_DURATION_MS, FOCUS_PADDING, HIGHLIGHT_OPACITY, HIT_TOLERANCE};
use crate::draw::DrawModule;
use crate::error::ViewerError;
use crate::events::{EventBus, EventKind, SubscriptionId, ViewerEvent};
use crate::feature::Feature;
use crate::layer::{DisplayPolicy, Layer};

/// The resolved image pyramid.
#[derive(Debug, Clone)]
struct ImageSet {
    extent: Extent,
    max_zoom: f64,
    /// Ascending by width. The first one also feeds the overview map.
    layers: Vec<ImageLayerSpec>,
    handles: Vec<LayerHandle>,
}

#[derive(Debug, Clone, Copy)]
struct PanGesture {
    last: [f64; 2],
    moved: bool,
}

/// Bookkeeping for a running view animation.
#[derive(Debug, Clone)]
struct AnimationClock {
    last: Instant,
    /// Feature to highlight once a focus animation completes.
    focus: Option<String>,
}

pub struct Viewer<B: RenderBackend> {
    config: ViewerConfig,
    backend: B,
    events: EventBus,
    layers: Vec<Layer>,
    images: Option<ImageSet>,
    view: Option<View>,
    /// Canvas size at the last layout, used to keep the view anchored on
    /// resize.
    canvas_size: Size,
    full_resolution: f64,
    wheel_mode: WheelMode,
    overview_collapsed: bool,
    chrome: ChromeFade,
    /// Features restyled by hovering.
    hovered: Vec<String>,
    /// Features under the pointer, for enter/leave events.
    entered: Vec<String>,
    /// Center at the start of the current move.
    prev_pos: Option<Coordinate>,
    pan: Option<PanGesture>,
    animation: Option<AnimationClock>,
    draw: Option<DrawModule>,
    /// Whether the current edit drag changed any geometry.
    edit_changed: bool,
}

impl<B: RenderBackend> std::fmt::Debug for Viewer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("name", &self.config.name)
            .field("layers", &self.layers.len())
            .field("initialized", &self.images.is_some())
            .field("draw", &self.draw.is_some())
            .finish()
    }
}

impl<B: RenderBackend> Viewer<B> {
    /// Create a viewer. Fails when required parameters are missing.
    pub fn new(config: ViewerConfig, backend: B) -> Result<Self, ViewerError> {
        if let Err(e) = config.validate() {
            log::error!("{}", e);
            return Err(e.into());
        }
        let draw = config.draw.then(DrawModule::new);
        Ok(Self {
            wheel_mode: config.properties.wheel_mode,
            overview_collapsed: config.properties.overview_map_collapsed,
            config,
            backend,
            events: EventBus::new(),
            layers: Vec::new(),
            images: None,
            view: None,
            canvas_size: Size::new(0.0, 0.0),
            full_resolution: 1.0,
            chrome: ChromeFade::new(),
            hovered: Vec::new(),
            entered: Vec::new(),
            prev_pos: None,
            pan: None,
            animation: None,
            draw,
            edit_changed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.images.is_some()
    }

    /// The image extent, `[0, -height, width, 0]`.
    pub fn extent(&self) -> Option<Extent> {
        self.images.as_ref().map(|i| i.extent)
    }

    /// Resolution at which the whole image fits the canvas.
    pub fn full_resolution(&self) -> f64 {
        self.full_resolution
    }

    pub fn image_layers(&self) -> &[ImageLayerSpec] {
        self.images
            .as_ref()
            .map(|i| i.layers.as_slice())
            .unwrap_or_default()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn draw_module(&self) -> Option<&DrawModule> {
        self.draw.as_ref()
    }

    fn image_width(&self) -> Result<f64, ViewerError> {
        self.extent()
            .map(|e| e.max_x)
            .ok_or(ViewerError::NotInitialized)
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&ViewerEvent) + 'static,
    {
        self.events.on(kind, listener)
    }

    /// Subscribe by public event name, e.g. `change:view`.
    pub fn on_name<F>(&mut self, name: &str, listener: F) -> Option<SubscriptionId>
    where
        F: FnMut(&ViewerEvent) + 'static,
    {
        let Some(kind) = EventKind::from_name(name) else {
            log::warn!("Unknown event name '{}'", name);
            return None;
        };
        Some(self.events.on(kind, listener))
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    fn emit(&mut self, event: ViewerEvent) {
        self.events.emit(&event);
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Parse an annotation record into a new layer. Unnamed layers are
    /// called `layer_0`.
    pub fn add_layer(&mut self, record: &AnnotationRecord) -> Result<&Layer, ViewerError> {
        self.add_layer_indexed(record, 0)
    }

    /// Add several layers. Unnamed ones are numbered from 1.
    pub fn add_layers(&mut self, records: &[AnnotationRecord]) -> Result<(), ViewerError> {
        for (i, record) in records.iter().enumerate() {
            self.add_layer_indexed(record, i + 1)?;
        }
        Ok(())
    }

    fn add_layer_indexed(
        &mut self,
        record: &AnnotationRecord,
        index: usize,
    ) -> Result<&Layer, ViewerError> {
        let width = self.image_width()?;
        let mut named = record.clone();
        let name = named
            .name
            .get_or_insert_with(|| format!("layer_{}", index))
            .clone();
        let features = parse_annotation(&named, width);
        self.insert_layer(Layer::from_record(name, &named, features))
    }

    /// Render a prepared layer and take ownership of it. A layer with the
    /// same name is replaced.
    pub fn insert_layer(&mut self, mut layer: Layer) -> Result<&Layer, ViewerError> {
        if self.layers.iter().any(|l| l.name() == layer.name()) {
            log::warn!("Replacing existing layer '{}'", layer.name());
            self.delete_layer(Some(layer.name()));
        }
        layer.render(&mut self.backend);
        let added: Vec<ViewerEvent> = layer
            .features()
            .iter()
            .map(|f| ViewerEvent::FeatureAdded {
                id: f.id.clone(),
                layer: layer.name().to_string(),
            })
            .collect();
        self.layers.push(layer);
        for event in added {
            self.emit(event);
        }
        self.layers.last().ok_or(ViewerError::NotInitialized)
    }

    /// Remove the named layer, or every layer when `name` is `None`.
    /// Returns how many layers were removed.
    pub fn delete_layer(&mut self, name: Option<&str>) -> usize {
        let (removed, kept): (Vec<Layer>, Vec<Layer>) = std::mem::take(&mut self.layers)
            .into_iter()
            .partition(|l| name.is_none_or(|n| l.name() == n));
        self.layers = kept;
        let count = removed.len();
        for mut layer in removed {
            layer.unrender(&mut self.backend);
            for feature in layer.features() {
                self.forget_feature(&feature.id);
            }
            log::debug!("Deleted layer '{}'", layer.name());
        }
        count
    }

    pub fn get_layer(&self, name: &str) -> Option<&Layer> {
        let layer = self.layers.iter().find(|l| l.name() == name);
        if layer.is_none() {
            log::warn!("Could not find layer with name {}", name);
        }
        layer
    }

    fn layer_index(&self, name: &str) -> Result<usize, ViewerError> {
        self.layers
            .iter()
            .position(|l| l.name() == name)
            .ok_or_else(|| ViewerError::LayerNotFound {
                name: name.to_string(),
            })
    }

    pub fn set_layer_color(&mut self, name: &str, color: Color) -> Result<(), ViewerError> {
        let index = self.layer_index(name)?;
        self.layers[index].set_color(color, &mut self.backend);
        Ok(())
    }

    pub fn set_layer_display(
        &mut self,
        name: &str,
        display: DisplayPolicy,
    ) -> Result<(), ViewerError> {
        let index = self.layer_index(name)?;
        self.layers[index].set_display(display, &mut self.backend);
        Ok(())
    }

    // ========================================================================
    // Features
    // ========================================================================

    fn locate(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.contains(id))
    }

    /// Look a feature up. Returns `None` when no layer has it.
    pub fn get_feature_and_layer(&self, id: &str) -> Option<(&Feature, &Layer)> {
        self.layers
            .iter()
            .find_map(|layer| layer.feature(id).map(|f| (f, layer)))
    }

    /// Look a feature up, failing with [`ViewerError::FeatureNotFound`].
    pub fn must_get_feature_and_layer(&self, id: &str) -> Result<(&Feature, &Layer), ViewerError> {
        self.get_feature_and_layer(id)
            .ok_or_else(|| ViewerError::feature_not_found(id, self.name()))
    }

    fn must_locate(&self, id: &str) -> Result<usize, ViewerError> {
        self.locate(id)
            .ok_or_else(|| ViewerError::feature_not_found(id, self.name()))
    }

    /// Parse a feature descriptor into the named layer and re-render it.
    pub fn add_feature(&mut self, layer_name: &str, record: FeatureRecord) -> Result<(), ViewerError> {
        let width = self.image_width()?;
        let index = self.layer_index(layer_name)?;
        let layer = &self.layers[index];
        let wrapper = AnnotationRecord {
            name: Some(layer.name().to_string()),
            kind: layer.kind().map(str::to_string),
            color: Some(layer.color()),
            features: vec![record],
            ..AnnotationRecord::default()
        };
        let features = parse_annotation(&wrapper, width);
        let added: Vec<ViewerEvent> = features
            .iter()
            .map(|f| ViewerEvent::FeatureAdded {
                id: f.id.clone(),
                layer: layer_name.to_string(),
            })
            .collect();
        self.layers[index].add_features(features, &mut self.backend);
        for event in added {
            self.emit(event);
        }
        Ok(())
    }

    /// Remove a feature from its layer.
    pub fn delete_feature(&mut self, id: &str) -> Result<Feature, ViewerError> {
        let index = self.must_locate(id)?;
        let feature = self.layers[index]
            .delete_feature(id, &mut self.backend)
            .ok_or_else(|| ViewerError::feature_not_found(id, self.name()))?;
        self.forget_feature(id);
        Ok(feature)
    }

    fn forget_feature(&mut self, id: &str) {
        self.hovered.retain(|h| h != id);
        self.entered.retain(|h| h != id);
        if let Some(draw) = self.draw.as_mut() {
            draw.forget(id);
        }
    }

    /// Recolor a feature and reset it to its base style.
    pub fn change_feature_color(&mut self, id: &str, color: Color) -> Result<(), ViewerError> {
        let index = self.must_locate(id)?;
        self.layers[index].set_feature_color(id, color, &mut self.backend);
        Ok(())
    }

    /// Paint a feature in its layer's strong style.
    pub fn highlight_feature(&mut self, id: &str, opacity: Option<f64>) -> Result<(), ViewerError> {
        let index = self.must_locate(id)?;
        let layer = &self.layers[index];
        if let Some(feature) = layer.feature(id) {
            let style = layer.strong_style(feature, Some(opacity.unwrap_or(HIGHLIGHT_OPACITY)));
            layer.apply_style(id, &style, &mut self.backend);
        }
        Ok(())
    }

    /// Return a feature to its layer's base style.
    pub fn unhighlight_feature(&mut self, id: &str) -> Result<(), ViewerError> {
        let index = self.must_locate(id)?;
        self.restyle(index, id, Layer::base_style);
        Ok(())
    }

    /// Fit the view to a feature, then highlight it.
    pub fn focus_feature(&mut self, id: &str) -> Result<(), ViewerError> {
        let (feature, _) = self.must_get_feature_and_layer(id)?;
        let extent = feature.geometry.extent();
        let view = self.view.as_ref().ok_or(ViewerError::NotInitialized)?;
        let target = view.fit_target(&extent, self.backend.canvas_size(), FOCUS_PADDING);
        self.start_animation(
            target,
            Duration::from_millis(FOCUS_DURATION_MS),
            Some(id.to_string()),
        );
        Ok(())
    }

    fn restyle(&mut self, layer_index: usize, id: &str, pick: impl Fn(&Layer, &Feature) -> Style) {
        let layer = &self.layers[layer_index];
        if let Some(feature) = layer.feature(id) {
            let style = pick(layer, feature);
            layer.apply_style(id, &style, &mut self.backend);
        }
    }

    fn restyle_ids(&mut self, ids: &[String], pick: impl Fn(&Layer, &Feature) -> Style) {
        for id in ids {
            if let Some(index) = self.locate(id) {
                self.restyle(index, id, &pick);
            }
        }
    }

    /// Ids of features under a canvas pixel, topmost first.
    fn features_at(&self, pixel: [f64; 2], tolerance_px: f64) -> Vec<String> {
        let Some(view) = &self.view else {
            return Vec::new();
        };
        let coord = view.coordinate_from_pixel(pixel, self.backend.canvas_size());
        let tolerance = tolerance_px * view.resolution();
        let mut order: Vec<&Layer> = self.layers.iter().rev().collect();
        order.sort_by_key(|l| std::cmp::Reverse(l.z_index()));
        order
            .into_iter()
            .flat_map(|layer| layer.features().iter().rev())
            .filter(|f| f.geometry.hits(coord, tolerance))
            .map(|f| f.id.clone())
            .collect()
    }

    fn is_selected(&self, id: &str) -> bool {
        self.draw.as_ref().is_some_and(|d| d.is_selected(id))
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn get_properties(&self) -> ViewerProperties {
        ViewerProperties {
            resolution: self.view.as_ref().map(View::resolution),
            wheel_mode: self.wheel_mode,
            rotation: self.view.as_ref().map_or(0.0, View::rotation),
            overview_map_collapsed: self.overview_collapsed,
        }
    }

    pub fn wheel_mode(&self) -> WheelMode {
        self.wheel_mode
    }

    pub fn is_overview_collapsed(&self) -> bool {
        self.overview_collapsed
    }

    // ========================================================================
    // View changes and moves
    // ========================================================================

    fn view_changed(&mut self) {
        if let Some(view) = &self.view {
            self.backend.render_view(&view.state());
            self.emit(ViewerEvent::ViewChanged);
        }
    }

    fn begin_move(&mut self) {
        self.prev_pos = self.view.as_ref().map(View::center);
        if !self.overview_collapsed {
            let state = self.chrome.pin();
            self.apply_chrome(state);
        }
    }

    /// Snap back when the viewport no longer overlaps the image, then
    /// start the chrome fade timer.
    fn end_move(&mut self) {
        let size = self.backend.canvas_size();
        let outside = match (&self.view, &self.images) {
            (Some(view), Some(images)) => !view.calculate_extent(size).intersects(&images.extent),
            _ => false,
        };
        if let (true, Some(prev)) = (outside, self.prev_pos) {
            log::debug!("View left the image, snapping back");
            if let Some(view) = self.view.as_mut() {
                view.set_center(prev);
            }
            self.view_changed();
        }
        if !self.overview_collapsed {
            self.chrome.schedule(Instant::now());
        }
    }

    fn apply_chrome(&mut self, (opacity, visible): (f64, bool)) {
        for element in [ChromeElement::OverviewMap, ChromeElement::ZoomSlider] {
            self.backend.set_chrome_opacity(element, opacity, visible);
        }
    }

    /// Apply an immediate view change as one complete move.
    fn jump(&mut self, change: impl FnOnce(&mut View)) {
        if self.view.is_none() {
            return;
        }
        self.begin_move();
        if let Some(view) = self.view.as_mut() {
            change(view);
        }
        self.view_changed();
        self.end_move();
    }

    /// Cancel any running animation and start a new one.
    fn start_animation(&mut self, target: ViewTarget, duration: Duration, focus: Option<String>) {
        let Some(view) = self.view.as_mut() else {
            return;
        };
        if view.is_animating() {
            view.cancel_animations();
        }
        self.begin_move();
        if let Some(view) = self.view.as_mut() {
            view.animate(target, duration);
        }
        self.animation = Some(AnimationClock {
            last: Instant::now(),
            focus,
        });
        if duration.is_zero() {
            self.tick(Instant::now());
        }
    }

    fn finish_animation(&mut self, clock: AnimationClock) {
        self.end_move();
        if let Some(id) = clock.focus {
            if let Err(e) = self.highlight_feature(&id, Some(HIGHLIGHT_OPACITY)) {
                log::warn!("{}", e);
            }
        }
    }

    /// Advance animations and the chrome fade to `now`.
    pub fn tick(&mut self, now: Instant) {
        if let Some(mut clock) = self.animation.take() {
            let running = self.view.as_ref().is_some_and(View::is_animating);
            if running {
                let dt = now.saturating_duration_since(clock.last);
                clock.last = now;
                let finished = self.view.as_mut().is_some_and(|v| v.advance(dt));
                self.view_changed();
                if finished {
                    self.finish_animation(clock);
                } else {
                    self.animation = Some(clock);
                }
            } else {
                // Completed immediately or cancelled by a direct setter.
                self.view_changed();
                self.finish_animation(clock);
            }
        }
        if let Some(state) = self.chrome.tick(now) {
            self.apply_chrome(state);
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Hit tolerance in image units at the current resolution.
    fn tolerance(&self, pixels: f64) -> f64 {
        self.view.as_ref().map_or(pixels, |v| pixels * v.resolution())
    }

    fn default_hit_tolerance(&self) -> f64 {
        self.tolerance(HIT_TOLERANCE)
    }
}
