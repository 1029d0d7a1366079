//! Browser bindings.
//!
//! [`HeiViewer`] exposes the viewer to JavaScript. Rendering is delegated
//! to an adapter object supplied by the page (typically wrapping a 2D map
//! library): every [`RenderBackend`] command becomes a method call on it,
//! with structured arguments handed over as JSON values.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use heiv_map::{
    ChromeElement, Geometry, ImageLayerSpec, LayerHandle, RenderBackend, RenderFeature, Size,
    Style, ViewState,
};
use js_sys::{Array, Function, Promise, Reflect};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{HtmlImageElement, Response};

use crate::codec::{AnnotationRecord, FeatureRecord};
use crate::config::{ViewerConfig, WheelMode};
use crate::draw::{DrawShape, EditMode};
use crate::error::{LoadError, ViewerError};
use crate::events::{SubscriptionId, ViewerEvent};
use crate::loader::ResourceLoader;
use crate::viewer::Viewer;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::log_1(&format!("Logger already initialized: {}", e).into());
    }
}

// ============================================================================
// Conversion helpers
// ============================================================================

fn js_error(e: ViewerError) -> JsValue {
    let err = js_sys::Error::new(&e.to_string());
    err.set_name(e.code());
    err.into()
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| js_error(e.into()))?;
    js_sys::JSON::parse(&json)
}

fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, JsValue> {
    let json: String = js_sys::JSON::stringify(value)?.into();
    serde_json::from_str(&json).map_err(|e| js_error(e.into()))
}

fn pixel(x: f64, y: f64) -> [f64; 2] {
    [x, y]
}

// ============================================================================
// JsBackend
// ============================================================================

/// Forwards render commands to a JavaScript adapter object.
pub struct JsBackend {
    adapter: JsValue,
    next_handle: u32,
}

impl JsBackend {
    pub fn new(adapter: JsValue) -> Self {
        Self {
            adapter,
            next_handle: 0,
        }
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Option<JsValue> {
        let function = match Reflect::get(&self.adapter, &method.into()) {
            Ok(f) => f.dyn_into::<Function>().ok(),
            Err(_) => None,
        };
        let Some(function) = function else {
            log::warn!("Render adapter has no method {}", method);
            return None;
        };
        let args: Array = args.iter().collect();
        match function.apply(&self.adapter, &args) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Render adapter {} failed: {:?}", method, e);
                None
            }
        }
    }

    fn call_json<T: Serialize + ?Sized>(&self, method: &str, head: &[JsValue], value: &T) {
        match to_js(value) {
            Ok(value) => {
                let mut args = head.to_vec();
                args.push(value);
                self.call(method, &args);
            }
            Err(e) => log::error!("Could not serialize {} argument: {:?}", method, e),
        }
    }

    fn allocate(&mut self) -> LayerHandle {
        self.next_handle += 1;
        LayerHandle(self.next_handle)
    }
}

impl RenderBackend for JsBackend {
    fn canvas_size(&self) -> Size {
        let Some(size) = self.call("canvasSize", &[]) else {
            return Size::new(0.0, 0.0);
        };
        let read = |key: &str| {
            Reflect::get(&size, &key.into())
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0)
        };
        Size::new(read("width"), read("height"))
    }

    fn add_image_layer(&mut self, spec: &ImageLayerSpec) -> LayerHandle {
        let handle = self.allocate();
        self.call_json("addImageLayer", &[handle.0.into()], spec);
        handle
    }

    fn add_vector_layer(&mut self, z_index: i32, features: &[RenderFeature<'_>]) -> LayerHandle {
        let handle = self.allocate();
        self.call_json("addVectorLayer", &[handle.0.into(), z_index.into()], features);
        handle
    }

    fn remove_layer(&mut self, layer: LayerHandle) {
        self.call("removeLayer", &[layer.0.into()]);
    }

    fn add_feature(&mut self, layer: LayerHandle, feature: &RenderFeature<'_>) {
        self.call_json("addFeature", &[layer.0.into()], feature);
    }

    fn remove_feature(&mut self, layer: LayerHandle, id: &str) {
        self.call("removeFeature", &[layer.0.into(), id.into()]);
    }

    fn set_feature_style(&mut self, layer: LayerHandle, id: &str, style: &Style) {
        self.call_json("setFeatureStyle", &[layer.0.into(), id.into()], style);
    }

    fn set_feature_geometry(&mut self, layer: LayerHandle, id: &str, geometry: &Geometry) {
        self.call_json("setFeatureGeometry", &[layer.0.into(), id.into()], geometry);
    }

    fn render_view(&mut self, view: &ViewState) {
        self.call_json("renderView", &[], view);
    }

    fn set_chrome_opacity(&mut self, element: ChromeElement, opacity: f64, visible: bool) {
        let element = match element {
            ChromeElement::OverviewMap => "overviewMap",
            ChromeElement::ZoomSlider => "zoomSlider",
        };
        self.call(
            "setChromeOpacity",
            &[element.into(), opacity.into(), visible.into()],
        );
    }

    fn configure_overview(&mut self, layer: &ImageLayerSpec, resolution: f64, collapsed: bool) {
        self.call_json(
            "configureOverview",
            &[resolution.into(), collapsed.into()],
            layer,
        );
    }
}

// ============================================================================
// BrowserLoader
// ============================================================================

/// Resolves resources with `fetch` and probes images through an
/// `HtmlImageElement`.
#[derive(Debug, Default)]
pub struct BrowserLoader;

impl ResourceLoader for BrowserLoader {
    async fn fetch_text(&self, url: &str) -> Result<String, LoadError> {
        let fail = |e: JsValue| LoadError::new(url, format!("{:?}", e));
        let window = web_sys::window().ok_or_else(|| LoadError::new(url, "no window"))?;
        let response: Response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(fail)?
            .dyn_into()
            .map_err(fail)?;
        if !response.ok() {
            return Err(LoadError::new(
                url,
                format!("HTTP status {}", response.status()),
            ));
        }
        let text = JsFuture::from(response.text().map_err(fail)?)
            .await
            .map_err(fail)?;
        text.as_string()
            .ok_or_else(|| LoadError::new(url, "response is not text"))
    }

    async fn probe_image_size(&self, url: &str) -> Result<[u32; 2], LoadError> {
        let fail = |e: JsValue| LoadError::new(url, format!("{:?}", e));
        let image = HtmlImageElement::new().map_err(fail)?;
        let loaded = Promise::new(&mut |resolve, reject| {
            image.set_onload(Some(&resolve));
            image.set_onerror(Some(&reject));
        });
        image.set_src(url);
        JsFuture::from(loaded)
            .await
            .map_err(|_| LoadError::new(url, "image could not be loaded"))?;
        image.set_onload(None);
        image.set_onerror(None);
        Ok([image.natural_width(), image.natural_height()])
    }
}

// ============================================================================
// HeiViewer
// ============================================================================

type Shared = Rc<RefCell<Option<Viewer<JsBackend>>>>;
type EventQueue = Rc<RefCell<Vec<(Function, ViewerEvent)>>>;

/// JavaScript handle of one viewer instance.
///
/// Listener callbacks run after the triggering call returns, so they may
/// call back into the viewer.
#[wasm_bindgen]
pub struct HeiViewer {
    viewer: Shared,
    pending: EventQueue,
    subscriptions: HashMap<u32, SubscriptionId>,
    next_subscription: u32,
}

impl HeiViewer {
    fn with<T>(&self, f: impl FnOnce(&mut Viewer<JsBackend>) -> T) -> Result<T, JsValue> {
        let result = {
            let mut guard = self.viewer.borrow_mut();
            let viewer = guard
                .as_mut()
                .ok_or_else(|| js_error(ViewerError::NotInitialized))?;
            f(viewer)
        };
        self.flush();
        Ok(result)
    }

    fn try_with<T>(
        &self,
        f: impl FnOnce(&mut Viewer<JsBackend>) -> Result<T, ViewerError>,
    ) -> Result<T, JsValue> {
        self.with(f)?.map_err(js_error)
    }

    fn flush(&self) {
        let events = std::mem::take(&mut *self.pending.borrow_mut());
        for (callback, event) in events {
            let payload = match to_js(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    log::error!("Could not serialize event: {:?}", e);
                    continue;
                }
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
                log::error!("Listener for {} failed: {:?}", event.kind(), e);
            }
        }
    }
}

#[wasm_bindgen]
impl HeiViewer {
    /// Create a viewer from a configuration object and a render adapter.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, adapter: JsValue) -> Result<HeiViewer, JsValue> {
        let config: ViewerConfig = from_js(&config)?;
        let viewer = Viewer::new(config, JsBackend::new(adapter)).map_err(js_error)?;
        Ok(HeiViewer {
            viewer: Rc::new(RefCell::new(Some(viewer))),
            pending: Rc::default(),
            subscriptions: HashMap::new(),
            next_subscription: 0,
        })
    }

    /// Load the images and build the view. Other calls fail with
    /// `ERR_HEIIMAGEVIEWER_NOT_INITIALIZED` until the promise settles.
    pub fn initialize(&self) -> Promise {
        let shared = Rc::clone(&self.viewer);
        let pending = Rc::clone(&self.pending);
        future_to_promise(async move {
            let mut viewer = shared
                .borrow_mut()
                .take()
                .ok_or_else(|| js_error(ViewerError::NotInitialized))?;
            let result = viewer.initialize(&BrowserLoader).await;
            *shared.borrow_mut() = Some(viewer);
            let events = std::mem::take(&mut *pending.borrow_mut());
            for (callback, event) in events {
                if let Ok(payload) = to_js(&event) {
                    let _ = callback.call1(&JsValue::NULL, &payload);
                }
            }
            result.map(|()| JsValue::UNDEFINED).map_err(js_error)
        })
    }

    pub fn name(&self) -> Result<String, JsValue> {
        self.with(|v| v.name().to_string())
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Subscribe to an event by name. Returns a key for [`HeiViewer::off`],
    /// or undefined for an unknown event name.
    pub fn on(&mut self, name: &str, callback: Function) -> Result<Option<u32>, JsValue> {
        let pending = Rc::clone(&self.pending);
        let id = self.with(|v| {
            v.on_name(name, move |event: &ViewerEvent| {
                pending.borrow_mut().push((callback.clone(), event.clone()));
            })
        })?;
        Ok(id.map(|id| {
            self.next_subscription += 1;
            self.subscriptions.insert(self.next_subscription, id);
            self.next_subscription
        }))
    }

    pub fn off(&mut self, key: u32) -> Result<bool, JsValue> {
        let Some(id) = self.subscriptions.remove(&key) else {
            return Ok(false);
        };
        self.with(|v| v.off(id))
    }

    // ------------------------------------------------------------------------
    // Layers and features
    // ------------------------------------------------------------------------

    #[wasm_bindgen(js_name = addLayer)]
    pub fn add_layer(&self, record: JsValue) -> Result<(), JsValue> {
        let record: AnnotationRecord = from_js(&record)?;
        self.try_with(|v| v.add_layer(&record).map(|_| ()))
    }

    #[wasm_bindgen(js_name = addLayers)]
    pub fn add_layers(&self, records: JsValue) -> Result<(), JsValue> {
        let records: Vec<AnnotationRecord> = from_js(&records)?;
        self.try_with(|v| v.add_layers(&records))
    }

    /// Delete one layer by name, or every layer without a name.
    #[wasm_bindgen(js_name = deleteLayer)]
    pub fn delete_layer(&self, name: Option<String>) -> Result<usize, JsValue> {
        self.with(|v| v.delete_layer(name.as_deref()))
    }

    /// Features of a layer, or undefined when there is no such layer.
    #[wasm_bindgen(js_name = getLayer)]
    pub fn get_layer(&self, name: &str) -> Result<JsValue, JsValue> {
        self.with(|v| match v.get_layer(name) {
            Some(layer) => to_js(layer.features()),
            None => Ok(JsValue::UNDEFINED),
        })?
    }

    #[wasm_bindgen(js_name = addFeature)]
    pub fn add_feature(&self, layer: &str, record: JsValue) -> Result<(), JsValue> {
        let record: FeatureRecord = from_js(&record)?;
        self.try_with(|v| v.add_feature(layer, record))
    }

    /// `{ feature, layer }` for a feature id, or undefined.
    #[wasm_bindgen(js_name = getFeatureAndLayer)]
    pub fn get_feature_and_layer(&self, id: &str) -> Result<JsValue, JsValue> {
        self.with(|v| match v.get_feature_and_layer(id) {
            Some((feature, layer)) => to_js(&serde_json::json!({
                "feature": feature,
                "layer": layer.name(),
            })),
            None => Ok(JsValue::UNDEFINED),
        })?
    }

    /// Like `getFeatureAndLayer`, but throws for an unknown id.
    #[wasm_bindgen(js_name = mustGetFeatureAndLayer)]
    pub fn must_get_feature_and_layer(&self, id: &str) -> Result<JsValue, JsValue> {
        self.with(|v| {
            let (feature, layer) = v.must_get_feature_and_layer(id).map_err(js_error)?;
            to_js(&serde_json::json!({
                "feature": feature,
                "layer": layer.name(),
            }))
        })?
    }

    #[wasm_bindgen(js_name = deleteFeature)]
    pub fn delete_feature(&self, id: &str) -> Result<JsValue, JsValue> {
        let feature = self.try_with(|v| v.delete_feature(id))?;
        to_js(&feature)
    }

    #[wasm_bindgen(js_name = changeFeatureColor)]
    pub fn change_feature_color(&self, id: &str, color: &str) -> Result<(), JsValue> {
        let color = color
            .parse()
            .map_err(|e: heiv_map::ColorParseError| JsValue::from_str(&e.to_string()))?;
        self.try_with(|v| v.change_feature_color(id, color))
    }

    #[wasm_bindgen(js_name = highlightFeature)]
    pub fn highlight_feature(&self, id: &str, opacity: Option<f64>) -> Result<(), JsValue> {
        self.try_with(|v| v.highlight_feature(id, opacity))
    }

    #[wasm_bindgen(js_name = unhighlightFeature)]
    pub fn unhighlight_feature(&self, id: &str) -> Result<(), JsValue> {
        self.try_with(|v| v.unhighlight_feature(id))
    }

    #[wasm_bindgen(js_name = focusFeature)]
    pub fn focus_feature(&self, id: &str) -> Result<(), JsValue> {
        self.try_with(|v| v.focus_feature(id))
    }

    #[wasm_bindgen(js_name = getLayerSvg)]
    pub fn get_layer_svg(&self, name: &str) -> Result<String, JsValue> {
        self.try_with(|v| v.get_layer_svg(name))
    }

    // ------------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------------

    #[wasm_bindgen(js_name = getProperties)]
    pub fn get_properties(&self) -> Result<JsValue, JsValue> {
        self.with(|v| to_js(&v.get_properties()))?
    }

    /// Switch the wheel to `"zoom"` or `"vertical"`; without an argument
    /// the mode is toggled.
    #[wasm_bindgen(js_name = toggleWheel)]
    pub fn toggle_wheel(&self, mode: Option<String>) -> Result<(), JsValue> {
        let mode: Option<WheelMode> = mode
            .map(|m| from_js(&JsValue::from_str(&m)))
            .transpose()?;
        self.with(|v| match mode {
            Some(mode) => v.toggle_wheel(mode),
            None => v.toggle_wheel_mode(),
        })
    }

    #[wasm_bindgen(js_name = toggleOverview)]
    pub fn toggle_overview(&self) -> Result<(), JsValue> {
        self.with(Viewer::toggle_overview)
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&self) -> Result<(), JsValue> {
        self.try_with(Viewer::reset_view)
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&self) -> Result<(), JsValue> {
        self.with(Viewer::zoom_in)
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&self) -> Result<(), JsValue> {
        self.with(Viewer::zoom_out)
    }

    #[wasm_bindgen(js_name = centerMap)]
    pub fn center_map(&self) -> Result<(), JsValue> {
        self.with(Viewer::center_map)
    }

    #[wasm_bindgen(js_name = rotateLeft)]
    pub fn rotate_left(&self) -> Result<(), JsValue> {
        self.with(Viewer::rotate_left)
    }

    #[wasm_bindgen(js_name = rotateRight)]
    pub fn rotate_right(&self) -> Result<(), JsValue> {
        self.with(Viewer::rotate_right)
    }

    /// Advance animations and the chrome fade. Call once per frame.
    pub fn tick(&self) -> Result<(), JsValue> {
        self.with(|v| v.tick(web_time::Instant::now()))
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f64, y: f64) -> Result<(), JsValue> {
        self.with(|v| v.pointer_move(pixel(x, y)))
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, x: f64, y: f64, shift: bool) -> Result<(), JsValue> {
        self.with(|v| v.pointer_down(pixel(x, y), shift))
    }

    #[wasm_bindgen(js_name = pointerDrag)]
    pub fn pointer_drag(&self, x: f64, y: f64) -> Result<(), JsValue> {
        self.with(|v| v.pointer_drag(pixel(x, y)))
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self) -> Result<(), JsValue> {
        self.with(Viewer::pointer_up)
    }

    #[wasm_bindgen(js_name = mouseOut)]
    pub fn mouse_out(&self) -> Result<(), JsValue> {
        self.with(Viewer::mouse_out)
    }

    pub fn click(&self, x: f64, y: f64, shift: bool) -> Result<(), JsValue> {
        self.with(|v| v.click(pixel(x, y), shift))
    }

    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&self, x: f64, y: f64) -> Result<(), JsValue> {
        self.with(|v| v.double_click(pixel(x, y)))
    }

    /// Returns true when the page should suppress the default action.
    pub fn wheel(&self, x: f64, y: f64, delta_y: f64) -> Result<bool, JsValue> {
        self.with(|v| v.wheel(pixel(x, y), delta_y))
    }

    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&self, key: &str) -> Result<bool, JsValue> {
        self.with(|v| v.key_down(key))
    }

    #[wasm_bindgen(js_name = contextMenu)]
    pub fn context_menu(&self) -> Result<bool, JsValue> {
        self.with(Viewer::context_menu)
    }

    #[wasm_bindgen(js_name = chromeEnter)]
    pub fn chrome_enter(&self) -> Result<(), JsValue> {
        self.with(Viewer::chrome_enter)
    }

    #[wasm_bindgen(js_name = chromeLeave)]
    pub fn chrome_leave(&self) -> Result<(), JsValue> {
        self.with(Viewer::chrome_leave)
    }

    // ------------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------------

    /// Start drawing `"Rectangle"`, `"Polygon"`, `"Circle"`, `"Ellipse"`
    /// or `"Line"`.
    #[wasm_bindgen(js_name = activateDraw)]
    pub fn activate_draw(&self, shape: &str) -> Result<(), JsValue> {
        let shape: DrawShape = from_js(&JsValue::from_str(shape))?;
        self.try_with(|v| v.activate_draw(shape))
    }

    #[wasm_bindgen(js_name = toggleDraw)]
    pub fn toggle_draw(&self, shape: &str) -> Result<(), JsValue> {
        let shape: DrawShape = from_js(&JsValue::from_str(shape))?;
        self.try_with(|v| v.toggle_draw(shape))
    }

    #[wasm_bindgen(js_name = deactivateDraw)]
    pub fn deactivate_draw(&self) -> Result<(), JsValue> {
        self.try_with(Viewer::deactivate_draw)
    }

    #[wasm_bindgen(js_name = activateSelect)]
    pub fn activate_select(&self) -> Result<(), JsValue> {
        self.try_with(Viewer::activate_select)
    }

    #[wasm_bindgen(js_name = deactivateSelect)]
    pub fn deactivate_select(&self) -> Result<(), JsValue> {
        self.try_with(Viewer::deactivate_select)
    }

    /// `"modify"` or `"transform"`.
    #[wasm_bindgen(js_name = setEditMode)]
    pub fn set_edit_mode(&self, mode: &str) -> Result<(), JsValue> {
        let mode: EditMode = from_js(&JsValue::from_str(mode))?;
        self.try_with(|v| v.set_edit_mode(mode))
    }

    #[wasm_bindgen(js_name = addDrawLayer)]
    pub fn add_draw_layer(&self, record: JsValue) -> Result<(), JsValue> {
        let record: AnnotationRecord = from_js(&record)?;
        self.try_with(|v| v.add_draw_layer(&record))
    }

    #[wasm_bindgen(js_name = selectedFeatures)]
    pub fn selected_features(&self) -> Result<Vec<String>, JsValue> {
        self.with(|v| v.selected_features())
    }

    #[wasm_bindgen(js_name = abortDrawing)]
    pub fn abort_drawing(&self) -> Result<bool, JsValue> {
        self.with(Viewer::abort_drawing)
    }

    /// Delete the selection after `confirm(message)` returns truthy.
    /// Falls back to `window.confirm`.
    #[wasm_bindgen(js_name = deleteSelectedFeatures)]
    pub fn delete_selected_features(&self, confirm: Option<Function>) -> Result<JsValue, JsValue> {
        let mut prompt = |message: &str| match &confirm {
            Some(f) => f
                .call1(&JsValue::NULL, &message.into())
                .map(|answer| answer.is_truthy())
                .unwrap_or(false),
            None => web_sys::window()
                .and_then(|w| w.confirm_with_message(message).ok())
                .unwrap_or(false),
        };
        let deleted = self.try_with(|v| v.delete_selected_features(&mut prompt))?;
        to_js(&deleted)
    }
}
