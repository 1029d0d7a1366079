//! Pointer, wheel and keyboard handling, plus the navigation controls.

use std::f64::consts::TAU;
use std::time::Duration;

use heiv_map::{Coordinate, RenderBackend, ViewTarget};
use web_time::Instant;

use super::{PanGesture, Viewer};
use crate::config::WheelMode;
use crate::constants::{
    HIT_TOLERANCE, ROTATE_STEP, ROTATION_RESET_THRESHOLD, WHEEL_VERTICAL_STEP, WHEEL_ZOOM_DELTA,
    ZOOM_BUTTON_DELTA, ZOOM_DRIFT_EXTENT_RATIO, ZOOM_DRIFT_FACTOR, ZOOM_DURATION_MS,
};
use crate::draw::InteractionMode;
use crate::events::ViewerEvent;
use crate::feature::Feature;
use crate::layer::Layer;

fn zoom_duration() -> Duration {
    Duration::from_millis(ZOOM_DURATION_MS)
}

impl<B: RenderBackend> Viewer<B> {
    pub(super) fn coordinate_at(&self, pixel: [f64; 2]) -> Option<Coordinate> {
        self.view
            .as_ref()
            .map(|v| v.coordinate_from_pixel(pixel, self.backend.canvas_size()))
    }

    pub(super) fn cancel_animation(&mut self) {
        if let Some(view) = self.view.as_mut() {
            view.cancel_animations();
        }
        self.animation = None;
    }

    // ========================================================================
    // Pointer
    // ========================================================================

    /// Pointer moved without a pressed button.
    pub fn pointer_move(&mut self, pixel: [f64; 2]) {
        let Some(coord) = self.coordinate_at(pixel) else {
            return;
        };
        self.track_cursor(coord);
        self.update_hover(pixel);
    }

    fn update_hover(&mut self, pixel: [f64; 2]) {
        let previous: Vec<String> = std::mem::take(&mut self.hovered)
            .into_iter()
            .filter(|id| !self.is_selected(id))
            .collect();
        self.restyle_ids(&previous, Layer::base_style);

        let hits = self.features_at(pixel, HIT_TOLERANCE);
        let hover: Vec<String> = hits
            .iter()
            .filter(|id| !self.is_selected(id))
            .cloned()
            .collect();
        self.restyle_ids(&hover, |layer: &Layer, feature: &Feature| {
            layer.strong_style(feature, None)
        });
        self.hovered = hover;

        let entered = std::mem::take(&mut self.entered);
        for id in entered.iter().filter(|id| !hits.contains(id)) {
            self.emit(ViewerEvent::FeatureLeave { id: id.clone() });
        }
        for id in hits.iter().filter(|id| !entered.contains(id)) {
            self.emit(ViewerEvent::FeatureEnter { id: id.clone() });
        }
        self.entered = hits;
    }

    /// Pointer left the canvas.
    pub fn mouse_out(&mut self) {
        let previous: Vec<String> = std::mem::take(&mut self.hovered)
            .into_iter()
            .filter(|id| !self.is_selected(id))
            .collect();
        self.restyle_ids(&previous, Layer::base_style);
        for id in std::mem::take(&mut self.entered) {
            self.emit(ViewerEvent::FeatureLeave { id });
        }
    }

    /// Primary button pressed. Starts an edit drag when the edit tools
    /// claim the pointer, a pan otherwise.
    pub fn pointer_down(&mut self, pixel: [f64; 2], shift: bool) {
        if self.view.is_none() {
            return;
        }
        if self.begin_edit_drag(pixel, shift) {
            return;
        }
        if matches!(self.interaction_mode(), InteractionMode::Draw(_)) {
            return;
        }
        self.pan = Some(PanGesture {
            last: pixel,
            moved: false,
        });
    }

    /// Pointer moved with the primary button pressed.
    pub fn pointer_drag(&mut self, pixel: [f64; 2]) {
        if self.continue_edit_drag(pixel) {
            return;
        }
        let Some(mut pan) = self.pan else {
            return;
        };
        if !pan.moved {
            self.cancel_animation();
            self.begin_move();
            pan.moved = true;
        }
        let (Some(from), Some(to)) = (self.coordinate_at(pan.last), self.coordinate_at(pixel)) else {
            return;
        };
        if let Some(view) = self.view.as_mut() {
            let center = view.center();
            view.set_center([center[0] - (to[0] - from[0]), center[1] - (to[1] - from[1])]);
        }
        pan.last = pixel;
        self.pan = Some(pan);
        self.view_changed();
    }

    /// Primary button released.
    pub fn pointer_up(&mut self) {
        if self.end_edit_drag() {
            return;
        }
        if let Some(pan) = self.pan.take() {
            if pan.moved {
                self.end_move();
            }
        }
    }

    /// A click that was not part of a drag.
    pub fn click(&mut self, pixel: [f64; 2], shift: bool) {
        if self.view.is_none() {
            return;
        }
        match self.interaction_mode() {
            InteractionMode::Draw(_) => self.draw_click(pixel),
            mode => {
                for id in self.features_at(pixel, HIT_TOLERANCE) {
                    self.emit(ViewerEvent::FeatureClick { id });
                }
                if let InteractionMode::Select(edit_mode) = mode {
                    self.select_click(pixel, edit_mode, shift);
                }
            }
        }
    }

    /// Finishes a polygon or line while drawing, zooms in one level
    /// otherwise.
    pub fn double_click(&mut self, pixel: [f64; 2]) {
        if matches!(self.interaction_mode(), InteractionMode::Draw(_)) {
            self.finish_sketch();
            return;
        }
        let Some(view) = self.view.as_ref() else {
            return;
        };
        let anchor = view.coordinate_from_pixel(pixel, self.backend.canvas_size());
        let zoom = view.constrained_zoom(view.zoom() + WHEEL_ZOOM_DELTA);
        let target = ViewTarget {
            resolution: Some(view.resolution_for_zoom(zoom)),
            anchor: Some(anchor),
            ..ViewTarget::default()
        };
        self.start_animation(target, zoom_duration(), None);
    }

    /// Returns true when the key was handled.
    pub fn key_down(&mut self, key: &str) -> bool {
        match key {
            "Escape" => self.abort_drawing(),
            "Enter" => self.finish_sketch().is_some(),
            _ => false,
        }
    }

    /// Secondary button. Aborts an unfinished drawing.
    pub fn context_menu(&mut self) -> bool {
        self.abort_drawing()
    }

    /// Mouse wheel. Returns true when the event was consumed.
    pub fn wheel(&mut self, pixel: [f64; 2], delta_y: f64) -> bool {
        if delta_y == 0.0 {
            return false;
        }
        let (Some(view), Some(extent)) = (self.view.as_ref(), self.extent()) else {
            return false;
        };
        match self.wheel_mode {
            WheelMode::Vertical => {
                let step = if delta_y < 0.0 {
                    WHEEL_VERTICAL_STEP
                } else {
                    -WHEEL_VERTICAL_STEP
                };
                self.cancel_animation();
                self.begin_move();
                // Vertical scrolling never snaps back.
                self.prev_pos = None;
                if let Some(view) = self.view.as_mut() {
                    let center = view.center();
                    view.set_center([center[0], center[1] + step]);
                }
                self.view_changed();
                self.end_move();
                true
            }
            WheelMode::Zoom => {
                let anchor = view.coordinate_from_pixel(pixel, self.backend.canvas_size());
                if !extent.contains(anchor) {
                    return false;
                }
                let delta = if delta_y < 0.0 {
                    WHEEL_ZOOM_DELTA
                } else {
                    -WHEEL_ZOOM_DELTA
                };
                let zoom = view.constrained_zoom(view.zoom() + delta);
                let target = ViewTarget {
                    resolution: Some(view.resolution_for_zoom(zoom)),
                    anchor: Some(anchor),
                    ..ViewTarget::default()
                };
                self.start_animation(target, zoom_duration(), None);
                true
            }
        }
    }

    // ========================================================================
    // Controls
    // ========================================================================

    /// Zoom by `delta` levels around the center. A center far outside the
    /// image drifts toward it.
    pub fn zoom_by_delta(&mut self, delta: f64) {
        let (Some(view), Some(extent)) = (self.view.as_ref(), self.extent()) else {
            return;
        };
        let mut center = view.center();
        if !extent.scaled(ZOOM_DRIFT_EXTENT_RATIO).contains(center) {
            let factor = (ZOOM_DRIFT_FACTOR * view.resolution()).min(1.0);
            let image_center = extent.center();
            center = [
                center[0] + (image_center[0] - center[0]) * factor,
                center[1] + (image_center[1] - center[1]) * factor,
            ];
        }
        let zoom = view.constrained_zoom(view.zoom() + delta);
        let target = ViewTarget {
            center: Some(center),
            resolution: Some(view.resolution_for_zoom(zoom)),
            ..ViewTarget::default()
        };
        self.start_animation(target, zoom_duration(), None);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by_delta(ZOOM_BUTTON_DELTA);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by_delta(-ZOOM_BUTTON_DELTA);
    }

    /// Center the image at full-fit resolution.
    pub fn center_map(&mut self) {
        let Some(extent) = self.extent() else {
            return;
        };
        let resolution = self.full_resolution;
        self.cancel_animation();
        self.jump(|view| {
            view.set_center(extent.center());
            view.set_resolution(resolution);
        });
    }

    /// Rotate by `angle` radians. Full turns fold back to zero.
    pub fn rotate_by(&mut self, angle: f64) {
        let Some(view) = self.view.as_ref() else {
            return;
        };
        let mut rotation = view.rotation() + angle;
        if rotation.abs() > TAU {
            rotation = rotation.signum() * (rotation.abs() - TAU);
        }
        if rotation.abs() > ROTATION_RESET_THRESHOLD {
            rotation = 0.0;
        }
        self.cancel_animation();
        self.jump(|view| view.set_rotation(rotation));
    }

    pub fn rotate_left(&mut self) {
        self.rotate_by(-ROTATE_STEP);
    }

    pub fn rotate_right(&mut self) {
        self.rotate_by(ROTATE_STEP);
    }

    pub fn toggle_wheel(&mut self, mode: WheelMode) {
        self.wheel_mode = mode;
        log::debug!("Wheel mode: {:?}", mode);
        self.emit(ViewerEvent::ViewChanged);
    }

    pub fn toggle_wheel_mode(&mut self) {
        self.toggle_wheel(self.wheel_mode.toggled());
    }

    /// Collapse or expand the overview map.
    pub fn toggle_overview(&mut self) {
        self.overview_collapsed = !self.overview_collapsed;
        self.apply_overview();
        self.emit(ViewerEvent::ViewChanged);
    }

    /// Pointer entered the overview map or the zoom slider.
    pub fn chrome_enter(&mut self) {
        if !self.overview_collapsed {
            let state = self.chrome.pin();
            self.apply_chrome(state);
        }
    }

    /// Pointer left the overview map or the zoom slider.
    pub fn chrome_leave(&mut self) {
        if !self.overview_collapsed {
            self.chrome.schedule(Instant::now());
        }
    }
}
