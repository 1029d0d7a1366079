//! Drawing, selection and geometry editing.
//!
//! Everything here requires a viewer built with `draw` enabled and fails
//! with [`ViewerError::DrawingDisabled`] otherwise. SVG export is the
//! exception and works on any viewer.

use heiv_map::{Geometry, RenderBackend, Style};

use super::Viewer;
use crate::codec::{AnnotationRecord, features_to_svg};
use crate::constants::{
    BASE_STROKE_WIDTH, DRAWN_OPACITY, HIT_TOLERANCE, TRANSFORM_HIT_TOLERANCE,
    VERTEX_PIXEL_TOLERANCE,
};
use crate::draw::{
    ConfirmPrompt, DELETE_CONFIRM_MESSAGE, DrawModule, DrawShape, EditDrag, EditMode,
    InteractionMode,
};
use crate::error::ViewerError;
use crate::events::ViewerEvent;
use crate::feature::Feature;
use crate::layer::Layer;

fn selection_style(_: &Layer, _: &Feature) -> Style {
    Style::selection()
}

impl<B: RenderBackend> Viewer<B> {
    pub(super) fn draw_mut(&mut self) -> Result<&mut DrawModule, ViewerError> {
        self.draw.as_mut().ok_or(ViewerError::DrawingDisabled)
    }

    /// The active interaction mode. Always idle without drawing.
    pub fn interaction_mode(&self) -> InteractionMode {
        self.draw
            .as_ref()
            .map_or(InteractionMode::Idle, DrawModule::mode)
    }

    // ========================================================================
    // Modes
    // ========================================================================

    pub fn activate_draw(&mut self, shape: DrawShape) -> Result<(), ViewerError> {
        let cleared = self.draw_mut()?.activate_draw(shape);
        self.restyle_ids(&cleared, Layer::base_style);
        Ok(())
    }

    /// Press a draw button: activates the shape, or returns to selecting
    /// when it is already active.
    pub fn toggle_draw(&mut self, shape: DrawShape) -> Result<(), ViewerError> {
        let cleared = self.draw_mut()?.toggle_draw(shape);
        self.restyle_ids(&cleared, Layer::base_style);
        Ok(())
    }

    pub fn deactivate_draw(&mut self) -> Result<(), ViewerError> {
        self.draw_mut()?.deactivate_draw();
        Ok(())
    }

    pub fn activate_select(&mut self) -> Result<(), ViewerError> {
        self.draw_mut()?.activate_select();
        Ok(())
    }

    pub fn deactivate_select(&mut self) -> Result<(), ViewerError> {
        let cleared = self.draw_mut()?.deactivate_select();
        self.restyle_ids(&cleared, Layer::base_style);
        Ok(())
    }

    pub fn set_edit_mode(&mut self, mode: EditMode) -> Result<(), ViewerError> {
        self.draw_mut()?.set_edit_mode(mode);
        Ok(())
    }

    /// Send new drawings to a layer built from `record`.
    pub fn add_draw_layer(&mut self, record: &AnnotationRecord) -> Result<(), ViewerError> {
        self.draw_mut()?;
        let name = self.add_layer(record)?.name().to_string();
        log::debug!("Drawing into layer '{}'", name);
        self.draw_mut()?.set_draw_layer(name);
        Ok(())
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    pub(super) fn track_cursor(&mut self, coord: heiv_map::Coordinate) {
        if let Some(session) = self.draw.as_mut().and_then(DrawModule::session_mut) {
            session.move_cursor(coord);
        }
    }

    /// The unfinished drawing as it would look if finished at the cursor.
    pub fn sketch(&self) -> Option<Geometry> {
        self.draw.as_ref()?.session()?.sketch()
    }

    pub(super) fn draw_click(&mut self, pixel: [f64; 2]) {
        let Some(coord) = self.coordinate_at(pixel) else {
            return;
        };
        let snap = self.default_hit_tolerance();
        let Some(session) = self.draw.as_mut().and_then(DrawModule::session_mut) else {
            return;
        };
        let shape = session.shape();
        if let Some(geometry) = session.add_point(coord, snap) {
            self.finish_drawing(shape, geometry);
        }
    }

    /// Finish a polygon or line drawing. Returns the new feature id.
    pub fn finish_sketch(&mut self) -> Option<String> {
        let session = self.draw.as_mut().and_then(DrawModule::session_mut)?;
        let shape = session.shape();
        let geometry = session.finish()?;
        self.finish_drawing(shape, geometry)
    }

    /// Drop the unfinished drawing. Returns false when nothing was drawn.
    pub fn abort_drawing(&mut self) -> bool {
        let Some(draw) = self.draw.as_mut() else {
            return false;
        };
        if !draw.session().is_some_and(|s| s.is_started()) {
            return false;
        }
        draw.abort_drawing();
        log::debug!("Drawing aborted");
        true
    }

    fn finish_drawing(&mut self, shape: DrawShape, geometry: Geometry) -> Option<String> {
        let layer_name = self.draw.as_ref()?.draw_layer().to_string();
        let Ok(index) = self.layer_index(&layer_name) else {
            log::warn!("Draw layer '{}' does not exist", layer_name);
            return None;
        };
        let id = self.draw.as_mut()?.next_feature_id(shape);
        let layer = &mut self.layers[index];
        let color = layer.color();
        let feature = Feature::new(id.clone(), geometry, shape.kind(), color)
            .with_layer(layer.name(), layer.kind().unwrap_or_default());
        let style = Style::paint(color, DRAWN_OPACITY, BASE_STROKE_WIDTH);
        layer.insert_feature(feature, &style, &mut self.backend);
        log::debug!("Drew '{}' into layer '{}'", id, layer_name);
        self.emit(ViewerEvent::DrawEnd);
        Some(id)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Ids of the selected features.
    pub fn selected_features(&self) -> Vec<String> {
        self.draw
            .as_ref()
            .map(|d| d.selected().to_vec())
            .unwrap_or_default()
    }

    pub(super) fn apply_selection(&mut self, hit: Option<String>, additive: bool) {
        let Some(draw) = self.draw.as_mut() else {
            return;
        };
        let removed = draw.select(hit.as_deref(), additive);
        self.restyle_ids(&removed, Layer::base_style);
        if let Some(id) = hit {
            if self.is_selected(&id) {
                self.hovered.retain(|h| *h != id);
                self.restyle_ids(&[id], selection_style);
            }
        }
    }

    pub(super) fn select_click(&mut self, pixel: [f64; 2], mode: EditMode, additive: bool) {
        let tolerance = match mode {
            EditMode::Modify => HIT_TOLERANCE,
            EditMode::Transform => TRANSFORM_HIT_TOLERANCE,
        };
        let hit = self.features_at(pixel, tolerance).into_iter().next();
        self.apply_selection(hit, additive);
    }

    /// Select a feature by id, as a click on it would.
    pub fn select_feature(&mut self, id: &str, additive: bool) -> Result<(), ViewerError> {
        self.must_locate(id)?;
        if !matches!(self.draw_mut()?.mode(), InteractionMode::Select(_)) {
            log::warn!("Features can only be selected in select mode");
            return Ok(());
        }
        self.apply_selection(Some(id.to_string()), additive);
        Ok(())
    }

    /// Clear the selection and return the features to their base style.
    pub fn deselect_all(&mut self) -> Result<(), ViewerError> {
        let cleared = self.draw_mut()?.clear_selection();
        self.restyle_ids(&cleared, Layer::base_style);
        Ok(())
    }

    /// Delete every selected feature after the user confirms. Returns the
    /// deleted features, or nothing when the prompt was declined.
    pub fn delete_selected_features<P>(&mut self, prompt: &mut P) -> Result<Vec<Feature>, ViewerError>
    where
        P: ConfirmPrompt + ?Sized,
    {
        let targets = self.draw_mut()?.deletion_targets();
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        if !prompt.confirm(DELETE_CONFIRM_MESSAGE) {
            log::debug!("Deletion of {} feature(s) declined", targets.len());
            return Ok(Vec::new());
        }
        let mut removed = Vec::with_capacity(targets.len());
        for id in &targets {
            match self.delete_feature(id) {
                Ok(feature) => removed.push(feature),
                Err(e) => log::warn!("{}", e),
            }
        }
        self.draw_mut()?.clear_selection();
        self.hovered.clear();
        self.emit(ViewerEvent::DrawEnd);
        Ok(removed)
    }

    // ========================================================================
    // Geometry edits
    // ========================================================================

    /// Apply `edit` to a copy of a feature's geometry and store it when
    /// `edit` reports a change.
    fn edit_geometry(
        &mut self,
        id: &str,
        edit: impl FnOnce(&mut Geometry) -> bool,
    ) -> Result<bool, ViewerError> {
        let index = self.must_locate(id)?;
        let layer = &mut self.layers[index];
        let Some(feature) = layer.feature(id) else {
            return Ok(false);
        };
        let mut geometry = feature.geometry.clone();
        if !edit(&mut geometry) {
            return Ok(false);
        }
        layer.set_feature_geometry(id, geometry, &mut self.backend);
        Ok(true)
    }

    fn feature_center(&self, id: &str) -> Result<heiv_map::Coordinate, ViewerError> {
        let (feature, _) = self.must_get_feature_and_layer(id)?;
        Ok(feature.geometry.extent().center())
    }

    /// Scale a feature about its center.
    pub fn scale_feature(&mut self, id: &str, sx: f64, sy: f64) -> Result<(), ViewerError> {
        self.draw_mut()?;
        let center = self.feature_center(id)?;
        self.edit_geometry(id, |g| {
            g.scale(sx, sy, Some(center));
            true
        })?;
        self.emit(ViewerEvent::DrawEnd);
        Ok(())
    }

    /// Rotate a feature about its center by `angle` radians.
    pub fn rotate_feature(&mut self, id: &str, angle: f64) -> Result<(), ViewerError> {
        self.draw_mut()?;
        let center = self.feature_center(id)?;
        self.edit_geometry(id, |g| {
            g.rotate(angle, center);
            true
        })?;
        self.emit(ViewerEvent::DrawEnd);
        Ok(())
    }

    pub fn translate_feature(&mut self, id: &str, dx: f64, dy: f64) -> Result<(), ViewerError> {
        self.draw_mut()?;
        self.edit_geometry(id, |g| {
            g.translate(dx, dy);
            true
        })?;
        self.emit(ViewerEvent::DrawEnd);
        Ok(())
    }

    /// Start a vertex or translate drag under the pointer. Returns true
    /// when the edit tools took the pointer.
    pub(super) fn begin_edit_drag(&mut self, pixel: [f64; 2], shift: bool) -> bool {
        let InteractionMode::Select(mode) = self.interaction_mode() else {
            return false;
        };
        let Some(coord) = self.coordinate_at(pixel) else {
            return false;
        };
        self.edit_changed = false;
        let drag = match mode {
            EditMode::Modify => self.grab_vertex(coord, shift),
            EditMode::Transform => {
                let Some(id) = self
                    .features_at(pixel, TRANSFORM_HIT_TOLERANCE)
                    .into_iter()
                    .next()
                else {
                    return false;
                };
                if !self.is_selected(&id) {
                    self.apply_selection(Some(id), shift);
                }
                Some(EditDrag::Translate {
                    ids: self.selected_features(),
                    last: coord,
                })
            }
        };
        match (drag, self.draw.as_mut()) {
            (Some(drag), Some(draw)) => {
                draw.begin_drag(drag);
                true
            }
            _ => false,
        }
    }

    /// Find a vertex of a selected feature near `coord`. With `insert`, a
    /// new vertex is added on the nearest edge instead.
    fn grab_vertex(&mut self, coord: heiv_map::Coordinate, insert: bool) -> Option<EditDrag> {
        let tolerance = self.tolerance(VERTEX_PIXEL_TOLERANCE);
        for id in self.selected_features() {
            let Some((feature, _)) = self.get_feature_and_layer(&id) else {
                continue;
            };
            if !insert {
                if let Some(vertex) = feature.geometry.nearest_vertex(coord, tolerance) {
                    return Some(EditDrag::Vertex { id, vertex });
                }
                continue;
            }
            let mut inserted = None;
            match self.edit_geometry(&id, |g| {
                inserted = g.insert_vertex(coord, tolerance);
                inserted.is_some()
            }) {
                Ok(true) => {}
                _ => continue,
            }
            if let Some(vertex) = inserted {
                self.edit_changed = true;
                return Some(EditDrag::Vertex { id, vertex });
            }
        }
        None
    }

    pub(super) fn continue_edit_drag(&mut self, pixel: [f64; 2]) -> bool {
        let Some(drag) = self.draw.as_ref().and_then(DrawModule::drag).cloned() else {
            return false;
        };
        let Some(coord) = self.coordinate_at(pixel) else {
            return true;
        };
        match drag {
            EditDrag::Vertex { id, vertex } => {
                if let Ok(true) = self.edit_geometry(&id, |g| g.set_vertex(vertex, coord)) {
                    self.edit_changed = true;
                }
            }
            EditDrag::Translate { ids, last } => {
                let (dx, dy) = (coord[0] - last[0], coord[1] - last[1]);
                for id in &ids {
                    if let Err(e) = self.edit_geometry(id, |g| {
                        g.translate(dx, dy);
                        true
                    }) {
                        log::warn!("{}", e);
                    }
                }
                if let Some(EditDrag::Translate { last, .. }) =
                    self.draw.as_mut().and_then(DrawModule::drag_mut)
                {
                    *last = coord;
                }
                self.edit_changed = true;
            }
        }
        true
    }

    pub(super) fn end_edit_drag(&mut self) -> bool {
        let Some(draw) = self.draw.as_mut() else {
            return false;
        };
        if draw.end_drag().is_none() {
            return false;
        }
        if std::mem::take(&mut self.edit_changed) {
            self.emit(ViewerEvent::DrawEnd);
        }
        true
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Serialize a layer's features to an SVG document sized to the image.
    pub fn get_layer_svg(&self, name: &str) -> Result<String, ViewerError> {
        let width = self.image_width()?;
        let Some(layer) = self.get_layer(name) else {
            return Err(ViewerError::LayerNotFound {
                name: name.to_string(),
            });
        };
        Ok(features_to_svg(
            layer.features(),
            width,
            self.config.max_coordinate_decimals,
        )?)
    }
}
