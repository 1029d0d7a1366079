//! Drawing and editing state.
//!
//! [`DrawModule`] is the interaction-mode state machine of a draw-capable
//! viewer. It owns the selection, the per-shape id counters and the
//! in-progress drawing, but never touches layers or the render backend:
//! the viewer applies the consequences of each transition.

mod session;
mod shape;

pub use session::DrawSession;
pub use shape::DrawShape;

use std::collections::HashMap;

use heiv_map::{Coordinate, VertexRef};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DRAW_LAYER;

/// Message shown before selected features are deleted.
pub const DELETE_CONFIRM_MESSAGE: &str = "Are you sure you want to delete this feature?";

/// Asks the user to confirm a destructive action.
pub trait ConfirmPrompt {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

/// Edit sub-mode active while selecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Vertex editing.
    Modify,
    /// Move, scale and rotate whole features.
    #[default]
    Transform,
}

/// The active interaction mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    /// Selecting, with an edit sub-mode.
    Select(EditMode),
    Draw(DrawShape),
}

impl InteractionMode {
    /// Names of the active tools, e.g. `["select", "transform"]` or
    /// `["draw:rect"]`.
    pub fn active_tools(&self) -> Vec<String> {
        match self {
            InteractionMode::Idle => Vec::new(),
            InteractionMode::Select(EditMode::Modify) => {
                vec!["select".to_string(), "modify".to_string()]
            }
            InteractionMode::Select(EditMode::Transform) => {
                vec!["select".to_string(), "transform".to_string()]
            }
            InteractionMode::Draw(shape) => vec![format!("draw:{}", shape.short_name())],
        }
    }
}

/// A pointer drag that edits geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum EditDrag {
    /// Moving one vertex of a feature in modify mode.
    Vertex { id: String, vertex: VertexRef },
    /// Translating the transform selection.
    Translate { ids: Vec<String>, last: Coordinate },
}

#[derive(Debug, Clone)]
pub struct DrawModule {
    mode: InteractionMode,
    edit_mode: EditMode,
    counters: HashMap<DrawShape, u32>,
    session: Option<DrawSession>,
    selection: Vec<String>,
    transform_selection: Vec<String>,
    delete_control_active: bool,
    draw_layer: String,
    drag: Option<EditDrag>,
}

impl Default for DrawModule {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawModule {
    pub fn new() -> Self {
        Self {
            mode: InteractionMode::Idle,
            edit_mode: EditMode::default(),
            counters: HashMap::new(),
            session: None,
            selection: Vec::new(),
            transform_selection: Vec::new(),
            delete_control_active: false,
            draw_layer: DEFAULT_DRAW_LAYER.to_string(),
            drag: None,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn edit_mode(&self) -> EditMode {
        self.edit_mode
    }

    pub fn draw_layer(&self) -> &str {
        &self.draw_layer
    }

    pub fn set_draw_layer(&mut self, name: impl Into<String>) {
        self.draw_layer = name.into();
    }

    pub fn session(&self) -> Option<&DrawSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut DrawSession> {
        self.session.as_mut()
    }

    pub fn is_delete_control_active(&self) -> bool {
        self.delete_control_active
    }

    // ========================================================================
    // Mode transitions
    // ========================================================================

    /// Enter `draw:<shape>`. Clears the selection, which is returned so
    /// the caller can restyle it.
    pub fn activate_draw(&mut self, shape: DrawShape) -> Vec<String> {
        let cleared = self.clear_selection();
        self.drag = None;
        self.mode = InteractionMode::Draw(shape);
        self.session = Some(DrawSession::new(shape));
        log::debug!("Interaction mode: draw:{}", shape.short_name());
        cleared
    }

    /// Leave draw mode and return to selecting.
    pub fn deactivate_draw(&mut self) {
        if matches!(self.mode, InteractionMode::Draw(_)) {
            self.activate_select();
        }
    }

    /// Press a draw button: activate it, or go back to selecting if it is
    /// already active.
    pub fn toggle_draw(&mut self, shape: DrawShape) -> Vec<String> {
        if self.mode == InteractionMode::Draw(shape) {
            self.deactivate_draw();
            Vec::new()
        } else {
            self.activate_draw(shape)
        }
    }

    /// Enter select mode with the last chosen edit sub-mode.
    pub fn activate_select(&mut self) {
        self.session = None;
        self.mode = InteractionMode::Select(self.edit_mode);
        log::debug!("Interaction mode: select ({:?})", self.edit_mode);
    }

    /// Leave select mode. Returns the ids that were selected.
    pub fn deactivate_select(&mut self) -> Vec<String> {
        let cleared = self.clear_selection();
        self.drag = None;
        if matches!(self.mode, InteractionMode::Select(_)) {
            self.mode = InteractionMode::Idle;
            log::debug!("Interaction mode: idle");
        }
        cleared
    }

    /// Switch between modify and transform. The selection carries over.
    pub fn set_edit_mode(&mut self, mode: EditMode) {
        self.edit_mode = mode;
        self.drag = None;
        match mode {
            EditMode::Transform => {
                for id in std::mem::take(&mut self.selection) {
                    if !self.transform_selection.contains(&id) {
                        self.transform_selection.push(id);
                    }
                }
            }
            EditMode::Modify => {
                for id in std::mem::take(&mut self.transform_selection) {
                    if !self.selection.contains(&id) {
                        self.selection.push(id);
                    }
                }
            }
        }
        if let InteractionMode::Select(_) = self.mode {
            self.mode = InteractionMode::Select(mode);
            log::debug!("Edit mode: {:?}", mode);
        }
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Next id for a finished drawing, e.g. `draw_rect_3`. Counters persist
    /// across activations.
    pub fn next_feature_id(&mut self, shape: DrawShape) -> String {
        let counter = self.counters.entry(shape).or_insert(0);
        *counter += 1;
        format!("draw_{}_{}", shape.short_name(), counter)
    }

    /// Drop the unfinished gesture, if any, keeping draw mode active.
    pub fn abort_drawing(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.abort();
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Currently selected ids. In transform mode this is the transform
    /// tool's own selection.
    pub fn selected(&self) -> &[String] {
        match self.mode {
            InteractionMode::Select(EditMode::Transform) => &self.transform_selection,
            _ => &self.selection,
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id) || self.transform_selection.iter().any(|s| s == id)
    }

    /// Apply a click selection. Without `additive` the previous selection
    /// is replaced. `hit` is `None` for a click on empty canvas. Returns
    /// the ids that left the selection.
    pub fn select(&mut self, hit: Option<&str>, additive: bool) -> Vec<String> {
        let list = match self.mode {
            InteractionMode::Select(EditMode::Transform) => &mut self.transform_selection,
            InteractionMode::Select(EditMode::Modify) => &mut self.selection,
            _ => return Vec::new(),
        };
        let mut removed = Vec::new();
        match hit {
            Some(id) if additive => {
                if !list.iter().any(|s| s == id) {
                    list.push(id.to_string());
                }
            }
            Some(id) => {
                removed = std::mem::take(list);
                removed.retain(|s| s != id);
                list.push(id.to_string());
            }
            None if additive => {}
            None => removed = std::mem::take(list),
        }
        self.update_delete_control();
        removed
    }

    /// Clear both selections. Returns the ids that were selected.
    pub fn clear_selection(&mut self) -> Vec<String> {
        let mut cleared = std::mem::take(&mut self.selection);
        for id in std::mem::take(&mut self.transform_selection) {
            if !cleared.contains(&id) {
                cleared.push(id);
            }
        }
        self.update_delete_control();
        cleared
    }

    /// Forget a feature that was removed elsewhere.
    pub fn forget(&mut self, id: &str) {
        self.selection.retain(|s| s != id);
        self.transform_selection.retain(|s| s != id);
        if matches!(&self.drag, Some(EditDrag::Vertex { id: d, .. }) if d == id) {
            self.drag = None;
        }
        self.update_delete_control();
    }

    /// The features a delete request applies to: the selection, or the
    /// transform tool's selection when the former is empty.
    pub fn deletion_targets(&self) -> Vec<String> {
        if self.selection.is_empty() {
            self.transform_selection.clone()
        } else {
            self.selection.clone()
        }
    }

    fn update_delete_control(&mut self) {
        let active = !self.selection.is_empty() || !self.transform_selection.is_empty();
        if active != self.delete_control_active {
            log::trace!("Delete control {}", if active { "on" } else { "off" });
        }
        self.delete_control_active = active;
    }

    // ========================================================================
    // Edit drags
    // ========================================================================

    pub fn drag(&self) -> Option<&EditDrag> {
        self.drag.as_ref()
    }

    pub fn drag_mut(&mut self) -> Option<&mut EditDrag> {
        self.drag.as_mut()
    }

    pub fn begin_drag(&mut self, drag: EditDrag) {
        self.drag = Some(drag);
    }

    pub fn end_drag(&mut self) -> Option<EditDrag> {
        self.drag.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selecting() -> DrawModule {
        let mut module = DrawModule::new();
        module.activate_select();
        module
    }

    #[test]
    fn test_select_defaults_to_transform() {
        let module = selecting();
        assert_eq!(module.mode(), InteractionMode::Select(EditMode::Transform));
    }

    #[test]
    fn test_draw_excludes_edit_modes() {
        let mut module = selecting();
        module.set_edit_mode(EditMode::Modify);
        assert!(module.mode().active_tools().contains(&"modify".to_string()));

        module.activate_draw(DrawShape::Rectangle);
        let active: Vec<String> = module
            .mode()
            .active_tools()
            .into_iter()
            .filter(|t| ["draw:rect", "modify", "transform"].contains(&t.as_str()))
            .collect();
        assert_eq!(active, vec!["draw:rect".to_string()]);
    }

    #[test]
    fn test_select_restores_last_edit_mode() {
        let mut module = selecting();
        module.set_edit_mode(EditMode::Modify);
        module.activate_draw(DrawShape::Polygon);
        module.toggle_draw(DrawShape::Polygon);
        assert_eq!(module.mode(), InteractionMode::Select(EditMode::Modify));
        assert!(module.session().is_none());
    }

    #[test]
    fn test_switching_draw_shapes() {
        let mut module = selecting();
        module.activate_draw(DrawShape::Circle);
        module.toggle_draw(DrawShape::Line);
        assert_eq!(module.mode(), InteractionMode::Draw(DrawShape::Line));
        assert_eq!(module.session().map(DrawSession::shape), Some(DrawShape::Line));
    }

    #[test]
    fn test_ids_are_monotonic_per_shape() {
        let mut module = DrawModule::new();
        assert_eq!(module.next_feature_id(DrawShape::Rectangle), "draw_rect_1");
        assert_eq!(module.next_feature_id(DrawShape::Rectangle), "draw_rect_2");
        assert_eq!(module.next_feature_id(DrawShape::Circle), "draw_circle_1");
        module.activate_draw(DrawShape::Rectangle);
        module.deactivate_draw();
        assert_eq!(module.next_feature_id(DrawShape::Rectangle), "draw_rect_3");
    }

    #[test]
    fn test_selection_drives_delete_control() {
        let mut module = selecting();
        module.select(Some("a"), false);
        assert!(module.is_delete_control_active());
        module.select(Some("b"), true);
        assert_eq!(module.selected(), ["a".to_string(), "b".to_string()]);

        let removed = module.select(None, false);
        assert_eq!(removed, vec!["a".to_string(), "b".to_string()]);
        assert!(!module.is_delete_control_active());
    }

    #[test]
    fn test_replacing_selection_reports_removed() {
        let mut module = selecting();
        module.select(Some("a"), false);
        let removed = module.select(Some("b"), false);
        assert_eq!(removed, vec!["a".to_string()]);
        assert_eq!(module.selected(), ["b".to_string()]);
    }

    #[test]
    fn test_edit_mode_switch_carries_selection() {
        let mut module = selecting();
        module.select(Some("t"), false);
        module.set_edit_mode(EditMode::Modify);
        assert_eq!(module.selected(), ["t".to_string()]);
        module.set_edit_mode(EditMode::Transform);
        assert_eq!(module.selected(), ["t".to_string()]);

        let removed = module.select(Some("u"), false);
        assert_eq!(removed, vec!["t".to_string()]);
        assert!(!module.is_selected("t"));
        assert!(module.is_selected("u"));
        assert_eq!(module.deletion_targets(), vec!["u".to_string()]);
    }

    #[test]
    fn test_deletion_targets_fall_back_to_transform_selection() {
        let mut module = selecting();
        module.select(Some("x"), false);
        assert_eq!(module.deletion_targets(), vec!["x".to_string()]);
        module.forget("x");
        assert!(module.deletion_targets().is_empty());
        assert!(!module.is_delete_control_active());
    }

    #[test]
    fn test_activating_draw_clears_selection() {
        let mut module = selecting();
        module.select(Some("x"), false);
        let cleared = module.activate_draw(DrawShape::Line);
        assert_eq!(cleared, vec!["x".to_string()]);
        assert!(!module.is_selected("x"));
    }

    #[test]
    fn test_closure_confirm_prompt() {
        let mut asked = Vec::new();
        let mut prompt = |m: &str| {
            asked.push(m.to_string());
            false
        };
        assert!(!prompt.confirm(DELETE_CONFIRM_MESSAGE));
        assert_eq!(asked, vec![DELETE_CONFIRM_MESSAGE.to_string()]);
    }
}
