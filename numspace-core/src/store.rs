//! Client-side whiteboard state.
//!
//! `WhiteboardStore` is the local model a sync agent wraps: the element
//! collection plus selection, tool settings, and undo history. Local edits go
//! through the typed mutators and are recorded in history; remote snapshots
//! arrive through [`WhiteboardStore::replace_elements`] and are not.

use crate::element::{valid_stroke_width, DrawingElement, Element, TextElement};
use crate::history::History;
use crate::StoreError;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of undo steps kept
    pub max_history: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_history: 50 }
    }
}

/// Which kind of element a pointer gesture creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Text,
    Draw,
}

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
pub const DEFAULT_FONT_SIZE: u32 = 24;

#[derive(Debug, Clone)]
pub struct WhiteboardStore {
    elements: Vec<Element>,
    selected: Option<String>,
    mode: ToolMode,
    drawing_color: String,
    stroke_width: f64,
    font_size: u32,
    history: History<Vec<Element>>,
    /// Bumped on every change to `elements`, local or remote.
    revision: u64,
}

impl Default for WhiteboardStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl WhiteboardStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            elements: Vec::new(),
            selected: None,
            mode: ToolMode::default(),
            drawing_color: DEFAULT_COLOR.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            font_size: DEFAULT_FONT_SIZE,
            history: History::new(config.max_history),
            revision: 0,
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ── Local element edits ─────────────────────────────────────────

    /// Add a text element using the current color and font size.
    pub fn add_text(&mut self, x: f64, y: f64, content: impl Into<String>) -> Result<String, StoreError> {
        let text = TextElement::new(x, y, content, self.font_size, self.drawing_color.clone());
        self.add_element(text.into())
    }

    /// Add a stroke using the current color and stroke width.
    pub fn add_drawing(&mut self, points: Vec<[f64; 2]>) -> Result<String, StoreError> {
        let stroke = DrawingElement::new(points, self.drawing_color.clone(), self.stroke_width);
        self.add_element(stroke.into())
    }

    /// Insert a prepared element. Its id must not already be on the board.
    pub fn add_element(&mut self, element: Element) -> Result<String, StoreError> {
        element.validate()?;
        if self.element(element.id()).is_some() {
            return Err(StoreError::DuplicateId(element.id().to_string()));
        }
        let id = element.id().to_string();
        self.checkpoint();
        self.elements.push(element);
        self.touch();
        Ok(id)
    }

    /// Apply an in-place edit to one element.
    ///
    /// The edit runs on a copy; it is rejected if it changes the element's
    /// id or variant, or leaves it with invalid attributes.
    pub fn update_element<F>(&mut self, id: &str, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Element),
    {
        let index = self.index_of(id)?;
        let mut edited = self.elements[index].clone();
        edit(&mut edited);

        let original = &self.elements[index];
        if !original.same_kind(&edited) {
            return Err(StoreError::VariantChanged {
                id: id.to_string(),
                from: original.kind(),
                to: edited.kind(),
            });
        }
        if edited.id() != id {
            return Err(StoreError::IdChanged(id.to_string()));
        }
        edited.validate()?;

        self.checkpoint();
        self.elements[index] = edited;
        self.touch();
        Ok(())
    }

    pub fn move_element(&mut self, id: &str, dx: f64, dy: f64) -> Result<(), StoreError> {
        self.update_element(id, |e| e.translate(dx, dy))
    }

    pub fn set_text_content(&mut self, id: &str, content: impl Into<String>) -> Result<(), StoreError> {
        match self.element(id) {
            Some(Element::Text(_)) => {}
            Some(_) => {
                return Err(StoreError::WrongKind {
                    id: id.to_string(),
                    expected: "text",
                })
            }
            None => return Err(StoreError::ElementNotFound(id.to_string())),
        }
        let content = content.into();
        self.update_element(id, move |e| {
            if let Element::Text(text) = e {
                text.content = content;
            }
        })
    }

    /// Extend a stroke that is still being drawn.
    pub fn append_point(&mut self, id: &str, point: [f64; 2]) -> Result<(), StoreError> {
        match self.element(id) {
            Some(Element::Drawing(_)) => {}
            Some(_) => {
                return Err(StoreError::WrongKind {
                    id: id.to_string(),
                    expected: "drawing",
                })
            }
            None => return Err(StoreError::ElementNotFound(id.to_string())),
        }
        self.update_element(id, |e| {
            if let Element::Drawing(drawing) = e {
                drawing.points.push(point);
            }
        })
    }

    pub fn delete_element(&mut self, id: &str) -> Result<Element, StoreError> {
        let index = self.index_of(id)?;
        self.checkpoint();
        let removed = self.elements.remove(index);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.touch();
        Ok(removed)
    }

    /// Remove every element. A no-op on an empty board.
    pub fn clear(&mut self) {
        if self.elements.is_empty() {
            return;
        }
        self.checkpoint();
        self.elements.clear();
        self.selected = None;
        self.touch();
    }

    // ── Remote overwrite ────────────────────────────────────────────

    /// Overwrite the whole collection with state received from the relay.
    ///
    /// Not recorded in history; both undo and redo stacks are dropped since
    /// they no longer describe edits to the current board.
    pub fn replace_elements(&mut self, elements: Vec<Element>) {
        log::debug!("Replacing {} local elements with {} remote", self.elements.len(), elements.len());
        self.elements = elements;
        self.history.clear();
        if let Some(selected) = &self.selected {
            if !self.elements.iter().any(|e| e.id() == selected) {
                self.selected = None;
            }
        }
        self.touch();
    }

    // ── History ─────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let current = self.elements.clone();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.elements.clone();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ── Selection & tool settings ───────────────────────────────────

    /// Select an element, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        match id {
            Some(id) => {
                self.index_of(id)?;
                self.selected = Some(id.to_string());
            }
            None => self.selected = None,
        }
        Ok(())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
    }

    pub fn drawing_color(&self) -> &str {
        &self.drawing_color
    }

    pub fn set_drawing_color(&mut self, color: impl Into<String>) {
        self.drawing_color = color.into();
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn set_stroke_width(&mut self, width: f64) -> Result<(), StoreError> {
        if !valid_stroke_width(width) {
            return Err(StoreError::InvalidStrokeWidth(width));
        }
        self.stroke_width = width;
        Ok(())
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn set_font_size(&mut self, size: u32) -> Result<(), StoreError> {
        if size == 0 {
            return Err(StoreError::InvalidFontSize(size));
        }
        self.font_size = size;
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    fn index_of(&self, id: &str) -> Result<usize, StoreError> {
        self.elements
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| StoreError::ElementNotFound(id.to_string()))
    }

    fn checkpoint(&mut self) {
        self.history.record(self.elements.clone());
    }

    fn restore(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        if let Some(selected) = &self.selected {
            if !self.elements.iter().any(|e| e.id() == selected) {
                self.selected = None;
            }
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_text_uses_current_settings() {
        let mut store = WhiteboardStore::default();
        store.set_drawing_color("#ff0000");
        store.set_font_size(32).unwrap();

        let id = store.add_text(10.0, 20.0, "x^2").unwrap();
        match store.element(&id) {
            Some(Element::Text(t)) => {
                assert_eq!(t.content, "x^2");
                assert_eq!(t.font_size, 32);
                assert_eq!(t.color, "#ff0000");
                assert_eq!((t.x, t.y), (10.0, 20.0));
            }
            other => panic!("Expected text element, got {other:?}"),
        }
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = WhiteboardStore::default();
        let text = TextElement::new(0.0, 0.0, "a", 24, "#000");
        store.add_element(text.clone().into()).unwrap();
        assert_eq!(
            store.add_element(text.clone().into()),
            Err(StoreError::DuplicateId(text.id))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_cannot_change_variant() {
        let mut store = WhiteboardStore::default();
        let id = store.add_text(0.0, 0.0, "a").unwrap();

        let err = store
            .update_element(&id, |e| {
                *e = Element::Drawing(DrawingElement {
                    id: e.id().to_string(),
                    points: vec![],
                    color: "#000".into(),
                    stroke_width: 1.0,
                });
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::VariantChanged { from: "text", to: "drawing", .. }));
        assert!(matches!(store.element(&id), Some(Element::Text(_))));
    }

    #[test]
    fn test_update_cannot_change_id() {
        let mut store = WhiteboardStore::default();
        let id = store.add_text(0.0, 0.0, "a").unwrap();
        let err = store
            .update_element(&id, |e| {
                if let Element::Text(t) = e {
                    t.id = "other".into();
                }
            })
            .unwrap_err();
        assert_eq!(err, StoreError::IdChanged(id.clone()));
        assert!(store.element(&id).is_some());
    }

    #[test]
    fn test_move_and_edit_content() {
        let mut store = WhiteboardStore::default();
        let id = store.add_text(100.0, 50.0, "5+5").unwrap();

        store.move_element(&id, 20.0, -10.0).unwrap();
        store.set_text_content(&id, "5+5=10").unwrap();

        match store.element(&id) {
            Some(Element::Text(t)) => {
                assert_eq!((t.x, t.y), (120.0, 40.0));
                assert_eq!(t.content, "5+5=10");
            }
            other => panic!("Expected text element, got {other:?}"),
        }
    }

    #[test]
    fn test_append_point_extends_stroke() {
        let mut store = WhiteboardStore::default();
        store.set_mode(ToolMode::Draw);
        let id = store.add_drawing(vec![[0.0, 0.0]]).unwrap();
        store.append_point(&id, [4.0, 4.0]).unwrap();

        match store.element(&id) {
            Some(Element::Drawing(d)) => {
                assert_eq!(d.points.len(), 2);
                assert!(d.is_visible());
            }
            other => panic!("Expected drawing, got {other:?}"),
        }

        let text_id = store.add_text(0.0, 0.0, "a").unwrap();
        assert!(matches!(
            store.append_point(&text_id, [1.0, 1.0]),
            Err(StoreError::WrongKind { expected: "drawing", .. })
        ));
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut store = WhiteboardStore::default();
        let id = store.add_text(0.0, 0.0, "a").unwrap();
        store.select(Some(&id)).unwrap();
        assert_eq!(store.selected(), Some(id.as_str()));

        store.delete_element(&id).unwrap();
        assert!(store.selected().is_none());
        assert!(store.is_empty());
        assert!(matches!(store.delete_element(&id), Err(StoreError::ElementNotFound(_))));
    }

    #[test]
    fn test_select_unknown_fails() {
        let mut store = WhiteboardStore::default();
        assert!(store.select(Some("nope")).is_err());
        assert!(store.select(None).is_ok());
    }

    #[test]
    fn test_undo_redo_local_edits() {
        let mut store = WhiteboardStore::default();
        let a = store.add_text(0.0, 0.0, "a").unwrap();
        let b = store.add_text(0.0, 0.0, "b").unwrap();

        assert!(store.undo());
        assert!(store.element(&b).is_none());
        assert!(store.element(&a).is_some());

        assert!(store.redo());
        assert!(store.element(&b).is_some());

        assert!(store.undo());
        assert!(store.undo());
        assert!(store.is_empty());
        assert!(!store.undo());
    }

    #[test]
    fn test_history_capped_by_config() {
        let mut store = WhiteboardStore::new(StoreConfig { max_history: 2 });
        for i in 0..5 {
            store.add_text(0.0, 0.0, format!("{i}")).unwrap();
        }
        assert!(store.undo());
        assert!(store.undo());
        assert!(!store.undo());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_remote_replace_resets_history_and_stale_selection() {
        let mut store = WhiteboardStore::default();
        let id = store.add_text(0.0, 0.0, "local").unwrap();
        store.select(Some(&id)).unwrap();
        let before = store.revision();

        let remote = TextElement::new(1.0, 1.0, "remote", 24, "#000");
        store.replace_elements(vec![remote.clone().into()]);

        assert_eq!(store.elements(), &[Element::Text(remote)]);
        assert!(store.selected().is_none());
        assert!(!store.can_undo());
        assert!(store.revision() > before);
    }

    #[test]
    fn test_invalid_tool_settings_rejected() {
        let mut store = WhiteboardStore::default();
        assert!(store.set_stroke_width(0.0).is_err());
        assert!(store.set_stroke_width(f64::INFINITY).is_err());
        assert!(store.set_font_size(0).is_err());
        assert_eq!(store.stroke_width(), DEFAULT_STROKE_WIDTH);
        assert_eq!(store.font_size(), DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_clear_empty_is_noop() {
        let mut store = WhiteboardStore::default();
        store.clear();
        assert_eq!(store.revision(), 0);
        assert!(!store.can_undo());

        store.add_text(0.0, 0.0, "a").unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(store.undo());
        assert_eq!(store.len(), 1);
    }
}
