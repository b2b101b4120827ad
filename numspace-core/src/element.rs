//! Whiteboard elements: text annotations and freehand strokes.
//!
//! Wire shape (JSON, camelCase fields, `type` discriminant):
//! ```text
//! { "type": "text",    "id", "x", "y", "content", "fontSize", "color" }
//! { "type": "drawing", "id", "points": [[x, y], ...], "color", "strokeWidth" }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StoreError;

/// A single whiteboard object.
///
/// The variant is fixed at creation; edits may change any field except the
/// discriminant itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Text(TextElement),
    Drawing(DrawingElement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub content: String,
    pub font_size: u32,
    pub color: String,
}

impl TextElement {
    pub fn new(
        x: f64,
        y: f64,
        content: impl Into<String>,
        font_size: u32,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: new_element_id(),
            x,
            y,
            content: content.into(),
            font_size,
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingElement {
    pub id: String,
    /// Stroke samples in capture order.
    pub points: Vec<[f64; 2]>,
    pub color: String,
    pub stroke_width: f64,
}

impl DrawingElement {
    pub fn new(points: Vec<[f64; 2]>, color: impl Into<String>, stroke_width: f64) -> Self {
        Self {
            id: new_element_id(),
            points,
            color: color.into(),
            stroke_width,
        }
    }

    /// A stroke needs at least two points to produce a visible line.
    pub fn is_visible(&self) -> bool {
        self.points.len() >= 2
    }
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::Text(text) => &text.id,
            Element::Drawing(drawing) => &drawing.id,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            Element::Text(text) => &text.color,
            Element::Drawing(drawing) => &drawing.color,
        }
    }

    /// Discriminant name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Text(_) => "text",
            Element::Drawing(_) => "drawing",
        }
    }

    /// Whether `other` is the same variant as `self`.
    pub fn same_kind(&self, other: &Element) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Translate the element by (dx, dy). Drawings shift every point.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Element::Text(text) => {
                text.x += dx;
                text.y += dy;
            }
            Element::Drawing(drawing) => {
                for point in &mut drawing.points {
                    point[0] += dx;
                    point[1] += dy;
                }
            }
        }
    }

    /// Check the attribute constraints a locally created element must meet.
    pub fn validate(&self) -> Result<(), StoreError> {
        match self {
            Element::Text(text) if text.font_size == 0 => {
                Err(StoreError::InvalidFontSize(text.font_size))
            }
            Element::Drawing(drawing) if !valid_stroke_width(drawing.stroke_width) => {
                Err(StoreError::InvalidStrokeWidth(drawing.stroke_width))
            }
            _ => Ok(()),
        }
    }
}

impl From<TextElement> for Element {
    fn from(text: TextElement) -> Self {
        Element::Text(text)
    }
}

impl From<DrawingElement> for Element {
    fn from(drawing: DrawingElement) -> Self {
        Element::Drawing(drawing)
    }
}

pub(crate) fn valid_stroke_width(width: f64) -> bool {
    width.is_finite() && width > 0.0
}

/// Mint a fresh element identifier. UUID v4, so ids are never reused.
pub fn new_element_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_wire_shape() {
        let text = Element::Text(TextElement {
            id: "t1".to_string(),
            x: 100.0,
            y: 50.0,
            content: "5+5".to_string(),
            font_size: 24,
            color: "#000000".to_string(),
        });

        let value = serde_json::to_value(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "text",
                "id": "t1",
                "x": 100.0,
                "y": 50.0,
                "content": "5+5",
                "fontSize": 24,
                "color": "#000000"
            })
        );
    }

    #[test]
    fn test_drawing_wire_shape() {
        let value = json!({
            "type": "drawing",
            "id": "d1",
            "points": [[0.0, 0.0], [10.0, 12.5]],
            "color": "#ff0000",
            "strokeWidth": 2.0
        });

        let element: Element = serde_json::from_value(value).unwrap();
        match element {
            Element::Drawing(d) => {
                assert_eq!(d.id, "d1");
                assert_eq!(d.points, vec![[0.0, 0.0], [10.0, 12.5]]);
                assert_eq!(d.stroke_width, 2.0);
                assert!(d.is_visible());
            }
            other => panic!("Expected drawing, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_discriminant_rejected() {
        let value = json!({ "id": "t1", "x": 1.0, "y": 2.0 });
        assert!(serde_json::from_value::<Element>(value).is_err());
    }

    #[test]
    fn test_single_point_stroke_not_visible() {
        let drawing = DrawingElement::new(vec![[1.0, 1.0]], "#000000", 2.0);
        assert!(!drawing.is_visible());
    }

    #[test]
    fn test_translate_drawing_moves_all_points() {
        let stroke = DrawingElement::new(vec![[0.0, 0.0], [5.0, 5.0]], "#000", 1.0);
        let mut element = Element::from(stroke);
        element.translate(10.0, -2.0);
        match element {
            Element::Drawing(d) => assert_eq!(d.points, vec![[10.0, -2.0], [15.0, 3.0]]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_fresh_ids_unique() {
        let a = TextElement::new(0.0, 0.0, "a", 24, "#000");
        let b = TextElement::new(0.0, 0.0, "a", 24, "#000");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_validate_rejects_bad_attributes() {
        let text = Element::from(TextElement::new(0.0, 0.0, "x", 0, "#000"));
        assert!(matches!(text.validate(), Err(StoreError::InvalidFontSize(0))));

        let drawing = Element::from(DrawingElement::new(vec![], "#000", f64::NAN));
        assert!(matches!(drawing.validate(), Err(StoreError::InvalidStrokeWidth(_))));

        let ok = Element::from(DrawingElement::new(vec![], "#000", 3.0));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_same_kind() {
        let text = Element::from(TextElement::new(0.0, 0.0, "x", 12, "#000"));
        let drawing = Element::from(DrawingElement::new(vec![], "#000", 1.0));
        assert!(text.same_kind(&text.clone()));
        assert!(!text.same_kind(&drawing));
        assert_eq!(text.kind(), "text");
        assert_eq!(drawing.kind(), "drawing");
    }
}
