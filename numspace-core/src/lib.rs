//! # numspace-core — whiteboard data model
//!
//! Element types shared by the relay and its clients, plus the client-side
//! state store that a sync agent reads from and writes into.
//!
//! - [`element`] — `Element` sum type (text / drawing) and its wire shape
//! - [`store`] — `WhiteboardStore`: elements, selection, tool mode, history
//! - [`history`] — bounded undo/redo snapshots
//! - [`room`] — room code generation and normalization

use thiserror::Error;

pub mod element;
pub mod history;
pub mod room;
pub mod store;

pub use element::{DrawingElement, Element, TextElement};
pub use history::History;
pub use room::{generate_room_code, normalize_room_id};
pub use store::{StoreConfig, ToolMode, WhiteboardStore};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Duplicate element id: {0}")]
    DuplicateId(String),
    #[error("Element {id} cannot change type from {from} to {to}")]
    VariantChanged {
        id: String,
        from: &'static str,
        to: &'static str,
    },
    #[error("Element {0} cannot change its id")]
    IdChanged(String),
    #[error("Element {id} is not a {expected} element")]
    WrongKind { id: String, expected: &'static str },
    #[error("Font size must be positive, got {0}")]
    InvalidFontSize(u32),
    #[error("Stroke width must be a positive number, got {0}")]
    InvalidStrokeWidth(f64),
    #[error("Invalid room id: {0:?}")]
    InvalidRoomId(String),
}
