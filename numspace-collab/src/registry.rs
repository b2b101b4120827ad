//! Room registry: the authoritative element collection of every room.
//!
//! Rooms are created on first join and live for the lifetime of the process.
//! State is replaced wholesale on every update; there is no merge and no
//! per-element diffing. The registry does no locking of its own: the relay
//! owns it and serializes access (see [`crate::relay`]).

use std::collections::HashMap;
use thiserror::Error;

use crate::protocol::RawElement;

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("Unknown room: {0}")]
    UnknownRoom(String),
}

/// One room's stored state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Room {
    pub id: String,
    /// Element collection, in the order the last writer sent it
    pub elements: Vec<RawElement>,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            elements: Vec::new(),
        }
    }
}

/// Keyed store of room state with create-on-first-access semantics.
///
/// The relay only talks to this trait, so the in-memory map can be swapped
/// for a persistent or shared store without touching protocol handling.
pub trait RoomStore: Send + 'static {
    /// Return the room, creating it empty if absent. Idempotent.
    fn ensure(&mut self, room_id: &str) -> &Room;

    /// Current state of a room, if it exists.
    fn get(&self, room_id: &str) -> Option<&Room>;

    /// Overwrite a room's elements. Fails if the room was never created.
    fn replace(&mut self, room_id: &str, elements: Vec<RawElement>) -> Result<(), RegistryError>;

    fn room_count(&self) -> usize;
}

/// Process-memory room store.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for RoomRegistry {
    fn ensure(&mut self, room_id: &str) -> &Room {
        self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            log::info!("Created room {room_id}");
            Room::new(room_id)
        })
    }

    fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    fn replace(&mut self, room_id: &str, elements: Vec<RawElement>) -> Result<(), RegistryError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RegistryError::UnknownRoom(room_id.to_string()))?;
        room.elements = elements;
        Ok(())
    }

    fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ensure_creates_empty_room() {
        let mut registry = RoomRegistry::new();
        let room = registry.ensure("ABC123");
        assert_eq!(room.id, "ABC123");
        assert!(room.elements.is_empty());
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn test_ensure_idempotent() {
        let mut registry = RoomRegistry::new();
        registry.ensure("R");
        registry.replace("R", vec![json!({"id": "a"})]).unwrap();

        // A second ensure must not reset existing state
        let room = registry.ensure("R");
        assert_eq!(room.elements, vec![json!({"id": "a"})]);
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn test_get_missing() {
        let registry = RoomRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_replace_overwrites_without_merge() {
        let mut registry = RoomRegistry::new();
        registry.ensure("R");
        registry
            .replace("R", vec![json!({"id": "a"}), json!({"id": "b"})])
            .unwrap();
        registry.replace("R", vec![json!({"id": "c"})]).unwrap();

        assert_eq!(registry.get("R").unwrap().elements, vec![json!({"id": "c"})]);
    }

    #[test]
    fn test_replace_unknown_room() {
        let mut registry = RoomRegistry::new();
        assert_eq!(
            registry.replace("ghost", vec![]),
            Err(RegistryError::UnknownRoom("ghost".to_string()))
        );
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_room_ids_case_sensitive() {
        let mut registry = RoomRegistry::new();
        registry.ensure("abc");
        registry.ensure("ABC");
        assert_eq!(registry.room_count(), 2);
        assert_eq!(registry.get("abc").unwrap().id, "abc");
        assert_eq!(registry.get("ABC").unwrap().id, "ABC");
    }
}
