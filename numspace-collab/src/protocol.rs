//! JSON wire protocol between whiteboard clients and the relay.
//!
//! Every WebSocket text frame carries one adjacently tagged message:
//! ```text
//! {"event": "join",             "data": "ABC123"}
//! {"event": "update-elements",  "data": {"roomId": "ABC123", "elements": [...]}}
//! {"event": "room-state",       "data": {"elements": [...]}}
//! {"event": "user-joined",      "data": "<connection id>"}
//! {"event": "elements-updated", "data": [...]}
//! ```
//!
//! Messages are generic over the element type. The relay uses
//! [`RawElement`] (any JSON value) so payloads pass through untouched;
//! clients decode into typed [`numspace_core::Element`]s.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Element as the relay sees it: opaque JSON, never validated.
pub type RawElement = serde_json::Value;

/// Messages the relay decodes.
pub type RelayInbound = ClientMessage<RawElement>;
/// Messages the relay encodes.
pub type RelayOutbound = ServerMessage<RawElement>;

/// Relay-assigned identifier for one client connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Mint a fresh random connection id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload<E> {
    pub room_id: String,
    pub elements: Vec<E>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomStatePayload<E> {
    pub elements: Vec<E>,
}

/// Client → relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage<E> {
    /// Enroll in a room; answered with `room-state`
    Join(String),
    /// Full replacement of a room's elements
    UpdateElements(UpdatePayload<E>),
}

/// Relay → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage<E> {
    /// Full snapshot, sent once per join to the joiner only
    RoomState(RoomStatePayload<E>),
    /// Informational: another connection joined the room
    UserJoined(ConnectionId),
    /// Someone else replaced the room's elements
    ElementsUpdated(Vec<E>),
}

impl<E> ClientMessage<E> {
    pub fn join(room_id: impl Into<String>) -> Self {
        ClientMessage::Join(room_id.into())
    }

    pub fn update(room_id: impl Into<String>, elements: Vec<E>) -> Self {
        ClientMessage::UpdateElements(UpdatePayload {
            room_id: room_id.into(),
            elements,
        })
    }

    /// Event name as it appears on the wire.
    pub fn event(&self) -> &'static str {
        match self {
            ClientMessage::Join(_) => "join",
            ClientMessage::UpdateElements(_) => "update-elements",
        }
    }
}

impl<E: Serialize> ClientMessage<E> {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}

impl<E: DeserializeOwned> ClientMessage<E> {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

impl<E> ServerMessage<E> {
    pub fn room_state(elements: Vec<E>) -> Self {
        ServerMessage::RoomState(RoomStatePayload { elements })
    }

    pub fn user_joined(connection_id: ConnectionId) -> Self {
        ServerMessage::UserJoined(connection_id)
    }

    pub fn elements_updated(elements: Vec<E>) -> Self {
        ServerMessage::ElementsUpdated(elements)
    }

    pub fn event(&self) -> &'static str {
        match self {
            ServerMessage::RoomState(_) => "room-state",
            ServerMessage::UserJoined(_) => "user-joined",
            ServerMessage::ElementsUpdated(_) => "elements-updated",
        }
    }
}

impl<E: Serialize> ServerMessage<E> {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}

impl<E: DeserializeOwned> ServerMessage<E> {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

/// Protocol errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Handshake failed: {0}")]
    Handshake(String),
    #[error("Connection closed")]
    ConnectionClosed,
}
