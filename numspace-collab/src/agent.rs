//! Client sync agent: keeps a [`WhiteboardStore`] and a relay room in
//! agreement without feedback loops.
//!
//! Inbound snapshots and broadcasts overwrite the local collection. Outbound,
//! every local change is sent as the full collection unless it serializes to
//! exactly the last state received from the relay ([`EchoGuard`]).
//!
//! The guard compares values, not origins. It starts out holding the empty
//! collection, so a fresh client with nothing on its board never overwrites
//! a populated room. A local edit that happens to reproduce the last remote
//! state is not sent, and a snapshot applied on join does not arm the guard.

use thiserror::Error;
use tokio::sync::mpsc;

use numspace_core::{normalize_room_id, Element, StoreError, WhiteboardStore};

use crate::client::{SyncClient, SyncEvent};
use crate::protocol::ProtocolError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Canonical serialization used for echo comparison.
pub fn serialize_elements(elements: &[Element]) -> Result<String, ProtocolError> {
    serde_json::to_string(elements).map_err(|e| ProtocolError::Serialization(e.to_string()))
}

/// Serialized empty collection; the guard's initial remote state.
const EMPTY_STATE: &str = "[]";

/// Remembers the last remote state and suppresses sends that would echo it.
#[derive(Debug, Clone)]
pub struct EchoGuard {
    last_remote: String,
}

impl Default for EchoGuard {
    fn default() -> Self {
        Self {
            last_remote: EMPTY_STATE.to_string(),
        }
    }
}

impl EchoGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `elements` as the last state received from the relay.
    pub fn remember(&mut self, elements: &[Element]) -> Result<(), ProtocolError> {
        self.last_remote = serialize_elements(elements)?;
        Ok(())
    }

    /// Whether a local state serialized as `local` should go out.
    pub fn should_send(&self, local: &str) -> bool {
        self.last_remote != local
    }

    pub fn last_remote(&self) -> &str {
        &self.last_remote
    }

    /// Back to the initial state: only an empty board is suppressed.
    pub fn reset(&mut self) {
        self.last_remote = EMPTY_STATE.to_string();
    }
}

/// A joined room: one relay connection plus the echo guard for it.
pub struct SyncAgent {
    client: SyncClient,
    events: mpsc::Receiver<SyncEvent>,
    room_id: String,
    guard: EchoGuard,
}

impl SyncAgent {
    /// Connect to `server_url` and join `room_id` (normalized first).
    pub async fn activate(server_url: &str, room_id: &str) -> Result<Self, AgentError> {
        let room_id = normalize_room_id(room_id)?;
        let mut client = SyncClient::new(server_url);
        let events = client
            .take_event_rx()
            .ok_or(ProtocolError::ConnectionClosed)?;

        client.connect().await?;
        client.join(&room_id).await?;
        log::info!("Joined room {room_id}");

        Ok(Self {
            client,
            events,
            room_id,
            guard: EchoGuard::new(),
        })
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn guard(&self) -> &EchoGuard {
        &self.guard
    }

    /// Wait for the next event from the relay. `None` once the connection is
    /// gone and every event has been drained.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Apply an inbound event to `store`. Returns whether the local element
    /// collection changed.
    pub fn apply(&mut self, store: &mut WhiteboardStore, event: &SyncEvent) -> Result<bool, AgentError> {
        match event {
            SyncEvent::Snapshot(elements) => {
                // An empty room must not wipe what this client already has
                if elements.is_empty() {
                    log::debug!("Empty snapshot for room {}", self.room_id);
                    return Ok(false);
                }
                store.replace_elements(elements.clone());
                Ok(true)
            }
            SyncEvent::ElementsUpdated(elements) => {
                self.guard.remember(elements)?;
                store.replace_elements(elements.clone());
                Ok(true)
            }
            SyncEvent::PeerJoined(peer) => {
                log::info!("Peer {peer} joined room {}", self.room_id);
                Ok(false)
            }
            SyncEvent::Connected => Ok(false),
            SyncEvent::Disconnected => {
                log::warn!("Lost connection to room {}", self.room_id);
                Ok(false)
            }
        }
    }

    /// Push the local collection unless it echoes the last remote state.
    /// Returns whether an update was sent.
    pub async fn local_changed(&mut self, elements: &[Element]) -> Result<bool, AgentError> {
        let local = serialize_elements(elements)?;
        if !self.guard.should_send(&local) {
            log::debug!("Suppressed echo of remote state in room {}", self.room_id);
            return Ok(false);
        }
        self.client.send_update(elements).await?;
        Ok(true)
    }

    /// [`SyncAgent::local_changed`] for the store's current elements.
    pub async fn sync_store(&mut self, store: &WhiteboardStore) -> Result<bool, AgentError> {
        self.local_changed(store.elements()).await
    }

    /// Leave the room and close the connection.
    pub async fn deactivate(mut self) {
        self.client.disconnect().await;
        log::info!("Left room {}", self.room_id);
    }
}
