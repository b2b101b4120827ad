//! Relay protocol logic: join, update, disconnect.
//!
//! `Relay` owns the room store and the broadcast groups. It does no I/O:
//! each operation runs to completion synchronously and hands back the frames
//! the caller must write. The server keeps one `Relay` behind a mutex, so
//! every replace-then-broadcast step is atomic with respect to other messages.
//!
//! ```text
//! join(conn, room)            update(conn, room, elements)
//!   ├─ leave previous room      ├─ replace(room, elements) ── unknown? drop
//!   ├─ ensure(room)             └─ elements-updated → members ∖ {conn}
//!   ├─ subscribe conn
//!   ├─ room-state → conn only
//!   └─ user-joined → members ∖ {conn}
//! ```

use std::collections::HashMap;

use crate::broadcast::{EnvelopeReceiver, RoomManager};
use crate::protocol::{ConnectionId, ProtocolError, RawElement, RelayOutbound, ServerMessage};
use crate::registry::{RegistryError, RoomRegistry, RoomStore};

/// What a join produced.
pub struct JoinOutcome {
    /// Encoded `room-state` frame for the joiner
    pub snapshot: String,
    /// The joiner's subscription to the room's broadcasts
    pub receiver: EnvelopeReceiver,
    /// How many other members were sent `user-joined`
    pub notified: usize,
    /// Room the connection was in before, if any
    pub left: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// State replaced and queued for `delivered` other members
    Applied { delivered: usize },
    /// Room unknown; nothing stored, nothing sent
    Dropped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub rooms: usize,
    pub occupied_rooms: usize,
    pub members: usize,
    pub updates_applied: u64,
    pub updates_dropped: u64,
}

pub struct Relay<S: RoomStore = RoomRegistry> {
    store: S,
    groups: RoomManager,
    /// Connection → the one room it is currently in
    memberships: HashMap<ConnectionId, String>,
    updates_applied: u64,
    updates_dropped: u64,
}

impl Relay<RoomRegistry> {
    /// In-memory relay; `broadcast_capacity` frames are buffered per member.
    pub fn new(broadcast_capacity: usize) -> Self {
        Self::with_store(RoomRegistry::new(), broadcast_capacity)
    }
}

impl<S: RoomStore> Relay<S> {
    pub fn with_store(store: S, broadcast_capacity: usize) -> Self {
        Self {
            store,
            groups: RoomManager::new(broadcast_capacity),
            memberships: HashMap::new(),
            updates_applied: 0,
            updates_dropped: 0,
        }
    }

    /// Enroll `conn` in `room_id`, leaving any room it was in before.
    pub fn join(&mut self, conn: &ConnectionId, room_id: &str) -> Result<JoinOutcome, ProtocolError> {
        let notice = RelayOutbound::user_joined(conn.clone()).encode()?;
        let snapshot = {
            let room = self.store.ensure(room_id);
            ServerMessage::room_state(room.elements.iter().collect::<Vec<_>>()).encode()?
        };

        let left = self.leave(conn);

        let group = self.groups.get_or_create(room_id);
        let receiver = group.add_peer(conn.clone());
        let notified = group.broadcast_from(conn, notice);
        self.memberships.insert(conn.clone(), room_id.to_string());

        log::info!("Connection {conn} joined room {room_id} ({notified} other member(s))");

        Ok(JoinOutcome {
            snapshot,
            receiver,
            notified,
            left,
        })
    }

    /// Replace `room_id`'s elements with `elements` and fan them out to
    /// every other member. The payload is trusted as the complete next state.
    pub fn update(
        &mut self,
        conn: &ConnectionId,
        room_id: &str,
        elements: Vec<RawElement>,
    ) -> Result<UpdateOutcome, ProtocolError> {
        let frame = ServerMessage::elements_updated(elements.iter().collect::<Vec<_>>()).encode()?;
        let count = elements.len();

        match self.store.replace(room_id, elements) {
            Ok(()) => {}
            Err(RegistryError::UnknownRoom(room)) => {
                self.updates_dropped += 1;
                log::debug!("Dropped update from {conn} for unknown room {room}");
                return Ok(UpdateOutcome::Dropped);
            }
        }
        self.updates_applied += 1;

        let delivered = self
            .groups
            .get_mut(room_id)
            .map_or(0, |group| group.broadcast_from(conn, frame));

        log::debug!("Room {room_id} replaced by {conn}: {count} element(s), {delivered} recipient(s)");
        Ok(UpdateOutcome::Applied { delivered })
    }

    /// Forget `conn`'s membership. Room state is left untouched.
    pub fn disconnect(&mut self, conn: &ConnectionId) -> Option<String> {
        let left = self.leave(conn);
        if let Some(room_id) = &left {
            log::info!("Connection {conn} left room {room_id}");
        }
        left
    }

    /// Current stored elements of a room.
    pub fn snapshot(&self, room_id: &str) -> Option<&[RawElement]> {
        self.store.get(room_id).map(|room| room.elements.as_slice())
    }

    /// Room `conn` is currently joined to.
    pub fn room_of(&self, conn: &ConnectionId) -> Option<&str> {
        self.memberships.get(conn).map(String::as_str)
    }

    pub fn member_count(&self, room_id: &str) -> usize {
        self.groups.get(room_id).map_or(0, |group| group.peer_count())
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            rooms: self.store.room_count(),
            occupied_rooms: self.groups.room_count(),
            members: self.memberships.len(),
            updates_applied: self.updates_applied,
            updates_dropped: self.updates_dropped,
        }
    }

    fn leave(&mut self, conn: &ConnectionId) -> Option<String> {
        let room_id = self.memberships.remove(conn)?;
        if let Some(group) = self.groups.get_mut(&room_id) {
            group.remove_peer(conn);
        }
        self.groups.remove_if_empty(&room_id);
        Some(room_id)
    }
}
