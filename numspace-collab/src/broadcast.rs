//! Room-scoped fan-out to every member except the originator.
//!
//! Each room gets one tokio broadcast channel. Frames are encoded once and
//! shared behind an `Arc`; every subscriber gets its own receiver buffering
//! up to `capacity` frames. A receiver that falls further behind loses the
//! oldest frames (`RecvError::Lagged`).
//!
//! Groups hold no locks of their own. They live inside the relay, which is
//! already behind a single mutex.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::ConnectionId;

/// A pre-encoded frame tagged with the connection that caused it.
#[derive(Debug)]
pub struct Envelope {
    pub origin: ConnectionId,
    pub frame: Arc<str>,
}

impl Envelope {
    /// Whether this frame must be withheld from `connection`.
    pub fn is_from(&self, connection: &ConnectionId) -> bool {
        &self.origin == connection
    }
}

pub type EnvelopeReceiver = broadcast::Receiver<Arc<Envelope>>;

/// Statistics for one broadcast group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub messages_sent: u64,
    pub active_peers: usize,
}

/// Membership and fan-out channel for a single room.
pub struct BroadcastGroup {
    sender: broadcast::Sender<Arc<Envelope>>,
    peers: HashSet<ConnectionId>,
    capacity: usize,
    messages_sent: u64,
}

impl BroadcastGroup {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            peers: HashSet::new(),
            capacity,
            messages_sent: 0,
        }
    }

    /// Enroll a connection. Returns its receiver for this room's frames.
    pub fn add_peer(&mut self, peer: ConnectionId) -> EnvelopeReceiver {
        self.peers.insert(peer);
        self.sender.subscribe()
    }

    pub fn remove_peer(&mut self, peer: &ConnectionId) -> bool {
        self.peers.remove(peer)
    }

    /// Queue `frame` for every member except `origin`.
    ///
    /// The origin's own receiver still sees the envelope; its connection
    /// loop skips it via [`Envelope::is_from`]. Returns the number of other
    /// members the frame was queued for.
    pub fn broadcast_from(&mut self, origin: &ConnectionId, frame: impl Into<Arc<str>>) -> usize {
        let envelope = Arc::new(Envelope {
            origin: origin.clone(),
            frame: frame.into(),
        });
        let receivers = self.sender.send(envelope).unwrap_or(0);
        self.messages_sent += 1;
        let own = usize::from(self.peers.contains(origin));
        receivers.saturating_sub(own)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn has_peer(&self, peer: &ConnectionId) -> bool {
        self.peers.contains(peer)
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            messages_sent: self.messages_sent,
            active_peers: self.peers.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Maps room ids to their broadcast groups.
///
/// Groups track who is connected right now; they are dropped once empty.
/// Room *state* lives in the registry and outlives its group.
pub struct RoomManager {
    groups: HashMap<String, BroadcastGroup>,
    default_capacity: usize,
}

impl RoomManager {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            groups: HashMap::new(),
            default_capacity,
        }
    }

    pub fn get_or_create(&mut self, room_id: &str) -> &mut BroadcastGroup {
        let capacity = self.default_capacity;
        self.groups
            .entry(room_id.to_string())
            .or_insert_with(|| BroadcastGroup::new(capacity))
    }

    pub fn get(&self, room_id: &str) -> Option<&BroadcastGroup> {
        self.groups.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut BroadcastGroup> {
        self.groups.get_mut(room_id)
    }

    /// Drop the group if nobody is left in it.
    pub fn remove_if_empty(&mut self, room_id: &str) -> bool {
        if self.groups.get(room_id).is_some_and(|g| g.peer_count() == 0) {
            self.groups.remove(room_id);
            return true;
        }
        false
    }

    /// Number of rooms with at least one group.
    pub fn room_count(&self) -> usize {
        self.groups.len()
    }
}
