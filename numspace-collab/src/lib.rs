//! # numspace-collab — real-time relay for the numSpace whiteboard
//!
//! Clients join a room and exchange whole-state element updates through a
//! central WebSocket relay. The relay keeps the latest collection of every
//! room in memory, hands it to newcomers, and rebroadcasts each update to the
//! other members.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     WebSocket      ┌─────────────┐
//! │ SyncAgent   │ ◄─────────────────► │ RelayServer │
//! │ (per user)  │     JSON frames     │ (central)   │
//! └──────┬──────┘                     └──────┬──────┘
//!        │                                   │
//!        ▼                                   ▼
//! ┌─────────────┐                     ┌─────────────┐
//! │ Whiteboard  │                     │ Relay       │
//! │ Store       │                     │ (one lock)  │
//! └─────────────┘                     └──────┬──────┘
//!                                     ┌──────┴───────┐
//!                                     ▼              ▼
//!                              ┌────────────┐ ┌──────────────┐
//!                              │RoomRegistry│ │BroadcastGroup│
//!                              │ (state)    │ │ (fan-out)    │
//!                              └────────────┘ └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — JSON wire messages (`join`, `update-elements`, ...)
//! - [`registry`] — `RoomStore` trait and the in-memory registry
//! - [`broadcast`] — per-room fan-out excluding the originator
//! - [`relay`] — join / update / disconnect semantics, no I/O
//! - [`server`] — WebSocket accept loop and sessions
//! - [`client`] — WebSocket client with typed events
//! - [`agent`] — store ↔ relay synchronization with echo suppression

pub mod agent;
pub mod broadcast;
pub mod client;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;

// Re-exports for convenience
pub use agent::{AgentError, EchoGuard, SyncAgent};
pub use broadcast::{BroadcastGroup, BroadcastStats, Envelope, RoomManager};
pub use client::{ConnectionState, SyncClient, SyncEvent};
pub use protocol::{
    ClientMessage, ConnectionId, ProtocolError, RawElement, RelayInbound, RelayOutbound,
    ServerMessage,
};
pub use registry::{RegistryError, Room, RoomRegistry, RoomStore};
pub use relay::{JoinOutcome, Relay, RelayStats, UpdateOutcome};
pub use server::{RelayServer, ServerConfig, ServerStats};
