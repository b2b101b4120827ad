//! WebSocket client for the relay.
//!
//! Provides:
//! - Connection lifecycle (connect, disconnect)
//! - Join and whole-state update sends
//! - Typed inbound events on an mpsc channel
//!
//! Inbound frames whose elements do not decode into [`Element`] are logged and
//! dropped here; they never reach the application.

use std::sync::Arc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use numspace_core::Element;

use crate::protocol::{ClientMessage, ConnectionId, ProtocolError, ServerMessage};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events emitted by the sync client.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connection established
    Connected,
    /// Connection lost or closed
    Disconnected,
    /// Room snapshot received in answer to a join
    Snapshot(Vec<Element>),
    /// Another member replaced the room's elements
    ElementsUpdated(Vec<Element>),
    /// Another connection joined the room
    PeerJoined(ConnectionId),
}

impl From<ServerMessage<Element>> for SyncEvent {
    fn from(msg: ServerMessage<Element>) -> Self {
        match msg {
            ServerMessage::RoomState(state) => SyncEvent::Snapshot(state.elements),
            ServerMessage::ElementsUpdated(elements) => SyncEvent::ElementsUpdated(elements),
            ServerMessage::UserJoined(id) => SyncEvent::PeerJoined(id),
        }
    }
}

/// The sync client.
///
/// Owns one WebSocket to the relay, driven by a writer task and a reader
/// task. Sends go through a channel to the writer; inbound frames come back
/// as [`SyncEvent`]s.
pub struct SyncClient {
    /// Connection state
    state: Arc<RwLock<ConnectionState>>,

    /// Room most recently joined
    room_id: Option<String>,

    /// Channel to the WebSocket writer task
    outgoing_tx: Option<mpsc::Sender<String>>,

    /// Event receiver for the application
    event_rx: Option<mpsc::Receiver<SyncEvent>>,

    /// Event sender (cloned into the reader task)
    event_tx: mpsc::Sender<SyncEvent>,

    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,

    /// Server URL
    server_url: String,
}

impl SyncClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            room_id: None,
            outgoing_tx: None,
            event_rx: Some(event_rx),
            event_tx,
            writer: None,
            reader: None,
            server_url: server_url.into(),
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.event_rx.take()
    }

    /// Connect to the relay.
    ///
    /// Spawns background tasks for reading and writing WebSocket frames.
    pub async fn connect(&mut self) -> Result<(), ProtocolError> {
        *self.state.write().await = ConnectionState::Connecting;

        let (ws_stream, _) = match tokio_tungstenite::connect_async(&self.server_url).await {
            Ok(connected) => connected,
            Err(e) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ProtocolError::Handshake(e.to_string()));
            }
        };
        log::info!("Connected to relay at {}", self.server_url);

        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        // Writer task: forward outgoing channel to WebSocket
        let (out_tx, mut out_rx) = mpsc::channel::<String>(256);
        self.outgoing_tx = Some(out_tx);
        self.writer = Some(tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if ws_writer.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_writer.close().await;
        }));

        *self.state.write().await = ConnectionState::Connected;
        let _ = self.event_tx.send(SyncEvent::Connected).await;

        // Reader task: decode inbound frames into events
        let event_tx = self.event_tx.clone();
        let state = self.state.clone();
        self.reader = Some(tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match ServerMessage::<Element>::decode(text.as_str()) {
                        Ok(server_msg) => {
                            if event_tx.send(server_msg.into()).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => log::warn!("Ignoring undecodable frame from relay: {e}"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }

            // Connection lost
            *state.write().await = ConnectionState::Disconnected;
            let _ = event_tx.send(SyncEvent::Disconnected).await;
        }));

        Ok(())
    }

    /// Enroll in `room_id`. The relay answers with a snapshot event.
    pub async fn join(&mut self, room_id: &str) -> Result<(), ProtocolError> {
        let encoded = ClientMessage::<Element>::join(room_id).encode()?;
        self.send_text(encoded).await?;
        self.room_id = Some(room_id.to_string());
        Ok(())
    }

    /// Send the complete element collection of the joined room.
    pub async fn send_update(&self, elements: &[Element]) -> Result<(), ProtocolError> {
        let room_id = self.room_id.as_deref().ok_or(ProtocolError::ConnectionClosed)?;
        let encoded = ClientMessage::update(room_id, elements.to_vec()).encode()?;
        self.send_text(encoded).await
    }

    async fn send_text(&self, text: String) -> Result<(), ProtocolError> {
        if *self.state.read().await != ConnectionState::Connected {
            return Err(ProtocolError::ConnectionClosed);
        }
        let tx = self.outgoing_tx.as_ref().ok_or(ProtocolError::ConnectionClosed)?;
        tx.send(text).await.map_err(|_| ProtocolError::ConnectionClosed)
    }

    /// Close the connection. Nothing is sent or received afterwards.
    pub async fn disconnect(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        // Dropping the sender lets the writer flush and send a close frame
        self.outgoing_tx = None;
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        self.room_id = None;

        let mut state = self.state.write().await;
        if *state != ConnectionState::Disconnected {
            *state = ConnectionState::Disconnected;
            let _ = self.event_tx.try_send(SyncEvent::Disconnected);
        }
        log::info!("Disconnected from relay at {}", self.server_url);
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}
