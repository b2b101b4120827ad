//! WebSocket relay server.
//!
//! Architecture:
//! ```text
//! Client A ──┐                     ┌── RoomRegistry (room → elements)
//!            ├── session task ──►  Relay (one mutex)
//! Client B ──┘        ▲            └── RoomManager (room → BroadcastGroup)
//!                     │                         │
//!                     └──── Envelope fan-out ◄──┘
//! ```
//!
//! One task per connection. A session decodes inbound text frames, runs the
//! matching [`Relay`] operation under the relay lock, and forwards broadcast
//! envelopes from its room to the socket, skipping the ones it caused.

use std::net::SocketAddr;
use std::sync::Arc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::broadcast::EnvelopeReceiver;
use crate::protocol::{ClientMessage, ConnectionId, RelayInbound, UpdatePayload};
use crate::relay::Relay;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// Browser origin allowed to connect (None = any)
    pub allowed_origin: Option<String>,
    /// Broadcast frames buffered per member before it starts lagging
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            allowed_origin: Some(DEFAULT_ALLOWED_ORIGIN.to_string()),
            broadcast_capacity: 256,
        }
    }
}

impl ServerConfig {
    /// Configuration from `PORT` and `RELAY_ALLOWED_ORIGIN`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    ///
    /// An unparsable `PORT` falls back to the default. `RELAY_ALLOWED_ORIGIN=*`
    /// disables the origin check.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid PORT {raw:?}, using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let allowed_origin = match lookup("RELAY_ALLOWED_ORIGIN") {
            Some(origin) if origin.trim() == "*" => None,
            Some(origin) if !origin.trim().is_empty() => Some(origin.trim().to_string()),
            _ => Some(DEFAULT_ALLOWED_ORIGIN.to_string()),
        };

        Self {
            bind_addr: format!("0.0.0.0:{port}"),
            allowed_origin,
            ..Self::default()
        }
    }
}

/// Server statistics.
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub failed_handshakes: u64,
    pub total_messages: u64,
    pub total_bytes: u64,
    pub malformed_messages: u64,
    pub active_rooms: usize,
    pub updates_dropped: u64,
}

/// The relay server.
pub struct RelayServer {
    config: ServerConfig,
    relay: Arc<Mutex<Relay>>,
    stats: Arc<RwLock<ServerStats>>,
}

impl RelayServer {
    pub fn new(config: ServerConfig) -> Self {
        let relay = Relay::new(config.broadcast_capacity);
        Self {
            config,
            relay: Arc::new(Mutex::new(relay)),
            stats: Arc::new(RwLock::new(ServerStats::default())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Bind the configured address and serve until the task is dropped.
    pub async fn run(&self) -> Result<(), BoxError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        log::info!("Relay listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), BoxError> {
        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::error!("Failed to accept connection: {e}");
                    continue;
                }
            };
            log::debug!("New TCP connection from {addr}");

            let relay = self.relay.clone();
            let stats = self.stats.clone();
            let allowed_origin = self.config.allowed_origin.clone();

            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, relay, stats, allowed_origin).await {
                    log::error!("Connection error from {addr}: {e}");
                }
            });
        }
    }

    /// Handshake, then run one session to completion and clean up after it.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        relay: Arc<Mutex<Relay>>,
        stats: Arc<RwLock<ServerStats>>,
        allowed_origin: Option<String>,
    ) -> Result<(), BoxError> {
        let check = move |request: &Request, response: Response| {
            check_origin(request, allowed_origin.as_deref()).map(|()| response)
        };
        let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, check).await {
            Ok(ws) => ws,
            Err(e) => {
                stats.write().await.failed_handshakes += 1;
                log::warn!("WebSocket handshake with {addr} failed: {e}");
                return Ok(());
            }
        };

        let conn = ConnectionId::new();
        log::info!("Connection {conn} established from {addr}");
        {
            let mut s = stats.write().await;
            s.total_connections += 1;
            s.active_connections += 1;
        }

        let result = Self::run_session(&conn, ws_stream, &relay, &stats).await;

        // Cleanup: membership only, room state stays
        let relay_stats = {
            let mut relay = relay.lock().await;
            relay.disconnect(&conn);
            relay.stats()
        };
        {
            let mut s = stats.write().await;
            s.active_connections -= 1;
            s.active_rooms = relay_stats.rooms;
        }
        log::info!("Connection {conn} from {addr} closed");

        result
    }

    async fn run_session(
        conn: &ConnectionId,
        ws_stream: WebSocketStream<TcpStream>,
        relay: &Mutex<Relay>,
        stats: &RwLock<ServerStats>,
    ) -> Result<(), BoxError> {
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let mut broadcast_rx: Option<EnvelopeReceiver> = None;

        loop {
            tokio::select! {
                // Incoming WebSocket message
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            {
                                let mut s = stats.write().await;
                                s.total_messages += 1;
                                s.total_bytes += text.len() as u64;
                            }

                            match RelayInbound::decode(text.as_str()) {
                                Ok(ClientMessage::Join(room_id)) => {
                                    let outcome = relay.lock().await.join(conn, &room_id)?;
                                    broadcast_rx = Some(outcome.receiver);
                                    // Snapshot goes out before anything queued on the new receiver
                                    ws_sender.send(Message::Text(outcome.snapshot.into())).await?;

                                    let rooms = relay.lock().await.stats().rooms;
                                    stats.write().await.active_rooms = rooms;
                                }

                                Ok(ClientMessage::UpdateElements(UpdatePayload { room_id, elements })) => {
                                    let dropped = {
                                        let mut relay = relay.lock().await;
                                        relay.update(conn, &room_id, elements)?;
                                        relay.stats().updates_dropped
                                    };
                                    stats.write().await.updates_dropped = dropped;
                                }

                                Err(e) => {
                                    stats.write().await.malformed_messages += 1;
                                    log::warn!("Failed to decode message from {conn}: {e}");
                                }
                            }
                        }

                        Some(Ok(Message::Binary(data))) => {
                            log::warn!("Ignoring {} byte binary frame from {conn}", data.len());
                        }

                        Some(Ok(Message::Close(_))) | None => {
                            log::debug!("Connection {conn} closed by peer");
                            break;
                        }

                        Some(Err(e)) => {
                            log::error!("WebSocket error from {conn}: {e}");
                            break;
                        }

                        // Pings are answered by tungstenite itself
                        _ => {}
                    }
                }

                // Outgoing broadcast frame
                envelope = async {
                    match broadcast_rx.as_mut() {
                        Some(rx) => rx.recv().await,
                        // Not in a room yet: wait forever
                        None => std::future::pending().await,
                    }
                } => {
                    match envelope {
                        Ok(envelope) => {
                            if envelope.is_from(conn) {
                                continue;
                            }
                            ws_sender.send(Message::Text(envelope.frame.to_string().into())).await?;
                        }
                        Err(RecvError::Lagged(n)) => {
                            log::warn!("Connection {conn} lagged by {n} frames");
                        }
                        Err(RecvError::Closed) => {
                            broadcast_rx = None;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Get server statistics.
    pub async fn stats(&self) -> ServerStats {
        self.stats.read().await.clone()
    }

    /// Shared handle to the relay state.
    pub fn relay(&self) -> Arc<Mutex<Relay>> {
        self.relay.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }
}

/// Whether a handshake carrying `origin` may proceed.
///
/// Requests without an `Origin` header come from non-browser clients and are
/// let through; the check only constrains browsers.
pub fn origin_allowed(origin: Option<&str>, allowed: Option<&str>) -> bool {
    match (origin, allowed) {
        (_, None) | (None, _) => true,
        (Some(origin), Some(allowed)) => origin.eq_ignore_ascii_case(allowed),
    }
}

fn check_origin(request: &Request, allowed: Option<&str>) -> Result<(), ErrorResponse> {
    let origin = request
        .headers()
        .get("origin")
        .and_then(|value| value.to_str().ok());

    if origin_allowed(origin, allowed) {
        return Ok(());
    }

    log::warn!("Rejecting handshake from origin {origin:?}");
    let mut response = ErrorResponse::new(Some("Origin not allowed".to_string()));
    *response.status_mut() = StatusCode::FORBIDDEN;
    Err(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.allowed_origin.as_deref(), Some("http://localhost:5173"));
        assert_eq!(config.broadcast_capacity, 256);
    }

    #[test]
    fn test_config_from_env_vars() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("RELAY_ALLOWED_ORIGIN", "https://board.example"),
        ]));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.allowed_origin.as_deref(), Some("https://board.example"));
    }

    #[test]
    fn test_config_without_env_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.allowed_origin.as_deref(), Some(DEFAULT_ALLOWED_ORIGIN));
    }

    #[test]
    fn test_config_invalid_port_falls_back() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "not-a-port")]));
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "70000")]));
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
    }

    #[test]
    fn test_config_wildcard_origin() {
        let config = ServerConfig::from_lookup(lookup(&[("RELAY_ALLOWED_ORIGIN", "*")]));
        assert!(config.allowed_origin.is_none());
    }

    #[test]
    fn test_origin_allowed() {
        let allowed = Some("http://localhost:5173");
        assert!(origin_allowed(Some("http://localhost:5173"), allowed));
        assert!(origin_allowed(Some("HTTP://LOCALHOST:5173"), allowed));
        assert!(!origin_allowed(Some("http://evil.example"), allowed));
        assert!(origin_allowed(None, allowed));
        assert!(origin_allowed(Some("http://anything"), None));
    }

    #[test]
    fn test_server_creation() {
        let server = RelayServer::with_defaults();
        assert_eq!(server.bind_addr(), "0.0.0.0:3001");
        assert_eq!(server.config().broadcast_capacity, 256);
    }

    #[tokio::test]
    async fn test_server_stats_initial() {
        let server = RelayServer::with_defaults();
        let stats = server.stats().await;
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.total_messages, 0);
        assert_eq!(stats.active_rooms, 0);
        assert_eq!(server.relay().lock().await.stats().rooms, 0);
    }
}
