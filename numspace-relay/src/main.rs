//! numSpace relay — WebSocket room relay for the collaborative whiteboard.
//!
//! Environment:
//! - `PORT` — listen port (default 3001)
//! - `RELAY_ALLOWED_ORIGIN` — browser origin allowed to connect
//!   (default `http://localhost:5173`, `*` for any)
//! - `RUST_LOG` — log filter (default `info`)

use log::info;
use numspace_collab::server::{RelayServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    match &config.allowed_origin {
        Some(origin) => info!("Starting numSpace relay on {} (origin {origin})", config.bind_addr),
        None => info!("Starting numSpace relay on {} (any origin)", config.bind_addr),
    }

    let server = RelayServer::new(config);
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
