//! HTTP endpoints serving slot commentary to game clients.
//!
//! `slotvoice-web` exposes a [`SlotService`] over two GET routes guarded by a
//! shared secret:
//!
//! | Route | Mode | Mode-specific parameters |
//! |-------|------|--------------------------|
//! | `/api/generateresponse` | FULL | `reels`, `payout`, `bankroll` |
//! | `/api/slotsresponse` | PARTIAL | `status`, `speech` |
//!
//! Both take `key`, `userId?`, `timestamp?`, `games`, `wins`, `losses` and
//! `getDetails?`, and answer `{"elapsedMs", "response", "details"?}`.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use slotvoice::config::SlotConfig;
//! use slotvoice_web::{WebConfig, spawn_web};
//!
//! let slot_config = SlotConfig::from_env();
//! let service = Arc::new(slot_config.build_service()?);
//!
//! let config = WebConfig {
//!     access_key: slot_config.access_key.clone(),
//!     ..Default::default()
//! };
//! let addr = spawn_web(service, config).await?;
//! println!("Listening on http://{addr}");
//! ```

mod api;
mod server;

pub use api::{AppState, GenerateResponse, parse_session};
pub use server::build_router;

use std::net::SocketAddr;
use std::sync::Arc;

use slotvoice::service::SlotService;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Shared secret callers must send as `key`. `None` rejects every request.
    pub access_key: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            access_key: None,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(service: Arc<SlotService>, config: WebConfig) -> Result<SocketAddr, String> {
    let state = AppState {
        service,
        access_key: config.access_key.map(Arc::from),
    };
    server::start_server(build_router(state), config.bind_addr).await
}
