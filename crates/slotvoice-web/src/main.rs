//! Slot commentary HTTP server.
//!
//! # Usage
//!
//! ```bash
//! ACCESS_KEY=... OPENAI_URL=https://my-res.openai.azure.com OPENAI_KEY=... \
//!   OPENAI_DEPLOYMENT_ID=gpt-35 cargo run -p slotvoice-web -- --port 7071
//! ```
//!
//! Then:
//!
//! ```bash
//! curl 'http://127.0.0.1:7071/api/slotsresponse?key=...&games=4&wins=0&losses=2&status=lose&speech=Here+we+go'
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use slotvoice::config::SlotConfig;
use slotvoice_web::{WebConfig, spawn_web};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Serve slot-machine commentary over HTTP.
#[derive(Parser)]
#[command(about = "Slot-machine commentary HTTP server")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Directory for the exchange log (overrides SLOTVOICE_STORE_DIR).
    #[arg(long)]
    store_dir: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut slot_config = SlotConfig::from_env();
    if let Some(dir) = args.store_dir {
        slot_config.store_dir = Some(dir);
    }
    if slot_config.access_key.is_none() {
        warn!("ACCESS_KEY is not set; every request will be rejected");
    }
    match &slot_config.store_dir {
        Some(dir) => info!("Logging exchanges under {}", dir.display()),
        None => info!("Exchange logging disabled"),
    }

    let service = Arc::new(slot_config.build_service().map_err(|e| e.to_string())?);

    let config = WebConfig {
        bind_addr: SocketAddr::new(args.bind, args.port),
        access_key: slot_config.access_key.clone(),
    };
    let addr = spawn_web(service, config).await?;
    println!("Listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to wait for Ctrl-C: {e}"))?;
    info!("Shutting down");
    Ok(())
}
