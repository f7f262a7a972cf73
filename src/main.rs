//! http2bus
//!
//! Bridges HTTP requests onto a request/response message bus.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ http server ──▶ route table ──▶ bridge::Translation
//!                                                      │  publish
//!                                                      ▼
//!                                                 ┌─────────┐
//!                                                 │   bus   │◀── responders
//!                                                 └────┬────┘
//!                                                      │  replies, End
//!     Client Response                                  ▼
//!     ◀────────── http server ◀── assembler ◀── reply of record
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use http2bus::bus::{EchoResponder, MemoryBus};
use http2bus::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use http2bus::http::HttpServer;
use http2bus::lifecycle::{spawn_signal_handler, Shutdown};
use http2bus::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "http2bus", version, about = "HTTP to message bus gateway")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "HTTP2BUS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "http2bus starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.listener.request_timeout_secs,
        routes = config.routes.len(),
        config_file = ?args.config,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bus = MemoryBus::new();
    for namespace in &config.bus.echo_namespaces {
        bus.subscribe(namespace.clone(), EchoResponder);
        tracing::info!(namespace = %namespace, "Echo responder attached");
    }

    // The watcher stops when dropped, so keep it for the lifetime of main.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, std::sync::Arc::new(bus));
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
