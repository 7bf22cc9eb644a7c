//! tidekv Server Binary
//!
//! Starts the TCP server for tidekv.

use std::sync::Arc;

use clap::Parser;
use tidekv::network::Server;
use tidekv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// tidekv Server
#[derive(Parser, Debug)]
#[command(name = "tidekv-server")]
#[command(about = "In-memory RESP key-value store with expiring keys")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Background expiry sweep period in milliseconds (0 disables it)
    #[arg(short, long, default_value = "100")]
    sweep_interval_ms: u64,

    /// Close connections idle for this many milliseconds (0 = never)
    #[arg(short, long, default_value = "0")]
    read_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tidekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("tidekv server v{}", tidekv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .sweep_interval_ms(args.sweep_interval_ms)
        .read_timeout_ms(args.read_timeout_ms)
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    engine.close();
    tracing::info!("Server stopped");
}
