use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber;

use noteguard::config::AppConfig;
use noteguard::notes::NoteRepository;
use noteguard::ratelimit::FixedWindowLimiter;
use noteguard::server::HttpServer;
use noteguard::store::RestCounterStore;

/// CLI arguments. Everything else comes from the environment.
#[derive(Parser, Debug)]
#[command(name = "noteguard")]
#[command(about = "Notes API protected by a distributed rate limiter")]
struct Args {
    /// Port to bind, overriding the PORT environment variable
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Best-effort .env load; the real environment wins.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    info!("Starting Noteguard");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration; missing store credentials halt startup here.
    let mut config = AppConfig::from_env()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    info!(addr = %config.server.socket_addr()?, "Configuration loaded");

    // Counter store client and the limiter over it
    let store = Arc::new(RestCounterStore::new(&config.store)?);
    let limiter = Arc::new(FixedWindowLimiter::new(store));
    info!(endpoint = %config.store.url, "Counter store client initialized");

    // Document store; the client connects lazily on first use
    let mongo = mongodb::Client::with_uri_str(&config.database.uri).await?;
    let repository = NoteRepository::new(
        mongo
            .database(&config.database.database)
            .collection("notes"),
    );
    info!(database = %config.database.database, "Document store client initialized");

    // Run the server with graceful shutdown on Ctrl+C or SIGTERM
    let server = HttpServer::new(&config.server, repository, limiter)?;
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Noteguard stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
