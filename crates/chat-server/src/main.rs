//! Relay Chat server entry point.
//!
//! ```text
//! main()
//!  └─ load_config()        -- optional TOML file, CLI overrides
//!  └─ ServerState::new()   -- credential table + empty registries
//!  └─ run_server()         -- accept loop, one task per connection
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_server::application::ServerState;
use chat_server::infrastructure::network::listener::run_server;
use chat_server::infrastructure::storage::config::{load_config, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Relay Chat server.
///
/// Clients log in, create or join named sessions, and every message is
/// relayed to the other members of the sender's session.
#[derive(Debug, Parser)]
#[command(name = "chat-server", version)]
struct Cli {
    /// TCP port to listen on.  Overrides `server.port` from the config file.
    port: Option<u16>,

    /// Path to a TOML configuration file.
    #[arg(long, env = "CHAT_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind to.  Overrides `server.bind_address`.
    #[arg(long, env = "CHAT_SERVER_BIND")]
    bind: Option<String>,
}

impl Cli {
    /// Loads the config file (if any) and applies command-line overrides.
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut config = load_config(self.config.as_deref()).with_context(|| {
            format!(
                "failed to load configuration from {}",
                self.config
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            )
        })?;
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let credentials = config
        .credentials()
        .context("invalid [[users]] section")?;
    info!(
        "Relay Chat server starting with {} allowed user(s)",
        credentials.len()
    );
    let state = ServerState::new(credentials);

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; stopping accept loop");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let addr = config.bind_addr();
    run_server(&addr, state, running)
        .await
        .with_context(|| format!("chat server failed on {addr}"))?;

    info!("Relay Chat server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
