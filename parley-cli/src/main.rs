use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use parley_server::{RelayConfig, SignalingService, router};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley", version, about = "Signaling relay for parley calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the signaling relay.
    Serve {
        #[arg(long, env = "PARLEY_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// JSON relay settings; flags below override it.
        #[arg(long, env = "PARLEY_CONFIG")]
        config: Option<PathBuf>,

        #[arg(long, env = "PARLEY_MAX_PEERS")]
        max_peers: Option<usize>,

        /// Grace period before a dropped peer is removed (ms).
        #[arg(long, env = "PARLEY_DISCONNECT_GRACE_MS")]
        disconnect_grace_ms: Option<u64>,

        /// Events buffered per subscriber before new ones are dropped.
        #[arg(long, env = "PARLEY_PUSH_BUFFER")]
        push_buffer: Option<usize>,
    },
    /// Prints the default relay settings as JSON.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            config,
            max_peers,
            disconnect_grace_ms,
            push_buffer,
        } => {
            init_tracing();

            let mut relay = match config {
                Some(path) => load_config(&path)?,
                None => RelayConfig::default(),
            };
            apply_overrides(&mut relay, max_peers, disconnect_grace_ms, push_buffer)?;

            serve(bind, relay).await?;
        }
        Commands::Config => {
            let json = serde_json::to_string_pretty(&RelayConfig::default())?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parley_server=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: &Path) -> Result<RelayConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: RelayConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid relay config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid relay config {}", path.display()))?;
    Ok(config)
}

fn apply_overrides(
    config: &mut RelayConfig,
    max_peers: Option<usize>,
    disconnect_grace_ms: Option<u64>,
    push_buffer: Option<usize>,
) -> Result<()> {
    if let Some(max_peers) = max_peers {
        config.max_peers_per_room = max_peers;
    }
    if let Some(grace) = disconnect_grace_ms {
        config.disconnect_grace_ms = grace;
    }
    if let Some(buffer) = push_buffer {
        config.push_buffer = buffer;
    }
    config.validate().context("Invalid relay flags")?;
    Ok(())
}

async fn serve(bind: SocketAddr, config: RelayConfig) -> Result<()> {
    println!("{}", "Starting parley relay...".green().bold());
    println!("   Listening:  {}", bind.to_string().cyan());
    println!("   Room limit: {}", config.max_peers_per_room);
    println!(
        "   Grace:      {} ms",
        config.disconnect_grace_ms.to_string().yellow()
    );

    let service = SignalingService::new(config);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!(%bind, "Relay listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Relay server failed")?;

    println!("{}", "Relay stopped".green().bold());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
