//! agentos binary.
//!
//! Usage:
//!   agentos serve --config agentos.toml
//!   agentos serve --port 8080 --bind 0.0.0.0
//!   agentos serve --no-memory
//!   agentos repl
//!
//! # Environment Variables
//!
//! - `OLLAMA_HOST` - Inference service URL (overrides `[llm] host`)
//! - `RUST_LOG` - Log filter (default: info,agentos_api=debug,tower_http=debug)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use agentos_api::{run_repl, serve, AppState, MemorySession};
use agentos_engine::{build_engine, AgentConfig, ResourceMonitor};
use agentos_memory::ConversationStore;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agentos", version, about = "Local agent with a guarded shell")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Do not persist conversations
        #[arg(long)]
        no_memory: bool,
    },
    /// Chat from the terminal
    Repl {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AgentConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            AgentConfig::from_file(&path)
        }
        None => {
            tracing::info!("Using default configuration");
            Ok(AgentConfig::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agentos_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Serve {
            config,
            port,
            bind,
            no_memory,
        } => {
            let config = load_config(config)?;
            let engine = build_engine(&config)?;
            let monitor = ResourceMonitor::system(config.monitor);

            let mut state = AppState::new(engine, monitor);
            if no_memory {
                tracing::info!("Starting without memory persistence");
            } else {
                let db_path = config.memory.resolved_db_path();
                let store = ConversationStore::open(&db_path)?;
                state = state.with_memory(MemorySession::new(store, config.memory.context_limit)?);
            }

            let host = bind.unwrap_or(config.server.bind);
            if host == "0.0.0.0" {
                tracing::warn!(
                    "Server binding to 0.0.0.0 exposes the agent, and its shell, to every network interface."
                );
            }
            let addr: SocketAddr = format!("{}:{}", host, port.unwrap_or(config.server.port)).parse()?;
            serve(Arc::new(state), addr).await
        }
        Command::Repl { config } => {
            let config = load_config(config)?;
            let engine = build_engine(&config)?;
            let monitor = ResourceMonitor::system(config.monitor);

            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            run_repl(&engine, &monitor, stdin, &mut stdout).await
        }
    }
}
