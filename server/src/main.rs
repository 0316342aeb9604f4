//! chessplay: play chess against a cloud evaluation service or a local UCI
//! engine, over HTTP (`serve`) or in the terminal (`play`).

mod config;
mod persistence;
mod play;
mod resolver;
mod service;
mod session;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::SearchBudget;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use persistence::SessionStore;
use resolver::StrategyChain;
use session::SessionManager;

#[derive(Parser)]
#[command(name = "chessplay", about = "Play chess against a computer opponent")]
struct Cli {
    /// Defaults to `serve`.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API.
    Serve {
        /// Address to listen on (overrides CHESSPLAY_BIND_ADDR).
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Directory for session files (overrides CHESSPLAY_DATA_DIR).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Play in this terminal.
    Play {
        /// Engine search depth in plies.
        #[arg(long, conflicts_with = "movetime_ms")]
        depth: Option<u8>,
        /// Engine thinking time per move in milliseconds.
        #[arg(long)]
        movetime_ms: Option<u64>,
        /// Directory for session files (overrides CHESSPLAY_DATA_DIR).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve {
        bind: None,
        data_dir: None,
    }) {
        Commands::Serve { bind, data_dir } => {
            init_server_tracing();
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            serve(config).await
        }
        Commands::Play {
            depth,
            movetime_ms,
            data_dir,
        } => {
            let _guard = init_play_tracing();
            match (depth, movetime_ms) {
                (Some(0), _) | (_, Some(0)) => anyhow::bail!("search budget must be non-zero"),
                (Some(depth), _) => config.engine_budget = SearchBudget::Depth(depth),
                (_, Some(ms)) => {
                    config.engine_budget = SearchBudget::MoveTime(Duration::from_millis(ms))
                }
                (None, None) => {}
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            play_in_terminal(config).await
        }
    }
}

fn init_server_tracing() {
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();
}

/// Logs go to a daily file so they do not interleave with the board.
fn init_play_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = "logs";
    std::fs::create_dir_all(log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(log_dir, "chessplay");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    guard
}

fn build_manager(config: &Config) -> anyhow::Result<SessionManager> {
    let chain = StrategyChain::from_config(config).context("failed to build HTTP client")?;
    tracing::info!(strategies = ?chain.names(), "Strategy chain ready");
    tracing::info!("Using data directory: {}", config.data_dir.display());

    Ok(SessionManager::new(
        SessionStore::new(config.data_dir.clone()),
        chain,
    )
    .with_idle_timeout(config.session_idle))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting chessplay server");
    let manager = Arc::new(build_manager(&config)?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, service::router(manager))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn play_in_terminal(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting terminal game");
    let manager = build_manager(&config)?;

    println!("chessplay - terminal game (engine budget: {})", config.engine_budget);
    println!("Debug logs: logs/chessplay.YYYY-MM-DD");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    play::run(&manager, stdin, tokio::io::stdout()).await
}
