use crate::locate::EngineLocator;
use crate::uci::{parse_uci_message, UciMessage};
use crate::{EngineError, SearchBudget};
use chess::format_uci_move;
use cozy_chess::Move;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};

/// Default bound on the `uci`/`isready` exchange.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on a single search.
const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack added on top of a movetime budget before the search is abandoned.
const MOVETIME_GRACE: Duration = Duration::from_secs(2);

/// How long an engine gets to exit after `quit` before it is killed.
const QUIT_GRACE: Duration = Duration::from_secs(1);

/// Where to find the engine and how long to wait for it.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub locator: EngineLocator,
    pub handshake_timeout: Duration,
    pub search_timeout: Duration,
}

impl EngineSettings {
    pub fn new(locator: EngineLocator) -> Self {
        Self {
            locator,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Hard upper bound for one search under `budget`.
    pub fn search_limit(&self, budget: SearchBudget) -> Duration {
        match budget {
            SearchBudget::Depth(_) => self.search_timeout,
            SearchBudget::MoveTime(time) => self.search_timeout.max(time + MOVETIME_GRACE),
        }
    }
}

/// One running engine process, owned by a single search call.
pub struct EngineProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl EngineProcess {
    /// Spawn the engine at `path`. The child is killed if this handle is dropped.
    pub async fn spawn(path: &Path) -> Result<Self, EngineError> {
        tracing::debug!(path = %path.display(), "Spawning engine process");
        let mut child = tokio::process::Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!(path = %path.display(), "Failed to spawn engine: {}", e);
                EngineError::Spawn(e)
            })?;

        let stdin = child.stdin.take().ok_or(EngineError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(EngineError::NoStdout)?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        tracing::trace!("UCI >> {}", cmd);
        self.stdin.write_all(cmd.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read lines until one parses into a message accepted by `want`.
    async fn wait_for(
        &mut self,
        stage: &'static str,
        want: impl Fn(&UciMessage) -> bool,
    ) -> Result<UciMessage, EngineError> {
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                tracing::warn!(stage, "Engine stdout EOF");
                return Err(EngineError::Closed(stage));
            };
            let line = line.trim();
            tracing::trace!("UCI << {}", line);

            match parse_uci_message(line) {
                Ok(UciMessage::Info(info)) => {
                    tracing::trace!(depth = ?info.depth, score = ?info.score, "Engine info");
                }
                Ok(msg) if want(&msg) => return Ok(msg),
                Ok(msg) => tracing::trace!("Ignoring UCI message: {:?}", msg),
                Err(_) => {}
            }
        }
    }

    /// `uci` → `uciok`, then `isready` → `readyok`.
    pub async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send("uci").await?;
        self.wait_for("uci", |msg| matches!(msg, UciMessage::UciOk))
            .await?;
        self.send("isready").await?;
        self.wait_for("isready", |msg| matches!(msg, UciMessage::ReadyOk))
            .await?;
        tracing::debug!("Engine handshake complete");
        Ok(())
    }

    /// Search `fen` under `budget`. `Ok(None)` means the engine answered
    /// without a usable move.
    pub async fn best_move(
        &mut self,
        fen: &str,
        budget: SearchBudget,
    ) -> Result<Option<Move>, EngineError> {
        self.send("ucinewgame").await?;
        self.send(&format!("position fen {}", fen)).await?;
        self.send(&budget.go_command()).await?;

        let msg = self
            .wait_for("search", |msg| matches!(msg, UciMessage::BestMove { .. }))
            .await?;
        match msg {
            UciMessage::BestMove { mv, .. } => Ok(mv),
            _ => Ok(None),
        }
    }

    /// Ask the engine to quit, and kill it if it does not exit promptly.
    /// Returns the exit status once the process has been reaped.
    pub async fn shutdown(mut self) -> Option<ExitStatus> {
        let _ = self.send("quit").await;

        match tokio::time::timeout(QUIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(?status, "Engine exited");
                return Some(status);
            }
            Ok(Err(e)) => tracing::warn!("Failed to wait for engine exit: {}", e),
            Err(_) => tracing::debug!("Engine ignored quit, killing"),
        }

        if let Err(e) = self.child.kill().await {
            tracing::warn!("Failed to kill engine: {}", e);
        }
        self.child.try_wait().ok().flatten()
    }
}

/// Run one complete search in a fresh engine process.
///
/// The process is torn down before returning on every path. `Ok(None)` means
/// the engine finished but produced no usable move.
#[tracing::instrument(level = "info", skip(settings, budget), fields(budget = %budget))]
pub async fn search(
    settings: &EngineSettings,
    fen: &str,
    budget: SearchBudget,
) -> Result<Option<Move>, EngineError> {
    let path = settings.locator.resolve()?;
    let mut process = EngineProcess::spawn(&path).await?;

    let result = run_search(&mut process, settings, fen, budget).await;
    process.shutdown().await;

    match &result {
        Ok(Some(mv)) => tracing::info!("Engine move: {}", format_uci_move(*mv)),
        Ok(None) => tracing::info!("Engine returned no move"),
        Err(e) => tracing::warn!("Engine search failed: {}", e),
    }
    result
}

async fn run_search(
    process: &mut EngineProcess,
    settings: &EngineSettings,
    fen: &str,
    budget: SearchBudget,
) -> Result<Option<Move>, EngineError> {
    tokio::time::timeout(settings.handshake_timeout, process.handshake())
        .await
        .map_err(|_| EngineError::Timeout {
            stage: "handshake",
            limit: settings.handshake_timeout,
        })??;

    let limit = settings.search_limit(budget);
    tokio::time::timeout(limit, process.best_move(fen, budget))
        .await
        .map_err(|_| EngineError::Timeout {
            stage: "search",
            limit,
        })?
}
