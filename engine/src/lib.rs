//! UCI engine process adapter.
//!
//! Every search spawns its own engine process, runs the UCI handshake, sends
//! one position and one `go`, waits for `bestmove`, and tears the process
//! down again. Nothing is shared between calls.

pub mod locate;
pub mod process;
pub mod uci;

pub use locate::{EngineLocator, Platform};
pub use process::{search, EngineProcess, EngineSettings};
pub use uci::{parse_uci_message, UciError, UciMessage};

use std::path::PathBuf;
use std::time::Duration;

/// How much work a single search may do. Exactly one dimension is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBudget {
    /// Search to a fixed depth in plies.
    Depth(u8),
    /// Search for a fixed wall-clock duration.
    MoveTime(Duration),
}

impl SearchBudget {
    /// The UCI `go` command for this budget.
    pub fn go_command(&self) -> String {
        match self {
            SearchBudget::Depth(depth) => format!("go depth {}", depth),
            SearchBudget::MoveTime(time) => format!("go movetime {}", time.as_millis()),
        }
    }
}

impl std::fmt::Display for SearchBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchBudget::Depth(depth) => write!(f, "depth {}", depth),
            SearchBudget::MoveTime(time) => write!(f, "movetime {}ms", time.as_millis()),
        }
    }
}

/// Engine analysis information
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<cozy_chess::Move>, // Principal variation
    pub multipv: Option<u8>,
    pub nps: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i8), // Negative for being mated
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine binary not found at {0}")]
    NotFound(PathBuf),
    #[error("Engine binary at {path} is not usable: {source}")]
    Unusable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unsupported operating system: {0}")]
    UnsupportedPlatform(String),
    #[error("Failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Engine IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine has no stdin")]
    NoStdin,
    #[error("Engine has no stdout")]
    NoStdout,
    #[error("Engine closed its output during {0}")]
    Closed(&'static str),
    #[error("Engine timed out during {stage} after {limit:?}")]
    Timeout {
        stage: &'static str,
        limit: Duration,
    },
}
