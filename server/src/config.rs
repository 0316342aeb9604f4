//! Configuration for the chessplay server.
//!
//! Every value has a compile-time default and can be overridden at runtime
//! via a dedicated environment variable. Values are read through a lookup
//! function so tests can supply their own environment.

use engine::SearchBudget;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ENGINE_DIR: &str = "./engines/stockfish";
const DEFAULT_ENGINE_DEPTH: u8 = 3;
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REMOTE_URL: &str = "https://lichess.org/api";
const DEFAULT_REMOTE_DEPTH: u8 = 5;
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;
const DEFAULT_STRATEGIES: &str = "remote,engine";
const DEFAULT_CONFIG_DIR: &str = ".config/chessplay/data";
const DEV_DATA_DIR: &str = "./data";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// A move-resolution strategy that can appear in the configured ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Cloud evaluation API.
    Remote,
    /// Locally spawned UCI engine.
    Engine,
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" | "cloud" => Ok(StrategyKind::Remote),
            "engine" | "local" => Ok(StrategyKind::Engine),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub engine_dir: PathBuf,
    pub engine_binary: Option<String>,
    pub engine_budget: SearchBudget,
    pub engine_timeout: Duration,
    pub remote_url: String,
    pub remote_token: Option<String>,
    pub remote_depth: u8,
    pub remote_timeout: Duration,
    pub strategies: Vec<StrategyKind>,
    /// How long a session actor may sit without commands before it is stopped.
    pub session_idle: Duration,
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("CHESSPLAY_ENGINE_DEPTH and CHESSPLAY_ENGINE_MOVETIME_MS are mutually exclusive")]
    ConflictingBudget,
    #[error("Unknown strategy: {0:?}")]
    UnknownStrategy(String),
    #[error("Strategy listed more than once: {0:?}")]
    DuplicateStrategy(StrategyKind),
    #[error("At least one strategy must be configured")]
    NoStrategies,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let engine_depth = parse_opt::<u8>(&var, "CHESSPLAY_ENGINE_DEPTH")?;
        let engine_movetime = parse_opt::<u64>(&var, "CHESSPLAY_ENGINE_MOVETIME_MS")?;
        let engine_budget = match (engine_depth, engine_movetime) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingBudget),
            (Some(0), None) => return Err(ConfigError::Zero("CHESSPLAY_ENGINE_DEPTH")),
            (Some(depth), None) => SearchBudget::Depth(depth),
            (None, Some(0)) => return Err(ConfigError::Zero("CHESSPLAY_ENGINE_MOVETIME_MS")),
            (None, Some(ms)) => SearchBudget::MoveTime(Duration::from_millis(ms)),
            (None, None) => SearchBudget::Depth(DEFAULT_ENGINE_DEPTH),
        };

        let remote_depth = parse_opt::<u8>(&var, "CHESSPLAY_REMOTE_DEPTH")?
            .unwrap_or(DEFAULT_REMOTE_DEPTH);
        if remote_depth == 0 {
            return Err(ConfigError::Zero("CHESSPLAY_REMOTE_DEPTH"));
        }

        let engine_timeout = parse_secs(&var, "CHESSPLAY_ENGINE_TIMEOUT_SECS", DEFAULT_ENGINE_TIMEOUT_SECS)?;
        let remote_timeout = parse_secs(&var, "CHESSPLAY_REMOTE_TIMEOUT_SECS", DEFAULT_REMOTE_TIMEOUT_SECS)?;

        let session_idle = parse_secs(&var, "CHESSPLAY_SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?;

        let strategies = parse_strategies(
            &var("CHESSPLAY_STRATEGIES").unwrap_or_else(|| DEFAULT_STRATEGIES.to_string()),
        )?;

        let bind_raw = var("CHESSPLAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "CHESSPLAY_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        Ok(Self {
            engine_dir: var("CHESSPLAY_ENGINE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE_DIR)),
            engine_binary: var("CHESSPLAY_ENGINE_BINARY"),
            engine_budget,
            engine_timeout,
            remote_url: var("CHESSPLAY_REMOTE_URL")
                .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string()),
            remote_token: var("LICHESS_API_TOKEN"),
            remote_depth,
            remote_timeout,
            strategies,
            session_idle,
            data_dir: data_dir(&var),
            bind_addr,
        })
    }
}

/// Data directory for persisted sessions.
///
/// Priority:
/// 1. CHESSPLAY_DATA_DIR env variable if set
/// 2. $HOME/.config/chessplay/data if HOME is set
/// 3. ./data as fallback
fn data_dir(var: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = var("CHESSPLAY_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Parse a comma-separated strategy ordering such as `remote,engine`.
pub fn parse_strategies(raw: &str) -> Result<Vec<StrategyKind>, ConfigError> {
    let mut strategies = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let kind: StrategyKind = part.parse()?;
        if strategies.contains(&kind) {
            return Err(ConfigError::DuplicateStrategy(kind));
        }
        strategies.push(kind);
    }

    if strategies.is_empty() {
        return Err(ConfigError::NoStrategies);
    }
    Ok(strategies)
}

fn parse_opt<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    var(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}

fn parse_secs(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match parse_opt::<u64>(var, key)?.unwrap_or(default) {
        0 => Err(ConfigError::Zero(key)),
        secs => Ok(Duration::from_secs(secs)),
    }
}
