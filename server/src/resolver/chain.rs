use ::engine::{EngineLocator, EngineSettings, SearchBudget};
use chess::{format_uci_move, Game};
use cozy_chess::Move;

use super::{EngineResolver, MoveResolver, RemoteEvalResolver, ResolutionOutcome, ResolutionRequest};
use crate::config::{Config, StrategyKind};

struct ChainEntry {
    resolver: Box<dyn MoveResolver>,
    budget: SearchBudget,
}

/// Result of running the whole chain for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// A move that is legal in the requested position, in internal encoding.
    Move { mv: Move, resolver: &'static str },
    NoMoveAvailable,
}

/// Ordered list of resolvers, tried until one yields a legal move.
#[derive(Default)]
pub struct StrategyChain {
    entries: Vec<ChainEntry>,
}

impl StrategyChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver that will be asked with `budget`.
    pub fn with(mut self, resolver: impl MoveResolver + 'static, budget: SearchBudget) -> Self {
        self.entries.push(ChainEntry {
            resolver: Box::new(resolver),
            budget,
        });
        self
    }

    /// Build the chain in the configured strategy order.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let mut chain = Self::new();
        for kind in &config.strategies {
            chain = match kind {
                StrategyKind::Remote => chain.with(
                    RemoteEvalResolver::new(
                        config.remote_url.clone(),
                        config.remote_token.clone(),
                        config.remote_timeout,
                    )?,
                    SearchBudget::Depth(config.remote_depth),
                ),
                StrategyKind::Engine => {
                    let mut locator = EngineLocator::new(&config.engine_dir);
                    if let Some(name) = &config.engine_binary {
                        locator = locator.with_binary_name(name.clone());
                    }
                    let settings =
                        EngineSettings::new(locator).with_search_timeout(config.engine_timeout);
                    chain.with(EngineResolver::new(settings), config.engine_budget)
                }
            };
        }
        Ok(chain)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.resolver.name()).collect()
    }

    /// Ask each resolver in turn for a reply in `game`'s current position.
    ///
    /// Every proposed move is checked against the position before it is
    /// accepted; failures are logged and the next resolver is tried.
    #[tracing::instrument(level = "info", skip_all, fields(fen = %game.to_fen()))]
    pub async fn resolve(&self, game: &Game) -> ChainOutcome {
        let fen = game.to_fen();

        for entry in &self.entries {
            let name = entry.resolver.name();
            let request = ResolutionRequest {
                fen: fen.clone(),
                budget: entry.budget,
            };

            match entry.resolver.resolve(&request).await {
                ResolutionOutcome::Move(proposed) => {
                    let mv = game.normalize_move(proposed);
                    if game.is_legal(mv) {
                        tracing::info!(resolver = name, "Accepted move {}", format_uci_move(proposed));
                        return ChainOutcome::Move { mv, resolver: name };
                    }
                    tracing::warn!(
                        resolver = name,
                        "Discarding illegal move {}",
                        format_uci_move(proposed)
                    );
                }
                ResolutionOutcome::NoResult(reason) if reason.is_misconfiguration() => {
                    tracing::error!(resolver = name, "Resolver misconfigured: {}", reason);
                }
                ResolutionOutcome::NoResult(reason) => {
                    tracing::warn!(resolver = name, "No result: {}", reason);
                }
            }
        }

        tracing::warn!("All resolvers exhausted");
        ChainOutcome::NoMoveAvailable
    }
}
