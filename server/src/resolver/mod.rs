//! Move resolution strategies and the ordered chain that tries them.
//!
//! A resolver never fails the caller: every problem it hits is folded into a
//! tagged [`ResolutionOutcome::NoResult`] so the chain can fall through to the
//! next strategy.

mod chain;
mod engine;
#[cfg(test)]
pub(crate) mod mock;
mod remote;

pub use chain::{ChainOutcome, StrategyChain};
pub use self::engine::EngineResolver;
pub use remote::RemoteEvalResolver;

use ::engine::{EngineError, SearchBudget};
use async_trait::async_trait;
use cozy_chess::Move;
use std::path::PathBuf;

/// One position plus the budget a resolver may spend on it.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub fen: String,
    pub budget: SearchBudget,
}

/// Result of asking one resolver for a move.
#[derive(Debug)]
pub enum ResolutionOutcome {
    Move(Move),
    NoResult(ResolverError),
}

/// Why a resolver produced no move. Logged by the chain, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Engine binary not found at {0}")]
    EngineNotFound(PathBuf),
    #[error("Engine binary unusable: {0}")]
    EngineUnusable(String),
    #[error("Engine failure: {0}")]
    Engine(#[source] EngineError),
    #[error("Remote evaluation unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("Resolver returned no move")]
    NoMove,
    #[error("Budget {0} is not supported by this resolver")]
    UnsupportedBudget(SearchBudget),
}

impl ResolverError {
    /// Configuration or environment defects that operators need to fix.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            ResolverError::EngineNotFound(_)
                | ResolverError::EngineUnusable(_)
                | ResolverError::UnsupportedBudget(_)
        )
    }
}

impl From<EngineError> for ResolverError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(path) => ResolverError::EngineNotFound(path),
            err @ (EngineError::Unusable { .. } | EngineError::UnsupportedPlatform(_)) => {
                ResolverError::EngineUnusable(err.to_string())
            }
            other => ResolverError::Engine(other),
        }
    }
}

/// A pluggable source of reply moves.
#[async_trait]
pub trait MoveResolver: Send + Sync {
    /// Short name used in logs and in the reply metadata.
    fn name(&self) -> &'static str;

    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionOutcome;
}
