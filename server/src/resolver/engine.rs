use ::engine::{search, EngineSettings};
use async_trait::async_trait;

use super::{MoveResolver, ResolutionOutcome, ResolutionRequest, ResolverError};

/// Resolves moves by spawning a local UCI engine for every request.
pub struct EngineResolver {
    settings: EngineSettings,
}

impl EngineResolver {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl MoveResolver for EngineResolver {
    fn name(&self) -> &'static str {
        "engine"
    }

    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionOutcome {
        match search(&self.settings, &request.fen, request.budget).await {
            Ok(Some(mv)) => ResolutionOutcome::Move(mv),
            Ok(None) => ResolutionOutcome::NoResult(ResolverError::NoMove),
            Err(e) => ResolutionOutcome::NoResult(e.into()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::resolver::mock::{install_fake_engine, replying_engine, SPAWN_LOCK};
    use ::engine::{EngineLocator, SearchBudget};
    use std::time::Duration;

    fn request() -> ResolutionRequest {
        ResolutionRequest {
            fen: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".to_string(),
            budget: SearchBudget::Depth(3),
        }
    }

    #[tokio::test]
    async fn test_engine_resolver_returns_engine_move() {
        let _guard = SPAWN_LOCK.lock().await;
        let dir = tempfile::tempdir().unwrap();
        let name = install_fake_engine(dir.path(), &replying_engine("g8f6"));

        let locator = EngineLocator::new(dir.path()).with_binary_name(name);
        let resolver = EngineResolver::new(
            EngineSettings::new(locator).with_search_timeout(Duration::from_secs(5)),
        );

        match resolver.resolve(&request()).await {
            ResolutionOutcome::Move(mv) => assert_eq!(chess::format_uci_move(mv), "g8f6"),
            other => panic!("expected a move, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_engine_without_a_move_is_no_result() {
        let _guard = SPAWN_LOCK.lock().await;
        let dir = tempfile::tempdir().unwrap();
        let name = install_fake_engine(dir.path(), &replying_engine("(none)"));

        let locator = EngineLocator::new(dir.path()).with_binary_name(name);
        let resolver = EngineResolver::new(EngineSettings::new(locator));

        assert!(matches!(
            resolver.resolve(&request()).await,
            ResolutionOutcome::NoResult(ResolverError::NoMove)
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_no_result() {
        let dir = tempfile::tempdir().unwrap();
        let locator = EngineLocator::new(dir.path()).with_binary_name("absent");
        let resolver = EngineResolver::new(EngineSettings::new(locator));

        match resolver.resolve(&request()).await {
            ResolutionOutcome::NoResult(ResolverError::EngineNotFound(path)) => {
                assert!(path.ends_with("absent"));
            }
            other => panic!("expected EngineNotFound, got {:?}", other),
        }
    }
}
