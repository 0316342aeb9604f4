pub mod actor;
pub mod commands;
pub mod handle;
pub mod snapshot;
pub mod state;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chess::Game;
use cozy_chess::{Move, Piece, Square};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::persistence::{PersistenceError, SessionStore};
use crate::resolver::StrategyChain;
use actor::{persist, run_session_actor};
pub use commands::{LegalMove, SessionError};
pub use handle::SessionHandle;
pub use snapshot::{MoveOutcome, Rejection, ReplyStatus, SessionSnapshot};
use state::SessionState;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Owns every live session. Spawns an actor task per session and restores
/// sessions from the store on first use after a restart or after the actor
/// idled out.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    store: Arc<SessionStore>,
    chain: Arc<StrategyChain>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(store: SessionStore, chain: StrategyChain) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store: Arc::new(store),
            chain: Arc::new(chain),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Stop a session's actor after this long without commands.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Start a new game from the standard position.
    pub async fn create_session(&self) -> SessionSnapshot {
        let session_id = Uuid::new_v4().to_string();
        let state = SessionState::new(session_id.clone(), Game::new(), self.chain.clone());
        persist(&state, &self.store);
        let snapshot = state.snapshot();

        let handle = self.spawn(state);
        self.sessions.write().await.insert(session_id.clone(), handle);

        tracing::info!(session_id = %session_id, "Created session");
        snapshot
    }

    fn spawn(&self, state: SessionState) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let handle = SessionHandle::new(state.session_id.clone(), cmd_tx);
        tokio::spawn(run_session_actor(
            state,
            cmd_rx,
            self.store.clone(),
            self.idle_timeout,
        ));
        handle
    }

    /// Find a live session, or bring a stored one back to life.
    pub async fn get_handle(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        let session_id = canonical_id(session_id)?;

        if let Some(handle) = self.sessions.read().await.get(&session_id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another request may have restored it while we waited for the lock.
        if let Some(handle) = sessions.get(&session_id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }
        sessions.remove(&session_id);
        // Drop idled-out actors of other sessions while we hold the lock.
        sessions.retain(|_, handle| !handle.is_closed());

        let game = match self.restore_game(&session_id) {
            Ok(game) => game,
            Err(SessionError::Corrupt(id, reason)) => {
                tracing::warn!(session_id = %id, "Session corrupt, starting over: {}", reason);
                Game::new()
            }
            Err(e) => return Err(e),
        };

        let state = SessionState::new(session_id.clone(), game, self.chain.clone());
        persist(&state, &self.store);
        let handle = self.spawn(state);
        sessions.insert(session_id.clone(), handle.clone());

        tracing::info!(session_id = %session_id, "Restored session");
        Ok(handle)
    }

    fn restore_game(&self, session_id: &str) -> Result<Game, SessionError> {
        let stored = match self.store.load(session_id) {
            Ok(Some(stored)) => stored,
            Ok(None) => return Err(SessionError::NotFound(session_id.to_string())),
            Err(PersistenceError::Json(e)) => {
                return Err(SessionError::Corrupt(session_id.to_string(), e.to_string()))
            }
            Err(e) => return Err(SessionError::Internal(e.to_string())),
        };

        Game::from_fen(&stored.fen)
            .map_err(|e| SessionError::Corrupt(session_id.to_string(), e.to_string()))
    }

    /// Run `op` against the session's actor. If the actor idled out between
    /// lookup and send, the command never reached it, so restore and retry once.
    async fn with_handle<T, F, Fut>(&self, session_id: &str, op: F) -> Result<T, SessionError>
    where
        F: Fn(SessionHandle) -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        let handle = self.get_handle(session_id).await?;
        match op(handle.clone()).await {
            Err(_) if handle.is_closed() => op(self.get_handle(session_id).await?).await,
            result => result,
        }
    }

    pub async fn submit_move(
        &self,
        session_id: &str,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Result<MoveOutcome, SessionError> {
        let candidate = Move {
            from,
            to,
            promotion,
        };
        self.with_handle(session_id, |handle| async move {
            handle.submit_move(candidate).await
        })
        .await
    }

    pub async fn reset(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        self.with_handle(session_id, |handle| async move { handle.reset().await })
            .await
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        self.with_handle(session_id, |handle| async move { handle.get_snapshot().await })
            .await
    }

    /// FEN of the session's current position.
    pub async fn current_position(&self, session_id: &str) -> Result<String, SessionError> {
        Ok(self.snapshot(session_id).await?.fen)
    }

    pub async fn legal_moves(
        &self,
        session_id: &str,
        from: Option<Square>,
    ) -> Result<Vec<LegalMove>, SessionError> {
        self.with_handle(session_id, |handle| async move {
            handle.get_legal_moves(from).await
        })
        .await
    }

    /// Stop a session's actor and forget its stored position.
    pub async fn close_session(&self, session_id: &str) -> Result<(), SessionError> {
        let session_id = canonical_id(session_id)?;
        let removed = self.sessions.write().await.remove(&session_id);

        let stored = self
            .store
            .load(&session_id)
            .map(|s| s.is_some())
            .unwrap_or(true);
        if removed.is_none() && !stored {
            return Err(SessionError::NotFound(session_id));
        }

        if let Some(handle) = removed {
            handle.shutdown().await;
            tracing::info!(session_id = handle.id(), "Closed session");
        }
        self.store
            .delete(&session_id)
            .map_err(|e| SessionError::Internal(e.to_string()))
    }
}

/// Session ids are UUIDs; anything else cannot name a session.
fn canonical_id(session_id: &str) -> Result<String, SessionError> {
    Uuid::parse_str(session_id)
        .map(|id| id.to_string())
        .map_err(|_| SessionError::NotFound(session_id.to_string()))
}
