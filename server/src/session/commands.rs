use cozy_chess::{Move, Square};
use tokio::sync::oneshot;

use super::snapshot::{MoveOutcome, SessionSnapshot};

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Stored session {0} is corrupt: {1}")]
    Corrupt(String, String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// One legal move from the current position, in standard UCI form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMove {
    pub from: String,
    pub to: String,
    pub promotion: Option<char>,
    pub uci: String,
    pub is_capture: bool,
    pub is_check: bool,
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
pub enum SessionCommand {
    SubmitMove {
        candidate: Move,
        reply: oneshot::Sender<MoveOutcome>,
    },
    Reset {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    GetLegalMoves {
        from: Option<Square>,
        reply: oneshot::Sender<Vec<LegalMove>>,
    },
    Shutdown,
}
