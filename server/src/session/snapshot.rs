use chess::{GameStatus, PieceColor};

/// Immutable view of a session, taken between commands.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub fen: String,
    pub side_to_move: PieceColor,
    pub fullmove_number: u16,
    pub status: GameStatus,
    /// Last move played by either side, in UCI notation.
    pub last_move: Option<String>,
}

/// Why a submitted move was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    IllegalMove,
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    /// The human move was rejected or ended the game.
    NotAttempted,
    Played { mv: String, resolver: &'static str },
    /// Every strategy came back empty; it is still the opponent's turn.
    Unavailable,
}

/// Result of one `SubmitMove`, always reported after the whole exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub snapshot: SessionSnapshot,
    pub rejection: Option<Rejection>,
    pub reply: ReplyStatus,
}

impl MoveOutcome {
    pub fn legal(&self) -> bool {
        self.rejection.is_none()
    }

    pub fn terminal(&self) -> bool {
        self.snapshot.status.is_terminal()
    }

    pub fn reply_move(&self) -> Option<&str> {
        match &self.reply {
            ReplyStatus::Played { mv, .. } => Some(mv),
            _ => None,
        }
    }
}
