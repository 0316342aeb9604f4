//! Wire types for the HTTP adapter and conversions from domain types.

use serde::{Deserialize, Serialize};

use crate::session::{LegalMove, MoveOutcome, Rejection, ReplyStatus, SessionSnapshot};

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub promotion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegalMovesQuery {
    pub from: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotDto {
    pub session_id: String,
    pub fen: String,
    pub side_to_move: String,
    pub fullmove_number: u16,
    pub status: String,
    pub terminal: bool,
    pub description: String,
    pub last_move: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyDto {
    NotAttempted,
    Played { resolver: String },
    Unavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoveOutcomeDto {
    pub fen: String,
    pub legal: bool,
    pub terminal: bool,
    pub status: String,
    pub reply_move: Option<String>,
    pub reply: ReplyDto,
    pub rejection: Option<String>,
    pub session: SnapshotDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LegalMoveDto {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    pub uci: String,
    pub is_capture: bool,
    pub is_check: bool,
}

impl From<SessionSnapshot> for SnapshotDto {
    fn from(snap: SessionSnapshot) -> Self {
        Self {
            session_id: snap.session_id,
            fen: snap.fen,
            side_to_move: snap.side_to_move.as_str().to_string(),
            fullmove_number: snap.fullmove_number,
            status: snap.status.as_str().to_string(),
            terminal: snap.status.is_terminal(),
            description: snap.status.to_string(),
            last_move: snap.last_move,
        }
    }
}

fn convert_rejection(rejection: Rejection) -> &'static str {
    match rejection {
        Rejection::IllegalMove => "illegal_move",
        Rejection::GameOver => "game_over",
    }
}

impl From<MoveOutcome> for MoveOutcomeDto {
    fn from(outcome: MoveOutcome) -> Self {
        let legal = outcome.legal();
        let terminal = outcome.terminal();
        let reply_move = outcome.reply_move().map(String::from);
        let reply = match outcome.reply {
            ReplyStatus::NotAttempted => ReplyDto::NotAttempted,
            ReplyStatus::Played { resolver, .. } => ReplyDto::Played {
                resolver: resolver.to_string(),
            },
            ReplyStatus::Unavailable => ReplyDto::Unavailable,
        };

        Self {
            fen: outcome.snapshot.fen.clone(),
            legal,
            terminal,
            status: outcome.snapshot.status.as_str().to_string(),
            reply_move,
            reply,
            rejection: outcome.rejection.map(|r| convert_rejection(r).to_string()),
            session: outcome.snapshot.into(),
        }
    }
}

impl From<LegalMove> for LegalMoveDto {
    fn from(mv: LegalMove) -> Self {
        Self {
            from: mv.from,
            to: mv.to,
            promotion: mv.promotion.map(String::from),
            uci: mv.uci,
            is_capture: mv.is_capture,
            is_check: mv.is_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{GameStatus, PieceColor, STARTING_FEN};

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            session_id: "s1".to_string(),
            fen: STARTING_FEN.to_string(),
            side_to_move: PieceColor::White,
            fullmove_number: 1,
            status: GameStatus::Ongoing,
            last_move: None,
        }
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = MoveOutcome {
            snapshot: snapshot(),
            rejection: None,
            reply: ReplyStatus::Played {
                mv: "e7e5".to_string(),
                resolver: "remote",
            },
        };
        let json = serde_json::to_value(MoveOutcomeDto::from(outcome)).unwrap();
        assert_eq!(json["legal"], true);
        assert_eq!(json["terminal"], false);
        assert_eq!(json["reply_move"], "e7e5");
        assert_eq!(json["reply"]["kind"], "played");
        assert_eq!(json["reply"]["resolver"], "remote");
        assert!(json["rejection"].is_null());
        assert_eq!(json["session"]["side_to_move"], "white");
    }

    #[test]
    fn test_rejected_outcome() {
        let outcome = MoveOutcome {
            snapshot: snapshot(),
            rejection: Some(Rejection::IllegalMove),
            reply: ReplyStatus::NotAttempted,
        };
        let dto = MoveOutcomeDto::from(outcome);
        assert!(!dto.legal);
        assert_eq!(dto.rejection.as_deref(), Some("illegal_move"));
        assert_eq!(dto.reply, ReplyDto::NotAttempted);
        assert_eq!(dto.reply_move, None);
    }

    #[test]
    fn test_terminal_snapshot() {
        let mut snap = snapshot();
        snap.status = GameStatus::Checkmate {
            winner: PieceColor::Black,
        };
        let dto = SnapshotDto::from(snap);
        assert!(dto.terminal);
        assert_eq!(dto.status, "checkmate");
        assert_eq!(dto.description, "black wins by checkmate");
    }
}
