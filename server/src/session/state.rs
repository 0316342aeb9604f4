use std::sync::Arc;

use chess::{format_square, format_uci_move, Game, PieceColor, PieceKind};
use cozy_chess::{Move, Piece, Square};

use super::commands::LegalMove;
use super::snapshot::{MoveOutcome, Rejection, ReplyStatus, SessionSnapshot};
use crate::persistence::{now_timestamp, StoredSession};
use crate::resolver::{ChainOutcome, StrategyChain};

/// Internal mutable state, owned entirely by the session actor. No locks.
pub(crate) struct SessionState {
    pub session_id: String,
    pub game: Game,
    pub last_move: Option<String>,
    chain: Arc<StrategyChain>,
}

impl SessionState {
    pub fn new(session_id: String, game: Game, chain: Arc<StrategyChain>) -> Self {
        Self {
            session_id,
            game,
            last_move: None,
            chain,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            fen: self.game.to_fen(),
            side_to_move: self.game.side_to_move(),
            fullmove_number: self.game.fullmove_number(),
            status: self.game.status(),
            last_move: self.last_move.clone(),
        }
    }

    pub fn to_stored(&self) -> StoredSession {
        StoredSession {
            session_id: self.session_id.clone(),
            fen: self.game.to_fen(),
            updated_at: now_timestamp(),
        }
    }

    fn rejected(&self, rejection: Rejection) -> MoveOutcome {
        MoveOutcome {
            snapshot: self.snapshot(),
            rejection: Some(rejection),
            reply: ReplyStatus::NotAttempted,
        }
    }

    /// Apply a human move and, if the game goes on, the chain's reply.
    pub async fn submit_move(&mut self, candidate: Move) -> MoveOutcome {
        if self.game.status().is_terminal() {
            return self.rejected(Rejection::GameOver);
        }

        let mv = self.game.normalize_move(candidate);
        if !self.game.is_legal(mv) {
            tracing::info!("Rejected illegal move {}", format_uci_move(candidate));
            return self.rejected(Rejection::IllegalMove);
        }
        let played = self.play(mv);
        tracing::info!("Human played {}", played);

        let status = self.game.status();
        if status.is_terminal() {
            tracing::info!(status = status.as_str(), "Game over: {}", status);
            return MoveOutcome {
                snapshot: self.snapshot(),
                rejection: None,
                reply: ReplyStatus::NotAttempted,
            };
        }

        let chained = self.chain.resolve(&self.game).await;
        let reply = match chained {
            ChainOutcome::Move { mv, resolver } if self.game.is_legal(mv) => {
                let played = self.play(mv);
                ReplyStatus::Played {
                    mv: played,
                    resolver,
                }
            }
            ChainOutcome::Move { mv, resolver } => {
                tracing::error!(resolver, "Chain returned illegal move {}", format_uci_move(mv));
                ReplyStatus::Unavailable
            }
            ChainOutcome::NoMoveAvailable => ReplyStatus::Unavailable,
        };

        let status = self.game.status();
        if status.is_terminal() {
            tracing::info!(status = status.as_str(), "Game over: {}", status);
        }

        MoveOutcome {
            snapshot: self.snapshot(),
            rejection: None,
            reply,
        }
    }

    /// Play a move already known to be legal; returns it in UCI notation.
    fn play(&mut self, mv: Move) -> String {
        let uci = format_uci_move(self.game.to_uci(mv));
        // Legality was checked by the caller against this same position.
        if self.game.make_move(mv).is_ok() {
            self.last_move = Some(uci.clone());
        }
        uci
    }

    pub fn reset(&mut self) -> SessionSnapshot {
        self.game = Game::new();
        self.last_move = None;
        self.snapshot()
    }

    pub fn legal_moves(&self, from: Option<Square>) -> Vec<LegalMove> {
        let board = self.game.position();
        let us = board.side_to_move();

        self.game
            .legal_moves()
            .into_iter()
            .filter(|mv| from.is_none_or(|sq| mv.from == sq))
            .map(|mv| {
                let uci = self.game.to_uci(mv);
                let is_castle = board.color_on(mv.to) == Some(us);
                let is_en_passant = board.piece_on(mv.from) == Some(Piece::Pawn)
                    && mv.from.file() != mv.to.file()
                    && board.piece_on(mv.to).is_none();
                let is_capture =
                    !is_castle && (board.piece_on(mv.to).is_some() || is_en_passant);

                let mut after = board.clone();
                after.play_unchecked(mv);

                LegalMove {
                    from: format_square(uci.from),
                    to: format_square(uci.to),
                    promotion: mv
                        .promotion
                        .map(|p| PieceKind::from(p).symbol(PieceColor::Black)),
                    uci: format_uci_move(uci),
                    is_capture,
                    is_check: !after.checkers().is_empty(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::mock::{Script, ScriptedResolver};
    use chess::{parse_uci_move, GameStatus, STARTING_FEN};
    use engine::SearchBudget;
    use std::sync::atomic::Ordering;

    fn state_with(chain: StrategyChain) -> SessionState {
        SessionState::new("test".to_string(), Game::new(), Arc::new(chain))
    }

    fn replying(script: Script) -> SessionState {
        state_with(
            StrategyChain::new().with(ScriptedResolver::new("scripted", script), SearchBudget::Depth(3)),
        )
    }

    fn mv(s: &str) -> Move {
        parse_uci_move(s).unwrap()
    }

    fn fen_after(moves: &[&str]) -> String {
        let mut game = Game::new();
        for m in moves {
            game.make_move(mv(m)).unwrap();
        }
        game.to_fen()
    }

    #[tokio::test]
    async fn test_human_move_then_reply() {
        let mut state = replying(Script::Move("e7e5"));
        let outcome = state.submit_move(mv("e2e4")).await;

        assert!(outcome.legal());
        assert!(!outcome.terminal());
        assert_eq!(outcome.reply_move(), Some("e7e5"));
        assert_eq!(outcome.snapshot.fen, fen_after(&["e2e4", "e7e5"]));
        assert_eq!(outcome.snapshot.last_move.as_deref(), Some("e7e5"));
        assert_eq!(outcome.snapshot.side_to_move, PieceColor::White);
    }

    #[tokio::test]
    async fn test_reply_sees_position_after_human_move() {
        let resolver = ScriptedResolver::new("scripted", Script::FirstLegal);
        let seen = resolver.seen();
        let mut state = state_with(StrategyChain::new().with(resolver, SearchBudget::Depth(3)));

        state.submit_move(mv("d2d4")).await;
        assert_eq!(*seen.lock().unwrap(), vec![fen_after(&["d2d4"])]);
    }

    #[tokio::test]
    async fn test_empty_origin_square_is_illegal() {
        let resolver = ScriptedResolver::new("scripted", Script::FirstLegal);
        let calls = resolver.calls();
        let mut state = state_with(StrategyChain::new().with(resolver, SearchBudget::Depth(3)));

        let outcome = state.submit_move(mv("e4e5")).await;
        assert_eq!(outcome.rejection, Some(Rejection::IllegalMove));
        assert_eq!(outcome.reply, ReplyStatus::NotAttempted);
        assert_eq!(outcome.snapshot.fen, STARTING_FEN);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_checkmate_skips_reply() {
        let resolver = ScriptedResolver::new("scripted", Script::FirstLegal);
        let calls = resolver.calls();
        let mut state = state_with(StrategyChain::new().with(resolver, SearchBudget::Depth(3)));
        // Fool's mate, one move from the end.
        state.game =
            Game::from_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2")
                .unwrap();

        let outcome = state.submit_move(mv("d8h4")).await;
        assert!(outcome.legal());
        assert!(outcome.terminal());
        assert_eq!(
            outcome.snapshot.status,
            GameStatus::Checkmate {
                winner: PieceColor::Black
            }
        );
        assert_eq!(outcome.reply, ReplyStatus::NotAttempted);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let again = state.submit_move(mv("e2e4")).await;
        assert_eq!(again.rejection, Some(Rejection::GameOver));
        assert_eq!(again.snapshot.fen, outcome.snapshot.fen);
    }

    #[tokio::test]
    async fn test_exhausted_chain_keeps_human_move() {
        let mut state = replying(Script::NoResult);
        let outcome = state.submit_move(mv("e2e4")).await;

        assert!(outcome.legal());
        assert_eq!(outcome.reply, ReplyStatus::Unavailable);
        assert_eq!(outcome.snapshot.fen, fen_after(&["e2e4"]));
        assert_eq!(outcome.snapshot.side_to_move, PieceColor::Black);
    }

    #[tokio::test]
    async fn test_illegal_reply_is_not_applied() {
        let mut state = replying(Script::Move("e2e4"));
        let outcome = state.submit_move(mv("d2d4")).await;
        assert_eq!(outcome.reply, ReplyStatus::Unavailable);
        assert_eq!(outcome.snapshot.last_move.as_deref(), Some("d2d4"));
    }

    #[tokio::test]
    async fn test_reply_can_end_the_game() {
        // Scholar's mate: the reply delivers mate.
        let mut state = replying(Script::Move("h5f7"));
        state.game = Game::from_fen(
            "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3",
        )
        .unwrap();

        let outcome = state.submit_move(mv("g8f6")).await;
        assert_eq!(outcome.reply_move(), Some("h5f7"));
        assert!(outcome.terminal());
    }

    #[tokio::test]
    async fn test_reset_from_terminal() {
        let mut state = replying(Script::FirstLegal);
        state.game = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(state.snapshot().status.is_terminal());

        let snapshot = state.reset();
        assert_eq!(snapshot.fen, STARTING_FEN);
        assert_eq!(snapshot.status, GameStatus::Ongoing);
        assert_eq!(snapshot.last_move, None);
    }

    #[tokio::test]
    async fn test_castling_in_standard_notation() {
        let mut state = replying(Script::NoResult);
        state.game =
            Game::from_fen("r3k2r/pppq1ppp/2npbn2/2b1p3/2B1P3/2NPBN2/PPPQ1PPP/R3K2R w KQkq - 0 1")
                .unwrap();

        let outcome = state.submit_move(mv("e1g1")).await;
        assert!(outcome.legal());
        assert_eq!(outcome.snapshot.last_move.as_deref(), Some("e1g1"));
        assert!(outcome.snapshot.fen.starts_with(
            "r3k2r/pppq1ppp/2npbn2/2b1p3/2B1P3/2NPBN2/PPPQ1PPP/R4RK1 b kq"
        ));
    }

    #[test]
    fn test_legal_moves_from_square() {
        let state = replying(Script::NoResult);
        let mut moves: Vec<String> = state
            .legal_moves(Some(chess::parse_square("g1").unwrap()))
            .into_iter()
            .map(|m| m.uci)
            .collect();
        moves.sort();
        assert_eq!(moves, vec!["g1f3", "g1h3"]);
        assert_eq!(state.legal_moves(None).len(), 20);
    }

    #[test]
    fn test_legal_move_flags() {
        let mut state = replying(Script::NoResult);
        state.game =
            Game::from_fen("r3k2r/pppq1ppp/2npbn2/2b1p3/2B1P3/2NPBN2/PPPQ1PPP/R3K2R w KQkq - 0 1")
                .unwrap();
        let moves = state.legal_moves(None);

        let castle = moves.iter().find(|m| m.uci == "e1g1").unwrap();
        assert!(!castle.is_capture);

        let quiet = moves.iter().find(|m| m.uci == "a2a3").unwrap();
        assert!(!quiet.is_capture);
        assert!(!quiet.is_check);

        state.game = Game::from_fen("4k3/3p4/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let moves = state.legal_moves(None);
        let check = moves.iter().find(|m| m.uci == "d1d7").unwrap();
        assert!(check.is_capture);
        assert!(check.is_check);
    }

    #[test]
    fn test_promotion_is_listed_per_piece() {
        let mut state = replying(Script::NoResult);
        state.game = Game::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").unwrap();
        let promotions: Vec<Option<char>> = state
            .legal_moves(Some(chess::parse_square("a7").unwrap()))
            .into_iter()
            .map(|m| m.promotion)
            .collect();
        assert_eq!(promotions.len(), 4);
        assert!(promotions.contains(&Some('q')));
        assert!(promotions.contains(&Some('n')));
    }
}
