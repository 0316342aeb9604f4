use cozy_chess::{BitBoard, Board, Move, Piece};

use crate::fen::{format_fen_with_clock, parse_fen_with_clock, FenError};
use crate::types::PieceColor;
use crate::uci::{convert_cozy_castling_to_uci, convert_uci_castling_to_cozy};

/// Number of occurrences of one position that ends the game without a claim.
const REPETITION_LIMIT: usize = 5;

/// Halfmove clock value that ends the game without a claim (seventy-five-move rule).
/// The fifty-move rule needs a claim and never ends a game on its own.
const SEVENTY_FIVE_MOVE_HALFMOVES: u16 = 150;

/// Authoritative game state: one position plus the hashes of every position
/// seen since this game was created or loaded.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    seen: Vec<u64>,
    /// The board stops counting at 100, so the full clock lives here.
    halfmove_clock: u16,
}

/// Outcome of evaluating a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: PieceColor },
    Stalemate,
    Draw(DrawReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    SeventyFiveMoveRule,
    InsufficientMaterial,
    Repetition,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Ongoing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Ongoing => "ongoing",
            GameStatus::Checkmate { .. } => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::Draw(_) => "draw",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::Ongoing => write!(f, "Game in progress"),
            GameStatus::Checkmate { winner } => write!(f, "{} wins by checkmate", winner),
            GameStatus::Stalemate => write!(f, "Draw by stalemate"),
            GameStatus::Draw(DrawReason::SeventyFiveMoveRule) => {
                write!(f, "Draw by seventy-five-move rule")
            }
            GameStatus::Draw(DrawReason::InsufficientMaterial) => {
                write!(f, "Draw by insufficient material")
            }
            GameStatus::Draw(DrawReason::Repetition) => write!(f, "Draw by repetition"),
        }
    }
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self::from_board(Board::default(), 0)
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let (position, halfmove_clock) = parse_fen_with_clock(fen)?;
        Ok(Self::from_board(position, halfmove_clock))
    }

    fn from_board(position: Board, halfmove_clock: u16) -> Self {
        let seen = vec![position.hash()];
        Self {
            position,
            seen,
            halfmove_clock,
        }
    }

    /// Get the current board position
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// Get all legal moves for the current position
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.position.is_legal(mv)
    }

    /// Rewrite standard UCI castling (`e1g1`) into the internal encoding.
    pub fn normalize_move(&self, mv: Move) -> Move {
        convert_uci_castling_to_cozy(mv, &self.legal_moves())
    }

    /// Render a move legal in the current position in standard UCI form.
    pub fn to_uci(&self, mv: Move) -> Move {
        convert_cozy_castling_to_uci(&self.position, mv)
    }

    /// Make a move on the board. An illegal move leaves the position untouched.
    pub fn make_move(&mut self, mv: Move) -> Result<(), GameError> {
        if !self.position.is_legal(mv) {
            return Err(GameError::IllegalMove);
        }

        self.position.play_unchecked(mv);
        // the board resets its clock to zero on captures and pawn moves
        self.halfmove_clock = match self.position.halfmove_clock() {
            0 => 0,
            _ => self.halfmove_clock.saturating_add(1),
        };
        self.seen.push(self.position.hash());
        Ok(())
    }

    /// Get the current game status
    pub fn status(&self) -> GameStatus {
        let has_moves = self.position.generate_moves(|_| true);

        if !has_moves {
            if self.position.checkers().is_empty() {
                return GameStatus::Stalemate;
            }
            let loser = PieceColor::from(self.position.side_to_move());
            return GameStatus::Checkmate {
                winner: loser.opposite(),
            };
        }

        if self.halfmove_clock >= SEVENTY_FIVE_MOVE_HALFMOVES {
            return GameStatus::Draw(DrawReason::SeventyFiveMoveRule);
        }

        if self.has_insufficient_material() {
            return GameStatus::Draw(DrawReason::InsufficientMaterial);
        }

        let current = self.position.hash();
        if self.seen.iter().filter(|&&h| h == current).count() >= REPETITION_LIMIT {
            return GameStatus::Draw(DrawReason::Repetition);
        }

        GameStatus::Ongoing
    }

    /// Neither side can mate: bare kings, a lone knight, or any number of
    /// bishops that all stand on squares of one colour.
    fn has_insufficient_material(&self) -> bool {
        let board = &self.position;
        let heavy =
            board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
        if !heavy.is_empty() {
            return false;
        }

        let knights = board.pieces(Piece::Knight);
        let bishops = board.pieces(Piece::Bishop);
        if !knights.is_empty() {
            return knights.len() == 1 && bishops.is_empty();
        }

        (bishops & BitBoard::LIGHT_SQUARES).is_empty()
            || (bishops & BitBoard::DARK_SQUARES).is_empty()
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    /// Get the side to move
    pub fn side_to_move(&self) -> PieceColor {
        self.position.side_to_move().into()
    }

    pub fn fullmove_number(&self) -> u16 {
        self.position.fullmove_number()
    }

    /// Export position to FEN string
    pub fn to_fen(&self) -> String {
        format_fen_with_clock(&self.position, self.halfmove_clock)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("FEN parse error: {0}")]
    Fen(#[from] FenError),
}
