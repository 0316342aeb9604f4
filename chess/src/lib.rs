pub mod board_display;
pub mod fen;
pub mod game;
pub mod types;
pub mod uci;

pub use board_display::{DisplayBoard, DisplayBoardError};
pub use fen::{
    format_fen, format_fen_with_clock, parse_fen, parse_fen_with_clock, FenError, STARTING_FEN,
};
pub use game::{DrawReason, Game, GameError, GameStatus};
pub use types::{PieceColor, PieceKind};
pub use uci::{
    convert_cozy_castling_to_uci, convert_uci_castling_to_cozy, format_square, format_uci_move,
    parse_square, parse_uci_move, UciMoveError,
};
