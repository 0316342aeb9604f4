use cozy_chess::Board;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Largest halfmove clock the board itself will hold.
const BOARD_CLOCK_LIMIT: u16 = 100;

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    parse_fen_with_clock(fen).map(|(board, _)| board)
}

/// Parse a FEN string, returning the board and the full halfmove clock.
///
/// The board caps its own clock at 100, so a larger clock is clamped before
/// parsing and handed back separately.
pub fn parse_fen_with_clock(fen: &str) -> Result<(Board, u16), FenError> {
    let fen = fen.trim();
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(FenError::InvalidFormat(fen.to_string()));
    }

    let clock: u16 = fields[4]
        .parse()
        .map_err(|_| FenError::InvalidFormat(fen.to_string()))?;
    let clamped = clock.min(BOARD_CLOCK_LIMIT).to_string();

    let mut board_fields = fields;
    board_fields[4] = &clamped;
    let board = board_fields
        .join(" ")
        .parse()
        .map_err(|_| FenError::InvalidBoardLayout(fen.to_string()))?;
    Ok((board, clock))
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    // Display on Board writes standard (non-Shredder) FEN
    board.to_string()
}

/// Format a Board as FEN, writing `clock` as the halfmove clock field.
pub fn format_fen_with_clock(board: &Board, clock: u16) -> String {
    let fen = format_fen(board);
    let mut fields: Vec<String> = fen.split_whitespace().map(str::to_string).collect();
    if let Some(field) = fields.get_mut(4) {
        *field = clock.to_string();
    }
    fields.join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format: {0}")]
    InvalidFormat(String),
    #[error("Invalid board layout: {0}")]
    InvalidBoardLayout(String),
}
