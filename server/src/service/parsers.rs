//! Parsing functions from wire strings to domain types

use cozy_chess::{Piece, Square};

use super::converters::MoveRequest;
use super::ApiError;

pub fn parse_square_http(s: &str) -> Result<Square, ApiError> {
    chess::parse_square(s.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid square: {}", s)))
}

/// Promotion piece as a single letter: `q`, `r`, `b` or `n`, either case.
pub fn parse_promotion(s: &str) -> Result<Piece, ApiError> {
    let mut chars = s.trim().chars();
    match (chars.next().map(|c| c.to_ascii_lowercase()), chars.next()) {
        (Some('q'), None) => Ok(Piece::Queen),
        (Some('r'), None) => Ok(Piece::Rook),
        (Some('b'), None) => Ok(Piece::Bishop),
        (Some('n'), None) => Ok(Piece::Knight),
        _ => Err(ApiError::BadRequest(format!("Invalid promotion piece: {}", s))),
    }
}

pub fn parse_move_request(
    req: &MoveRequest,
) -> Result<(Square, Square, Option<Piece>), ApiError> {
    let from = parse_square_http(&req.from)?;
    let to = parse_square_http(&req.to)?;
    let promotion = req
        .promotion
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(parse_promotion)
        .transpose()?;
    Ok((from, to, promotion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::{File, Rank};

    fn request(from: &str, to: &str, promotion: Option<&str>) -> MoveRequest {
        MoveRequest {
            from: from.to_string(),
            to: to.to_string(),
            promotion: promotion.map(String::from),
        }
    }

    #[test]
    fn test_parse_square_http() {
        let sq = parse_square_http("e4").unwrap();
        assert_eq!(sq.file(), File::E);
        assert_eq!(sq.rank(), Rank::Fourth);
        assert!(matches!(parse_square_http("z9"), Err(ApiError::BadRequest(_))));
        assert!(parse_square_http("").is_err());
    }

    #[test]
    fn test_parse_move_request() {
        let (from, to, promotion) = parse_move_request(&request("e2", "e4", None)).unwrap();
        assert_eq!(from, Square::new(File::E, Rank::Second));
        assert_eq!(to, Square::new(File::E, Rank::Fourth));
        assert_eq!(promotion, None);

        let (_, _, promotion) = parse_move_request(&request("a7", "a8", Some("Q"))).unwrap();
        assert_eq!(promotion, Some(Piece::Queen));

        let (_, _, promotion) = parse_move_request(&request("a7", "a8", Some(""))).unwrap();
        assert_eq!(promotion, None);
    }

    #[test]
    fn test_invalid_promotion() {
        assert!(parse_promotion("k").is_err());
        assert!(parse_promotion("p").is_err());
        assert!(parse_promotion("qq").is_err());
        assert!(parse_move_request(&request("a7", "a8", Some("x"))).is_err());
    }
}
