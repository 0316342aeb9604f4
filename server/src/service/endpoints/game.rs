//! Game action endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::service::converters::{LegalMoveDto, LegalMovesQuery, MoveOutcomeDto, MoveRequest};
use crate::service::parsers::{parse_move_request, parse_square_http};
use crate::service::ApiError;
use crate::session::SessionManager;

pub async fn submit_move(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<MoveOutcomeDto>, ApiError> {
    tracing::info!(session_id = %id, from = %req.from, to = %req.to, "HTTP submit_move");

    let (from, to, promotion) = parse_move_request(&req)?;
    let outcome = manager.submit_move(&id, from, to, promotion).await?;
    Ok(Json(outcome.into()))
}

pub async fn legal_moves(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<String>,
    Query(query): Query<LegalMovesQuery>,
) -> Result<Json<Vec<LegalMoveDto>>, ApiError> {
    tracing::debug!(session_id = %id, from = ?query.from, "HTTP legal_moves");

    let from = query
        .from
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_square_http)
        .transpose()?;
    let moves = manager.legal_moves(&id, from).await?;
    Ok(Json(moves.into_iter().map(LegalMoveDto::from).collect()))
}
