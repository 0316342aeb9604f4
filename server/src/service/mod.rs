//! JSON-over-HTTP adapter for the session manager.

pub mod converters;
pub mod endpoints;
pub mod parsers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::session::{SessionError, SessionManager};
use endpoints::{game, session};

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SessionError::Corrupt(..) | SessionError::Internal(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(manager: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/api/sessions", post(session::create_session))
        .route(
            "/api/sessions/{id}",
            get(session::get_session).delete(session::close_session),
        )
        .route("/api/sessions/{id}/moves", post(game::submit_move))
        .route("/api/sessions/{id}/reset", post(session::reset_session))
        .route("/api/sessions/{id}/legal-moves", get(game::legal_moves))
        .with_state(manager)
}
