//! Session lifecycle endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::service::converters::SnapshotDto;
use crate::service::ApiError;
use crate::session::SessionManager;

pub async fn create_session(
    State(manager): State<Arc<SessionManager>>,
) -> (StatusCode, Json<SnapshotDto>) {
    let snapshot = manager.create_session().await;
    tracing::info!(session_id = %snapshot.session_id, "HTTP create_session");
    (StatusCode::CREATED, Json(snapshot.into()))
}

pub async fn get_session(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<String>,
) -> Result<Json<SnapshotDto>, ApiError> {
    tracing::debug!(session_id = %id, "HTTP get_session");
    let snapshot = manager.snapshot(&id).await?;
    Ok(Json(snapshot.into()))
}

pub async fn reset_session(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<String>,
) -> Result<Json<SnapshotDto>, ApiError> {
    tracing::info!(session_id = %id, "HTTP reset_session");
    let snapshot = manager.reset(&id).await?;
    Ok(Json(snapshot.into()))
}

pub async fn close_session(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(session_id = %id, "HTTP close_session");
    manager.close_session(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
