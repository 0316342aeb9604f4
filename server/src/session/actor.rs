use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::Instrument;

use super::commands::SessionCommand;
use super::state::SessionState;
use crate::persistence::SessionStore;

/// The main session actor loop.
/// Owns all mutable state and processes commands one at a time, so two
/// submits for the same session can never interleave.
///
/// After `idle` without a command the queue is closed, anything already
/// queued is still answered, and the actor exits. The position is persisted
/// after every change, so the manager can restore it on the next request.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    store: Arc<SessionStore>,
    idle: Duration,
) {
    let session_id = state.session_id.clone();
    run_session_actor_inner(state, cmd_rx, store, idle)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    store: Arc<SessionStore>,
    idle: Duration,
) {
    tracing::info!("Session actor started");

    loop {
        let cmd = match time::timeout(idle, cmd_rx.recv()).await {
            Ok(Some(cmd)) => cmd,
            Ok(None) => break,
            Err(_) => {
                tracing::info!("Session idle, evicting");
                cmd_rx.close();
                continue;
            }
        };

        match cmd {
            SessionCommand::Shutdown => break,
            SessionCommand::SubmitMove { candidate, reply } => {
                let outcome = state.submit_move(candidate).await;
                if outcome.legal() {
                    persist(&state, &store);
                }
                let _ = reply.send(outcome);
            }
            SessionCommand::Reset { reply } => {
                let snapshot = state.reset();
                persist(&state, &store);
                let _ = reply.send(snapshot);
            }
            SessionCommand::GetSnapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }
            SessionCommand::GetLegalMoves { from, reply } => {
                let _ = reply.send(state.legal_moves(from));
            }
        }
    }

    tracing::info!("Session actor exited");
}

/// Write the current position to the store. Failures are logged only.
pub(crate) fn persist(state: &SessionState, store: &SessionStore) {
    if let Err(e) = store.save(&state.to_stored()) {
        tracing::warn!("Failed to persist session: {}", e);
    }
}
