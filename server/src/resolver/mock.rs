//! Scripted resolvers and fake engine helpers for tests.

use async_trait::async_trait;
use chess::{parse_uci_move, Game};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{MoveResolver, ResolutionOutcome, ResolutionRequest, ResolverError};

/// Serializes writing and spawning fake engine scripts across the test binary.
#[cfg(unix)]
pub(crate) static SPAWN_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Write an executable shell script into `dir` and return its file name.
/// Callers must hold [`SPAWN_LOCK`] until every spawn of it has finished.
#[cfg(unix)]
pub(crate) fn install_fake_engine(dir: &std::path::Path, script: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let name = "fake-engine".to_string();
    let path = dir.join(&name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    name
}

/// A UCI engine that answers every search with `bestmove <mv>`.
#[cfg(unix)]
pub(crate) fn replying_engine(mv: &str) -> String {
    format!(
        r#"#!/bin/sh
while read -r line; do
  case "$line" in
    uci) echo "id name Fake"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "bestmove {mv}" ;;
    quit) exit 0 ;;
  esac
done
"#
    )
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    /// Always answer with this UCI move, legal or not.
    Move(&'static str),
    /// Answer with the first legal move of the requested position.
    FirstLegal,
    /// Never produce a move.
    NoResult,
}

/// Resolver that follows a fixed script and records what it was asked.
pub(crate) struct ScriptedResolver {
    name: &'static str,
    script: Script,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedResolver {
    pub(crate) fn new(name: &'static str, script: Script) -> Self {
        Self {
            name,
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// FENs of every request, in order.
    pub(crate) fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        self.seen.clone()
    }
}

#[async_trait]
impl MoveResolver for ScriptedResolver {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.fen.clone());

        match self.script {
            Script::Move(uci) => match parse_uci_move(uci) {
                Ok(mv) => ResolutionOutcome::Move(mv),
                Err(_) => ResolutionOutcome::NoResult(ResolverError::NoMove),
            },
            Script::FirstLegal => {
                let game = Game::from_fen(&request.fen).unwrap();
                match game.legal_moves().first() {
                    Some(&mv) => ResolutionOutcome::Move(game.to_uci(mv)),
                    None => ResolutionOutcome::NoResult(ResolverError::NoMove),
                }
            }
            Script::NoResult => ResolutionOutcome::NoResult(ResolverError::RemoteUnavailable(
                "scripted outage".to_string(),
            )),
        }
    }
}
