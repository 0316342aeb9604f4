//! Client for a cloud evaluation endpoint (`GET <base>/cloud-eval`).

use ::engine::SearchBudget;
use async_trait::async_trait;
use chess::parse_uci_move;
use cozy_chess::Move;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use super::{MoveResolver, ResolutionOutcome, ResolutionRequest, ResolverError};

#[derive(Debug, Deserialize)]
struct CloudEval {
    #[serde(default)]
    pvs: Option<Vec<PrincipalVariation>>,
}

#[derive(Debug, Deserialize)]
struct PrincipalVariation {
    moves: String,
}

/// Resolves moves from precomputed cloud evaluations.
///
/// Each request is bounded by the client timeout. No retries are made here;
/// a failed lookup is reported as no result and the chain moves on.
pub struct RemoteEvalResolver {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteEvalResolver {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    fn endpoint(&self, fen: &str, depth: u8) -> Result<Url, ResolverError> {
        let base = format!("{}/cloud-eval", self.base_url.trim_end_matches('/'));
        let depth = depth.to_string();
        Url::parse_with_params(
            &base,
            &[("fen", fen), ("multiPv", "1"), ("depth", depth.as_str())],
        )
        .map_err(|e| ResolverError::RemoteUnavailable(format!("bad endpoint {}: {}", base, e)))
    }

    async fn fetch(&self, fen: &str, depth: u8) -> Result<Move, ResolverError> {
        let url = self.endpoint(fen, depth)?;

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolverError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ResolverError::RemoteUnavailable(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolverError::RemoteUnavailable(e.to_string()))?;
        parse_cloud_eval(&body)
    }
}

/// Extract the first move of the first principal variation.
pub fn parse_cloud_eval(body: &str) -> Result<Move, ResolverError> {
    let eval: CloudEval = serde_json::from_str(body)
        .map_err(|e| ResolverError::RemoteUnavailable(format!("malformed payload: {}", e)))?;

    let first = eval
        .pvs
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| ResolverError::RemoteUnavailable("no principal variation".to_string()))?;

    let token = first
        .moves
        .split_whitespace()
        .next()
        .ok_or(ResolverError::NoMove)?;

    parse_uci_move(token).map_err(|e| {
        ResolverError::RemoteUnavailable(format!("unparsable move {:?}: {}", token, e))
    })
}

#[async_trait]
impl MoveResolver for RemoteEvalResolver {
    fn name(&self) -> &'static str {
        "remote"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(fen = %request.fen))]
    async fn resolve(&self, request: &ResolutionRequest) -> ResolutionOutcome {
        let depth = match request.budget {
            SearchBudget::Depth(depth) => depth,
            other => return ResolutionOutcome::NoResult(ResolverError::UnsupportedBudget(other)),
        };

        match self.fetch(&request.fen, depth).await {
            Ok(mv) => ResolutionOutcome::Move(mv),
            Err(e) => ResolutionOutcome::NoResult(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::Router;
    use chess::{format_uci_move, STARTING_FEN};
    use std::collections::HashMap;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Answers like the real endpoint, but only for the expected token.
    async fn cloud_eval(
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> (StatusCode, String) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer good-token");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, r#"{"error":"No such token"}"#.to_string());
        }
        assert_eq!(params.get("multiPv").map(String::as_str), Some("1"));
        assert_eq!(params.get("depth").map(String::as_str), Some("5"));
        assert_eq!(params.get("fen").map(String::as_str), Some(STARTING_FEN));

        (
            StatusCode::OK,
            r#"{"fen":"x","knodes":1,"depth":5,"pvs":[{"moves":"e2e4 e7e5 g1f3","cp":30}]}"#
                .to_string(),
        )
    }

    fn request(budget: SearchBudget) -> ResolutionRequest {
        ResolutionRequest {
            fen: STARTING_FEN.to_string(),
            budget,
        }
    }

    fn resolver(base: &str, token: Option<&str>) -> RemoteEvalResolver {
        RemoteEvalResolver::new(
            base,
            token.map(String::from),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolves_first_move_of_first_pv() {
        let base = spawn_stub(Router::new().route("/cloud-eval", get(cloud_eval))).await;
        let outcome = resolver(&base, Some("good-token"))
            .resolve(&request(SearchBudget::Depth(5)))
            .await;
        match outcome {
            ResolutionOutcome::Move(mv) => assert_eq!(format_uci_move(mv), "e2e4"),
            other => panic!("expected a move, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_credential_is_no_result() {
        let base = spawn_stub(Router::new().route("/cloud-eval", get(cloud_eval))).await;
        let outcome = resolver(&base, Some("bad-token"))
            .resolve(&request(SearchBudget::Depth(5)))
            .await;
        match outcome {
            ResolutionOutcome::NoResult(ResolverError::RemoteUnavailable(reason)) => {
                assert!(reason.contains("401"), "reason: {}", reason);
            }
            other => panic!("expected RemoteUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_token_sends_no_header() {
        let base = spawn_stub(Router::new().route("/cloud-eval", get(cloud_eval))).await;
        let outcome = resolver(&base, None)
            .resolve(&request(SearchBudget::Depth(5)))
            .await;
        assert!(matches!(
            outcome,
            ResolutionOutcome::NoResult(ResolverError::RemoteUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let router = Router::new().route(
            "/cloud-eval",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                r#"{"pvs":[{"moves":"e2e4"}]}"#
            }),
        );
        let base = spawn_stub(router).await;

        let started = std::time::Instant::now();
        let outcome = resolver(&base, None)
            .resolve(&request(SearchBudget::Depth(5)))
            .await;
        assert!(matches!(
            outcome,
            ResolutionOutcome::NoResult(ResolverError::RemoteUnavailable(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_connection_refused_is_no_result() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = resolver(&format!("http://{}", addr), None)
            .resolve(&request(SearchBudget::Depth(5)))
            .await;
        assert!(matches!(
            outcome,
            ResolutionOutcome::NoResult(ResolverError::RemoteUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_movetime_budget_is_unsupported() {
        let outcome = resolver("http://127.0.0.1:9", None)
            .resolve(&request(SearchBudget::MoveTime(Duration::from_millis(100))))
            .await;
        assert!(matches!(
            outcome,
            ResolutionOutcome::NoResult(ResolverError::UnsupportedBudget(_))
        ));
    }

    #[test]
    fn test_parse_cloud_eval() {
        let mv = parse_cloud_eval(r#"{"pvs":[{"moves":"g1f3 d7d5"},{"moves":"e2e4"}]}"#).unwrap();
        assert_eq!(format_uci_move(mv), "g1f3");

        let promo = parse_cloud_eval(r#"{"pvs":[{"moves":"a7a8q"}]}"#).unwrap();
        assert_eq!(format_uci_move(promo), "a7a8q");
    }

    #[test]
    fn test_parse_cloud_eval_failures() {
        assert!(matches!(
            parse_cloud_eval(r#"{"error":"Not found"}"#),
            Err(ResolverError::RemoteUnavailable(_))
        ));
        assert!(matches!(
            parse_cloud_eval(r#"{"pvs":[]}"#),
            Err(ResolverError::RemoteUnavailable(_))
        ));
        assert!(matches!(
            parse_cloud_eval(r#"{"pvs":[{"moves":""}]}"#),
            Err(ResolverError::NoMove)
        ));
        assert!(matches!(
            parse_cloud_eval(r#"{"pvs":[{"moves":"zz99"}]}"#),
            Err(ResolverError::RemoteUnavailable(_))
        ));
        assert!(matches!(
            parse_cloud_eval("<html>"),
            Err(ResolverError::RemoteUnavailable(_))
        ));
    }
}
