// HTTP client for the remote scoring service.
//
// The service picks the next question and the final guess from the asked
// history and the surviving candidate ids. Any transport or decode failure
// is surfaced to the caller, which falls back to local question selection
// for the rest of the session.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One asked question and the user's answer, as the service expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnRequest<'a> {
    asked_questions: &'a [QaPair],
    candidate_ids: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NextQuestionResponse {
    pub question: String,
    /// Candidate count remaining after the service's own filtering.
    pub remaining: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessResponse {
    pub full_name: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote scoring not configured")]
    NotConfigured,

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}")]
    BadStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },
}

// ---------------------------------------------------------------------------
// HttpScorer
// ---------------------------------------------------------------------------

/// Low-level client bound to one service base URL.
pub struct HttpScorer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScorer {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Probe the service. Succeeds on any 2xx from GET /health.
    pub async fn health(&self) -> Result<(), RemoteError> {
        let endpoint = self.endpoint("health");
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| RemoteError::Transport {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        if !response.status().is_success() {
            return Err(RemoteError::BadStatus {
                endpoint,
                status: response.status(),
            });
        }
        debug!("remote scoring service healthy");
        Ok(())
    }

    /// Ask the service for the next question to pose.
    pub async fn next_question(
        &self,
        asked: &[QaPair],
        candidate_ids: &[String],
    ) -> Result<NextQuestionResponse, RemoteError> {
        self.post(
            "next-question",
            &TurnRequest {
                asked_questions: asked,
                candidate_ids,
            },
        )
        .await
    }

    /// Ask the service for its final guess.
    pub async fn guess(
        &self,
        asked: &[QaPair],
        candidate_ids: &[String],
    ) -> Result<GuessResponse, RemoteError> {
        self.post(
            "guess",
            &TurnRequest {
                asked_questions: asked,
                candidate_ids,
            },
        )
        .await
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, RemoteError> {
        let endpoint = self.endpoint(path);
        let response = self
            .http
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Transport {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        if !response.status().is_success() {
            return Err(RemoteError::BadStatus {
                endpoint,
                status: response.status(),
            });
        }
        response.json::<R>().await.map_err(|e| RemoteError::Decode {
            endpoint: self.endpoint(path),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// RemoteScorer wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that can be either an active scoring client or disabled.
pub enum RemoteScorer {
    /// A service base URL is configured and ready.
    Active(HttpScorer),
    /// Remote scoring is disabled (no base URL configured).
    Disabled,
}

impl RemoteScorer {
    /// Build a `RemoteScorer` from the application config.
    ///
    /// Returns `Active` when a base URL is present, otherwise `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        let url = config.backend.base_url.trim();
        if url.is_empty() {
            RemoteScorer::Disabled
        } else {
            RemoteScorer::Active(HttpScorer::new(url.to_string()))
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RemoteScorer::Active(_))
    }

    /// Probe the service, returning whether it answered. A disabled scorer
    /// reports unhealthy without touching the network.
    pub async fn health(&self) -> bool {
        match self {
            RemoteScorer::Active(client) => match client.health().await {
                Ok(()) => true,
                Err(e) => {
                    warn!("remote health probe failed: {e}");
                    false
                }
            },
            RemoteScorer::Disabled => false,
        }
    }

    pub async fn next_question(
        &self,
        asked: &[QaPair],
        candidate_ids: &[String],
    ) -> Result<NextQuestionResponse, RemoteError> {
        match self {
            RemoteScorer::Active(client) => client.next_question(asked, candidate_ids).await,
            RemoteScorer::Disabled => Err(RemoteError::NotConfigured),
        }
    }

    pub async fn guess(
        &self,
        asked: &[QaPair],
        candidate_ids: &[String],
    ) -> Result<GuessResponse, RemoteError> {
        match self {
            RemoteScorer::Active(client) => client.guess(asked, candidate_ids).await,
            RemoteScorer::Disabled => Err(RemoteError::NotConfigured),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // -- Wire shape --

    #[test]
    fn turn_request_serializes_camel_case() {
        let asked = vec![QaPair {
            question: "Is your player on the Celtics?".to_string(),
            answer: true,
        }];
        let ids = vec!["tatumja01".to_string()];
        let request = TurnRequest {
            asked_questions: &asked,
            candidate_ids: &ids,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["askedQuestions"][0]["question"],
            "Is your player on the Celtics?"
        );
        assert_eq!(json["askedQuestions"][0]["answer"], true);
        assert_eq!(json["candidateIds"][0], "tatumja01");
    }

    #[test]
    fn guess_response_decodes_camel_case() {
        let decoded: GuessResponse =
            serde_json::from_str(r#"{"fullName": "Jayson Tatum"}"#).unwrap();
        assert_eq!(decoded.full_name, "Jayson Tatum");
    }

    #[test]
    fn next_question_response_decodes() {
        let decoded: NextQuestionResponse =
            serde_json::from_str(r#"{"question": "Has your player received any awards?", "remaining": 12}"#)
                .unwrap();
        assert_eq!(decoded.remaining, 12);
        assert!(decoded.question.starts_with("Has your player"));
    }

    // -- from_config --

    fn make_test_config(base_url: &str) -> Config {
        use crate::config::{BackendConfig, DataPaths, GameConfig};
        use crate::recommend::{ConstraintLimits, ScoreWeights};

        Config {
            game: GameConfig {
                final_round_threshold: 5,
            },
            backend: BackendConfig {
                base_url: base_url.to_string(),
            },
            weights: ScoreWeights::default(),
            limits: ConstraintLimits::default(),
            data_paths: DataPaths {
                players: "data/players.csv".to_string(),
            },
        }
    }

    #[test]
    fn from_config_with_base_url_returns_active() {
        let scorer = RemoteScorer::from_config(&make_test_config("http://localhost:8080"));
        assert!(scorer.is_active());
    }

    #[test]
    fn from_config_with_empty_base_url_returns_disabled() {
        let scorer = RemoteScorer::from_config(&make_test_config(""));
        assert!(!scorer.is_active());
        let scorer = RemoteScorer::from_config(&make_test_config("   "));
        assert!(!scorer.is_active());
    }

    #[tokio::test]
    async fn disabled_scorer_reports_not_configured() {
        let scorer = RemoteScorer::Disabled;
        assert!(!scorer.health().await);
        let err = scorer.next_question(&[], &[]).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotConfigured));
    }

    // -- Integration-style tests with a mock TCP server --

    /// Accept one connection, discard the request, and write `body` back as
    /// an HTTP response with the given status line.
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_accepts_200() {
        let base = one_shot_server("HTTP/1.1 200 OK", "{}").await;
        let scorer = RemoteScorer::Active(HttpScorer::new(base));
        assert!(scorer.health().await);
    }

    #[tokio::test]
    async fn health_rejects_500() {
        let base = one_shot_server("HTTP/1.1 500 Internal Server Error", "{}").await;
        let scorer = RemoteScorer::Active(HttpScorer::new(base));
        assert!(!scorer.health().await);
    }

    #[tokio::test]
    async fn health_rejects_unreachable_host() {
        // Bind a listener to reserve a port, then drop it so nothing answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let scorer = RemoteScorer::Active(HttpScorer::new(format!("http://{addr}")));
        assert!(!scorer.health().await);
    }

    #[tokio::test]
    async fn next_question_decodes_service_reply() {
        let base = one_shot_server(
            "HTTP/1.1 200 OK",
            r#"{"question": "Is your player on the Celtics?", "remaining": 2}"#,
        )
        .await;
        let client = HttpScorer::new(base);

        let asked = vec![QaPair {
            question: "Has your player received any awards?".to_string(),
            answer: true,
        }];
        let ids = vec!["tatumja01".to_string(), "brownja02".to_string()];
        let reply = client.next_question(&asked, &ids).await.unwrap();
        assert_eq!(reply.question, "Is your player on the Celtics?");
        assert_eq!(reply.remaining, 2);
    }

    #[tokio::test]
    async fn guess_decodes_service_reply() {
        let base = one_shot_server("HTTP/1.1 200 OK", r#"{"fullName": "Jayson Tatum"}"#).await;
        let client = HttpScorer::new(base);

        let reply = client.guess(&[], &["tatumja01".to_string()]).await.unwrap();
        assert_eq!(reply.full_name, "Jayson Tatum");
    }

    #[tokio::test]
    async fn next_question_surfaces_bad_status() {
        let base = one_shot_server("HTTP/1.1 503 Service Unavailable", "{}").await;
        let client = HttpScorer::new(base);

        let err = client.next_question(&[], &[]).await.unwrap_err();
        match err {
            RemoteError::BadStatus { status, .. } => {
                assert_eq!(status.as_u16(), 503);
            }
            other => panic!("expected BadStatus, got: {other}"),
        }
    }

    #[tokio::test]
    async fn next_question_surfaces_decode_failure() {
        let base = one_shot_server("HTTP/1.1 200 OK", "not json at all").await;
        let client = HttpScorer::new(base);

        let err = client.next_question(&[], &[]).await.unwrap_err();
        assert!(matches!(err, RemoteError::Decode { .. }));
    }

    #[test]
    fn trailing_slash_in_base_url_is_tolerated() {
        let client = HttpScorer::new("http://localhost:8080/".to_string());
        assert_eq!(client.endpoint("health"), "http://localhost:8080/health");
    }
}
