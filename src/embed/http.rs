//! HTTP embedding provider (Ollama-compatible `/api/embeddings`).
//!
//! Network I/O is bounded: every request carries the configured timeout,
//! and a transport failure is retried exactly once before surfacing as
//! [`EmbedError::Unavailable`]. There is no unbounded retry loop.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::EmbedError;

use super::{EmbedResult, EmbeddingProvider, check_dimension};

/// Configuration for the HTTP embedder.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
#[serde(default)]
pub struct HttpEmbedderConfig {
    /// Base URL for the embedding API.
    pub base_url: String,
    /// Model name to use. Must match the model the corpus was indexed with.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "all-minilm".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for an Ollama-compatible embedding endpoint.
pub struct HttpEmbedder {
    config: HttpEmbedderConfig,
    agent: ureq::Agent,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build();
        Self { config, agent }
    }

    /// Lightweight availability check against the model listing endpoint.
    pub fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.agent.get(&url).call() {
            Ok(resp) => resp.status() == 200,
            Err(_) => false,
        }
    }

    fn request(&self, text: &str) -> Result<Vec<f32>, RequestFailure> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": text,
        });
        let resp = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e| match e {
                ureq::Error::Status(status, _) => RequestFailure::Status(status),
                ureq::Error::Transport(t) => RequestFailure::Transport(t.to_string()),
            })?;
        let parsed: EmbeddingResponse = resp
            .into_json()
            .map_err(|e| RequestFailure::Body(e.to_string()))?;
        Ok(parsed.embedding)
    }
}

/// Failure modes of one embedding request; only transport failures are
/// retried.
enum RequestFailure {
    Transport(String),
    Status(u16),
    Body(String),
}

impl RequestFailure {
    fn into_embed_error(self, base_url: &str) -> EmbedError {
        match self {
            RequestFailure::Transport(_) => EmbedError::Unavailable {
                url: base_url.into(),
            },
            RequestFailure::Status(status) => EmbedError::Status { status },
            RequestFailure::Body(message) => EmbedError::Parse { message },
        }
    }
}

impl EmbeddingProvider for HttpEmbedder {
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        // One retry on a transport-level failure; HTTP status and body
        // errors are not transient and surface immediately.
        let vector = match self.request(text) {
            Ok(v) => v,
            Err(RequestFailure::Transport(first)) => {
                warn!(error = %first, "embedding request failed, retrying once");
                self.request(text)
                    .map_err(|e| e.into_embed_error(&self.config.base_url))?
            }
            Err(other) => return Err(other.into_embed_error(&self.config.base_url)),
        };

        check_dimension(&vector)?;
        debug!(model = %self.config.model, chars = text.len(), "embedded text");
        Ok(vector)
    }
}

impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_provider() {
        let config = HttpEmbedderConfig::default();
        assert!(config.base_url.contains("localhost"));
        assert!(config.timeout_secs > 0);
    }

    #[test]
    fn unreachable_endpoint_reports_unavailable() {
        // Reserved TEST-NET address; connection fails fast.
        let embedder = HttpEmbedder::new(HttpEmbedderConfig {
            base_url: "http://192.0.2.1:1".into(),
            timeout_secs: 1,
            ..Default::default()
        });
        let err = embedder.embed("hello").unwrap_err();
        assert!(matches!(err, EmbedError::Unavailable { .. }));
        assert!(!embedder.probe());
    }

    #[test]
    fn http_error_status_is_reported_as_status() {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            stream
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
        });

        let embedder = HttpEmbedder::new(HttpEmbedderConfig {
            base_url: format!("http://{addr}"),
            timeout_secs: 5,
            ..Default::default()
        });
        let err = embedder.embed("hello").unwrap_err();
        assert!(matches!(err, EmbedError::Status { status: 500 }));
        server.join().unwrap();
    }
}
