//! Answer synthesis: bounded context + query → generated answer text.
//!
//! This is a collaborator boundary, not a reasoning component: the prompt
//! is assembled here and everything else happens in the external
//! text-generation service. Failures are surfaced distinctly so callers
//! can degrade to showing the retrieved context instead of an answer.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::GenerateError;
use crate::retrieve::ContextItem;

/// Result alias for synthesis operations.
pub type GenerateResult<T> = std::result::Result<T, GenerateError>;

/// Configuration for the generation client.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Base URL for the generation API.
    pub base_url: String,
    /// Model name to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            timeout_secs: 120,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct Synthesizer {
    config: SynthesizerConfig,
    agent: ureq::Agent,
}

impl Synthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build();
        Self { config, agent }
    }

    /// Lightweight availability check.
    pub fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.agent.get(&url).call() {
            Ok(resp) => resp.status() == 200,
            Err(_) => false,
        }
    }

    /// Synthesize an answer from the query and the retrieved context.
    pub fn synthesize(&self, query: &str, context: &str) -> GenerateResult<String> {
        let prompt = build_prompt(query, context);
        let url = format!("{}/api/generate", self.config.base_url);
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });

        // Single retry on transport failure, same policy as embedding.
        let resp = match self.post(&url, &body) {
            Ok(resp) => resp,
            Err(ureq::Error::Transport(first)) => {
                warn!(error = %first, "generation request failed, retrying once");
                self.post(&url, &body).map_err(|e| match e {
                    ureq::Error::Status(429, _) => GenerateError::RateLimited { status: 429 },
                    ureq::Error::Status(status, _) => GenerateError::Parse {
                        message: format!("server returned status {status}"),
                    },
                    ureq::Error::Transport(_) => GenerateError::Unavailable {
                        url: self.config.base_url.clone(),
                    },
                })?
            }
            Err(ureq::Error::Status(429, _)) => {
                return Err(GenerateError::RateLimited { status: 429 });
            }
            Err(ureq::Error::Status(status, _)) => {
                return Err(GenerateError::Parse {
                    message: format!("server returned status {status}"),
                });
            }
        };

        let parsed: GenerateResponse = resp.into_json().map_err(|e| GenerateError::Parse {
            message: e.to_string(),
        })?;
        debug!(model = %self.config.model, answer_chars = parsed.response.len(), "synthesized answer");
        Ok(parsed.response.trim().to_string())
    }

    fn post(&self, url: &str, body: &serde_json::Value) -> Result<ureq::Response, ureq::Error> {
        self.agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
    }
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Assemble the generation prompt from query and context. The model is
/// instructed to rely on the retrieved data only.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are answering questions about a community knowledge graph.\n\
         Use ONLY the retrieved data below. If the data does not contain \
         the answer, say so instead of guessing.\n\n\
         USER QUESTION: {query}\n\n\
         RETRIEVED RELEVANT DATA:\n{context}\n\n\
         ANSWER:"
    )
}

/// Render context items for display in degraded mode (generation down,
/// retrieval fine).
pub fn degraded_answer(items: &[ContextItem]) -> String {
    let mut out = String::from("Answer generation is unavailable; closest known facts:\n");
    for item in items {
        out.push_str(&format!("- {} (similarity {:.2})\n", item.text, item.similarity));
    }
    out
}
