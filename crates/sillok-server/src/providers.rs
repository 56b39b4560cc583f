//! HTTP-backed [`Embedder`] and [`Llm`] implementations against an
//! OpenAI-compatible API (§1 "external collaborators", §6.5).
//!
//! The embedding and chat-completion services are out of scope for the
//! core crate's design, which depends only on the capability traits; this
//! module supplies the concrete binary-side implementation, grounded on
//! the bearer-auth JSON request/response shape used elsewhere in the
//! corpus for LLM-router clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sillok_core::error::{Error, Result};
use sillok_core::providers::{Embedder, Llm};

/// Configuration for the HTTP provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Chat-completion model name.
    pub chat_model: String,
}

/// Shared HTTP client plus provider configuration, implementing both
/// provider capability traits.
#[derive(Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpProvider {
    /// Builds a provider with a default 30-second request timeout.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponseItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingResponseItem>,
}

#[async_trait]
impl Embedder for HttpProvider {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.config.base_url);
        let body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
        };
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Embedder(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Embedder(e.to_string()))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::Embedder(e.to_string()))?;
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[async_trait]
impl Llm for HttpProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Llm(e.to_string()))?
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Llm("empty choices array".to_string()))
    }
}

/// Serializes an empty JSON object, used as a fallback payload when a
/// provider response cannot be parsed but the caller still needs a value.
#[must_use]
pub fn empty_object() -> serde_json::Value {
    json!({})
}
