//! Grounded answer generation.
//!
//! The generation backend is only ever invoked with retrieved context and a
//! strict instruction to answer from that context alone; there is no
//! unrestricted-generation fallback anywhere in the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed response returned when retrieval produces no supporting chunks.
pub const NOT_FOUND_MESSAGE: &str =
    "No relevant documents found in the knowledge base to answer this question.";

/// System instruction constraining answers to the retrieved chunks.
const GROUNDED_SYSTEM_PROMPT: &str = "\
You are given a user question and a list of text chunks retrieved via \
similarity search from a knowledge base. Produce a final answer grounded ONLY \
in the retrieved chunks: select the chunks relevant to the question, extract \
and synthesize only information explicitly stated in them, and present the \
answer as well-structured Markdown. Do not hallucinate, do not mention chunks, \
retrieval, or tools. If the answer is not present in the chunks, explicitly \
say so. Tone: concise, factual, professional.";

/// Errors raised by generation backends.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Backend was unable to produce a completion.
    #[error("Failed to generate answer: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by grounded-answer generation backends.
///
/// Implementations must decode deterministically (temperature 0) so grounding
/// behavior is reproducible.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Answer `query` using only the supplied retrieved `context`.
    async fn generate(&self, query: &str, context: &str) -> Result<String, GenerationError>;
}

/// Generation client backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiGenerationClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerationClient {
    /// Build a client targeting `base_url` with the given model and key.
    pub fn new(
        base_url: &str,
        api_key: String,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .user_agent("arke/0.1")
            .build()
            .map_err(|err| GenerationError::GenerationFailed(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl GenerationClient for OpenAiGenerationClient {
    async fn generate(&self, query: &str, context: &str) -> Result<String, GenerationError> {
        let user_content = format!("### User Question\n{query}\n\n### Retrieved Chunks\n{context}");
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: GROUNDED_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_content,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerationError::GenerationFailed(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "generation endpoint returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::GenerationFailed(err.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationError::GenerationFailed("empty choices in completion".to_string())
            })
    }
}
