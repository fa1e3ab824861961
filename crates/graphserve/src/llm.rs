//! Chat and embedding clients.
//!
//! The engines talk to the model API through two narrow traits so tests can
//! substitute canned responses. The real implementations sit on top of
//! `async-openai`; retry behavior belongs to that client, not to the
//! engines.

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::error::{Error, Result};

/// Default chat model used by both engines.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
/// Default embedding model for entity-description search.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Per-call generation parameters.
#[derive(Debug, Clone, Copy)]
pub struct GenerateParams {
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature. Both engines run deterministically at 0.0.
    pub temperature: f32,
    /// Constrain the response to a JSON object (global map phase).
    pub json_mode: bool,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            max_tokens: 2_000,
            temperature: 0.0,
            json_mode: false,
        }
    }
}

/// A chat completion model driven with a system prompt and a user turn.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for `user` under `system`.
    async fn generate(&self, system: &str, user: &str, params: &GenerateParams) -> Result<String>;
}

/// Text embedding model.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of documents.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// [`ChatModel`] over the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAIChat {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChat {
    /// Build a client against `api_base` with `api_key`, using
    /// [`DEFAULT_CHAT_MODEL`].
    #[must_use]
    pub fn new(api_key: &str, api_base: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(config),
            model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    /// Override the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    async fn generate(&self, system: &str, user: &str, params: &GenerateParams) -> Result<String> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()?
                    .into(),
            ])
            .max_tokens(params.max_tokens)
            .temperature(params.temperature);
        if params.json_mode {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let request = builder.build()?;

        let response = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelResponse("completion had no choices".to_string()))?;
        choice
            .message
            .content
            .ok_or_else(|| Error::ModelResponse("completion had no content".to_string()))
    }
}

/// [`Embeddings`] over the OpenAI embeddings API.
#[derive(Clone)]
pub struct OpenAIEmbeddings {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIEmbeddings {
    /// Build a client against `api_base` with `api_key`, using
    /// [`DEFAULT_EMBEDDING_MODEL`].
    #[must_use]
    pub fn new(api_key: &str, api_base: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(config),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// Override the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts)
            .build()?;
        let response = self.client.embeddings().create(request).await?;
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embeddings for OpenAIEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelResponse("embedding response was empty".to_string()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts.to_vec()).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-test-123",
            "object": "chat.completion",
            "created": 1_699_000_000,
            "model": DEFAULT_CHAT_MODEL,
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        })
    }

    #[tokio::test]
    async fn generate_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": DEFAULT_CHAT_MODEL })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("Paris.")))
            .expect(1)
            .mount(&server)
            .await;

        let chat = OpenAIChat::new("test-key", &server.uri());
        let out = chat
            .generate("You are helpful", "Capital of France?", &GenerateParams::default())
            .await
            .unwrap();
        assert_eq!(out, "Paris.");
    }

    #[tokio::test]
    async fn json_mode_sets_response_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(
                json!({ "response_format": { "type": "json_object" } }),
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completion_body("{\"points\":[]}")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let chat = OpenAIChat::new("test-key", &server.uri());
        let params = GenerateParams {
            max_tokens: 1_000,
            json_mode: true,
            ..GenerateParams::default()
        };
        let out = chat.generate("map", "query", &params).await.unwrap();
        assert_eq!(out, "{\"points\":[]}");
    }

    #[tokio::test]
    async fn upstream_error_surfaces_as_model_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "boom", "type": "server_error", "code": null }
            })))
            .mount(&server)
            .await;

        let chat = OpenAIChat::new("test-key", &server.uri());
        let err = chat
            .generate("sys", "user", &GenerateParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModelCall(_)));
    }
}
