//! OpenAI-compatible wire types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::format::whitespace_tokens;
use crate::settings::{MODEL_GLOBAL_SEARCH, MODEL_LOCAL_SEARCH, MODEL_OWNER};

/// One message of a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of `POST /v1/chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    /// Selects the engine: the global alias routes globally, anything
    /// else locally.
    pub model: String,
    /// Conversation; the last message's content is the query.
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
}

/// Whitespace-token usage accounting.
///
/// Counts words, not tokenizer tokens; the engines do their own real
/// token budgeting internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    #[must_use]
    pub fn from_texts(prompt: &str, completion: &str) -> Self {
        let prompt_tokens = whitespace_tokens(prompt);
        let completion_tokens = whitespace_tokens(completion);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// A complete (non-streaming) chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Usage,
}

impl ChatCompletionResponse {
    /// Assemble a single-choice completion for `content`.
    #[must_use]
    pub fn new(id: String, model: String, content: String, usage: Usage) -> Self {
        Self {
            id,
            object: "chat.completion".to_string(),
            created: Utc::now().timestamp(),
            model,
            choices: vec![ChatCompletionChoice {
                index: 0,
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content,
                },
                finish_reason: "stop".to_string(),
            }],
            usage,
        }
    }
}

/// Incremental content carried by a stream chunk. The final chunk's delta
/// is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// One server-sent chunk of a streamed completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// A chunk delivering one line of content.
    #[must_use]
    pub fn content(id: &str, model: &str, content: String) -> Self {
        Self::build(id, model, Some(content), None)
    }

    /// The terminal chunk: empty delta, finish reason `stop`.
    #[must_use]
    pub fn done(id: &str, model: &str) -> Self {
        Self::build(id, model, None, Some("stop".to_string()))
    }

    fn build(id: &str, model: &str, content: Option<String>, finish: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created: Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![StreamChoice {
                index: 0,
                delta: Delta { content },
                finish_reason: finish,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// Body of `GET /v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelList {
    /// The two supported model identifiers, created-at set to call time.
    #[must_use]
    pub fn current() -> Self {
        let created = Utc::now().timestamp();
        let data = [MODEL_GLOBAL_SEARCH, MODEL_LOCAL_SEARCH]
            .into_iter()
            .map(|id| ModelInfo {
                id: id.to_string(),
                object: "model".to_string(),
                created,
                owned_by: MODEL_OWNER.to_string(),
            })
            .collect();
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
