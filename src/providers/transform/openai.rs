//! OpenAI chat completions wire types and translation.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderError;
use crate::providers::transform::stream::StreamEvent;
use crate::providers::transform::util::{
    PromptRequest, PromptTurn, TurnRole, build_prompt, estimate_tokens, response_id,
};
use crate::providers::types::{ModelInfo, Response};

pub const FINISH_REASON: &str = "stop";

// MARK: - Request

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, alias = "max_completion_tokens")]
    pub max_tokens: Option<u32>,
    /// Extension: run deep research. The reply carries `conversation_id` so
    /// the finished report can be fetched from `/v1/research/{id}`.
    #[serde(default)]
    pub deep_research: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

/// Message content: a plain string or an array of typed parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text parts joined by newlines. Non-text parts are ignored.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ChatCompletionRequest {
    pub fn to_prompt_request(&self) -> Result<PromptRequest, ProviderError> {
        let turns: Vec<PromptTurn> = self
            .messages
            .iter()
            .map(|m| {
                PromptTurn::new(
                    TurnRole::parse(&m.role),
                    m.content.as_ref().map(MessageContent::as_text).unwrap_or_default(),
                )
            })
            .collect();

        Ok(PromptRequest {
            prompt: build_prompt(&turns)?,
            model: self.model.clone(),
            stream: self.stream,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            deep_research: self.deep_research,
        })
    }
}

// MARK: - Response

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        let prompt_tokens = estimate_tokens(prompt);
        let completion_tokens = estimate_tokens(completion);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

impl ChatCompletionResponse {
    pub fn from_response(response: &Response, request: &PromptRequest) -> Self {
        Self {
            id: response_id("chatcmpl-"),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: request.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    role: "assistant".to_string(),
                    content: response.text.clone(),
                },
                finish_reason: FINISH_REASON.to_string(),
            }],
            usage: Usage::estimate(&request.prompt, &response.text),
            conversation_id: request
                .deep_research
                .then(|| response.conversation_id.clone())
                .flatten(),
        }
    }
}

// MARK: - Streaming

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Shared identity of every chunk in one completion stream.
#[derive(Debug, Clone)]
pub struct ChunkContext {
    pub id: String,
    pub created: i64,
    pub model: String,
}

impl ChunkContext {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: response_id("chatcmpl-"),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
        }
    }

    pub fn chunk(&self, event: StreamEvent) -> ChatCompletionChunk {
        let (delta, finish_reason) = match event {
            StreamEvent::Role => (
                Delta {
                    role: Some("assistant".to_string()),
                    content: None,
                },
                None,
            ),
            StreamEvent::Content(text) => (
                Delta {
                    role: None,
                    content: Some(text),
                },
                None,
            ),
            StreamEvent::Finish => (Delta::default(), Some(FINISH_REASON.to_string())),
        };

        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

// MARK: - Models

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelObject {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl ModelList {
    pub fn from_models(models: &[ModelInfo]) -> Self {
        Self {
            object: "list".to_string(),
            data: models
                .iter()
                .map(|m| ModelObject {
                    id: m.id.to_string(),
                    object: "model".to_string(),
                    created: m.created,
                    owned_by: m.owned_by.to_string(),
                })
                .collect(),
        }
    }
}
