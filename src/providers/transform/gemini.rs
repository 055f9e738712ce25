//! Gemini REST (`generateContent`) wire types and translation.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderError;
use crate::providers::transform::stream::StreamEvent;
use crate::providers::transform::util::{
    PromptRequest, PromptTurn, TurnRole, build_prompt, estimate_tokens,
};
use crate::providers::types::{ModelInfo, Response};

pub const FINISH_REASON: &str = "STOP";

// MARK: - Request

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(default, alias = "system_instruction")]
    pub system_instruction: Option<Content>,
    #[serde(default, alias = "generation_config")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, alias = "max_output_tokens")]
    pub max_output_tokens: Option<u32>,
}

impl GenerateContentRequest {
    /// The model comes from the URL path, not the body.
    pub fn to_prompt_request(&self, model: &str, stream: bool) -> Result<PromptRequest, ProviderError> {
        let system = self
            .system_instruction
            .as_ref()
            .map(|c| PromptTurn::new(TurnRole::System, c.text()));
        let turns: Vec<PromptTurn> = system
            .into_iter()
            .chain(self.contents.iter().map(|c| {
                PromptTurn::new(TurnRole::parse(c.role.as_deref().unwrap_or("user")), c.text())
            }))
            .collect();
        let config = self.generation_config.clone().unwrap_or_default();

        Ok(PromptRequest {
            prompt: build_prompt(&turns)?,
            model: model.to_string(),
            stream,
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
            deep_research: false,
        })
    }
}

// MARK: - Response

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<&'static str>,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
}

impl UsageMetadata {
    fn estimate(prompt: &str, completion: &str) -> Self {
        let prompt_token_count = estimate_tokens(prompt);
        let candidates_token_count = estimate_tokens(completion);
        Self {
            prompt_token_count,
            candidates_token_count,
            total_token_count: prompt_token_count.saturating_add(candidates_token_count),
        }
    }
}

fn model_content(text: Option<String>) -> Content {
    Content {
        role: Some("model".to_string()),
        parts: text.map(|t| Part { text: Some(t) }).into_iter().collect(),
    }
}

impl GenerateContentResponse {
    pub fn from_response(response: &Response, request: &PromptRequest) -> Self {
        Self {
            candidates: vec![Candidate {
                content: model_content(Some(response.text.clone())),
                finish_reason: Some(FINISH_REASON),
                index: 0,
            }],
            usage_metadata: Some(UsageMetadata::estimate(&request.prompt, &response.text)),
            model_version: request.model.clone(),
        }
    }

    /// Streaming chunk for one neutral event.
    ///
    /// Gemini streams have no role-only frame, so [`StreamEvent::Role`] maps
    /// to `None`. The terminal chunk has no parts and carries the finish
    /// reason and usage.
    pub fn chunk(event: StreamEvent, request: &PromptRequest, completion: &str) -> Option<Self> {
        let (content, finish_reason, usage_metadata) = match event {
            StreamEvent::Role => return None,
            StreamEvent::Content(text) => (model_content(Some(text)), None, None),
            StreamEvent::Finish => (
                model_content(None),
                Some(FINISH_REASON),
                Some(UsageMetadata::estimate(&request.prompt, completion)),
            ),
        };
        Some(Self {
            candidates: vec![Candidate {
                content,
                finish_reason,
                index: 0,
            }],
            usage_metadata,
            model_version: request.model.clone(),
        })
    }
}

// MARK: - Models

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelList {
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub name: String,
    pub display_name: String,
    pub supported_generation_methods: Vec<&'static str>,
}

impl ModelList {
    pub fn from_models(models: &[ModelInfo]) -> Self {
        Self {
            models: models
                .iter()
                .map(|m| ModelEntry {
                    name: format!("models/{}", m.id),
                    display_name: m.id.to_string(),
                    supported_generation_methods: vec!["generateContent", "streamGenerateContent"],
                })
                .collect(),
        }
    }
}
