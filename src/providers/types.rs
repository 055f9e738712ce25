//! Provider-neutral data model.
//!
//! Everything a backing service produces is normalized into a [`Response`];
//! conversations are tracked with [`Message`] history and [`SessionMetadata`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key carrying the conversation id.
pub const META_CONVERSATION_ID: &str = "cid";
/// Metadata key carrying the response id.
pub const META_RESPONSE_ID: &str = "rid";
/// Metadata key carrying the chosen candidate (choice) id.
pub const META_CHOICE_ID: &str = "rcid";
/// Metadata key carrying the deep research state token.
pub const META_STATE_TOKEN: &str = "state_token";
/// Metadata key carrying the model's thought summary, when present.
pub const META_THOUGHTS: &str = "thoughts";

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// An image attached to a model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// An alternative draft returned alongside the chosen answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub content: String,
}

/// A source link cited by a deep research report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

/// Normalized result of one exchange with a backing service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    /// Open-ended metadata. Well-known keys are the `META_*` constants.
    pub metadata: HashMap<String, Value>,
    pub chosen_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl Response {
    /// A metadata value as a string, treating empty strings as absent.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Id of the chosen candidate.
    pub fn choice_id(&self) -> Option<&str> {
        self.metadata_str(META_CHOICE_ID)
    }

    /// Deep research state token handed out by the planning phase.
    pub fn state_token(&self) -> Option<&str> {
        self.metadata_str(META_STATE_TOKEN)
    }
}

// ---------------------------------------------------------------------------
// Conversation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn model(content: impl Into<String>, images: Vec<Image>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            images,
        }
    }
}

/// Continuity state of a conversation.
///
/// Identifier fields are only ever replaced by non-empty values, so a reply
/// that omits an id never erases one learned earlier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, Value>,
}

impl SessionMetadata {
    /// Continuity identifiers carried by a decoded response.
    pub fn from_response(response: &Response) -> Self {
        let conversation_id = response
            .conversation_id
            .clone()
            .or_else(|| response.metadata_str(META_CONVERSATION_ID).map(String::from));
        let response_id = response
            .response_id
            .clone()
            .or_else(|| response.metadata_str(META_RESPONSE_ID).map(String::from));
        Self {
            conversation_id,
            response_id,
            choice_id: response.choice_id().map(String::from),
            model: None,
            extra: HashMap::new(),
        }
    }

    /// Fold `update` into `self`, keeping existing values wherever `update`
    /// has nothing (or an empty string) to offer.
    pub fn merge(&mut self, update: &SessionMetadata) {
        overwrite_if_present(&mut self.conversation_id, &update.conversation_id);
        overwrite_if_present(&mut self.response_id, &update.response_id);
        overwrite_if_present(&mut self.choice_id, &update.choice_id);
        overwrite_if_present(&mut self.model, &update.model);
        for (key, value) in &update.extra {
            if !value.is_null() {
                self.extra.insert(key.clone(), value.clone());
            }
        }
    }

    /// True when no conversation has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.conversation_id.is_none() && self.response_id.is_none() && self.choice_id.is_none()
    }
}

fn overwrite_if_present(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        *slot = Some(v.to_string());
    }
}

// ---------------------------------------------------------------------------
// Per-call options
// ---------------------------------------------------------------------------

/// Option accepted by `generate_content` and `send_message`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOption {
    Model(String),
    Files(Vec<PathBuf>),
    Temperature(f32),
    MaxTokens(u32),
    /// Run the two-phase deep research workflow instead of a single turn.
    DeepResearch,
    /// Abort the whole exchange once this much time has passed.
    Timeout(Duration),
}

/// Configuration assembled from a list of [`GenerateOption`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateConfig {
    pub model: Option<String>,
    pub files: Vec<PathBuf>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub deep_research: bool,
    pub timeout: Option<Duration>,
}

impl GenerateConfig {
    /// Later options win over earlier ones; `Files` accumulate.
    pub fn from_options(options: &[GenerateOption]) -> Self {
        let mut config = Self::default();
        for option in options {
            match option {
                GenerateOption::Model(model) => config.model = Some(model.clone()),
                GenerateOption::Files(files) => config.files.extend(files.iter().cloned()),
                GenerateOption::Temperature(t) => config.temperature = Some(*t),
                GenerateOption::MaxTokens(n) => config.max_tokens = Some(*n),
                GenerateOption::DeepResearch => config.deep_research = true,
                GenerateOption::Timeout(d) => config.timeout = Some(*d),
            }
        }
        config
    }
}

/// Option accepted by `start_chat`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOption {
    Model(String),
    /// Resume a previously observed conversation.
    Metadata(SessionMetadata),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatConfig {
    pub model: Option<String>,
    pub metadata: Option<SessionMetadata>,
}

impl ChatConfig {
    pub fn from_options(options: &[ChatOption]) -> Self {
        let mut config = Self::default();
        for option in options {
            match option {
                ChatOption::Model(model) => config.model = Some(model.clone()),
                ChatOption::Metadata(meta) => config.metadata = Some(meta.clone()),
            }
        }
        config
    }
}

// ---------------------------------------------------------------------------
// Model catalog entry
// ---------------------------------------------------------------------------

/// Static description of a model exposed through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub created: i64,
    pub owned_by: &'static str,
    /// Name of the backing provider serving this model.
    pub provider: &'static str,
}
