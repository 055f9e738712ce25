//! Anthropic messages wire types and translation.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderError;
use crate::providers::transform::stream::StreamEvent;
use crate::providers::transform::util::{
    PromptRequest, PromptTurn, TurnRole, build_prompt, estimate_tokens, response_id,
};
use crate::providers::types::Response;

pub const STOP_REASON: &str = "end_turn";

// MARK: - Request

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesRequest {
    #[serde(default)]
    pub model: String,
    pub messages: Vec<AnthropicMessage>,
    #[serde(default)]
    pub system: Option<SystemPrompt>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: BlockContent,
}

/// A string or a list of content blocks.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BlockContent {
    Text(String),
    Blocks(Vec<InputBlock>),
}

impl BlockContent {
    /// Text blocks joined by newlines. Images and tool blocks are ignored.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.kind == "text")
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InputBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

pub type SystemPrompt = BlockContent;

impl MessagesRequest {
    pub fn to_prompt_request(&self) -> Result<PromptRequest, ProviderError> {
        let system = self
            .system
            .as_ref()
            .map(|s| PromptTurn::new(TurnRole::System, s.as_text()));
        let turns: Vec<PromptTurn> = system
            .into_iter()
            .chain(
                self.messages
                    .iter()
                    .map(|m| PromptTurn::new(TurnRole::parse(&m.role), m.content.as_text())),
            )
            .collect();

        Ok(PromptRequest {
            prompt: build_prompt(&turns)?,
            model: self.model.clone(),
            stream: self.stream,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            deep_research: false,
        })
    }
}

// MARK: - Response

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub role: &'static str,
    pub model: String,
    pub content: Vec<TextBlock>,
    pub stop_reason: Option<&'static str>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl TextBlock {
    fn new(text: impl Into<String>) -> Self {
        Self {
            kind: "text",
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    pub fn from_response(response: &Response, request: &PromptRequest) -> Self {
        Self {
            id: response_id("msg_"),
            kind: "message",
            role: "assistant",
            model: request.model.clone(),
            content: vec![TextBlock::new(response.text.clone())],
            stop_reason: Some(STOP_REASON),
            stop_sequence: None,
            usage: Usage {
                input_tokens: estimate_tokens(&request.prompt),
                output_tokens: estimate_tokens(&response.text),
            },
        }
    }
}

// MARK: - Streaming

/// One server-sent event of the messages stream. The SSE event name equals
/// the `type` tag, see [`MessageStreamEvent::event_name`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageStreamEvent {
    MessageStart { message: MessagesResponse },
    ContentBlockStart { index: u32, content_block: TextBlock },
    ContentBlockDelta { index: u32, delta: TextDelta },
    ContentBlockStop { index: u32 },
    MessageDelta { delta: StopDelta, usage: OutputUsage },
    MessageStop,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextDelta {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopDelta {
    pub stop_reason: &'static str,
    pub stop_sequence: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct OutputUsage {
    pub output_tokens: u32,
}

impl MessageStreamEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::MessageStart { .. } => "message_start",
            Self::ContentBlockStart { .. } => "content_block_start",
            Self::ContentBlockDelta { .. } => "content_block_delta",
            Self::ContentBlockStop { .. } => "content_block_stop",
            Self::MessageDelta { .. } => "message_delta",
            Self::MessageStop => "message_stop",
        }
    }
}

/// Tracks what a messages stream has emitted so far.
#[derive(Debug, Clone)]
pub struct StreamContext {
    id: String,
    model: String,
    input_tokens: u32,
    output_tokens: u32,
}

impl StreamContext {
    pub fn new(request: &PromptRequest) -> Self {
        Self {
            id: response_id("msg_"),
            model: request.model.clone(),
            input_tokens: estimate_tokens(&request.prompt),
            output_tokens: 0,
        }
    }

    /// Anthropic events for one neutral event. The opener starts the message
    /// and its single text block; the terminal event closes both.
    pub fn events(&mut self, event: StreamEvent) -> Vec<MessageStreamEvent> {
        match event {
            StreamEvent::Role => vec![
                MessageStreamEvent::MessageStart {
                    message: MessagesResponse {
                        id: self.id.clone(),
                        kind: "message",
                        role: "assistant",
                        model: self.model.clone(),
                        content: Vec::new(),
                        stop_reason: None,
                        stop_sequence: None,
                        usage: Usage {
                            input_tokens: self.input_tokens,
                            output_tokens: 0,
                        },
                    },
                },
                MessageStreamEvent::ContentBlockStart {
                    index: 0,
                    content_block: TextBlock::new(""),
                },
            ],
            StreamEvent::Content(text) => {
                self.output_tokens = self.output_tokens.saturating_add(estimate_tokens(&text));
                vec![MessageStreamEvent::ContentBlockDelta {
                    index: 0,
                    delta: TextDelta {
                        kind: "text_delta",
                        text,
                    },
                }]
            }
            StreamEvent::Finish => vec![
                MessageStreamEvent::ContentBlockStop { index: 0 },
                MessageStreamEvent::MessageDelta {
                    delta: StopDelta {
                        stop_reason: STOP_REASON,
                        stop_sequence: None,
                    },
                    usage: OutputUsage {
                        output_tokens: self.output_tokens,
                    },
                },
                MessageStreamEvent::MessageStop,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::transform::stream::ResponseEvents;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_with_system_blocks() {
        let request: MessagesRequest = serde_json::from_value(json!({
            "model": "gemini-2.5-pro",
            "max_tokens": 256,
            "system": [{"type": "text", "text": "Be brief."}],
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": "Hi"}]}
            ]
        }))
        .unwrap();
        let prompt = request.to_prompt_request().unwrap();
        assert_eq!(prompt.prompt, "System: Be brief.\n\nUser: Hi");
        assert_eq!(prompt.max_tokens, Some(256));
    }

    #[test]
    fn test_plain_request_is_verbatim() {
        let request: MessagesRequest = serde_json::from_value(json!({
            "model": "gemini-2.5-pro",
            "messages": [{"role": "user", "content": "Hello"}]
        }))
        .unwrap();
        assert_eq!(request.to_prompt_request().unwrap().prompt, "Hello");
    }

    #[test]
    fn test_response_shape() {
        let request = PromptRequest {
            prompt: "Hello".into(),
            model: "gemini-2.5-pro".into(),
            ..Default::default()
        };
        let response = Response {
            text: "Hi!".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(MessagesResponse::from_response(&response, &request)).unwrap();
        assert_eq!(value["type"], json!("message"));
        assert_eq!(value["role"], json!("assistant"));
        assert_eq!(value["content"], json!([{"type": "text", "text": "Hi!"}]));
        assert_eq!(value["stop_reason"], json!("end_turn"));
        assert_eq!(value["usage"], json!({"input_tokens": 2, "output_tokens": 1}));
    }

    #[test]
    fn test_stream_event_sequence() {
        let request = PromptRequest {
            prompt: "Hello".into(),
            model: "gemini-2.5-pro".into(),
            stream: true,
            ..Default::default()
        };
        let mut ctx = StreamContext::new(&request);
        let events: Vec<MessageStreamEvent> = ResponseEvents::from_text("Hi there")
            .flat_map(|e| ctx.events(e))
            .collect();

        let names: Vec<&str> = events.iter().map(MessageStreamEvent::event_name).collect();
        assert_eq!(
            names,
            vec![
                "message_start",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );

        let delta = serde_json::to_value(&events[2]).unwrap();
        assert_eq!(
            delta,
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hi there"}})
        );
        let stop = serde_json::to_value(&events[4]).unwrap();
        assert_eq!(stop["delta"]["stop_reason"], json!("end_turn"));
        assert_eq!(stop["usage"]["output_tokens"], json!(2));
    }
}
