//! Shared conversion utilities for the protocol translators.
//!
//! Every exposed protocol is reduced to a [`PromptRequest`] before it reaches a
//! provider. The backing service is stateless from the caller's point of view,
//! so a multi-message request is flattened into one role-labelled transcript
//! that carries its own context.

use crate::providers::ProviderError;
use crate::providers::types::GenerateOption;

// MARK: - Prompt Request

/// Protocol-neutral form of an inbound generation request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PromptRequest {
    pub prompt: String,
    pub model: String,
    pub stream: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Run the deep research workflow instead of a single turn.
    pub deep_research: bool,
}

impl PromptRequest {
    /// Options to pass to [`crate::providers::Provider::generate_content`].
    pub fn generate_options(&self) -> Vec<GenerateOption> {
        let mut options = Vec::with_capacity(4);
        if !self.model.is_empty() {
            options.push(GenerateOption::Model(self.model.clone()));
        }
        if let Some(t) = self.temperature {
            options.push(GenerateOption::Temperature(t));
        }
        if let Some(n) = self.max_tokens {
            options.push(GenerateOption::MaxTokens(n));
        }
        if self.deep_research {
            options.push(GenerateOption::DeepResearch);
        }
        options
    }
}

// MARK: - Transcript

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl TurnRole {
    /// Map a protocol role name. Gemini's `model` and OpenAI's `tool` are
    /// folded into the closest transcript role.
    pub fn parse(role: &str) -> Self {
        match role {
            "system" | "developer" => Self::System,
            "assistant" | "model" => Self::Assistant,
            _ => Self::User,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One message of an inbound conversation, reduced to plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTurn {
    pub role: TurnRole,
    pub text: String,
}

impl PromptTurn {
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Build the prompt sent upstream.
///
/// A lone user message goes out verbatim. Anything else becomes a transcript
/// with the system text first, then the remaining turns in order, each
/// prefixed by its role. Turns with blank text are dropped.
pub fn build_prompt(turns: &[PromptTurn]) -> Result<String, ProviderError> {
    let turns: Vec<&PromptTurn> = turns.iter().filter(|t| !t.text.trim().is_empty()).collect();

    match turns.as_slice() {
        [] => Err(ProviderError::InvalidRequest(
            "request contains no message text".to_string(),
        )),
        [only] if only.role == TurnRole::User => Ok(only.text.clone()),
        _ => {
            let system = turns.iter().filter(|t| t.role == TurnRole::System);
            let rest = turns.iter().filter(|t| t.role != TurnRole::System);
            let sections: Vec<String> = system
                .chain(rest)
                .map(|t| format!("{}: {}", t.role.label(), t.text))
                .collect();
            Ok(sections.join("\n\n"))
        }
    }
}

// MARK: - Usage

/// Rough token count for usage reporting, about four characters per token.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

// MARK: - Ids

/// Fresh id with the given prefix, e.g. `chatcmpl-…` or `msg_…`.
pub fn response_id(prefix: &str) -> String {
    format!("{prefix}{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_user_message_is_verbatim() {
        let prompt = build_prompt(&[PromptTurn::new(TurnRole::User, "2+2?")]).unwrap();
        assert_eq!(prompt, "2+2?");
    }

    #[test]
    fn test_transcript_puts_system_first() {
        let turns = [
            PromptTurn::new(TurnRole::User, "Hi"),
            PromptTurn::new(TurnRole::Assistant, "Hello!"),
            PromptTurn::new(TurnRole::System, "Be brief."),
            PromptTurn::new(TurnRole::User, "Bye"),
        ];
        assert_eq!(
            build_prompt(&turns).unwrap(),
            "System: Be brief.\n\nUser: Hi\n\nAssistant: Hello!\n\nUser: Bye"
        );
    }

    #[test]
    fn test_system_plus_user_is_transcript() {
        let turns = [
            PromptTurn::new(TurnRole::System, "Be brief."),
            PromptTurn::new(TurnRole::User, "Hi"),
        ];
        assert_eq!(build_prompt(&turns).unwrap(), "System: Be brief.\n\nUser: Hi");
    }

    #[test]
    fn test_blank_turns_dropped() {
        let turns = [
            PromptTurn::new(TurnRole::System, "  "),
            PromptTurn::new(TurnRole::User, "Hi"),
        ];
        assert_eq!(build_prompt(&turns).unwrap(), "Hi");
        assert!(matches!(
            build_prompt(&[PromptTurn::new(TurnRole::User, "")]),
            Err(ProviderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(TurnRole::parse("model"), TurnRole::Assistant);
        assert_eq!(TurnRole::parse("developer"), TurnRole::System);
        assert_eq!(TurnRole::parse("tool"), TurnRole::User);
    }

    #[test]
    fn test_generate_options() {
        let request = PromptRequest {
            prompt: "x".into(),
            model: "gemini-2.5-pro".into(),
            temperature: Some(0.2),
            ..Default::default()
        };
        assert_eq!(
            request.generate_options(),
            vec![
                GenerateOption::Model("gemini-2.5-pro".into()),
                GenerateOption::Temperature(0.2)
            ]
        );
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
