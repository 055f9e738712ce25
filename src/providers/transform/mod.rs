//! Protocol translation.
//!
//! Each exposed API (OpenAI chat completions, Anthropic messages, Gemini
//! `generateContent`) has a module with its wire types and the mapping to and
//! from the provider types. Shared prompt building lives in [`util`] and the
//! streaming event model in [`stream`].

pub mod claude;
pub mod gemini;
pub mod openai;
pub mod stream;
pub mod util;

pub use stream::{ResponseEvents, StreamEvent};
pub use util::{PromptRequest, PromptTurn, TurnRole, build_prompt, estimate_tokens};
