//! Provider traits.

use futures::future::BoxFuture;

use crate::providers::ProviderError;
use crate::providers::types::{
    ChatOption, GenerateOption, Message, ModelInfo, Response, SessionMetadata,
};

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> = BoxFuture<'a, Result<T, ProviderError>>;

/// Capability set every backing service implements.
///
/// Async methods return boxed futures so the trait can be used as
/// `Arc<dyn Provider>`.
pub trait Provider: Send + Sync {
    /// Registry name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Establish the upstream session. Safe to call once at startup.
    fn init(&self) -> ProviderFuture<'_, ()>;

    /// Single-turn generation without conversation state.
    fn generate_content<'a>(
        &'a self,
        prompt: &'a str,
        options: &'a [GenerateOption],
    ) -> ProviderFuture<'a, Response>;

    /// Open a conversation, optionally resuming known continuity ids.
    fn start_chat(&self, options: &[ChatOption]) -> Box<dyn ChatSession>;

    /// Stop background work and release the upstream session.
    fn close(&self) -> ProviderFuture<'_, ()>;

    /// Whether the provider currently holds a usable session.
    fn is_healthy(&self) -> bool;

    /// Models served by this provider.
    fn list_models(&self) -> Vec<ModelInfo>;

    /// Fetch a finished deep research report by conversation id.
    fn retrieve_research<'a>(&'a self, conversation_id: &'a str) -> ProviderFuture<'a, Response> {
        let _ = conversation_id;
        Box::pin(async move {
            Err(ProviderError::InvalidRequest(format!(
                "{} does not support research retrieval",
                self.name()
            )))
        })
    }
}

/// A stateful conversation bound to one provider.
///
/// History and metadata only change through [`ChatSession::send_message`]
/// (after a fully successful exchange) and [`ChatSession::clear`].
pub trait ChatSession: Send {
    fn send_message<'a>(
        &'a mut self,
        text: &'a str,
        options: &'a [GenerateOption],
    ) -> ProviderFuture<'a, Response>;

    /// Turns so far, oldest first.
    fn history(&self) -> &[Message];

    fn metadata(&self) -> SessionMetadata;

    /// Forget history and continuity ids.
    fn clear(&mut self);
}
