//! Stateful conversations on top of [`GeminiWebClient`].

use tracing::debug;

use crate::providers::gemini::client::{GeminiWebClient, with_deadline};
use crate::providers::traits::{ChatSession, ProviderFuture};
use crate::providers::types::{
    GenerateConfig, GenerateOption, Message, Response, SessionMetadata,
};

/// A conversation that threads continuity ids from one turn to the next.
///
/// Nothing is recorded until an exchange has fully succeeded, so a failed or
/// cancelled turn leaves history and metadata exactly as they were.
pub struct GeminiChatSession {
    client: GeminiWebClient,
    model: Option<String>,
    metadata: SessionMetadata,
    history: Vec<Message>,
}

impl GeminiChatSession {
    pub(crate) fn new(
        client: GeminiWebClient,
        model: Option<String>,
        metadata: Option<SessionMetadata>,
    ) -> Self {
        Self {
            client,
            model,
            metadata: metadata.unwrap_or_default(),
            history: Vec::new(),
        }
    }
}

impl ChatSession for GeminiChatSession {
    fn send_message<'a>(
        &'a mut self,
        text: &'a str,
        options: &'a [GenerateOption],
    ) -> ProviderFuture<'a, Response> {
        Box::pin(async move {
            let config = GenerateConfig::from_options(options);
            let client = &self.client;
            let metadata = &self.metadata;

            let response = with_deadline(config.timeout, async {
                let _guard = client.lock().await;
                client.exchange(text, metadata, &config).await
            })
            .await?;

            self.metadata.merge(&SessionMetadata::from_response(&response));
            self.history.push(Message::user(text));
            self.history
                .push(Message::model(response.text.clone(), response.images.clone()));
            debug!(
                turns = self.history.len() / 2,
                conversation_id = self.metadata.conversation_id.as_deref().unwrap_or(""),
                "Chat turn committed"
            );
            Ok(response)
        })
    }

    fn history(&self) -> &[Message] {
        &self.history
    }

    fn metadata(&self) -> SessionMetadata {
        let mut metadata = self.metadata.clone();
        if metadata.model.is_none() {
            metadata.model.clone_from(&self.model);
        }
        metadata
    }

    fn clear(&mut self) {
        self.history.clear();
        self.metadata = SessionMetadata::default();
    }
}
