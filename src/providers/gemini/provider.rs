//! Gemini web provider
//!
//! Exposes [`GeminiWebClient`] through the [`Provider`] trait so the manager
//! and the HTTP layer never see the web protocol directly.

use tracing::info;

use crate::providers::gemini::client::GeminiWebClient;
use crate::providers::models::models_for_provider;
use crate::providers::traits::{ChatSession, Provider, ProviderFuture};
use crate::providers::types::{ChatOption, GenerateOption, ModelInfo, Response};

const PROVIDER_NAME: &str = "gemini";

/// Provider backed by the Gemini web app.
pub struct GeminiWebProvider {
    client: GeminiWebClient,
}

impl GeminiWebProvider {
    pub fn new(client: GeminiWebClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GeminiWebClient {
        &self.client
    }
}

impl Provider for GeminiWebProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn init(&self) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            self.client.init().await?;
            info!(provider = PROVIDER_NAME, "Provider initialized");
            Ok(())
        })
    }

    fn generate_content<'a>(
        &'a self,
        prompt: &'a str,
        options: &'a [GenerateOption],
    ) -> ProviderFuture<'a, Response> {
        Box::pin(self.client.generate_content(prompt, options))
    }

    fn start_chat(&self, options: &[ChatOption]) -> Box<dyn ChatSession> {
        Box::new(self.client.start_chat(options))
    }

    fn close(&self) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            self.client.close();
            Ok(())
        })
    }

    fn is_healthy(&self) -> bool {
        self.client.is_healthy()
    }

    fn list_models(&self) -> Vec<ModelInfo> {
        models_for_provider(PROVIDER_NAME)
    }

    fn retrieve_research<'a>(&'a self, conversation_id: &'a str) -> ProviderFuture<'a, Response> {
        Box::pin(self.client.retrieve_deep_research(conversation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::gemini::auth::Credentials;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> GeminiWebProvider {
        let client = GeminiWebClient::builder()
            .with_credentials(Credentials::new("psid"))
            .with_base_url(base_url)
            .with_refresh_interval(Duration::ZERO)
            .build()
            .unwrap();
        GeminiWebProvider::new(client)
    }

    #[test]
    fn test_identity_and_models() {
        let provider = provider("https://gemini.example.com");
        assert_eq!(provider.name(), "gemini");
        let models = provider.list_models();
        assert!(!models.is_empty());
        assert!(models.iter().all(|m| m.provider == "gemini"));
        assert!(!provider.is_healthy());
    }

    #[tokio::test]
    async fn test_init_and_close_toggle_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#""SNlM0e":"tok""#))
            .mount(&server)
            .await;

        let provider = provider(&server.uri());
        provider.init().await.unwrap();
        assert!(provider.is_healthy());

        provider.close().await.unwrap();
        assert!(!provider.is_healthy());
    }

    #[tokio::test]
    async fn test_init_failure_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>sign in</html>"))
            .mount(&server)
            .await;

        let provider = provider(&server.uri());
        assert!(provider.init().await.is_err());
        assert!(!provider.is_healthy());
    }
}
