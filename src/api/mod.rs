pub mod chat;
pub mod embeddings;
pub mod gemini;
pub mod health;
pub mod messages;
pub mod models;
pub mod research;

use axum::Router;
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::config::Config;
use crate::providers::ProviderError;
use crate::providers::transform::PromptRequest;
use crate::providers::types::{GenerateOption, Response};

/// Build the full API router with all endpoint groups.
///
/// Route layout:
/// ```text
/// /health                                      GET
/// /v1/chat/completions                         POST   (OpenAI)
/// /v1/models                                   GET    (OpenAI)
/// /v1/embeddings                               POST   (OpenAI, 501)
/// /v1/messages                                 POST   (Anthropic)
/// /v1beta/models                               GET    (Gemini)
/// /v1beta/models/{model}:generateContent       POST   (Gemini)
/// /v1beta/models/{model}:streamGenerateContent POST   (Gemini)
/// /v1/research/{conversation_id}               GET
/// ```
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/models", get(models::list_models))
        .route("/v1/embeddings", post(embeddings::create_embedding))
        .route("/v1/messages", post(messages::create_message))
        .route("/v1beta/models", get(gemini::list_models))
        // `{model}:{action}` is a single path segment, split by the handler.
        .route("/v1beta/models/{model_action}", post(gemini::model_action))
        .route("/v1/research/{conversation_id}", get(research::retrieve_research))
}

/// Build the application router with the global middleware stack.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    // -- Request ID layer (X-Request-ID) --------------------------------------
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    build_api_router()
        .layer(propagate_id)
        .layer(TraceLayer::new_for_http())
        .layer(request_id)
        .layer(CatchPanicLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from config.
pub fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Run one translated request against the active provider, bounded by the
/// configured request timeout.
pub(crate) async fn generate(state: &AppState, prompt: &PromptRequest) -> Result<Response, ProviderError> {
    let provider = state.active_provider().await?;
    let mut options = prompt.generate_options();
    options.push(GenerateOption::Timeout(state.config.gemini.request_timeout()));

    let response = provider.generate_content(&prompt.prompt, &options).await?;
    tracing::debug!(
        provider = provider.name(),
        model = %prompt.model,
        chars = response.text.len(),
        "Generation finished"
    );
    Ok(response)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::AppState;
    use crate::config::Config;
    use crate::providers::models::models_for_provider;
    use crate::providers::traits::{ChatSession, ProviderFuture};
    use crate::providers::types::{
        ChatOption, GenerateConfig, GenerateOption, Message, ModelInfo, Response, SessionMetadata,
    };
    use crate::providers::{Provider, ProviderError, ProviderManager};

    /// Provider that echoes the prompt, or fails with a fixed error.
    pub struct EchoProvider {
        pub fail_with: Option<fn() -> ProviderError>,
        pub healthy: AtomicBool,
    }

    impl EchoProvider {
        pub fn new() -> Self {
            Self {
                fail_with: None,
                healthy: AtomicBool::new(true),
            }
        }
    }

    struct NoSession;

    impl ChatSession for NoSession {
        fn send_message<'a>(
            &'a mut self,
            _text: &'a str,
            _options: &'a [GenerateOption],
        ) -> ProviderFuture<'a, Response> {
            Box::pin(async { Err(ProviderError::InvalidRequest("no sessions".into())) })
        }

        fn history(&self) -> &[Message] {
            &[]
        }

        fn metadata(&self) -> SessionMetadata {
            SessionMetadata::default()
        }

        fn clear(&mut self) {}
    }

    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "gemini"
        }

        fn init(&self) -> ProviderFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }

        fn generate_content<'a>(
            &'a self,
            prompt: &'a str,
            options: &'a [GenerateOption],
        ) -> ProviderFuture<'a, Response> {
            Box::pin(async move {
                if let Some(fail) = self.fail_with {
                    return Err(fail());
                }
                let config = GenerateConfig::from_options(options);
                Ok(Response {
                    text: format!("echo: {prompt}"),
                    conversation_id: config.deep_research.then(|| "c_research".to_string()),
                    ..Default::default()
                })
            })
        }

        fn start_chat(&self, _options: &[ChatOption]) -> Box<dyn ChatSession> {
            Box::new(NoSession)
        }

        fn close(&self) -> ProviderFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }

        fn list_models(&self) -> Vec<ModelInfo> {
            models_for_provider("gemini")
        }

        fn retrieve_research<'a>(&'a self, conversation_id: &'a str) -> ProviderFuture<'a, Response> {
            Box::pin(async move {
                Ok(Response {
                    text: format!("report for {conversation_id}"),
                    conversation_id: Some(conversation_id.to_string()),
                    ..Default::default()
                })
            })
        }
    }

    pub fn state_with(provider: Option<EchoProvider>) -> AppState {
        let mut manager = ProviderManager::new();
        if let Some(provider) = provider {
            manager.register(Arc::new(provider));
            manager.select_provider("gemini").unwrap();
        }
        AppState::new(Config::default(), manager)
    }

    pub fn echo_state() -> AppState {
        state_with(Some(EchoProvider::new()))
    }
}
