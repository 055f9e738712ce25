use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};

use crate::AppState;
use crate::error::AppError;
use crate::providers::transform::ResponseEvents;
use crate::providers::transform::openai::{ChatCompletionRequest, ChatCompletionResponse, ChunkContext};
use crate::providers::types::Response as ProviderResponse;

/// POST /v1/chat/completions
///
/// OpenAI-compatible chat completion endpoint supporting both streaming
/// (SSE) and non-streaming JSON responses.
pub async fn chat_completions(
    State(state): State<AppState>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let prompt = request.to_prompt_request()?;

    tracing::info!(
        model = %prompt.model,
        stream = prompt.stream,
        messages = request.messages.len(),
        deep_research = prompt.deep_research,
        "Chat completion request"
    );

    let response = super::generate(&state, &prompt).await?;

    if prompt.stream {
        Ok(stream_completion(&response, &prompt.model))
    } else {
        Ok(Json(ChatCompletionResponse::from_response(&response, &prompt)).into_response())
    }
}

/// Replay a finished reply as `chat.completion.chunk` events followed by the
/// `[DONE]` sentinel.
fn stream_completion(response: &ProviderResponse, model: &str) -> Response {
    let ctx = ChunkContext::new(model);
    let events = ResponseEvents::new(response)
        .map(move |event| Event::default().json_data(ctx.chunk(event)))
        .chain(std::iter::once(Ok(Event::default().data("[DONE]"))));

    Sse::new(tokio_stream::iter(events))
        .keep_alive(KeepAlive::default())
        .into_response()
}
