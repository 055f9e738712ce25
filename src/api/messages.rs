use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};

use crate::AppState;
use crate::error::{AppError, Protocol, ProtocolError};
use crate::providers::transform::claude::{MessagesRequest, MessagesResponse, StreamContext};
use crate::providers::transform::{PromptRequest, ResponseEvents};
use crate::providers::types::Response as ProviderResponse;

fn anthropic_error(err: impl Into<AppError>) -> ProtocolError {
    err.into().with_protocol(Protocol::Anthropic)
}

/// POST /v1/messages
///
/// Anthropic-compatible messages endpoint. Errors use the Anthropic error
/// envelope.
pub async fn create_message(
    State(state): State<AppState>,
    payload: Result<Json<MessagesRequest>, JsonRejection>,
) -> Result<Response, ProtocolError> {
    let Json(request) = payload.map_err(anthropic_error)?;
    let prompt = request.to_prompt_request().map_err(anthropic_error)?;

    tracing::info!(
        model = %prompt.model,
        stream = prompt.stream,
        messages = request.messages.len(),
        "Messages request"
    );

    let response = super::generate(&state, &prompt)
        .await
        .map_err(anthropic_error)?;

    if prompt.stream {
        Ok(stream_message(&response, &prompt))
    } else {
        Ok(Json(MessagesResponse::from_response(&response, &prompt)).into_response())
    }
}

/// Replay a finished reply as the Anthropic event sequence. Each SSE event
/// is named after its `type`.
fn stream_message(response: &ProviderResponse, prompt: &PromptRequest) -> Response {
    let mut ctx = StreamContext::new(prompt);
    let events = ResponseEvents::new(response)
        .flat_map(move |event| ctx.events(event))
        .map(|event| Event::default().event(event.event_name()).json_data(&event));

    Sse::new(tokio_stream::iter(events))
        .keep_alive(KeepAlive::default())
        .into_response()
}
