use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};

use crate::AppState;
use crate::error::{AppError, Protocol, ProtocolError};
use crate::providers::transform::gemini::{GenerateContentRequest, GenerateContentResponse, ModelList};
use crate::providers::transform::{PromptRequest, ResponseEvents};
use crate::providers::types::Response as ProviderResponse;

fn gemini_error(err: impl Into<AppError>) -> ProtocolError {
    err.into().with_protocol(Protocol::Gemini)
}

/// GET /v1beta/models
pub async fn list_models(State(state): State<AppState>) -> Result<Json<ModelList>, ProtocolError> {
    let provider = state.active_provider().await.map_err(gemini_error)?;
    Ok(Json(ModelList::from_models(&provider.list_models())))
}

/// POST /v1beta/models/{model}:{action}
///
/// `generateContent` answers with one JSON body, `streamGenerateContent`
/// with SSE chunks. Any other action is a 404.
pub async fn model_action(
    State(state): State<AppState>,
    Path(model_action): Path<String>,
    payload: Result<Json<GenerateContentRequest>, JsonRejection>,
) -> Result<Response, ProtocolError> {
    let (model, stream) = match model_action.rsplit_once(':') {
        Some((model, "generateContent")) if !model.is_empty() => (model, false),
        Some((model, "streamGenerateContent")) if !model.is_empty() => (model, true),
        _ => {
            return Err(gemini_error(AppError::NotFound(format!(
                "Unknown model action: {model_action}"
            ))));
        }
    };

    let Json(request) = payload.map_err(gemini_error)?;
    let prompt = request
        .to_prompt_request(model, stream)
        .map_err(gemini_error)?;

    tracing::info!(
        model = %prompt.model,
        stream,
        contents = request.contents.len(),
        "Generate content request"
    );

    let response = super::generate(&state, &prompt)
        .await
        .map_err(gemini_error)?;

    if stream {
        Ok(stream_content(&response, prompt))
    } else {
        Ok(Json(GenerateContentResponse::from_response(&response, &prompt)).into_response())
    }
}

fn stream_content(response: &ProviderResponse, prompt: PromptRequest) -> Response {
    let completion = response.text.clone();
    let events = ResponseEvents::new(response)
        .filter_map(move |event| GenerateContentResponse::chunk(event, &prompt, &completion))
        .map(|chunk| Event::default().json_data(&chunk));

    Sse::new(tokio_stream::iter(events))
        .keep_alive(KeepAlive::default())
        .into_response()
}
