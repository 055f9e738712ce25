use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppError;
use crate::providers::transform::openai::ModelList;

/// GET /v1/models
///
/// Models served by the active provider, in the OpenAI list format.
pub async fn list_models(State(state): State<AppState>) -> Result<Json<ModelList>, AppError> {
    let provider = state.active_provider().await?;
    Ok(Json(ModelList::from_models(&provider.list_models())))
}
