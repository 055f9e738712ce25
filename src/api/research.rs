use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use crate::AppState;
use crate::error::AppError;
use crate::providers::types::Reference;

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub conversation_id: String,
    pub text: String,
    pub references: Vec<Reference>,
}

/// GET /v1/research/{conversation_id}
///
/// Fetch the report of a deep research conversation started through
/// `/v1/chat/completions` with `deep_research: true`.
pub async fn retrieve_research(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ResearchResponse>, AppError> {
    let provider = state.active_provider().await?;
    tracing::info!(conversation_id = %conversation_id, "Research retrieval request");

    let response = provider.retrieve_research(&conversation_id).await?;
    Ok(Json(ResearchResponse {
        conversation_id: response.conversation_id.unwrap_or(conversation_id),
        text: response.text,
        references: response.references,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::build_api_router;
    use crate::api::test_support::{echo_state, state_with};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_research(state: crate::AppState, id: &str) -> (StatusCode, Value) {
        let app = build_api_router().with_state(state);
        let req = Request::builder()
            .uri(format!("/v1/research/{id}"))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_retrieve_research() {
        let (status, json) = get_research(echo_state(), "c_abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["conversation_id"], "c_abc");
        assert_eq!(json["text"], "report for c_abc");
        assert!(json["references"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_research_without_provider() {
        let (status, _) = get_research(state_with(None), "c_abc").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
