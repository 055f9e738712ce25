use crate::error::AppError;

/// POST /v1/embeddings
///
/// The web app has no embedding model, so this always answers 501 in the
/// OpenAI error format. The body is not inspected.
pub async fn create_embedding() -> AppError {
    AppError::NotImplemented("Embeddings are not supported by this bridge".to_string())
}

#[cfg(test)]
mod tests {
    use crate::api::build_api_router;
    use crate::api::test_support::echo_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_embeddings_not_implemented() {
        let app = build_api_router().with_state(echo_state());
        let req = Request::builder()
            .method("POST")
            .uri("/v1/embeddings")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"model":"text-embedding-3-small","input":"hi"}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["type"], "not_implemented_error");
        assert_eq!(json["error"]["code"], "not_implemented");
    }
}
