use ai_bridges::api::build_app;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::ResponseTemplate;

use crate::common;

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_openai_round_trip() {
    let server = common::gemini_server().await;
    common::mount_generate(&server, common::ok(&common::reply("c_1", "r_1", "rc_1", "4"))).await;
    let app = build_app(common::app_state(&server).await);

    let (status, body) = post_json(
        app,
        "/v1/chat/completions",
        json!({"model": "gemini-2.5-flash", "messages": [{"role": "user", "content": "2+2?"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["choices"][0]["message"]["content"], "4");

    let requests = common::generate_requests(&server).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(common::inner_payload(&requests[0])[0], json!(["2+2?"]));
}

#[tokio::test]
async fn test_anthropic_round_trip_flattens_transcript() {
    let server = common::gemini_server().await;
    common::mount_generate(&server, common::ok(&common::reply("c_1", "r_1", "rc_1", "Paris"))).await;
    let app = build_app(common::app_state(&server).await);

    let (status, body) = post_json(
        app,
        "/v1/messages",
        json!({
            "model": "gemini-2.5-pro",
            "max_tokens": 64,
            "system": "Be brief.",
            "messages": [{"role": "user", "content": "Capital of France?"}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"][0]["text"], "Paris");

    let requests = common::generate_requests(&server).await;
    let prompt = common::inner_payload(&requests[0])[0][0].as_str().unwrap().to_string();
    assert_eq!(prompt, "System: Be brief.\n\nUser: Capital of France?");
}

#[tokio::test]
async fn test_gemini_round_trip() {
    let server = common::gemini_server().await;
    common::mount_generate(&server, common::ok(&common::reply("c_1", "r_1", "rc_1", "Hello"))).await;
    let app = build_app(common::app_state(&server).await);

    let (status, body) = post_json(
        app,
        "/v1beta/models/gemini-2.5-flash:generateContent",
        json!({"contents": [{"role": "user", "parts": [{"text": "Hi"}]}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidates"][0]["content"]["parts"][0]["text"], "Hello");
}

#[tokio::test]
async fn test_upstream_error_is_bad_gateway() {
    let server = common::gemini_server().await;
    common::mount_generate(&server, ResponseTemplate::new(500).set_body_string("boom")).await;
    let app = build_app(common::app_state(&server).await);

    let (status, body) = post_json(
        app,
        "/v1/chat/completions",
        json!({"model": "gemini-2.5-flash", "messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body.to_string().contains("boom"));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let server = common::gemini_server().await;
    let app = build_app(common::app_state(&server).await);

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}
