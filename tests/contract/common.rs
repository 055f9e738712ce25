use std::sync::Arc;
use std::time::Duration;

use ai_bridges::AppState;
use ai_bridges::config::Config;
use ai_bridges::providers::ProviderManager;
use ai_bridges::providers::gemini::constants::{APP_PATH, STREAM_GENERATE_PATH};
use ai_bridges::providers::gemini::{Credentials, GeminiWebClient, GeminiWebProvider};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "tok-contract";

/// One `StreamGenerate` body holding a single payload.
pub fn frame(payload: &Value) -> String {
    let envelope = json!([["wrb.fr", null, payload.to_string()]]).to_string();
    format!(")]}}'\n\n{}\n{}\n", envelope.len(), envelope)
}

/// Payload of an ordinary reply.
pub fn reply(cid: &str, rid: &str, rcid: &str, text: &str) -> Value {
    json!([null, [cid, rid], null, null, [[rcid, [text]]]])
}

pub fn ok(payload: &Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(frame(payload))
}

/// Mock server that hands out [`TOKEN`] from the app page.
pub async fn gemini_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(APP_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(r#""SNlM0e":"{TOKEN}""#)))
        .mount(&server)
        .await;
    server
}

pub async fn mount_generate(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(STREAM_GENERATE_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Initialized client pointed at `server`.
pub async fn client(server: &MockServer) -> GeminiWebClient {
    let client = GeminiWebClient::builder()
        .with_credentials(Credentials::new("psid").with_psidts("psidts"))
        .with_base_url(server.uri())
        .with_refresh_interval(Duration::ZERO)
        .build()
        .unwrap();
    client.init().await.unwrap();
    client
}

/// Application state with the Gemini web provider active.
pub async fn app_state(server: &MockServer) -> AppState {
    let mut manager = ProviderManager::new();
    manager.register(Arc::new(GeminiWebProvider::new(client(server).await)));
    manager.select_provider("gemini").unwrap();

    let mut config = Config::default();
    config.gemini.base_url = server.uri();
    AppState::new(config, manager)
}

/// `StreamGenerate` requests the server has seen.
pub async fn generate_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == STREAM_GENERATE_PATH)
        .collect()
}

/// Decoded inner request array of a `StreamGenerate` form body.
pub fn inner_payload(request: &Request) -> Value {
    let freq = url::form_urlencoded::parse(&request.body)
        .find(|(k, _)| k == "f.req")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    let outer: Value = serde_json::from_str(&freq).unwrap();
    serde_json::from_str(outer[1].as_str().unwrap()).unwrap()
}
