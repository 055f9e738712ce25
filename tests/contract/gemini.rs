use std::sync::Arc;
use std::time::{Duration, Instant};

use ai_bridges::providers::types::{GenerateOption, META_STATE_TOKEN};
use ai_bridges::providers::{ChatSession, Provider, ProviderError};
use ai_bridges::providers::gemini::GeminiWebProvider;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{self, TOKEN};

#[tokio::test]
async fn test_single_turn_payload() {
    let server = common::gemini_server().await;
    common::mount_generate(&server, common::ok(&common::reply("c_1", "r_1", "rc_1", "4"))).await;
    let client = common::client(&server).await;

    let response = client.generate_content("2+2?", &[]).await.unwrap();
    assert_eq!(response.text, "4");

    let requests = common::generate_requests(&server).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        common::inner_payload(&requests[0]),
        json!([["2+2?"], null, [null, null, null]])
    );
    let query_token = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "at")
        .map(|(_, v)| v.into_owned());
    assert_eq!(query_token.as_deref(), Some(TOKEN));
}

#[tokio::test]
async fn test_exchanges_are_serialized() {
    let server = common::gemini_server().await;
    common::mount_generate(
        &server,
        common::ok(&common::reply("c", "r", "rc", "done")).set_delay(Duration::from_millis(200)),
    )
    .await;
    let client = common::client(&server).await;

    let started = Instant::now();
    let (a, b) = tokio::join!(
        client.generate_content("first", &[]),
        client.generate_content("second", &[])
    );
    a.unwrap();
    b.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_timeout_leaves_session_untouched() {
    let server = common::gemini_server().await;
    common::mount_generate(
        &server,
        common::ok(&common::reply("c_1", "r_1", "rc_1", "late")).set_delay(Duration::from_millis(500)),
    )
    .await;
    let provider = GeminiWebProvider::new(common::client(&server).await);

    let mut session = provider.start_chat(&[]);
    let err = session
        .send_message("hello", &[GenerateOption::Timeout(Duration::from_millis(50))])
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Cancelled(_)));
    assert!(session.history().is_empty());
    assert!(session.metadata().is_empty());

    // The lock was released with the cancelled exchange.
    let reply = session.send_message("hello", &[]).await.unwrap();
    assert_eq!(reply.text, "late");
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn test_follow_up_carries_conversation_ids() {
    let server = common::gemini_server().await;
    common::mount_generate(&server, common::ok(&common::reply("c_1", "r_1", "rc_1", "hi"))).await;
    let provider: Arc<dyn Provider> = Arc::new(GeminiWebProvider::new(common::client(&server).await));

    let mut session = provider.start_chat(&[]);
    session.send_message("one", &[]).await.unwrap();
    session.send_message("two", &[]).await.unwrap();

    let requests = common::generate_requests(&server).await;
    assert_eq!(requests.len(), 2);
    assert_eq!(
        common::inner_payload(&requests[1]),
        json!([["two"], null, ["c_1", "r_1", "rc_1"]])
    );
}

#[tokio::test]
async fn test_deep_research_without_state_token_sends_one_request() {
    let server = common::gemini_server().await;
    common::mount_generate(
        &server,
        common::ok(&common::reply("c_plan", "r_plan", "rc_plan", "Quick answer")),
    )
    .await;
    let client = common::client(&server).await;

    let response = client
        .generate_content("Research tides", &[GenerateOption::DeepResearch])
        .await
        .unwrap();
    assert_eq!(response.text, "Quick answer");
    assert!(response.metadata_str(META_STATE_TOKEN).is_none());
    assert_eq!(common::generate_requests(&server).await.len(), 1);
}

#[tokio::test]
async fn test_deep_research_runs_both_phases() {
    let server = common::gemini_server().await;
    let plan = json!([null, ["c_1", "r_1"], null, "state-xyz", [["rc_1", ["Plan"]]]]);
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path(
            ai_bridges::providers::gemini::constants::STREAM_GENERATE_PATH,
        ))
        .respond_with(common::ok(&plan))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    common::mount_generate(&server, common::ok(&common::reply("c_1", "r_2", "rc_2", "Report"))).await;
    let client = common::client(&server).await;

    let response = client
        .generate_content("Research tides", &[GenerateOption::DeepResearch])
        .await
        .unwrap();
    assert_eq!(response.text, "Report");
    assert_eq!(common::generate_requests(&server).await.len(), 2);
}
