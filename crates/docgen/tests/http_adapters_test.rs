//! HTTP adapter tests against a local mock server.

use docgen::adapter::{
    CompletionAdapter, CompletionError, OpenAiCompletion, OutputShape, SearchAdapter, SearchError,
    TavilySearch,
};
use docgen::message::Message;
use docgen::retry::{RetryError, retrying_call};
use docgen::workflow::ReportPlan;
use serde_json::{Value as JsonValue, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_reply(content: JsonValue) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn openai(server: &MockServer) -> OpenAiCompletion {
    OpenAiCompletion::new("test-key", "gpt-4o-mini").with_base_url(format!("{}/v1", server.uri()))
}

// ============================================================================
// OpenAiCompletion
// ============================================================================

#[tokio::test]
async fn test_openai_text_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "temperature": 0.0 })))
        .respond_with(chat_reply(json!("Rust is memory safe.")))
        .expect(1)
        .mount(&server)
        .await;

    let value = openai(&server)
        .complete(
            "You write sections.",
            &[Message::user("Research for Safety:\nresult")],
            &OutputShape::Text,
        )
        .await
        .unwrap();

    assert_eq!(value, Some(json!("Rust is memory safe.")));

    let requests = server.received_requests().await.unwrap();
    let body: JsonValue = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0], json!({"role": "system", "content": "You write sections."}));
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(body.get("response_format").is_none());
}

#[tokio::test]
async fn test_openai_json_shape_sends_schema_and_parses_fenced_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "response_format": { "type": "json_schema", "json_schema": { "name": "ReportPlan" } }
        })))
        .respond_with(chat_reply(json!(
            "Here is the plan:\n```json\n{\"title\": \"Rust\", \"sections\": [{\"name\": \"Intro\"}]}\n```"
        )))
        .mount(&server)
        .await;

    let plan: ReportPlan = retrying_call(&openai(&server), "Plan it.", &[], 3)
        .await
        .unwrap();

    assert_eq!(plan, ReportPlan::new("Rust", ["Intro"]));
}

#[tokio::test]
async fn test_openai_empty_content_is_no_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_reply(JsonValue::Null))
        .mount(&server)
        .await;

    let value = openai(&server)
        .complete("sys", &[], &OutputShape::Text)
        .await
        .unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_openai_unauthorized_aborts_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "Incorrect API key provided" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = retrying_call::<String>(&openai(&server), "sys", &[], 3)
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Aborted(CompletionError::Rejected(_))));
}

#[tokio::test]
async fn test_openai_server_error_consumes_attempt_then_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_reply(json!("Recovered.")))
        .expect(1)
        .mount(&server)
        .await;

    let text: String = retrying_call(&openai(&server), "sys", &[], 3).await.unwrap();
    assert_eq!(text, "Recovered.");
}

#[tokio::test]
async fn test_openai_persistent_server_error_exhausts_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = retrying_call::<String>(&openai(&server), "sys", &[], 3)
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
}

// ============================================================================
// TavilySearch
// ============================================================================

#[tokio::test]
async fn test_tavily_search_renders_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({ "query": "Rust overview", "max_results": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Rust is a language.",
            "results": [
                { "title": "Rust", "url": "https://www.rust-lang.org", "content": "Fast and safe." }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let search = TavilySearch::new("tvly-key")
        .with_base_url(server.uri())
        .with_max_results(2);
    let text = search.search("Rust overview").await.unwrap();

    assert_eq!(
        text,
        "Rust is a language.\n\nRust\nhttps://www.rust-lang.org\nFast and safe."
    );
}

#[tokio::test]
async fn test_tavily_http_error_is_search_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = TavilySearch::new("tvly-key")
        .with_base_url(server.uri())
        .search("Rust overview")
        .await
        .unwrap_err();

    match err {
        SearchError::Failed { query, message } => {
            assert_eq!(query, "Rust overview");
            assert!(message.contains("500"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
