use hnbrief_client::OpenAiSummarizer;
use hnbrief_core::{AppError, Summarizer};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::integration::common::http_client;

fn summarizer(server: &MockServer) -> OpenAiSummarizer {
    OpenAiSummarizer::new(http_client(), "test-key", "gpt-test")
        .with_base_url(&format!("{}/v1", server.uri()))
}

#[tokio::test]
async fn returns_trimmed_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "gpt-test", "temperature": 0.5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "  A queue story.\n" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = summarizer(&server).summarize("Summarize this").await.unwrap();
    assert_eq!(reply, "A queue story.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Summarize this");
}

#[tokio::test]
async fn temperature_can_be_left_to_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "ok" } }]
        })))
        .mount(&server)
        .await;

    summarizer(&server)
        .with_temperature(None)
        .unwrap()
        .summarize("p")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("temperature").is_none());
}

#[tokio::test]
async fn rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = summarizer(&server).summarize("p").await.unwrap_err();
    assert!(matches!(err, AppError::RateLimitExceeded));
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "model not found", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let err = summarizer(&server).summarize("p").await.unwrap_err();
    match err {
        AppError::LlmError {
            message,
            status_code,
        } => {
            assert_eq!(message, "model not found");
            assert_eq!(status_code, 400);
        }
        other => panic!("expected LlmError, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = summarizer(&server).summarize("p").await.unwrap_err();
    assert!(matches!(err, AppError::LlmError { .. }));
}
