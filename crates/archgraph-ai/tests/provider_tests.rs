use archgraph_ai::{LLMProvider, OpenAICompatibleConfig, OpenAICompatibleProvider};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer, max_retries: u32) -> OpenAICompatibleProvider {
    let mut config = OpenAICompatibleConfig::custom(
        format!("{}/v1", server.uri()),
        "test-model".to_string(),
        "test".to_string(),
    );
    config.api_key = Some("secret".to_string());
    config.max_retries = max_retries;
    config.retry_base_delay_ms = 10;
    OpenAICompatibleProvider::new(config).unwrap()
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
    })
}

#[tokio::test]
async fn test_complete_returns_first_choice_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("CONFIRM,a,b")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server, 0);
    let text = provider.complete("system", "user").await.unwrap();
    assert_eq!(text, "CONFIRM,a,b");
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&server)
        .await;

    let provider = provider_for(&server, 2);
    assert_eq!(provider.complete("s", "u").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_exhausted_retries_surface_the_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider_for(&server, 1);
    let err = provider.complete("s", "u").await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_availability_probes_models_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    assert!(provider_for(&server, 0).is_available().await);
}
