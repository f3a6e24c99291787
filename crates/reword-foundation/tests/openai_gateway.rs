//! HTTP-level tests for `OpenAiGateway` against a wiremock server.

use std::time::Duration;

use reword_foundation::llm::{OpenAiConfig, OpenAiGateway};
use reword_kernel::{CompletionGateway, GenerationError, GenerationParams, Role, RoleModels};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer) -> OpenAiGateway {
    let config = OpenAiConfig::new("sk-test")
        .with_base_url(server.uri())
        .with_models(RoleModels::new("assistant-model", "moderator-model"))
        .with_params(GenerationParams {
            max_tokens: 64,
            temperature: 0.2,
        })
        .with_timeout(Duration::from_secs(5));
    OpenAiGateway::new(config).unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn sends_role_model_and_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "moderator-model",
            "max_tokens": 64,
            "messages": [{ "role": "user", "content": "is this rude?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("NO")))
        .expect(1)
        .mount(&server)
        .await;

    let text = gateway_for(&server)
        .complete(Role::Moderator, "is this rude?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(text, "NO");
}

#[tokio::test]
async fn assistant_role_uses_assistant_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "assistant-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Thanks!")))
        .expect(1)
        .mount(&server)
        .await;

    let text = gateway_for(&server)
        .complete(Role::Assistant, "reply please", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(text, "Thanks!");
}

#[tokio::test]
async fn upstream_rejection_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .complete(Role::Assistant, "hi", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GenerationError::Rejected {
            status: 401,
            message: "Incorrect API key provided".into()
        }
    );
}

#[tokio::test]
async fn empty_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .complete(Role::Assistant, "hi", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::EmptyCompletion);
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .complete(Role::Assistant, "hi", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Malformed(_)));
}

#[tokio::test]
async fn cancellation_aborts_in_flight_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = gateway
        .complete(Role::Assistant, "hi", &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn cancellation_interrupts_error_body_read() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Status line and headers arrive at once; the body never finishes.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let _ = socket.read(&mut buf).await;
        let head = "HTTP/1.1 503 Service Unavailable\r\n\
                    content-type: application/json\r\n\
                    content-length: 512\r\n\r\n{\"error\":";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let config = OpenAiConfig::new("sk-test")
        .with_base_url(format!("http://{addr}/v1"))
        .with_timeout(Duration::from_secs(30));
    let gateway = OpenAiGateway::new(config).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = gateway
        .complete(Role::Moderator, "hi", &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = OpenAiConfig::new("sk-test")
        .with_base_url(server.uri())
        .with_timeout(Duration::from_millis(200));
    let err = OpenAiGateway::new(config)
        .unwrap()
        .complete(Role::Assistant, "hi", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::Timeout(Duration::from_millis(200)));
}

#[tokio::test]
async fn unreachable_upstream() {
    let config = OpenAiConfig::new("sk-test").with_base_url("http://127.0.0.1:1/v1");
    let err = OpenAiGateway::new(config)
        .unwrap()
        .complete(Role::Assistant, "hi", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Unreachable(_)));
}
