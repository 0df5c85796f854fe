use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{any, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use duet_bridge::{router, BridgeState};
use duet_core::config::{ModelConfig, SourcedAnswerConfig};
use duet_core::{DuetConfig, ModelTransport};

const SOURCED_PATH: &str = "/v1/answers";
const REST_PATH: &str = "/predict";

fn app(sourced_answer: SourcedAnswerConfig, transport: ModelTransport) -> Router {
    let config = DuetConfig {
        sourced_answer,
        model: ModelConfig {
            transport,
            ..ModelConfig::default()
        },
        ..DuetConfig::default()
    };
    router(BridgeState::from_config(Arc::new(config)).unwrap())
}

fn sourced(server: &MockServer) -> SourcedAnswerConfig {
    SourcedAnswerConfig {
        api_key: "pplx-test".into(),
        api_url: format!("{}{}", server.uri(), SOURCED_PATH),
        ..SourcedAnswerConfig::default()
    }
}

fn rest(server: &MockServer) -> ModelTransport {
    ModelTransport::Rest {
        url: format!("{}{}", server.uri(), REST_PATH),
        api_key: "gkey".into(),
    }
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn ask_with_both_flags_off_echoes_prompt() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = post_json(
        app(sourced(&server), rest(&server)),
        "/ask",
        json!({"prompt": "hi", "use_sourced_answer": false, "use_model": false}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"prompt": "hi", "sourced_answer": null, "model_output": null})
    );
}

#[tokio::test]
async fn ask_propagates_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SOURCED_PATH))
        .and(body_json(json!({"question": "q", "num_results": 1})))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = post_json(
        app(sourced(&server), ModelTransport::Unconfigured),
        "/ask",
        json!({"prompt": "q", "use_model": false}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn ask_reports_non_error_upstream_status_as_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SOURCED_PATH))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = post_json(
        app(sourced(&server), ModelTransport::Unconfigured),
        "/ask",
        json!({"prompt": "q", "use_model": false}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"].as_str().unwrap().contains("304"));
}

#[tokio::test(flavor = "multi_thread")]
async fn ask_with_unconfigured_model_is_500() {
    let (status, body) = post_json(
        app(SourcedAnswerConfig::default(), ModelTransport::Unconfigured),
        "/ask",
        json!({"prompt": "q", "use_sourced_answer": false}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("not configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn ask_merges_both_providers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SOURCED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "A"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REST_PATH))
        .and(body_json(json!({
            "instances": [{"content": "Be brief\n\nwhy"}],
            "parameters": {}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": ["B"]})))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = post_json(
        app(sourced(&server), rest(&server)),
        "/ask",
        json!({"prompt": "why", "model_instructions": "Be brief"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sourced_answer"], json!({"answer": "A"}));
    assert_eq!(body["model_output"], json!({"predictions": ["B"]}));
}

#[tokio::test]
async fn ide_requires_question() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for payload in [json!({"context": "C"}), json!({"context": "C", "question": ""})] {
        let (status, body) = post_json(app(sourced(&server), rest(&server)), "/ide", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"detail": "question required"}));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ide_delegates_with_composed_prompt() {
    let server = MockServer::start().await;
    let composed = "Project context:\nfn main() {}\n\nQuestion:\nHow do I refactor this?";
    Mock::given(method("POST"))
        .and(path(SOURCED_PATH))
        .and(body_json(json!({"question": composed, "num_results": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "A"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = post_json(
        app(sourced(&server), rest(&server)),
        "/ide",
        json!({"context": "fn main() {}", "question": "How do I refactor this?"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt"], composed);
}

#[tokio::test]
async fn health_reports_transport_mode() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app(SourcedAnswerConfig::default(), ModelTransport::Unconfigured)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({"ok": true, "model_transport": "unconfigured", "sourced_answer_configured": false})
    );
}
