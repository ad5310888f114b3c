//! End-to-end tests: real gateway over HTTP, faked backend listeners.

use std::sync::Arc;
use std::time::Duration;

use vox_core::{PipelineConfig, StageEndpoint};
use vox_gateway::{start, GatewayConfig, VoicePipeline};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FakeBackends {
    stt: MockServer,
    alpha: MockServer,
    tts: MockServer,
}

impl FakeBackends {
    async fn start() -> Self {
        Self {
            stt: MockServer::start().await,
            alpha: MockServer::start().await,
            tts: MockServer::start().await,
        }
    }

    fn config(&self) -> PipelineConfig {
        let timeout = Duration::from_secs(5);
        PipelineConfig {
            stt: StageEndpoint::new(format!("{}/stt", self.stt.uri())).with_timeout(timeout),
            alpha: StageEndpoint::new(format!("{}/alpha", self.alpha.uri())).with_timeout(timeout),
            tts: StageEndpoint::new(format!("{}/tts", self.tts.uri())).with_timeout(timeout),
        }
    }
}

async fn start_gateway(config: &PipelineConfig) -> u16 {
    let pipeline = Arc::new(VoicePipeline::from_config(config));
    let handle = start(
        GatewayConfig {
            port: 0,
            ..Default::default()
        },
        pipeline,
        None,
    )
    .await
    .unwrap();
    handle.port
}

async fn post_alexa(port: u16, body: impl Into<reqwest::Body>) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/alexa"))
        .body(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn full_chain_success_returns_synthesized_answer() {
    let backends = FakeBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/stt"))
        .and(body_string(r#"{"speech":"YXVkaW8="}"#))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "what is 6 x 7"})),
        )
        .expect(1)
        .mount(&backends.stt)
        .await;
    Mock::given(method("POST"))
        .and(path("/alpha"))
        .and(body_string(r#"{"text":"what is 6 x 7"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "42"})))
        .expect(1)
        .mount(&backends.alpha)
        .await;
    Mock::given(method("POST"))
        .and(path("/tts"))
        .and(body_string(r#"{"text":"42"}"#))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"speech": "c3ludGg="})),
        )
        .expect(1)
        .mount(&backends.tts)
        .await;

    let port = start_gateway(&backends.config()).await;
    let resp = post_alexa(port, r#"{"speech":"YXVkaW8="}"#).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"speech": "c3ludGg="}));
}

#[tokio::test]
async fn stage_one_unreachable_skips_later_stages() {
    let backends = FakeBackends::start().await;

    // Later stages must never be invoked
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backends.alpha)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backends.tts)
        .await;

    let mut config = backends.config();
    // Nothing listens here
    config.stt = StageEndpoint::new("http://127.0.0.1:1/stt").with_timeout(Duration::from_secs(2));

    let port = start_gateway(&config).await;
    let resp = post_alexa(port, r#"{"speech":"YQ=="}"#).await;

    assert_eq!(resp.status(), 502);
    let body = resp.text().await.unwrap();
    assert_eq!(body, "unable to send request to: speech-to-text service");
}

#[tokio::test]
async fn stage_two_server_error_names_stage_and_code() {
    let backends = FakeBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/stt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "q"})))
        .mount(&backends.stt)
        .await;
    Mock::given(method("POST"))
        .and(path("/alpha"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&backends.alpha)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backends.tts)
        .await;

    let port = start_gateway(&backends.config()).await;
    let resp = post_alexa(port, r#"{"speech":"YQ=="}"#).await;

    assert_ne!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("knowledge-engine service"), "body: {body}");
    assert!(body.contains("500"), "body: {body}");
}

#[tokio::test]
async fn empty_body_is_rejected_without_invoking_any_stage() {
    let backends = FakeBackends::start().await;

    for server in [&backends.stt, &backends.alpha, &backends.tts] {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    let port = start_gateway(&backends.config()).await;
    let resp = post_alexa(port, "").await;

    assert_eq!(resp.status(), 400);
    let body = resp.text().await.unwrap();
    assert!(body.contains("empty"), "body: {body}");
}

#[tokio::test]
async fn undecodable_final_body_is_a_decode_error() {
    let backends = FakeBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/stt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "q"})))
        .mount(&backends.stt)
        .await;
    Mock::given(method("POST"))
        .and(path("/alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "a"})))
        .mount(&backends.alpha)
        .await;
    Mock::given(method("POST"))
        .and(path("/tts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<binary garbage"))
        .mount(&backends.tts)
        .await;

    let port = start_gateway(&backends.config()).await;
    let resp = post_alexa(port, r#"{"speech":"YQ=="}"#).await;

    assert_eq!(resp.status(), 500);
    let body = resp.text().await.unwrap();
    assert!(body.contains("cannot decode"), "body: {body}");
}

#[tokio::test]
async fn identical_requests_classify_identically() {
    let backends = FakeBackends::start().await;

    Mock::given(method("POST"))
        .and(path("/stt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "q"})))
        .mount(&backends.stt)
        .await;
    Mock::given(method("POST"))
        .and(path("/alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "a"})))
        .mount(&backends.alpha)
        .await;
    Mock::given(method("POST"))
        .and(path("/tts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"speech": "YQ=="})),
        )
        .mount(&backends.tts)
        .await;

    let port = start_gateway(&backends.config()).await;
    let first = post_alexa(port, r#"{"speech":"YQ=="}"#).await;
    let second = post_alexa(port, r#"{"speech":"YQ=="}"#).await;

    assert_eq!(first.status(), 200);
    assert_eq!(first.status(), second.status());
    let a: serde_json::Value = first.json().await.unwrap();
    let b: serde_json::Value = second.json().await.unwrap();
    assert_eq!(a, b);
}
