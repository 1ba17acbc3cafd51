// tests/webhook_delivery.rs
//
// These tests use wiremock for the tenant callback endpoint.

mod common;

use std::time::Duration;

use common::lead;
use lead_poller::delivery::webhook::WebhookSink;
use lead_poller::error::DeliveryError;
use lead_poller::DeliverySink;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn posts_lead_json_and_accepts_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "id": "L1",
            "contactDetails": {"email": "a@x.com"}
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookSink::new().unwrap();
    sink.deliver(&format!("{}/hook", server.uri()), &lead("L1", "a@x.com", ""))
        .await
        .expect("2xx is success");
}

#[tokio::test]
async fn non_2xx_is_a_failure_with_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookSink::new().unwrap();
    let err = sink
        .deliver(&server.uri(), &lead("L1", "a@x.com", ""))
        .await
        .unwrap_err();
    match err {
        DeliveryError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_redirect_3xx_is_not_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let sink = WebhookSink::new().unwrap();
    assert!(sink
        .deliver(&server.uri(), &lead("L1", "a@x.com", ""))
        .await
        .is_err());
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let sink = WebhookSink::with_timeout(Duration::from_millis(100)).unwrap();
    let err = sink
        .deliver(&server.uri(), &lead("L1", "a@x.com", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    let sink = WebhookSink::with_timeout(Duration::from_secs(2)).unwrap();
    // port 9 (discard) on localhost is closed in CI containers
    let err = sink
        .deliver("http://127.0.0.1:9/hook", &lead("L1", "a@x.com", ""))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DeliveryError::Transport(_) | DeliveryError::Timeout(_)),
        "{err:?}"
    );
}
