// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP delivery adapter against a mock send API.

use courier_config::model::DeliveryConfig;
use courier_core::{CourierError, DeliveryAdapter, SendRequest};
use courier_delivery::HttpDelivery;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> SendRequest {
    SendRequest {
        id: 7,
        phone: 79_001_234_567,
        text: "Your code is 1234".into(),
    }
}

async fn delivery(server: &MockServer) -> HttpDelivery {
    HttpDelivery::new(&DeliveryConfig {
        base_url: format!("{}/v1/send", server.uri()),
        token: Some("test-token".into()),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn success_requires_zero_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/send/7"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(serde_json::json!({
            "id": 7,
            "phone": 79_001_234_567i64,
            "text": "Your code is 1234"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0, "message": "OK"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    delivery(&server).await.send(&request()).await.unwrap();
}

#[tokio::test]
async fn nonzero_code_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"code": 3, "message": "blocked"})),
        )
        .mount(&server)
        .await;

    let err = delivery(&server).await.send(&request()).await.unwrap_err();
    assert!(matches!(err, CourierError::Delivery { .. }));
    assert!(err.to_string().contains("code 3"));
}

#[tokio::test]
async fn bad_request_status_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid phone"))
        .mount(&server)
        .await;

    let err = delivery(&server).await.send(&request()).await.unwrap_err();
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn unparseable_body_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    assert!(delivery(&server).await.send(&request()).await.is_err());
}
