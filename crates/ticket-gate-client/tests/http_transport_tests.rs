//! Integration tests for the HTTP transport against a mock gate service.

use std::time::Duration;

use serde_json::json;
use ticket_gate_client::{GateError, GateTransport, HttpGateTransport};
use ticket_gate_core::{RegisterRequest, TicketId};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn transport(server: &MockServer) -> HttpGateTransport {
    HttpGateTransport::new(&server.uri(), Duration::from_secs(5))
        .expect("loopback endpoint should be accepted")
}

#[tokio::test]
async fn http_transport_tests_sends_click_id_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gate/callback"))
        .and(query_param("click_id", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "player_num": "0042",
            "has_password": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport(&server)
        .await
        .callback(&TicketId::new("abc123").expect("valid ticket"))
        .await
        .expect("callback should succeed");
    assert_eq!(body.player_num.as_deref(), Some("0042"));
}

#[tokio::test]
async fn http_transport_tests_posts_register_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gate/register"))
        .and(body_json(json!({
            "click_id": "abc123",
            "password": "abcd",
            "instagram_id": "abc"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport(&server)
        .await
        .register(&RegisterRequest {
            click_id: "abc123".to_string(),
            password: "abcd".to_string(),
            instagram_id: "abc".to_string(),
        })
        .await
        .expect("register should succeed");
    assert!(body.is_success());
}

#[tokio::test]
async fn http_transport_tests_surface_detail_of_refusals() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gate/create"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "ticket insert failed"
        })))
        .mount(&server)
        .await;

    let error = transport(&server)
        .await
        .create_ticket()
        .await
        .expect_err("create should fail");
    assert!(matches!(
        error,
        GateError::BackendRejected { status: Some(500), ref reason } if reason == "ticket insert failed"
    ));
}

#[tokio::test]
async fn http_transport_tests_gateway_errors_are_network_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gate/create"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let error = transport(&server)
        .await
        .create_ticket()
        .await
        .expect_err("create should fail");
    assert!(matches!(error, GateError::NetworkUnavailable(_)));
}
