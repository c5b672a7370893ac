//! Tests decoding of gate-service bodies as the live service emits them.

use ticket_gate_core::{CallbackResponse, IssueTicketResponse, LoginRequest, LoginResponse};

#[test]
fn wire_contract_tests_decode_issue_body() {
    let raw = r#"{
        "msg":"ticket created",
        "ticket_id":"abc123",
        "lootlabs_url":"https://loot-link.com/s?M6BOhyGL&click_id=abc123"
    }"#;

    let body: IssueTicketResponse = serde_json::from_str(raw).expect("issue body should decode");
    assert_eq!(body.ticket_id.as_deref(), Some("abc123"));
    assert!(body.lootlabs_url.is_some());
    assert_eq!(body.failure.reason(), None);
}

#[test]
fn wire_contract_tests_decode_callback_without_optional_fields() {
    let raw = r#"{"status":"SUCCESS","player_num":"0042","message":"waiting room"}"#;

    let body: CallbackResponse = serde_json::from_str(raw).expect("callback body should decode");
    assert!(body.is_success());
    assert_eq!(body.player_num.as_deref(), Some("0042"));
    assert_eq!(body.instagram_id, None);
    assert!(!body.has_password);
}

#[test]
fn wire_contract_tests_missing_status_is_not_success() {
    let body: LoginResponse =
        serde_json::from_str(r#"{"message":"wrong password"}"#).expect("login body should decode");
    assert!(!body.is_success());
    assert_eq!(body.failure.reason().as_deref(), Some("wrong password"));
}

#[test]
fn wire_contract_tests_login_request_sends_only_one_key() {
    let request = LoginRequest {
        instagram_id: None,
        player_num: Some("0042".to_string()),
        password: "abcd".to_string(),
    };

    let encoded = serde_json::to_value(&request).expect("login request should encode");
    assert_eq!(encoded, serde_json::json!({"player_num":"0042","password":"abcd"}));
    assert!(!format!("{request:?}").contains("abcd"));
}
