//! Validates contract fixtures and serialized wire types against the frozen
//! JSON schemas.

use ticket_gate_contract_tests::{CONTRACTS, compile_schema, load_fixture, violations};
use ticket_gate_core::{
    CallbackResponse, IssueTicketResponse, LoginRequest, RegisterRequest, parse_failure_reason,
};

#[test]
fn contract_validation_tests_every_valid_fixture_matches_its_schema() {
    for name in CONTRACTS {
        let schema = compile_schema(name).expect("schema should compile");
        let fixture = load_fixture(name, "valid").expect("fixture should load");
        assert_eq!(violations(&schema, &fixture), Vec::<String>::new(), "{name}");
    }
}

#[test]
fn contract_validation_tests_invalid_fixtures_are_rejected() {
    for name in ["register.request", "login.request", "login.response"] {
        let schema = compile_schema(name).expect("schema should compile");
        let fixture = load_fixture(name, "invalid").expect("fixture should load");
        assert!(!schema.is_valid(&fixture), "{name} invalid fixture passed");
    }
}

#[test]
fn contract_validation_tests_serialized_requests_match_schemas() {
    let register = RegisterRequest {
        click_id: "abc123".to_string(),
        password: "abcd".to_string(),
        instagram_id: "abc".to_string(),
    };
    let login = LoginRequest {
        instagram_id: None,
        player_num: Some("0042".to_string()),
        password: "abcd".to_string(),
    };

    let register_schema = compile_schema("register.request").expect("schema should compile");
    let login_schema = compile_schema("login.request").expect("schema should compile");
    let register_json = serde_json::to_value(&register).expect("register should serialize");
    let login_json = serde_json::to_value(&login).expect("login should serialize");

    assert!(register_schema.is_valid(&register_json));
    assert!(login_schema.is_valid(&login_json));
}

#[test]
fn contract_validation_tests_response_fixtures_decode_into_wire_types() {
    let issue: IssueTicketResponse = serde_json::from_value(
        load_fixture("issue-ticket.response", "valid").expect("fixture should load"),
    )
    .expect("issue fixture should decode");
    let callback: CallbackResponse = serde_json::from_value(
        load_fixture("callback.response", "valid").expect("fixture should load"),
    )
    .expect("callback fixture should decode");

    assert_eq!(issue.ticket_id.as_deref(), Some("abc123"));
    assert!(callback.is_success());
    assert_eq!(callback.player_num.as_deref(), Some("0042"));
    assert!(!callback.has_password);
}

#[test]
fn contract_validation_tests_failure_fixture_yields_reason() {
    let failure = load_fixture("failure.response", "valid").expect("fixture should load");
    assert_eq!(
        parse_failure_reason(&failure.to_string()).as_deref(),
        Some("field required")
    );
}
