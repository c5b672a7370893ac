//! Integration tests for ticket issuance and resolution.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::RecordingNavigator;
use ticket_gate_client::fake::InMemoryGateService;
use ticket_gate_client::{GateError, GateTransport, TicketClient};
use ticket_gate_core::{
    CallbackResponse, FailureBody, FailureDetail, FailureEntry, IssueTicketResponse, LoginRequest,
    LoginResponse, RegisterRequest, Resolution, StatusResponse, TicketId,
};
use ticket_gate_session::{MemorySessionStore, SessionSlot, SessionStore};

/// Transport answering every call with fixed bodies.
struct ScriptedTransport {
    issue: IssueTicketResponse,
    callback: CallbackResponse,
}

#[async_trait]
impl GateTransport for ScriptedTransport {
    async fn create_ticket(&self) -> Result<IssueTicketResponse, GateError> {
        Ok(self.issue.clone())
    }

    async fn callback(&self, _ticket: &TicketId) -> Result<CallbackResponse, GateError> {
        Ok(self.callback.clone())
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<StatusResponse, GateError> {
        unreachable!("register is not scripted")
    }

    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, GateError> {
        unreachable!("login is not scripted")
    }
}

fn scripted(issue: IssueTicketResponse, callback: CallbackResponse) -> Arc<ScriptedTransport> {
    Arc::new(ScriptedTransport { issue, callback })
}

#[tokio::test]
async fn ticket_client_tests_store_pending_before_navigation() {
    let store = Arc::new(MemorySessionStore::new());
    let transport = scripted(
        IssueTicketResponse {
            ticket_id: Some("abc123".to_string()),
            lootlabs_url: Some("https://ad.example/x".to_string()),
            ..IssueTicketResponse::default()
        },
        CallbackResponse::default(),
    );
    let client = TicketClient::new(transport, store.clone());
    let navigator = RecordingNavigator::new(store.clone());

    let issued = client.issue(&navigator).await.expect("issue should succeed");

    let ticket = TicketId::new("abc123").expect("valid ticket");
    assert_eq!(issued.ticket, ticket);
    let visits = navigator.visits.lock().expect("visit lock should work");
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].0.as_str(), "https://ad.example/x");
    assert_eq!(visits[0].1, Some(ticket));
}

#[tokio::test]
async fn ticket_client_tests_missing_redirect_fails_without_store_or_navigation() {
    let store = Arc::new(MemorySessionStore::new());
    let transport = scripted(
        IssueTicketResponse {
            ticket_id: Some("abc123".to_string()),
            failure: FailureBody {
                message: None,
                detail: Some(FailureDetail::Entries(vec![FailureEntry {
                    msg: Some("ad link unavailable".to_string()),
                }])),
            },
            ..IssueTicketResponse::default()
        },
        CallbackResponse::default(),
    );
    let client = TicketClient::new(transport, store.clone());
    let navigator = RecordingNavigator::new(store.clone());

    let error = client.issue(&navigator).await.expect_err("issue should fail");

    assert!(matches!(error, GateError::IssuanceFailed(ref reason) if reason == "ad link unavailable"));
    assert!(navigator.visits.lock().expect("visit lock").is_empty());
    assert_eq!(store.get(SessionSlot::PendingTicket).expect("read"), None);
}

#[tokio::test]
async fn ticket_client_tests_non_success_status_is_rejection() {
    let store = Arc::new(MemorySessionStore::new());
    let transport = scripted(
        IssueTicketResponse::default(),
        CallbackResponse {
            status: "FAIL".to_string(),
            failure: FailureBody {
                message: Some(FailureDetail::Text("ticket already used".to_string())),
                detail: None,
            },
            ..CallbackResponse::default()
        },
    );
    let client = TicketClient::new(transport, store);

    let resolution = client
        .resolve(&TicketId::new("abc123").expect("valid ticket"))
        .await
        .expect("rejection is not an error");
    assert_eq!(
        resolution,
        Resolution::Rejected {
            reason: "ticket already used".to_string()
        }
    );
}

#[tokio::test]
async fn ticket_client_tests_resolution_is_idempotent() {
    let store = Arc::new(MemorySessionStore::new());
    let service = Arc::new(InMemoryGateService::new());
    let client = TicketClient::new(service.clone(), store.clone());
    let navigator = RecordingNavigator::new(store.clone());

    let issued = client.issue(&navigator).await.expect("issue should succeed");
    let before = store.snapshot().expect("snapshot should work");

    let first = client.resolve(&issued.ticket).await.expect("resolve should work");
    let second = client.resolve(&issued.ticket).await.expect("resolve should work");

    assert_eq!(first, second);
    assert_eq!(store.snapshot().expect("snapshot should work"), before);
    assert_eq!(service.resolutions(&issued.ticket), 2);
}

#[tokio::test]
async fn ticket_client_tests_unknown_ticket_is_rejected() {
    let store = Arc::new(MemorySessionStore::new());
    let client = TicketClient::new(Arc::new(InMemoryGateService::new()), store);

    let resolution = client
        .resolve(&TicketId::new("never-issued").expect("valid ticket"))
        .await
        .expect("rejection is not an error");
    assert!(matches!(resolution, Resolution::Rejected { ref reason } if reason == "invalid ticket"));
}

#[tokio::test]
async fn ticket_client_tests_offline_service_is_network_unavailable() {
    let store = Arc::new(MemorySessionStore::new());
    let service = Arc::new(InMemoryGateService::new());
    service.set_offline(true);
    let client = TicketClient::new(service, store.clone());
    let navigator = RecordingNavigator::new(store.clone());

    let error = client.issue(&navigator).await.expect_err("issue should fail");
    assert!(matches!(error, GateError::NetworkUnavailable(_)));
    assert_eq!(store.get(SessionSlot::PendingTicket).expect("read"), None);
}
