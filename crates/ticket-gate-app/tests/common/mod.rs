//! Shared fixtures for controller integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ticket_gate_app::GateController;
use ticket_gate_client::fake::InMemoryGateService;
use ticket_gate_client::{GateError, GateTransport, Navigator};
use ticket_gate_core::{
    CallbackResponse, FailureBody, IssueTicketResponse, LoginRequest, LoginResponse,
    RegisterRequest, STATUS_SUCCESS, StatusResponse, TicketId,
};
use ticket_gate_session::{MemorySessionStore, SessionSlot, SessionStore};
use url::Url;

/// Navigator that records each target together with the `pending_ticket`
/// value visible at the moment of navigation.
#[derive(Debug)]
pub struct RecordingNavigator {
    store: Arc<MemorySessionStore>,
    pub visits: Mutex<Vec<(Url, Option<TicketId>)>>,
}

impl RecordingNavigator {
    pub fn new(store: Arc<MemorySessionStore>) -> Self {
        Self {
            store,
            visits: Mutex::new(Vec::new()),
        }
    }

    /// Most recent navigation target.
    #[allow(dead_code)]
    pub fn last_target(&self) -> Option<Url> {
        self.visits
            .lock()
            .expect("visit lock should work")
            .last()
            .map(|(url, _)| url.clone())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &Url) {
        let pending = self
            .store
            .get(SessionSlot::PendingTicket)
            .expect("memory store read should work");
        self.visits
            .lock()
            .expect("visit lock should work")
            .push((target.clone(), pending));
    }
}

/// One browser context: its own store and navigator, talking to a shared
/// transport.
pub struct Browser {
    pub store: Arc<MemorySessionStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub controller: GateController,
}

impl Browser {
    pub fn new(transport: Arc<dyn GateTransport>) -> Self {
        let store = Arc::new(MemorySessionStore::new());
        let navigator = Arc::new(RecordingNavigator::new(store.clone()));
        let controller = GateController::new(transport, store.clone(), navigator.clone());
        Self {
            store,
            navigator,
            controller,
        }
    }

    #[allow(dead_code)]
    pub fn slot(&self, slot: SessionSlot) -> Option<TicketId> {
        self.store.get(slot).expect("memory store read should work")
    }
}

/// Fresh in-memory service.
#[allow(dead_code)]
pub fn service() -> Arc<InMemoryGateService> {
    Arc::new(InMemoryGateService::new())
}

/// Gate service answering with fixed bodies, recording what it receives.
#[derive(Debug, Default)]
pub struct ScriptedGate {
    pub has_password: Mutex<bool>,
    pub registrations: Mutex<Vec<RegisterRequest>>,
    pub callbacks: Mutex<u32>,
}

#[async_trait]
impl GateTransport for ScriptedGate {
    async fn create_ticket(&self) -> Result<IssueTicketResponse, GateError> {
        Ok(IssueTicketResponse {
            msg: None,
            ticket_id: Some("abc123".to_string()),
            lootlabs_url: Some("https://ad.example/x".to_string()),
            failure: FailureBody::default(),
        })
    }

    async fn callback(&self, _ticket: &TicketId) -> Result<CallbackResponse, GateError> {
        *self.callbacks.lock().expect("lock should work") += 1;
        Ok(CallbackResponse {
            status: STATUS_SUCCESS.to_string(),
            player_num: Some("0042".to_string()),
            instagram_id: None,
            has_password: *self.has_password.lock().expect("lock should work"),
            failure: FailureBody::default(),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<StatusResponse, GateError> {
        self.registrations
            .lock()
            .expect("lock should work")
            .push(request.clone());
        *self.has_password.lock().expect("lock should work") = true;
        Ok(StatusResponse {
            status: STATUS_SUCCESS.to_string(),
            failure: FailureBody::default(),
        })
    }

    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, GateError> {
        Ok(LoginResponse {
            status: "FAIL".to_string(),
            ticket_id: None,
            failure: FailureBody::default(),
        })
    }
}
