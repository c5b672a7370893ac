//! Shared fixtures for identity binding tests.

use std::sync::Arc;

use ticket_gate_auth::IdentityBinder;
use ticket_gate_client::GateTransport;
use ticket_gate_client::fake::InMemoryGateService;
use ticket_gate_core::TicketId;
use ticket_gate_session::{MemorySessionStore, SessionSlot, SessionStore};

/// Service double, session store, and binder wired together.
pub struct Fixture {
    pub service: Arc<InMemoryGateService>,
    pub store: Arc<MemorySessionStore>,
    pub binder: IdentityBinder,
}

impl Fixture {
    pub fn new() -> Self {
        let service = Arc::new(InMemoryGateService::new());
        let store = Arc::new(MemorySessionStore::new());
        let binder = IdentityBinder::new(service.clone(), store.clone());
        Self {
            service,
            store,
            binder,
        }
    }

    /// Issues a ticket straight from the service and parks it as pending.
    pub async fn pending_ticket(&self) -> TicketId {
        let body = self
            .service
            .create_ticket()
            .await
            .expect("create should succeed");
        let ticket = TicketId::new(body.ticket_id.expect("ticket id should be present"))
            .expect("ticket id should be valid");
        self.store
            .set(SessionSlot::PendingTicket, &ticket)
            .expect("store write should work");
        ticket
    }
}
