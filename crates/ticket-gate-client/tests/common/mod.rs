//! Shared fixtures for ticket client integration tests.

use std::sync::{Arc, Mutex};

use ticket_gate_client::Navigator;
use ticket_gate_core::TicketId;
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
    #[allow(dead_code)]
    pub fn new(store: Arc<MemorySessionStore>) -> Self {
        Self {
            store,
            visits: Mutex::new(Vec::new()),
        }
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
