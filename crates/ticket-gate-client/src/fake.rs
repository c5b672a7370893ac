//! In-memory stand-in for the remote gate service.
//!
//! Mirrors the live service's observable contract: every issuance creates a
//! participant with the next sequential number, a ticket can be resolved any
//! number of times, and login mints a fresh ticket for an existing
//! participant. Credentials are held as SHA-256 digests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use ticket_gate_core::{
    CLICK_ID_PARAM, CallbackResponse, FailureBody, FailureDetail, IssueTicketResponse,
    LoginRequest, LoginResponse, ParticipantCode, RegisterRequest, STATUS_SUCCESS,
    StatusResponse, TicketId,
};

use crate::{GateError, GateTransport};

const DEFAULT_AD_LINK: &str = "https://ad.example/s?offer";
const DEFAULT_SEED: u64 = 0x7469_636b_6574;

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `create_ticket` calls.
    pub create: u32,
    /// `callback` calls.
    pub callback: u32,
    /// `register` calls.
    pub register: u32,
    /// `login` calls.
    pub login: u32,
}

#[derive(Debug)]
struct ParticipantRecord {
    number: u64,
    handle: Option<String>,
    password_digest: Option<String>,
}

#[derive(Debug)]
struct TicketRecord {
    participant: usize,
    resolutions: u32,
}

#[derive(Debug)]
struct ServiceState {
    rng: StdRng,
    ad_link: Option<String>,
    offline: bool,
    participants: Vec<ParticipantRecord>,
    tickets: HashMap<String, TicketRecord>,
    calls: CallCounts,
}

impl ServiceState {
    fn mint_ticket(&mut self, participant: usize) -> String {
        loop {
            let nonce = format!("{:016x}", self.rng.next_u64());
            if !self.tickets.contains_key(&nonce) {
                self.tickets.insert(
                    nonce.clone(),
                    TicketRecord {
                        participant,
                        resolutions: 0,
                    },
                );
                return nonce;
            }
        }
    }

    fn ensure_online(&self, operation: &str) -> Result<(), GateError> {
        if self.offline {
            return Err(GateError::NetworkUnavailable(format!(
                "{operation}: connection refused"
            )));
        }
        Ok(())
    }
}

/// Deterministic in-memory gate service.
#[derive(Debug)]
pub struct InMemoryGateService {
    state: Mutex<ServiceState>,
}

impl InMemoryGateService {
    /// Creates a service with the default seed and ad link.
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Creates a service whose ticket nonces derive from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Mutex::new(ServiceState {
                rng: StdRng::seed_from_u64(seed),
                ad_link: Some(DEFAULT_AD_LINK.to_string()),
                offline: false,
                participants: Vec::new(),
                tickets: HashMap::new(),
                calls: CallCounts::default(),
            }),
        }
    }

    /// Creates a service that answers issuance without a redirect link.
    pub fn without_ad_link() -> Self {
        let service = Self::new();
        service.lock().ad_link = None;
        service
    }

    /// Simulates the service being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Returns per-operation call counts.
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Returns how many times `ticket` has been resolved.
    pub fn resolutions(&self, ticket: &TicketId) -> u32 {
        self.lock()
            .tickets
            .get(ticket.as_str())
            .map_or(0, |record| record.resolutions)
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        // A panic while holding the lock only happens inside a failing test.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryGateService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GateTransport for InMemoryGateService {
    async fn create_ticket(&self) -> Result<IssueTicketResponse, GateError> {
        let mut state = self.lock();
        state.calls.create += 1;
        state.ensure_online("create")?;

        let number = state.participants.len() as u64 + 1;
        state.participants.push(ParticipantRecord {
            number,
            handle: None,
            password_digest: None,
        });
        let participant = state.participants.len() - 1;
        let nonce = state.mint_ticket(participant);
        let lootlabs_url = state
            .ad_link
            .as_ref()
            .map(|link| format!("{link}&{CLICK_ID_PARAM}={nonce}"));

        Ok(IssueTicketResponse {
            msg: Some("ticket created".to_string()),
            ticket_id: Some(nonce),
            lootlabs_url,
            failure: FailureBody::default(),
        })
    }

    async fn callback(&self, ticket: &TicketId) -> Result<CallbackResponse, GateError> {
        let mut state = self.lock();
        state.calls.callback += 1;
        state.ensure_online("callback")?;

        let participant = match state.tickets.get_mut(ticket.as_str()) {
            Some(record) => {
                record.resolutions += 1;
                record.participant
            }
            None => {
                return Err(GateError::BackendRejected {
                    status: Some(400),
                    reason: "invalid ticket".to_string(),
                });
            }
        };
        let record = &state.participants[participant];

        Ok(CallbackResponse {
            status: STATUS_SUCCESS.to_string(),
            player_num: Some(ParticipantCode::from_number(record.number).to_string()),
            instagram_id: record.handle.clone(),
            has_password: record.password_digest.is_some(),
            failure: FailureBody::default(),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<StatusResponse, GateError> {
        let mut state = self.lock();
        state.calls.register += 1;
        state.ensure_online("register")?;

        let Some(participant) = state
            .tickets
            .get(&request.click_id)
            .map(|record| record.participant)
        else {
            return Ok(failed_status("invalid ticket"));
        };

        if state.participants[participant].password_digest.is_some() {
            return Ok(failed_status("participant is already registered"));
        }

        let handle_taken = state.participants.iter().enumerate().any(|(index, record)| {
            index != participant && record.handle.as_deref() == Some(request.instagram_id.as_str())
        });
        if handle_taken {
            return Ok(failed_status("handle already in use"));
        }

        let record = &mut state.participants[participant];
        record.handle = Some(request.instagram_id.clone());
        record.password_digest = Some(password_digest(&request.password));

        Ok(StatusResponse {
            status: STATUS_SUCCESS.to_string(),
            failure: FailureBody::default(),
        })
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, GateError> {
        let mut state = self.lock();
        state.calls.login += 1;
        state.ensure_online("login")?;

        let digest = password_digest(&request.password);
        let matched = state.participants.iter().position(|record| {
            let key_matches = match (&request.instagram_id, &request.player_num) {
                (Some(handle), _) => record.handle.as_deref() == Some(handle.as_str()),
                (None, Some(code)) => {
                    ParticipantCode::from_number(record.number).as_str() == code.as_str()
                }
                (None, None) => false,
            };
            key_matches && record.password_digest.as_deref() == Some(digest.as_str())
        });

        let Some(participant) = matched else {
            return Ok(LoginResponse {
                status: "FAIL".to_string(),
                ticket_id: None,
                failure: failed_body("handle or password is incorrect"),
            });
        };

        let nonce = state.mint_ticket(participant);
        Ok(LoginResponse {
            status: STATUS_SUCCESS.to_string(),
            ticket_id: Some(nonce),
            failure: FailureBody::default(),
        })
    }
}

fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn failed_body(reason: &str) -> FailureBody {
    FailureBody {
        message: Some(FailureDetail::Text(reason.to_string())),
        detail: None,
    }
}

fn failed_status(reason: &str) -> StatusResponse {
    StatusResponse {
        status: "FAIL".to_string(),
        failure: failed_body(reason),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the service double's contract.

    use super::*;

    #[tokio::test]
    async fn issuance_appends_ticket_to_ad_link() {
        let service = InMemoryGateService::new();
        let body = service.create_ticket().await.expect("create should succeed");

        let ticket = body.ticket_id.expect("ticket id should be present");
        let link = body.lootlabs_url.expect("link should be present");
        assert!(link.ends_with(&format!("&click_id={ticket}")));
    }

    #[tokio::test]
    async fn participant_numbers_are_sequential() {
        let service = InMemoryGateService::new();
        let first = service.create_ticket().await.expect("create should succeed");
        let second = service.create_ticket().await.expect("create should succeed");

        let second_ticket =
            TicketId::new(second.ticket_id.expect("ticket id")).expect("valid ticket");
        let resolved = service
            .callback(&second_ticket)
            .await
            .expect("callback should succeed");
        assert!(first.ticket_id.is_some());
        assert_eq!(resolved.player_num.as_deref(), Some("0002"));
    }
}
