#![warn(missing_docs)]
//! # ticket-gate-client
//!
//! ## Purpose
//! Issues gate tickets and resolves returning tickets against the remote gate
//! service.
//!
//! ## Responsibilities
//! - Define the async [`GateTransport`] seam and its HTTP implementation.
//! - Issue a ticket, remember it as `pending_ticket`, then navigate to the ad
//!   network, in that order.
//! - Resolve a ticket into a [`Resolution`] without touching local state.
//! - Own the workspace error taxonomy ([`GateError`]) and its classification.
//!
//! ## Data flow
//! Controller -> [`TicketClient::issue`] -> transport `POST /gate/create` ->
//! session store write -> [`Navigator::navigate`].
//! Controller -> [`TicketClient::resolve`] -> transport `GET /gate/callback` ->
//! [`Resolution`] -> access state machine.
//!
//! ## Ownership and lifetimes
//! The client holds `Arc` handles to its transport and store so it can be
//! cloned into the identity binder and controller without lifetimes.
//!
//! ## Error model
//! Transport failures arrive as [`GateError`]. Issuance failures are folded
//! into [`GateError::IssuanceFailed`]; resolution rejections are a successful
//! [`Resolution::Rejected`], not an error.
//!
//! ## Security and privacy notes
//! Tickets are bearer capabilities. Logs carry [`ticket_fingerprint`] values
//! only, never the ticket itself.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use ticket_gate_core::{
    CoreError, Participant, ParticipantCode, Resolution, TicketId, ValidationError,
    normalize_credential,
};
use ticket_gate_session::{SessionError, SessionSlot, SessionStore};
use url::Url;

pub mod fake;
mod transport;

pub use transport::{GateTransport, HttpGateTransport, validate_gate_endpoint};

/// Browser navigation seam. Navigation may tear the page down, so callers
/// perform it last.
pub trait Navigator: Send + Sync {
    /// Navigates the visitor to `target`.
    fn navigate(&self, target: &Url);
}

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    /// Ticket stored in `pending_ticket`.
    pub ticket: TicketId,
    /// Ad-network link the visitor was sent to.
    pub redirect: Url,
}

/// Issues and resolves tickets.
#[derive(Clone)]
pub struct TicketClient {
    transport: Arc<dyn GateTransport>,
    store: Arc<dyn SessionStore>,
}

impl TicketClient {
    /// Creates a client over `transport`, writing to `store`.
    pub fn new(transport: Arc<dyn GateTransport>, store: Arc<dyn SessionStore>) -> Self {
        Self { transport, store }
    }

    /// Issues a ticket and sends the visitor to the ad network.
    ///
    /// The ticket is written to `pending_ticket` before `navigator` runs.
    ///
    /// # Errors
    /// Returns [`GateError::IssuanceFailed`] when the service refuses or omits
    /// the ticket id or redirect link, [`GateError::NetworkUnavailable`] when
    /// the service cannot be reached, and [`GateError::Session`] when the
    /// ticket cannot be stored (no navigation happens in that case).
    pub async fn issue(&self, navigator: &dyn Navigator) -> Result<IssuedTicket, GateError> {
        let body = self
            .transport
            .create_ticket()
            .await
            .map_err(|error| match error {
                GateError::BackendRejected { reason, .. } => GateError::IssuanceFailed(reason),
                other => other,
            })?;

        let failure = || {
            body.failure
                .reason()
                .unwrap_or_else(|| "ticket link was not created".to_string())
        };

        let redirect = match body.lootlabs_url.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Url::parse(raw).map_err(|error| {
                GateError::IssuanceFailed(format!("redirect link is invalid: {error}"))
            })?,
            _ => return Err(GateError::IssuanceFailed(failure())),
        };
        let ticket = body
            .ticket_id
            .as_deref()
            .map(TicketId::new)
            .transpose()
            .ok()
            .flatten()
            .ok_or_else(|| GateError::IssuanceFailed(failure()))?;

        self.store.set(SessionSlot::PendingTicket, &ticket)?;
        tracing::info!(
            ticket = %ticket_fingerprint(&ticket),
            host = redirect.host_str().unwrap_or_default(),
            "ticket issued; redirecting to ad network"
        );
        navigator.navigate(&redirect);

        Ok(IssuedTicket { ticket, redirect })
    }

    /// Resolves `ticket` against the gate service.
    ///
    /// Performs no session writes, so repeated calls cannot corrupt local
    /// state.
    ///
    /// # Errors
    /// Returns [`GateError::NetworkUnavailable`] when the service cannot be
    /// reached and [`GateError::InvalidResponse`] when a successful body lacks
    /// the participant number.
    pub async fn resolve(&self, ticket: &TicketId) -> Result<Resolution, GateError> {
        let body = match self.transport.callback(ticket).await {
            Ok(body) => body,
            Err(GateError::BackendRejected { reason, .. }) => {
                return Ok(Resolution::Rejected { reason });
            }
            Err(other) => return Err(other),
        };

        if !body.is_success() {
            let reason = body.failure.reason().unwrap_or_else(|| {
                format!("ticket was rejected (status {:?})", body.status)
            });
            return Ok(Resolution::Rejected { reason });
        }

        let code = body
            .player_num
            .as_deref()
            .map(ParticipantCode::new)
            .transpose()
            .map_err(|error| GateError::InvalidResponse(error.to_string()))?
            .ok_or_else(|| {
                GateError::InvalidResponse("resolution is missing player_num".to_string())
            })?;
        let handle = body
            .instagram_id
            .as_deref()
            .map(normalize_credential)
            .filter(|handle| !handle.is_empty());

        tracing::debug!(
            ticket = %ticket_fingerprint(ticket),
            participant = %code,
            has_credential = body.has_password,
            "ticket resolved"
        );

        Ok(Resolution::Resolved(Participant {
            code,
            handle,
            has_credential: body.has_password,
        }))
    }
}

/// Short, log-safe fingerprint of a ticket (first 12 hex chars of SHA-256).
pub fn ticket_fingerprint(ticket: &TicketId) -> String {
    let digest = Sha256::digest(ticket.as_str().as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(12);
    encoded
}

/// How a caller should react to a [`GateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Transient; offer a retry and leave state untouched.
    Retry,
    /// The ticket is dead; discard stored tickets and return to idle.
    ResetToIdle,
    /// Local input was rejected; the visitor must correct it.
    FixInput,
    /// Surface the reason verbatim; state returns to where it was.
    ShowReason,
}

/// Classifies an error into the reaction the access machine applies.
pub fn classify_gate_error(error: &GateError) -> FailureClass {
    match error {
        GateError::NetworkUnavailable(_) => FailureClass::Retry,
        GateError::InvalidTicket(_) => FailureClass::ResetToIdle,
        GateError::ValidationFailed(_) => FailureClass::FixInput,
        GateError::IssuanceFailed(_)
        | GateError::BackendRejected { .. }
        | GateError::ParticipantMismatch
        | GateError::InvalidResponse(_)
        | GateError::InvalidEndpoint(_)
        | GateError::Session(_) => FailureClass::ShowReason,
    }
}

/// Errors produced while talking to the gate service or binding identities.
#[derive(Debug, Error)]
pub enum GateError {
    /// The service could not be reached.
    #[error("gate service unavailable: {0}")]
    NetworkUnavailable(String),
    /// Ticket issuance failed; the reason is user-displayable.
    #[error("{0}")]
    IssuanceFailed(String),
    /// The ticket was rejected during resolution.
    #[error("{0}")]
    InvalidTicket(String),
    /// A local precondition failed; no request was sent.
    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),
    /// The service refused the request; the reason is surfaced verbatim.
    #[error("{reason}")]
    BackendRejected {
        /// HTTP status, when the refusal came as a non-success response.
        status: Option<u16>,
        /// Backend-supplied reason.
        reason: String,
    },
    /// Unlock credentials belong to someone other than the ticket's owner.
    #[error("these credentials belong to a different participant")]
    ParticipantMismatch,
    /// A successful response violated the contract.
    #[error("invalid gate response: {0}")]
    InvalidResponse(String),
    /// The configured service URL is not acceptable.
    #[error("invalid gate endpoint: {0}")]
    InvalidEndpoint(String),
    /// Local session storage failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<CoreError> for GateError {
    fn from(error: CoreError) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error classification and fingerprints.

    use super::*;

    #[test]
    fn classification_separates_retry_reset_and_input() {
        assert_eq!(
            classify_gate_error(&GateError::NetworkUnavailable("down".to_string())),
            FailureClass::Retry
        );
        assert_eq!(
            classify_gate_error(&GateError::InvalidTicket("gone".to_string())),
            FailureClass::ResetToIdle
        );
        assert_eq!(
            classify_gate_error(&GateError::ValidationFailed(
                ValidationError::ConfirmationMismatch
            )),
            FailureClass::FixInput
        );
    }

    #[test]
    fn participant_mismatch_is_shown_to_the_visitor() {
        assert_eq!(
            classify_gate_error(&GateError::ParticipantMismatch),
            FailureClass::ShowReason
        );
    }

    #[test]
    fn backend_reason_is_displayed_verbatim() {
        let error = GateError::BackendRejected {
            status: Some(400),
            reason: "handle already in use".to_string(),
        };
        assert_eq!(error.to_string(), "handle already in use");
    }

    #[test]
    fn fingerprint_hides_ticket_value() {
        let ticket = TicketId::new("abc123").expect("fixture ticket should be valid");
        let fingerprint = ticket_fingerprint(&ticket);
        assert_eq!(fingerprint.len(), 12);
        assert!(!fingerprint.contains("abc123"));
    }
}
