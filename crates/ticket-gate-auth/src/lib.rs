#![warn(missing_docs)]
//! # ticket-gate-auth
//!
//! ## Purpose
//! Binds a durable participant identity to tickets: first-time registration,
//! login from a new device, and unlocking a ticket another browser opened.
//!
//! ## Responsibilities
//! - Validate registration and login input locally, before any request.
//! - Normalize handles and passwords (trim + lowercase) for transmission.
//! - Execute register/login through the [`GateTransport`] seam.
//! - Promote the bound ticket to `my_ticket` on success.
//!
//! ## Data flow
//! Visitor input -> [`RegistrationForm::validate`] / [`Credentials::to_request`]
//! -> [`IdentityBinder`] -> transport -> `my_ticket` promotion -> [`Binding`]
//! handed to the access state machine.
//!
//! ## Ownership and lifetimes
//! Forms and credentials own their input buffers; they are dropped by the
//! caller once the request completes.
//!
//! ## Error model
//! Local failures are [`GateError::ValidationFailed`] and never reach the
//! network. Refusals from the service are [`GateError::BackendRejected`] with
//! the service's reason. Unlock credentials that name a different participant
//! than the ticket's owner are [`GateError::ParticipantMismatch`]. Failures
//! leave the session store untouched.
//!
//! ## Security and privacy notes
//! Passwords never appear in `Debug` output or logs. The confirmation check
//! is case-insensitive and the password is lowercased before sending; this
//! mirrors the deployed service contract.
//!
//! ## Example
//! ```rust
//! use ticket_gate_auth::RegistrationForm;
//!
//! let form = RegistrationForm::new("AbC", "PaSS", "pass");
//! let normalized = form.validate().expect("form is valid");
//! assert_eq!(normalized.handle(), "abc");
//! ```

use std::fmt;
use std::sync::Arc;

use ticket_gate_client::{GateError, GateTransport, ticket_fingerprint};
use ticket_gate_core::{
    Binding, LoginRequest, MIN_HANDLE_CHARS, MIN_PASSWORD_CHARS, Participant, RegisterRequest,
    TicketId, ValidationError, credentials_match, normalize_credential,
};
use ticket_gate_session::{SessionSlot, SessionStore};

/// Raw registration input as typed by the visitor.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    /// Desired handle.
    pub handle: String,
    /// Password.
    pub password: String,
    /// Password confirmation.
    pub confirmation: String,
}

impl RegistrationForm {
    /// Creates a form from raw input.
    pub fn new(
        handle: impl Into<String>,
        password: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Self {
        Self {
            handle: handle.into(),
            password: password.into(),
            confirmation: confirmation.into(),
        }
    }

    /// Checks local preconditions and returns normalized values.
    ///
    /// # Errors
    /// Returns [`ValidationError::HandleTooShort`],
    /// [`ValidationError::PasswordTooShort`], or
    /// [`ValidationError::ConfirmationMismatch`], in that order of precedence.
    pub fn validate(&self) -> Result<NormalizedRegistration, ValidationError> {
        let handle = normalize_credential(&self.handle);
        if handle.chars().count() < MIN_HANDLE_CHARS {
            return Err(ValidationError::HandleTooShort {
                min: MIN_HANDLE_CHARS,
            });
        }

        let password = normalize_credential(&self.password);
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_CHARS,
            });
        }

        if !credentials_match(&self.password, &self.confirmation) {
            return Err(ValidationError::ConfirmationMismatch);
        }

        Ok(NormalizedRegistration { handle, password })
    }
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Registration input that passed validation.
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedRegistration {
    handle: String,
    password: String,
}

impl NormalizedRegistration {
    /// Normalized handle.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Builds the wire request for `ticket`.
    pub fn to_request(&self, ticket: &TicketId) -> RegisterRequest {
        RegisterRequest {
            click_id: ticket.as_str().to_string(),
            password: self.password.clone(),
            instagram_id: self.handle.clone(),
        }
    }
}

impl fmt::Debug for NormalizedRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedRegistration")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// What identifies the participant at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginKey {
    /// The registered handle.
    Handle(String),
    /// The participant number (legacy login variant).
    ParticipantCode(String),
}

/// Login input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Participant lookup key.
    pub key: LoginKey,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Credentials keyed by handle.
    pub fn with_handle(handle: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            key: LoginKey::Handle(handle.into()),
            password: password.into(),
        }
    }

    /// Credentials keyed by participant number.
    pub fn with_participant_code(code: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            key: LoginKey::ParticipantCode(code.into()),
            password: password.into(),
        }
    }

    /// Normalized handle, when keyed by handle.
    pub fn normalized_handle(&self) -> Option<String> {
        match &self.key {
            LoginKey::Handle(handle) => Some(normalize_credential(handle)),
            LoginKey::ParticipantCode(_) => None,
        }
    }

    /// Returns `true` when the login key names `participant`.
    ///
    /// Participant numbers compare numerically, so `42` matches `0042`.
    pub fn identifies(&self, participant: &Participant) -> bool {
        match &self.key {
            LoginKey::Handle(handle) => participant
                .handle
                .as_deref()
                .is_some_and(|owner| normalize_credential(owner) == normalize_credential(handle)),
            LoginKey::ParticipantCode(code) => {
                let typed = code.trim();
                let owner = participant.code.as_str();
                typed == owner
                    || matches!(
                        (typed.parse::<u64>(), owner.parse::<u64>()),
                        (Ok(left), Ok(right)) if left == right
                    )
            }
        }
    }

    /// Validates and normalizes into the wire request.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingLoginKey`] or
    /// [`ValidationError::MissingPassword`] for blank input.
    pub fn to_request(&self) -> Result<LoginRequest, ValidationError> {
        let password = normalize_credential(&self.password);
        let (instagram_id, player_num) = match &self.key {
            LoginKey::Handle(handle) => (Some(normalize_credential(handle)), None),
            LoginKey::ParticipantCode(code) => (None, Some(code.trim().to_string())),
        };

        let key_blank = instagram_id
            .as_deref()
            .or(player_num.as_deref())
            .is_none_or(str::is_empty);
        if key_blank {
            return Err(ValidationError::MissingLoginKey);
        }
        if password.is_empty() {
            return Err(ValidationError::MissingPassword);
        }

        Ok(LoginRequest {
            instagram_id,
            player_num,
            password,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Executes register/login/unlock and promotes the resulting ticket.
#[derive(Clone)]
pub struct IdentityBinder {
    transport: Arc<dyn GateTransport>,
    store: Arc<dyn SessionStore>,
}

impl IdentityBinder {
    /// Creates a binder over `transport`, promoting tickets in `store`.
    pub fn new(transport: Arc<dyn GateTransport>, store: Arc<dyn SessionStore>) -> Self {
        Self { transport, store }
    }

    /// Registers `form` against the resolved `ticket`.
    ///
    /// On success the ticket becomes `my_ticket` and `pending_ticket` is
    /// cleared.
    ///
    /// # Errors
    /// Returns [`GateError::ValidationFailed`] without a request when the form
    /// is invalid, and [`GateError::BackendRejected`] when the service refuses.
    pub async fn register(
        &self,
        ticket: &TicketId,
        form: &RegistrationForm,
    ) -> Result<Binding, GateError> {
        let normalized = form.validate()?;
        let response = self
            .transport
            .register(&normalized.to_request(ticket))
            .await?;

        if !response.is_success() {
            return Err(rejected(
                response.failure.reason(),
                "registration was refused",
            ));
        }

        self.promote(ticket)?;
        tracing::info!(ticket = %ticket_fingerprint(ticket), "participant registered");
        Ok(Binding {
            ticket: ticket.clone(),
            handle: Some(normalized.handle),
        })
    }

    /// Authenticates an existing participant and promotes the fresh ticket the
    /// service mints for this login.
    ///
    /// # Errors
    /// Returns [`GateError::ValidationFailed`] for blank input,
    /// [`GateError::BackendRejected`] for wrong credentials, and
    /// [`GateError::InvalidResponse`] when success carries no ticket id.
    pub async fn login(&self, credentials: &Credentials) -> Result<Binding, GateError> {
        let ticket = self.authenticate(credentials).await?;

        self.promote(&ticket)?;
        tracing::info!(ticket = %ticket_fingerprint(&ticket), "participant logged in");
        Ok(Binding {
            ticket,
            handle: credentials.normalized_handle(),
        })
    }

    /// Re-authenticates `owner` for an already-resolved `ticket` and promotes
    /// that ticket.
    ///
    /// # Errors
    /// Returns [`GateError::ParticipantMismatch`] without a request when the
    /// credentials name someone other than `owner`, otherwise the same errors
    /// as [`IdentityBinder::login`].
    pub async fn unlock(
        &self,
        ticket: &TicketId,
        owner: &Participant,
        credentials: &Credentials,
    ) -> Result<Binding, GateError> {
        credentials.to_request()?;
        if !credentials.identifies(owner) {
            tracing::warn!(
                ticket = %ticket_fingerprint(ticket),
                "unlock credentials name another participant"
            );
            return Err(GateError::ParticipantMismatch);
        }
        self.authenticate(credentials).await?;

        self.promote(ticket)?;
        tracing::info!(ticket = %ticket_fingerprint(ticket), "ticket unlocked");
        Ok(Binding {
            ticket: ticket.clone(),
            handle: owner.handle.clone(),
        })
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<TicketId, GateError> {
        let request = credentials.to_request()?;
        let response = self.transport.login(&request).await?;

        if !response.is_success() {
            return Err(rejected(
                response.failure.reason(),
                "handle or password is incorrect",
            ));
        }

        let raw = response.ticket_id.ok_or_else(|| {
            GateError::InvalidResponse("login succeeded without ticket_id".to_string())
        })?;
        Ok(TicketId::new(raw)?)
    }

    fn promote(&self, ticket: &TicketId) -> Result<(), GateError> {
        self.store.set(SessionSlot::MyTicket, ticket)?;
        self.store.clear(SessionSlot::PendingTicket)?;
        Ok(())
    }
}

fn rejected(reason: Option<String>, fallback: &str) -> GateError {
    GateError::BackendRejected {
        status: None,
        reason: reason.unwrap_or_else(|| fallback.to_string()),
    }
}
