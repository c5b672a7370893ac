#![warn(missing_docs)]
//! # ticket-gate-core
//!
//! ## Purpose
//! Defines the pure data model and wire contract shared across the
//! `ticket-gate` workspace.
//!
//! ## Responsibilities
//! - Represent tickets, participants, and ticket resolutions.
//! - Normalize handles and passwords the way the gate service expects them.
//! - Describe the JSON request/response bodies of the remote gate service.
//! - Extract a human-readable failure reason from any failure body shape.
//!
//! ## Data flow
//! The ticket client decodes gate-service bodies into the response types of
//! this crate, converts them into [`Resolution`] values, and hands those to the
//! access state machine. Identity binding builds [`RegisterRequest`] and
//! [`LoginRequest`] from normalized credentials.
//!
//! ## Ownership and lifetimes
//! All values own their strings so they can cross `await` points and live in
//! state-machine snapshots without borrowing from network buffers.
//!
//! ## Error model
//! Construction of identifiers is validated and fails with [`CoreError`].
//! Response decoding is lenient: optional fields default, and a missing
//! `status` is simply "not successful".
//!
//! ## Security and privacy notes
//! Request types carrying a password implement `Debug` by hand so that the
//! password never reaches logs through `{:?}` formatting.
//!
//! ## Example
//! ```rust
//! use ticket_gate_core::{TicketId, normalize_credential};
//!
//! let ticket = TicketId::new(" abc123 ").expect("ticket id is non-empty");
//! assert_eq!(ticket.as_str(), "abc123");
//! assert_eq!(normalize_credential("  PaSS "), "pass");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status value the gate service reports on success.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Browser navigation parameter carrying the ticket id back from the ad network.
pub const CLICK_ID_PARAM: &str = "click_id";

/// Minimum handle length, in characters, after normalization.
pub const MIN_HANDLE_CHARS: usize = 2;

/// Minimum password length, in characters, after normalization.
pub const MIN_PASSWORD_CHARS: usize = 4;

/// Opaque ticket identifier minted by the gate service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Creates a ticket id from raw input, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidTicketId`] when the trimmed input is empty.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidTicketId);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display-only participant number (`player_num` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantCode(String);

impl ParticipantCode {
    /// Creates a participant code from raw input.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidParticipantCode`] when the trimmed input is
    /// empty.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidParticipantCode);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Formats a numeric participant id the way the gate service does
    /// (zero-padded to four digits, wider numbers kept as-is).
    pub fn from_number(number: u64) -> Self {
        Self(format!("{number:04}"))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable identity a resolved ticket points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Display-only participant number.
    pub code: ParticipantCode,
    /// Normalized handle, once registered.
    pub handle: Option<String>,
    /// Whether the participant already has a password.
    pub has_credential: bool,
}

/// Outcome of resolving one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The ticket is valid and identifies a participant.
    Resolved(Participant),
    /// The gate service refused the ticket.
    Rejected {
        /// Human-readable reason, surfaced verbatim.
        reason: String,
    },
}

/// Normalizes a handle or password: trims whitespace and lowercases.
pub fn normalize_credential(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Case-insensitive comparison used for password confirmation.
pub fn credentials_match(left: &str, right: &str) -> bool {
    normalize_credential(left) == normalize_credential(right)
}

/// Returns `true` when a gate-service status string means success.
pub fn is_success_status(status: &str) -> bool {
    status == STATUS_SUCCESS
}

/// One entry of a structured validation-error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    /// Entry message (`msg` in FastAPI-style bodies, `message` elsewhere).
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
}

/// A failure field that is either flat text or a validation-error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureDetail {
    /// Flat human-readable text.
    Text(String),
    /// Structured list; the first entry's message is surfaced.
    Entries(Vec<FailureEntry>),
}

impl FailureDetail {
    fn reason(&self) -> Option<String> {
        match self {
            Self::Text(text) => non_blank(text),
            Self::Entries(entries) => entries
                .first()
                .and_then(|entry| entry.msg.as_deref())
                .and_then(non_blank),
        }
    }
}

/// Failure fields that may appear on any gate-service body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    /// Flat or list-shaped `message` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<FailureDetail>,
    /// Flat or list-shaped `detail` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<FailureDetail>,
}

impl FailureBody {
    /// Returns the first usable reason, preferring `message` over `detail`.
    pub fn reason(&self) -> Option<String> {
        self.message
            .as_ref()
            .and_then(FailureDetail::reason)
            .or_else(|| self.detail.as_ref().and_then(FailureDetail::reason))
    }
}

/// Extracts a user-displayable reason from a raw failure body.
///
/// JSON bodies are searched for `message`/`detail` in flat or list shape.
/// Non-JSON bodies are returned trimmed. Blank bodies yield `None`.
pub fn parse_failure_reason(raw: &str) -> Option<String> {
    match serde_json::from_str::<FailureBody>(raw) {
        Ok(body) => body.reason(),
        Err(_) if serde_json::from_str::<serde_json::Value>(raw).is_ok() => None,
        Err(_) => non_blank(raw),
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Body of `POST /gate/create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTicketResponse {
    /// Informational message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Newly minted ticket id.
    #[serde(default)]
    pub ticket_id: Option<String>,
    /// Ad-network link the visitor must follow.
    #[serde(default)]
    pub lootlabs_url: Option<String>,
    /// Failure fields, when present.
    #[serde(flatten)]
    pub failure: FailureBody,
}

/// Body of `GET /gate/callback`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackResponse {
    /// `SUCCESS` or a failure marker.
    #[serde(default)]
    pub status: String,
    /// Participant number, zero-padded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_num: Option<String>,
    /// Registered handle, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_id: Option<String>,
    /// Whether the participant already holds a password.
    #[serde(default)]
    pub has_password: bool,
    /// Failure (or informational) fields.
    #[serde(flatten)]
    pub failure: FailureBody,
}

impl CallbackResponse {
    /// Returns `true` when the service reported success.
    pub fn is_success(&self) -> bool {
        is_success_status(&self.status)
    }
}

/// Body of `POST /gate/register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Ticket being claimed.
    pub click_id: String,
    /// Normalized password.
    pub password: String,
    /// Normalized handle.
    pub instagram_id: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("click_id", &self.click_id)
            .field("password", &"<redacted>")
            .field("instagram_id", &self.instagram_id)
            .finish()
    }
}

/// Body of `POST /gate/login`; exactly one of the two keys is set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Normalized handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_id: Option<String>,
    /// Participant number, for the legacy login variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_num: Option<String>,
    /// Normalized password.
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("instagram_id", &self.instagram_id)
            .field("player_num", &self.player_num)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Generic `{status}` body returned by `POST /gate/register`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// `SUCCESS` or a failure marker.
    #[serde(default)]
    pub status: String,
    /// Failure fields.
    #[serde(flatten)]
    pub failure: FailureBody,
}

impl StatusResponse {
    /// Returns `true` when the service reported success.
    pub fn is_success(&self) -> bool {
        is_success_status(&self.status)
    }
}

/// Body of `POST /gate/login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// `SUCCESS` or a failure marker.
    #[serde(default)]
    pub status: String,
    /// Fresh ticket bound to the authenticated participant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    /// Failure fields.
    #[serde(flatten)]
    pub failure: FailureBody,
}

impl LoginResponse {
    /// Returns `true` when the service reported success.
    pub fn is_success(&self) -> bool {
        is_success_status(&self.status)
    }
}

/// Binding produced by a successful register, login, or unlock: the ticket
/// this browser is now authorized for and the participant's handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Ticket promoted to `my_ticket`.
    pub ticket: TicketId,
    /// Normalized handle, when known.
    pub handle: Option<String>,
}

/// Local precondition failures; these never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Handle is shorter than [`MIN_HANDLE_CHARS`].
    #[error("handle must be at least {min} characters")]
    HandleTooShort {
        /// Required minimum.
        min: usize,
    },
    /// Password is shorter than [`MIN_PASSWORD_CHARS`].
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Required minimum.
        min: usize,
    },
    /// Confirmation does not match the password.
    #[error("password confirmation does not match")]
    ConfirmationMismatch,
    /// Login key is blank.
    #[error("handle or participant number is required")]
    MissingLoginKey,
    /// Password is blank.
    #[error("password is required")]
    MissingPassword,
}

/// Error type for core identifier validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Ticket ids cannot be blank.
    #[error("ticket id is empty")]
    InvalidTicketId,
    /// Participant codes cannot be blank.
    #[error("participant code is empty")]
    InvalidParticipantCode,
}
