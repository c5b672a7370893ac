#![warn(missing_docs)]
//! # ticket-gate-app
//!
//! ## Purpose
//! Orchestrates the ticket client, identity binder, session store, and access
//! state machine for `ticket-gate`.
//!
//! ## Responsibilities
//! - Drive the access machine by executing the effects it emits.
//! - Validate form input locally before anything is sent.
//! - Resolve runtime configuration from environment and flags.
//! - Provide log redaction and the build-time version.
//!
//! ## Data flow
//! Page entry or visitor action -> [`GateController`] -> access machine ->
//! effects (requests, session writes, reloads) -> completions fed back into
//! the machine -> [`ticket_gate_ui::ViewModel`].
//!
//! ## Ownership and lifetimes
//! The controller owns the machine and holds `Arc` handles to the shared
//! transport, store, and navigator. Forms are borrowed for one call only.
//!
//! ## Error model
//! Request failures become machine notices, never [`AppError`]s. Only
//! session storage failures, configuration errors, and effect wiring bugs
//! surface as [`AppError`].
//!
//! ## Security and privacy notes
//! - Passwords never reach log calls.
//! - Tickets are logged as fingerprints.
//! - [`redact_sensitive`] strips credential and ticket values from
//!   free-form text such as transport error messages.

use thiserror::Error;
use ticket_gate_client::GateError;
use ticket_gate_core::{CLICK_ID_PARAM, TicketId};
use ticket_gate_session::SessionError;
use url::Url;

mod config;
mod controller;

pub use config::{
    BASE_URL_ENV, ConfigOverrides, DEFAULT_BASE_URL, DEFAULT_SESSION_FILE, DEFAULT_TIMEOUT_SECS,
    GateConfig, LOG_ENV, SESSION_FILE_ENV, TIMEOUT_SECS_ENV, log_filter_from_env,
};
pub use controller::GateController;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("TICKET_GATE_VERSION");

const SENSITIVE_KEYS: [&str; 4] = ["password", "token", "click_id", "ticket_id"];
const REDACTED: &str = "<redacted>";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Extracts the inbound ticket from a return URL's `click_id` parameter.
pub fn inbound_ticket(url: &Url) -> Option<TicketId> {
    url.query_pairs()
        .find(|(key, _)| key == CLICK_ID_PARAM)
        .and_then(|(_, value)| TicketId::new(&value).ok())
}

/// Replaces the values of `password=`, `token=`, `click_id=`, and
/// `ticket_id=` pairs with a placeholder.
pub fn redact_sensitive(input: &str) -> String {
    SENSITIVE_KEYS
        .iter()
        .fold(input.to_string(), |text, key| redact_key_value(&text, key))
}

fn redact_key_value(input: &str, key: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `input`.
    let lower = input.to_ascii_lowercase();
    let needle = format!("{key}=");
    let mut output = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(&needle) {
        let value_start = cursor + found + needle.len();
        output.push_str(&input[cursor..value_start]);
        output.push_str(REDACTED);

        let value_len = input[value_start..]
            .find(|c: char| matches!(c, '&' | ',' | ';' | '"' | '\'' | ')') || c.is_whitespace())
            .unwrap_or(input.len() - value_start);
        cursor = value_start + value_len;
    }

    output.push_str(&input[cursor..]);
    output
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
    /// Local session storage failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    /// Gate client setup failed.
    #[error("gate error: {0}")]
    Gate(#[from] GateError),
    /// A request effect arrived without the input it needs.
    #[error("no {0} input is held for the pending request")]
    MissingInput(&'static str),
}

#[cfg(test)]
mod tests {
    //! Unit tests for redaction and return-URL parsing.

    use super::*;

    #[test]
    fn redaction_keeps_surrounding_text() {
        let raw = "callback failed for url (https://gate.test/gate/callback?click_id=abc123) retry";
        let redacted = redact_sensitive(raw);

        assert_eq!(
            redacted,
            "callback failed for url (https://gate.test/gate/callback?click_id=<redacted>) retry"
        );
    }

    #[test]
    fn redaction_covers_every_occurrence() {
        let redacted = redact_sensitive("password=a&PASSWORD=b");
        assert!(!redacted.contains("=a"));
        assert!(!redacted.contains("=b"));
    }

    #[test]
    fn inbound_ticket_reads_click_id() {
        let url = Url::parse("https://site.example/?click_id=abc123&x=1").expect("valid url");
        assert_eq!(
            inbound_ticket(&url),
            Some(TicketId::new("abc123").expect("valid ticket"))
        );
    }

    #[test]
    fn inbound_ticket_ignores_blank_value() {
        let url = Url::parse("https://site.example/?click_id=").expect("valid url");
        assert_eq!(inbound_ticket(&url), None);
    }
}
