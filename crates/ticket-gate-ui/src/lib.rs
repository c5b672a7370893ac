#![warn(missing_docs)]
//! # ticket-gate-ui
//!
//! ## Purpose
//! Defines the display-facing view of the access state.
//!
//! ## Responsibilities
//! - Map each access state to a screen with its participant badge.
//! - Turn the last notice into a banner the visitor can read.
//! - List the actions the visitor may take right now.
//!
//! ## Data flow
//! [`AccessMachine`] state and notice -> [`ViewModel::project`] -> shell
//! renders screen, badge, banner, and action list.
//!
//! ## Ownership and lifetimes
//! `ViewModel` owns all its strings so shells can keep it past the next
//! transition.
//!
//! ## Error model
//! Projection is total; every state has a view.
//!
//! ## Security and privacy notes
//! Views carry the participant code and handle only. Tickets and passwords are
//! never projected.

use ticket_gate_access::{AccessMachine, AccessState, Notice, Operation, UserAction};
use ticket_gate_client::FailureClass;

/// Which screen the shell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Landing screen with enter and login entries.
    Welcome,
    /// Waiting on the gate service.
    Waiting,
    /// Gate passed.
    Cleared,
    /// Registration form.
    Registration,
    /// Login form.
    Login,
    /// Ticket belongs to another browser; unlock form.
    Locked,
}

/// Banner severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerTone {
    /// Neutral information.
    Info,
    /// Recoverable by retrying or correcting input.
    Warning,
    /// The request was refused.
    Error,
}

/// One-line message above the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// Severity.
    pub tone: BannerTone,
    /// Message text.
    pub text: String,
}

/// Display-safe projection of the access machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    /// App version string sourced from root `VERSION`.
    pub version: String,
    /// Current screen.
    pub screen: Screen,
    /// Screen headline.
    pub title: String,
    /// Participant code, once a ticket resolved.
    pub badge: Option<String>,
    /// Participant handle, when known.
    pub handle: Option<String>,
    /// Message from the last transition.
    pub banner: Option<Banner>,
    /// Actions the visitor may take.
    pub actions: Vec<UserAction>,
    /// Whether a request is in flight.
    pub busy: bool,
}

impl ViewModel {
    /// Projects `machine` into a view.
    pub fn project(machine: &AccessMachine, version: impl Into<String>) -> Self {
        Self::from_parts(machine.state(), machine.notice(), version)
    }

    /// Projects an explicit state and notice.
    pub fn from_parts(
        state: &AccessState,
        notice: Option<&Notice>,
        version: impl Into<String>,
    ) -> Self {
        let participant = state.participant();
        let badge = participant.map(|participant| participant.code.as_str().to_string());
        let handle = participant.and_then(|participant| participant.handle.clone());

        Self {
            version: version.into(),
            screen: screen_for(state),
            title: title_for(state, badge.as_deref()),
            badge,
            handle,
            banner: notice.map(banner_for),
            actions: state.actions(),
            busy: matches!(state, AccessState::Loading { .. }),
        }
    }

    /// Returns `true` when `action` is offered.
    pub fn allows(&self, action: UserAction) -> bool {
        self.actions.contains(&action)
    }

    /// Plain-text rendering, one line per element.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("ticket-gate {}", self.version), self.title.clone()];
        if let Some(handle) = &self.handle {
            lines.push(format!("handle: {handle}"));
        }
        if let Some(banner) = &self.banner {
            let marker = match banner.tone {
                BannerTone::Info => "info",
                BannerTone::Warning => "warning",
                BannerTone::Error => "error",
            };
            lines.push(format!("[{marker}] {}", banner.text));
        }
        if !self.actions.is_empty() {
            let names: Vec<&str> = self.actions.iter().map(|action| action_label(*action)).collect();
            lines.push(format!("next: {}", names.join(", ")));
        }
        lines
    }
}

/// Short label for an action.
pub fn action_label(action: UserAction) -> &'static str {
    match action {
        UserAction::Enter => "enter",
        UserAction::ShowLogin => "login",
        UserAction::Back => "back",
        UserAction::Leave => "leave",
        UserAction::SubmitRegistration => "register",
        UserAction::SubmitLogin => "submit login",
        UserAction::SubmitUnlock => "unlock",
    }
}

fn screen_for(state: &AccessState) -> Screen {
    match state {
        AccessState::Idle => Screen::Welcome,
        AccessState::Loading { .. } => Screen::Waiting,
        AccessState::GateCleared { .. } => Screen::Cleared,
        AccessState::RegistrationRequired { .. } => Screen::Registration,
        AccessState::LoginPrompt => Screen::Login,
        AccessState::DeviceLocked { .. } => Screen::Locked,
    }
}

fn title_for(state: &AccessState, badge: Option<&str>) -> String {
    let badge = badge.unwrap_or("----");
    match state {
        AccessState::Idle => "Press enter to get your ticket".to_string(),
        AccessState::Loading { operation, .. } => match operation {
            Operation::Resolving { .. } => "Checking your ticket...".to_string(),
            Operation::Issuing => "Preparing your ticket...".to_string(),
            Operation::Registering { .. } => "Registering...".to_string(),
            Operation::LoggingIn => "Logging in...".to_string(),
            Operation::Unlocking { .. } => "Unlocking...".to_string(),
        },
        AccessState::GateCleared { .. } => format!("Player {badge}, you are in"),
        AccessState::RegistrationRequired { .. } => {
            format!("Player {badge}, choose a handle and password")
        }
        AccessState::LoginPrompt => "Log in with your handle and password".to_string(),
        AccessState::DeviceLocked { .. } => {
            format!("Player {badge} is registered on another device; enter the password")
        }
    }
}

fn banner_for(notice: &Notice) -> Banner {
    match notice {
        Notice::Redirected => Banner {
            tone: BannerTone::Info,
            text: "Redirected to the ad network; come back through its link".to_string(),
        },
        Notice::Failure { class, reason } => {
            let (tone, text) = match class {
                FailureClass::Retry => (BannerTone::Warning, format!("{reason}; try again")),
                FailureClass::FixInput => (BannerTone::Warning, reason.clone()),
                FailureClass::ResetToIdle | FailureClass::ShowReason => {
                    (BannerTone::Error, reason.clone())
                }
            };
            Banner { tone, text }
        }
    }
}
