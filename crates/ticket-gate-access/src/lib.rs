#![warn(missing_docs)]
//! # ticket-gate-access
//!
//! ## Purpose
//! The access state machine: decides whether the visitor is idle, waiting on
//! the network, cleared through the gate, registering, logging in, or locked
//! out of a ticket another browser owns.
//!
//! ## Responsibilities
//! - Model the visitor's position as one tagged-union [`AccessState`].
//! - Compute every move with a single pure [`transition`] function that
//!   returns the next state plus the [`Effect`]s the caller must execute.
//! - Keep at most one request in flight and discard completions that belong
//!   to an abandoned view.
//!
//! ## Data flow
//! Controller feeds [`Event`]s (page loads, visitor actions, request
//! completions) into [`AccessMachine::apply`]; the machine answers with
//! effects (requests to start, session writes, reloads) which the controller
//! executes and reports back as [`Event::Completed`].
//!
//! ## Ownership and lifetimes
//! The machine owns its state. Events and effects are moved through it by
//! value; no borrowed data outlives one `apply` call.
//!
//! ## Error model
//! Failures arrive inside [`Outcome`] values and are turned into a
//! [`Notice`] plus a return to `Idle` or to the state the action started
//! from. The machine itself never fails.
//!
//! ## Security and privacy notes
//! The machine never sees passwords: submit actions carry no payload and the
//! controller keeps the form until the request effect asks for it.
//!
//! ## Example
//! ```rust
//! use ticket_gate_access::{AccessMachine, Effect, Event, StateKind};
//! use ticket_gate_core::TicketId;
//! use ticket_gate_session::SessionSnapshot;
//!
//! let mut machine = AccessMachine::new();
//! let step = machine.apply(Event::PageLoaded {
//!     inbound: Some(TicketId::new("abc123").expect("ticket id is non-empty")),
//!     session: SessionSnapshot::default(),
//! });
//! assert_eq!(machine.state().kind(), StateKind::Loading);
//! assert!(matches!(step.effects[0], Effect::Resolve { .. }));
//! ```

use ticket_gate_client::{FailureClass, GateError, IssuedTicket, classify_gate_error};
use ticket_gate_core::{Binding, Participant, Resolution, TicketId, ValidationError};
use ticket_gate_session::{SessionSlot, SessionSnapshot};

/// Identifies one request; completions carrying another epoch are stale.
pub type Epoch = u64;

/// Request a `Loading` state is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Resolving the effective ticket of a page load.
    Resolving {
        /// Effective ticket.
        ticket: TicketId,
        /// `my_ticket` as stored when the page loaded.
        my_ticket: Option<TicketId>,
    },
    /// Issuing a new ticket.
    Issuing,
    /// Registering a participant for a resolved ticket.
    Registering {
        /// Ticket being claimed.
        ticket: TicketId,
        /// Participant the ticket resolved to.
        participant: Participant,
    },
    /// Logging in without a ticket.
    LoggingIn,
    /// Unlocking a resolved ticket.
    Unlocking {
        /// Ticket being unlocked.
        ticket: TicketId,
        /// Participant the ticket resolved to.
        participant: Participant,
    },
}

/// Where the visitor currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    /// Nothing to resolve; the visitor may enter or log in.
    Idle,
    /// A request is in flight.
    Loading {
        /// Epoch of the in-flight request.
        epoch: Epoch,
        /// What is being waited on.
        operation: Operation,
        /// State to return to if the request fails.
        resume: Box<AccessState>,
    },
    /// This browser proved ownership of the ticket.
    GateCleared {
        /// Authorized ticket.
        ticket: TicketId,
        /// Owning participant.
        participant: Participant,
    },
    /// The ticket belongs to a visitor who has not registered yet.
    RegistrationRequired {
        /// Resolved ticket.
        ticket: TicketId,
        /// Anonymous participant.
        participant: Participant,
    },
    /// Returning visitor logging in without a ticket.
    LoginPrompt,
    /// Valid ticket of a registered participant, not owned by this browser.
    DeviceLocked {
        /// Resolved ticket.
        ticket: TicketId,
        /// Owning participant.
        participant: Participant,
    },
}

/// Payload-free discriminant of [`AccessState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    /// [`AccessState::Idle`].
    Idle,
    /// [`AccessState::Loading`].
    Loading,
    /// [`AccessState::GateCleared`].
    GateCleared,
    /// [`AccessState::RegistrationRequired`].
    RegistrationRequired,
    /// [`AccessState::LoginPrompt`].
    LoginPrompt,
    /// [`AccessState::DeviceLocked`].
    DeviceLocked,
}

impl AccessState {
    /// Returns the discriminant.
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::Loading { .. } => StateKind::Loading,
            Self::GateCleared { .. } => StateKind::GateCleared,
            Self::RegistrationRequired { .. } => StateKind::RegistrationRequired,
            Self::LoginPrompt => StateKind::LoginPrompt,
            Self::DeviceLocked { .. } => StateKind::DeviceLocked,
        }
    }

    /// Ticket the state is keyed by, if any.
    pub fn ticket(&self) -> Option<&TicketId> {
        match self {
            Self::GateCleared { ticket, .. }
            | Self::RegistrationRequired { ticket, .. }
            | Self::DeviceLocked { ticket, .. } => Some(ticket),
            Self::Loading { resume, .. } => resume.ticket(),
            Self::Idle | Self::LoginPrompt => None,
        }
    }

    /// Participant the state is about, if any.
    pub fn participant(&self) -> Option<&Participant> {
        match self {
            Self::GateCleared { participant, .. }
            | Self::RegistrationRequired { participant, .. }
            | Self::DeviceLocked { participant, .. } => Some(participant),
            Self::Loading { resume, .. } => resume.participant(),
            Self::Idle | Self::LoginPrompt => None,
        }
    }

    /// Actions offered to the visitor in this state.
    pub fn actions(&self) -> Vec<UserAction> {
        match self {
            Self::Idle => vec![UserAction::Enter, UserAction::ShowLogin],
            Self::Loading { .. } | Self::GateCleared { .. } => vec![UserAction::Leave],
            Self::RegistrationRequired { .. } => {
                vec![UserAction::SubmitRegistration, UserAction::Leave]
            }
            Self::LoginPrompt => vec![UserAction::SubmitLogin, UserAction::Back],
            Self::DeviceLocked { .. } => vec![UserAction::SubmitUnlock, UserAction::Leave],
        }
    }

    /// Returns `true` when `action` is offered.
    pub fn offers(&self, action: UserAction) -> bool {
        self.actions().contains(&action)
    }
}

/// Visitor intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Start the gate: issue a ticket and go to the ad network.
    Enter,
    /// Open the login prompt.
    ShowLogin,
    /// Close the login prompt.
    Back,
    /// Navigate away; abandons any in-flight request.
    Leave,
    /// Submit the registration form.
    SubmitRegistration,
    /// Submit the login form.
    SubmitLogin,
    /// Submit the unlock form.
    SubmitUnlock,
}

/// Result of a request the machine asked for.
#[derive(Debug)]
pub enum Outcome {
    /// Completion of [`Effect::Resolve`].
    Resolved(Result<Resolution, GateError>),
    /// Completion of [`Effect::Issue`].
    Issued(Result<IssuedTicket, GateError>),
    /// Completion of [`Effect::Register`].
    Registered(Result<Binding, GateError>),
    /// Completion of [`Effect::Login`].
    LoggedIn(Result<Binding, GateError>),
    /// Completion of [`Effect::Unlock`].
    Unlocked(Result<Binding, GateError>),
}

/// Inputs to the machine.
#[derive(Debug)]
pub enum Event {
    /// Fresh page entry, with the inbound `click_id` and the stored session.
    PageLoaded {
        /// Ticket carried by the navigation, if any.
        inbound: Option<TicketId>,
        /// Session as stored at load time.
        session: SessionSnapshot,
    },
    /// A visitor action.
    Action(UserAction),
    /// Form input failed local validation; nothing was sent.
    InputRejected(ValidationError),
    /// A request finished.
    Completed {
        /// Epoch the request was started with.
        epoch: Epoch,
        /// Its result.
        outcome: Outcome,
    },
}

/// Session write the controller must apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Store `ticket` under `slot`.
    Set(SessionSlot, TicketId),
    /// Clear one slot.
    Clear(SessionSlot),
    /// Discard every stored ticket.
    ClearAll,
}

/// Work the controller must perform after a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Resolve `ticket`.
    Resolve {
        /// Request epoch.
        epoch: Epoch,
        /// Ticket to resolve.
        ticket: TicketId,
    },
    /// Issue a ticket and redirect.
    Issue {
        /// Request epoch.
        epoch: Epoch,
    },
    /// Register the held form against `ticket`.
    Register {
        /// Request epoch.
        epoch: Epoch,
        /// Ticket being claimed.
        ticket: TicketId,
    },
    /// Log in with the held credentials.
    Login {
        /// Request epoch.
        epoch: Epoch,
    },
    /// Unlock `ticket` with the held credentials.
    Unlock {
        /// Request epoch.
        epoch: Epoch,
        /// Ticket being unlocked.
        ticket: TicketId,
        /// Participant the ticket resolved to; the credentials must name it.
        owner: Participant,
    },
    /// Apply a session write.
    Session(SessionCommand),
    /// Full-page transition keyed by `inbound`.
    Reload {
        /// Ticket the new page carries.
        inbound: TicketId,
    },
}

/// Message for the visitor produced by the last applied transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The visitor was sent to the ad network.
    Redirected,
    /// Something failed.
    Failure {
        /// How the failure was handled.
        class: FailureClass,
        /// Reason to display.
        reason: String,
    },
}

impl Notice {
    fn from_error(error: &GateError) -> Self {
        Self::Failure {
            class: classify_gate_error(error),
            reason: error.to_string(),
        }
    }
}

/// Why an event left the machine unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A request is already in flight.
    Busy,
    /// The action is not offered in the current state.
    Unavailable,
    /// The completion belongs to an abandoned request.
    Stale,
}

/// Whether an event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The event moved the machine.
    Applied,
    /// The event was dropped.
    Ignored(IgnoreReason),
}

/// Full result of [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Whether the event applied.
    pub disposition: Disposition,
    /// Next state (a copy of the current one when ignored).
    pub state: AccessState,
    /// Effects to execute, in order.
    pub effects: Vec<Effect>,
    /// Notice to display; `None` clears the previous one.
    pub notice: Option<Notice>,
}

impl Transition {
    fn applied(state: AccessState) -> Self {
        Self {
            disposition: Disposition::Applied,
            state,
            effects: Vec::new(),
            notice: None,
        }
    }

    fn ignored(state: &AccessState, reason: IgnoreReason) -> Self {
        Self {
            disposition: Disposition::Ignored(reason),
            state: state.clone(),
            effects: Vec::new(),
            notice: None,
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Computes the next state for `event`.
///
/// `epoch` is the id given to any request this transition starts; it must
/// differ from every epoch handed out before.
pub fn transition(state: &AccessState, event: Event, epoch: Epoch) -> Transition {
    match event {
        Event::PageLoaded { inbound, session } => page_loaded(inbound, session, epoch),
        Event::Action(action) => act(state, action, epoch),
        Event::InputRejected(error) => {
            if matches!(state, AccessState::Loading { .. }) {
                return Transition::ignored(state, IgnoreReason::Busy);
            }
            Transition::applied(state.clone())
                .with_notice(Notice::from_error(&GateError::ValidationFailed(error)))
        }
        Event::Completed {
            epoch: completed,
            outcome,
        } => match state {
            AccessState::Loading {
                epoch: current,
                operation,
                resume,
            } if *current == completed => complete(state, operation, resume, outcome),
            _ => Transition::ignored(state, IgnoreReason::Stale),
        },
    }
}

fn page_loaded(inbound: Option<TicketId>, session: SessionSnapshot, epoch: Epoch) -> Transition {
    // The navigation parameter reflects the latest visible redirect; it wins.
    let Some(ticket) = inbound.or(session.pending_ticket) else {
        return Transition::applied(AccessState::Idle);
    };

    Transition::applied(AccessState::Loading {
        epoch,
        operation: Operation::Resolving {
            ticket: ticket.clone(),
            my_ticket: session.my_ticket,
        },
        resume: Box::new(AccessState::Idle),
    })
    .with_effect(Effect::Resolve { epoch, ticket })
}

fn act(state: &AccessState, action: UserAction, epoch: Epoch) -> Transition {
    if action == UserAction::Leave {
        return leave(state);
    }
    if matches!(state, AccessState::Loading { .. }) {
        return Transition::ignored(state, IgnoreReason::Busy);
    }

    let loading = |operation: Operation| AccessState::Loading {
        epoch,
        operation,
        resume: Box::new(state.clone()),
    };

    match (state, action) {
        (AccessState::Idle, UserAction::Enter) => {
            Transition::applied(loading(Operation::Issuing)).with_effect(Effect::Issue { epoch })
        }
        (AccessState::Idle, UserAction::ShowLogin) => {
            Transition::applied(AccessState::LoginPrompt)
        }
        (AccessState::LoginPrompt, UserAction::Back) => Transition::applied(AccessState::Idle),
        (AccessState::LoginPrompt, UserAction::SubmitLogin) => {
            Transition::applied(loading(Operation::LoggingIn)).with_effect(Effect::Login { epoch })
        }
        (
            AccessState::RegistrationRequired {
                ticket,
                participant,
            },
            UserAction::SubmitRegistration,
        ) => Transition::applied(loading(Operation::Registering {
            ticket: ticket.clone(),
            participant: participant.clone(),
        }))
        .with_effect(Effect::Register {
            epoch,
            ticket: ticket.clone(),
        }),
        (
            AccessState::DeviceLocked {
                ticket,
                participant,
            },
            UserAction::SubmitUnlock,
        ) => Transition::applied(loading(Operation::Unlocking {
            ticket: ticket.clone(),
            participant: participant.clone(),
        }))
        .with_effect(Effect::Unlock {
            epoch,
            ticket: ticket.clone(),
            owner: participant.clone(),
        }),
        _ => Transition::ignored(state, IgnoreReason::Unavailable),
    }
}

fn leave(state: &AccessState) -> Transition {
    let registration = match state {
        AccessState::Loading { resume, .. } => resume.as_ref(),
        other => other,
    };
    let left = Transition::applied(AccessState::Idle);
    if matches!(registration, AccessState::RegistrationRequired { .. }) {
        // The pending ticket only lives as long as the registration form.
        return left.with_effect(Effect::Session(SessionCommand::Clear(
            SessionSlot::PendingTicket,
        )));
    }
    left
}

fn complete(
    state: &AccessState,
    operation: &Operation,
    resume: &AccessState,
    outcome: Outcome,
) -> Transition {
    match (operation, outcome) {
        (Operation::Resolving { ticket, my_ticket }, Outcome::Resolved(result)) => match result {
            Ok(Resolution::Resolved(participant)) => {
                settle_resolution(ticket, my_ticket.as_ref(), participant)
            }
            Ok(Resolution::Rejected { reason }) => {
                failed(resume, &GateError::InvalidTicket(reason))
            }
            Err(error) => failed(resume, &error),
        },
        (Operation::Issuing, Outcome::Issued(result)) => match result {
            Ok(_) => Transition::applied(AccessState::Idle).with_notice(Notice::Redirected),
            Err(error) => failed(resume, &error),
        },
        (Operation::Registering { participant, .. }, Outcome::Registered(result))
        | (Operation::Unlocking { participant, .. }, Outcome::Unlocked(result)) => match result {
            Ok(binding) => Transition::applied(AccessState::GateCleared {
                participant: Participant {
                    code: participant.code.clone(),
                    handle: binding.handle.or_else(|| participant.handle.clone()),
                    has_credential: true,
                },
                ticket: binding.ticket,
            }),
            Err(error) => failed(resume, &error),
        },
        (Operation::LoggingIn, Outcome::LoggedIn(result)) => match result {
            Ok(binding) => Transition::applied(AccessState::Idle).with_effect(Effect::Reload {
                inbound: binding.ticket,
            }),
            Err(error) => failed(resume, &error),
        },
        _ => Transition::ignored(state, IgnoreReason::Stale),
    }
}

fn settle_resolution(
    ticket: &TicketId,
    my_ticket: Option<&TicketId>,
    participant: Participant,
) -> Transition {
    if !participant.has_credential {
        // Keep the ticket pending while the registration form is open so a
        // reload lands back on it.
        return Transition::applied(AccessState::RegistrationRequired {
            ticket: ticket.clone(),
            participant,
        })
        .with_effect(Effect::Session(SessionCommand::Set(
            SessionSlot::PendingTicket,
            ticket.clone(),
        )));
    }

    let next = if my_ticket == Some(ticket) {
        AccessState::GateCleared {
            ticket: ticket.clone(),
            participant,
        }
    } else {
        AccessState::DeviceLocked {
            ticket: ticket.clone(),
            participant,
        }
    };
    Transition::applied(next).with_effect(Effect::Session(SessionCommand::Clear(
        SessionSlot::PendingTicket,
    )))
}

fn failed(resume: &AccessState, error: &GateError) -> Transition {
    let notice = Notice::from_error(error);
    match classify_gate_error(error) {
        FailureClass::ResetToIdle => Transition::applied(AccessState::Idle)
            .with_effect(Effect::Session(SessionCommand::ClearAll))
            .with_notice(notice),
        FailureClass::Retry | FailureClass::FixInput | FailureClass::ShowReason => {
            Transition::applied(resume.clone()).with_notice(notice)
        }
    }
}

/// Outcome of [`AccessMachine::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Whether the event applied.
    pub disposition: Disposition,
    /// Effects to execute, in order.
    pub effects: Vec<Effect>,
}

/// Stateful wrapper around [`transition`] that allocates epochs.
#[derive(Debug, Clone)]
pub struct AccessMachine {
    state: AccessState,
    notice: Option<Notice>,
    next_epoch: Epoch,
}

impl AccessMachine {
    /// Creates a machine in `Idle`.
    pub fn new() -> Self {
        Self {
            state: AccessState::Idle,
            notice: None,
            next_epoch: 1,
        }
    }

    /// Current state.
    pub fn state(&self) -> &AccessState {
        &self.state
    }

    /// Notice from the last applied transition.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Feeds one event through [`transition`].
    pub fn apply(&mut self, event: Event) -> Step {
        let next = transition(&self.state, event, self.next_epoch);
        if next.disposition == Disposition::Applied {
            self.state = next.state;
            self.notice = next.notice;
            self.next_epoch += 1;
        }
        Step {
            disposition: next.disposition,
            effects: next.effects,
        }
    }
}

impl Default for AccessMachine {
    fn default() -> Self {
        Self::new()
    }
}
