//! Effect executor that connects the access machine to the outside world.

use std::collections::VecDeque;
use std::sync::Arc;

use ticket_gate_access::{
    AccessMachine, AccessState, Disposition, Effect, Event, Notice, Outcome, SessionCommand,
    Step, UserAction,
};
use ticket_gate_auth::{Credentials, IdentityBinder, RegistrationForm};
use ticket_gate_client::{GateTransport, Navigator, TicketClient, ticket_fingerprint};
use ticket_gate_core::TicketId;
use ticket_gate_session::SessionStore;
use ticket_gate_ui::ViewModel;

use crate::{AppError, app_version, redact_sensitive};

/// Form input held for the request an action starts.
#[derive(Clone, Copy)]
enum Input<'a> {
    None,
    Registration(&'a RegistrationForm),
    Credentials(&'a Credentials),
}

/// Drives one browser context through the gate.
pub struct GateController {
    machine: AccessMachine,
    client: TicketClient,
    binder: IdentityBinder,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl GateController {
    /// Wires a controller over shared transport, store, and navigator.
    pub fn new(
        transport: Arc<dyn GateTransport>,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            machine: AccessMachine::new(),
            client: TicketClient::new(transport.clone(), store.clone()),
            binder: IdentityBinder::new(transport, store.clone()),
            store,
            navigator,
        }
    }

    /// Current machine state.
    pub fn state(&self) -> &AccessState {
        self.machine.state()
    }

    /// Underlying machine.
    pub fn machine(&self) -> &AccessMachine {
        &self.machine
    }

    /// Display projection of the current state.
    pub fn view(&self) -> ViewModel {
        ViewModel::project(&self.machine, app_version())
    }

    /// Fresh page entry with an optional inbound ticket.
    ///
    /// # Errors
    /// Returns [`AppError::Session`] when the session cannot be read or
    /// written.
    pub async fn open(&mut self, inbound: Option<TicketId>) -> Result<Disposition, AppError> {
        let fingerprint = inbound.as_ref().map(ticket_fingerprint);
        tracing::info!(inbound = ?fingerprint, "page entry");
        let session = self.store.snapshot()?;
        let step = self.machine.apply(Event::PageLoaded { inbound, session });
        self.drive(step, Input::None).await
    }

    /// Issues a ticket and navigates to the ad network.
    ///
    /// # Errors
    /// Returns [`AppError::Session`] when a session effect fails.
    pub async fn enter(&mut self) -> Result<Disposition, AppError> {
        self.act(UserAction::Enter, Input::None).await
    }

    /// Opens the login prompt.
    pub fn show_login(&mut self) -> Disposition {
        self.simple(UserAction::ShowLogin)
    }

    /// Closes the login prompt.
    pub fn back(&mut self) -> Disposition {
        self.simple(UserAction::Back)
    }

    /// Abandons the current view, including any in-flight request.
    ///
    /// # Errors
    /// Returns [`AppError::Session`] when the pending ticket of an abandoned
    /// registration cannot be dropped.
    pub fn leave(&mut self) -> Result<Disposition, AppError> {
        let step = self.machine.apply(Event::Action(UserAction::Leave));
        log_disposition(UserAction::Leave, step.disposition);
        for effect in step.effects {
            if let Effect::Session(command) = effect {
                self.apply_session(command)?;
            }
        }
        Ok(step.disposition)
    }

    /// Submits the registration form.
    ///
    /// Invalid input is rejected locally and never reaches the network.
    ///
    /// # Errors
    /// Returns [`AppError::Session`] when a session effect fails.
    pub async fn register(&mut self, form: &RegistrationForm) -> Result<Disposition, AppError> {
        let action = UserAction::SubmitRegistration;
        if self.machine.state().offers(action)
            && let Err(error) = form.validate()
        {
            tracing::warn!(%error, "registration input rejected");
            return Ok(self.machine.apply(Event::InputRejected(error)).disposition);
        }
        self.act(action, Input::Registration(form)).await
    }

    /// Submits the login form.
    ///
    /// # Errors
    /// Returns [`AppError::Session`] when a session effect fails.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<Disposition, AppError> {
        self.submit_credentials(UserAction::SubmitLogin, credentials)
            .await
    }

    /// Submits the unlock form for the resolved ticket.
    ///
    /// # Errors
    /// Returns [`AppError::Session`] when a session effect fails.
    pub async fn unlock(&mut self, credentials: &Credentials) -> Result<Disposition, AppError> {
        self.submit_credentials(UserAction::SubmitUnlock, credentials)
            .await
    }

    /// Forgets every stored ticket and returns to `Idle`.
    ///
    /// # Errors
    /// Returns [`AppError::Session`] when the store cannot be cleared.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.store.clear_all()?;
        self.leave()?;
        tracing::info!("session reset");
        Ok(())
    }

    async fn submit_credentials(
        &mut self,
        action: UserAction,
        credentials: &Credentials,
    ) -> Result<Disposition, AppError> {
        if self.machine.state().offers(action)
            && let Err(error) = credentials.to_request()
        {
            tracing::warn!(%error, "credential input rejected");
            return Ok(self.machine.apply(Event::InputRejected(error)).disposition);
        }
        self.act(action, Input::Credentials(credentials)).await
    }

    fn simple(&mut self, action: UserAction) -> Disposition {
        let step = self.machine.apply(Event::Action(action));
        log_disposition(action, step.disposition);
        step.disposition
    }

    async fn act(&mut self, action: UserAction, input: Input<'_>) -> Result<Disposition, AppError> {
        let step = self.machine.apply(Event::Action(action));
        log_disposition(action, step.disposition);
        self.drive(step, input).await
    }

    async fn drive(&mut self, step: Step, input: Input<'_>) -> Result<Disposition, AppError> {
        let disposition = step.disposition;
        let mut queue: VecDeque<Effect> = step.effects.into();

        while let Some(effect) = queue.pop_front() {
            let event = match effect {
                Effect::Session(command) => {
                    self.apply_session(command)?;
                    continue;
                }
                Effect::Reload { inbound } => {
                    tracing::info!(ticket = %ticket_fingerprint(&inbound), "reloading gate view");
                    Event::PageLoaded {
                        inbound: Some(inbound),
                        session: self.store.snapshot()?,
                    }
                }
                Effect::Resolve { epoch, ticket } => Event::Completed {
                    epoch,
                    outcome: Outcome::Resolved(self.client.resolve(&ticket).await),
                },
                Effect::Issue { epoch } => Event::Completed {
                    epoch,
                    outcome: Outcome::Issued(self.client.issue(self.navigator.as_ref()).await),
                },
                Effect::Register { epoch, ticket } => {
                    let Input::Registration(form) = input else {
                        return Err(AppError::MissingInput("registration"));
                    };
                    Event::Completed {
                        epoch,
                        outcome: Outcome::Registered(self.binder.register(&ticket, form).await),
                    }
                }
                Effect::Login { epoch } => {
                    let Input::Credentials(credentials) = input else {
                        return Err(AppError::MissingInput("login"));
                    };
                    Event::Completed {
                        epoch,
                        outcome: Outcome::LoggedIn(self.binder.login(credentials).await),
                    }
                }
                Effect::Unlock {
                    epoch,
                    ticket,
                    owner,
                } => {
                    let Input::Credentials(credentials) = input else {
                        return Err(AppError::MissingInput("unlock"));
                    };
                    Event::Completed {
                        epoch,
                        outcome: Outcome::Unlocked(
                            self.binder.unlock(&ticket, &owner, credentials).await,
                        ),
                    }
                }
            };

            let next = self.machine.apply(event);
            if let Some(Notice::Failure { class, reason }) =
                self.machine.notice()
                && next.disposition == Disposition::Applied
            {
                tracing::warn!(?class, reason = %redact_sensitive(reason), "gate request failed");
            }
            tracing::debug!(state = ?self.machine.state().kind(), "machine settled");
            queue.extend(next.effects);
        }

        Ok(disposition)
    }

    fn apply_session(&self, command: SessionCommand) -> Result<(), AppError> {
        match command {
            SessionCommand::Set(slot, ticket) => self.store.set(slot, &ticket)?,
            SessionCommand::Clear(slot) => self.store.clear(slot)?,
            SessionCommand::ClearAll => self.store.clear_all()?,
        }
        Ok(())
    }
}

fn log_disposition(action: UserAction, disposition: Disposition) {
    match disposition {
        Disposition::Applied => tracing::info!(?action, "action applied"),
        Disposition::Ignored(reason) => tracing::info!(?action, ?reason, "action ignored"),
    }
}
