#![warn(missing_docs)]
//! # ticket-gate binary
//!
//! Command-line shell for the gate. Every invocation is a fresh page entry
//! against the session file left behind by the previous one.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use ticket_gate_access::{Disposition, UserAction};
use ticket_gate_app::{
    ConfigOverrides, GateConfig, GateController, app_version, inbound_ticket,
    log_filter_from_env, redact_sensitive,
};
use ticket_gate_auth::{Credentials, RegistrationForm};
use ticket_gate_client::{HttpGateTransport, Navigator, ticket_fingerprint};
use ticket_gate_core::TicketId;
use ticket_gate_session::{FileSessionStore, SessionSlot, SessionStore};
use ticket_gate_ui::action_label;
use url::Url;

#[derive(Parser)]
#[command(name = "ticket-gate", version = app_version(), about = "Ad-gated ticket access")]
struct Cli {
    /// Gate service base URL [env: TICKET_GATE_BASE_URL]
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Session file path [env: TICKET_GATE_SESSION_FILE]
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// Request timeout in seconds [env: TICKET_GATE_TIMEOUT_SECS]
    #[arg(long, global = true)]
    timeout_secs: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enter the page, optionally returning from the ad network
    Open(ReturnOpts),
    /// Get a ticket and go to the ad network
    Enter,
    /// Register a handle and password for the pending ticket
    Register(RegisterOpts),
    /// Log in with an existing handle or participant number
    Login(CredentialOpts),
    /// Prove ownership of a ticket registered on another device
    Unlock(UnlockOpts),
    /// Show the current gate view and stored session
    Status(ReturnOpts),
    /// Forget every stored ticket
    Reset,
}

#[derive(Args)]
struct ReturnOpts {
    /// Ticket carried back by the ad network
    #[arg(long, conflicts_with = "return_url")]
    click_id: Option<String>,

    /// Full return URL; its `click_id` parameter is used
    #[arg(long)]
    return_url: Option<Url>,
}

impl ReturnOpts {
    fn inbound(&self) -> anyhow::Result<Option<TicketId>> {
        if let Some(raw) = &self.click_id {
            return Ok(Some(TicketId::new(raw).context("invalid --click-id")?));
        }
        match &self.return_url {
            Some(url) => match inbound_ticket(url) {
                Some(ticket) => Ok(Some(ticket)),
                None => bail!("return URL carries no click_id"),
            },
            None => Ok(None),
        }
    }
}

#[derive(Args)]
struct RegisterOpts {
    /// Handle to register
    #[arg(long)]
    handle: String,

    /// Password
    #[arg(long, env = "TICKET_GATE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Password confirmation (defaults to the password)
    #[arg(long)]
    confirm: Option<String>,
}

#[derive(Args)]
struct CredentialOpts {
    /// Registered handle
    #[arg(long, conflicts_with = "player", required_unless_present = "player")]
    handle: Option<String>,

    /// Participant number
    #[arg(long)]
    player: Option<String>,

    /// Password
    #[arg(long, env = "TICKET_GATE_PASSWORD", hide_env_values = true)]
    password: String,
}

impl CredentialOpts {
    fn credentials(&self) -> Credentials {
        match (&self.handle, &self.player) {
            (Some(handle), _) => Credentials::with_handle(handle, &self.password),
            (None, Some(player)) => Credentials::with_participant_code(player, &self.password),
            (None, None) => Credentials::with_handle("", &self.password),
        }
    }
}

#[derive(Args)]
struct UnlockOpts {
    #[command(flatten)]
    target: ReturnOpts,

    #[command(flatten)]
    credentials: CredentialOpts,
}

/// Prints the redirect target; the visitor opens it in a browser.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, target: &Url) {
        println!("open this link to continue: {target}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_filter_from_env()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("ticket-gate: {}", redact_sensitive(&format!("{error:#}")));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GateConfig::from_env(ConfigOverrides {
        base_url: cli.base_url,
        session_file: cli.session_file,
        timeout_secs: cli.timeout_secs,
    })?;
    tracing::debug!(base_url = %config.base_url, "configuration resolved");

    let transport = Arc::new(HttpGateTransport::new(
        config.base_url.as_str(),
        config.timeout,
    )?);
    let store = Arc::new(FileSessionStore::new(&config.session_file));
    let mut controller = GateController::new(transport, store.clone(), Arc::new(PrintNavigator));

    match cli.command {
        Command::Open(opts) => {
            controller.open(opts.inbound()?).await?;
        }
        Command::Enter => {
            controller.open(None).await?;
            report(UserAction::Enter, controller.enter().await?);
        }
        Command::Register(opts) => {
            controller.open(None).await?;
            let confirmation = opts.confirm.as_deref().unwrap_or(&opts.password);
            let form = RegistrationForm::new(&opts.handle, &opts.password, confirmation);
            report(
                UserAction::SubmitRegistration,
                controller.register(&form).await?,
            );
        }
        Command::Login(opts) => {
            controller.open(None).await?;
            if !controller.state().offers(UserAction::ShowLogin) {
                controller.leave()?;
            }
            controller.show_login();
            report(
                UserAction::SubmitLogin,
                controller.login(&opts.credentials()).await?,
            );
        }
        Command::Unlock(opts) => {
            controller.open(opts.target.inbound()?).await?;
            report(
                UserAction::SubmitUnlock,
                controller.unlock(&opts.credentials.credentials()).await?,
            );
        }
        Command::Status(opts) => {
            controller.open(opts.inbound()?).await?;
            let session = store.snapshot()?;
            for slot in SessionSlot::ALL {
                let value = session
                    .get(slot)
                    .map_or_else(|| "-".to_string(), ticket_fingerprint);
                println!("{}: {value}", slot.key());
            }
        }
        Command::Reset => {
            controller.reset()?;
        }
    }

    for line in controller.view().render_lines() {
        println!("{line}");
    }
    Ok(())
}

fn report(action: UserAction, disposition: Disposition) {
    if let Disposition::Ignored(reason) = disposition {
        println!("`{}` is not available here ({reason:?})", action_label(action));
    }
}
