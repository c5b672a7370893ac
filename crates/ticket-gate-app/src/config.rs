//! Runtime configuration resolved from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use ticket_gate_client::validate_gate_endpoint;
use url::Url;

use crate::AppError;

/// Gate service base URL.
pub const BASE_URL_ENV: &str = "TICKET_GATE_BASE_URL";
/// Session file location.
pub const SESSION_FILE_ENV: &str = "TICKET_GATE_SESSION_FILE";
/// Request timeout in seconds.
pub const TIMEOUT_SECS_ENV: &str = "TICKET_GATE_TIMEOUT_SECS";
/// Log filter, falling back to `RUST_LOG`.
pub const LOG_ENV: &str = "TICKET_GATE_LOG";

/// Service the deployed page talks to.
pub const DEFAULT_BASE_URL: &str = "https://dead-or-play-kr.onrender.com";
/// Default session file, relative to the working directory.
pub const DEFAULT_SESSION_FILE: &str = "./.ticket-gate/session.json";
/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw, unvalidated settings. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Gate service base URL.
    pub base_url: Option<String>,
    /// Session file path.
    pub session_file: Option<PathBuf>,
    /// Request timeout in seconds, unparsed.
    pub timeout_secs: Option<String>,
}

impl ConfigOverrides {
    /// Reads every setting through `lookup`, keyed by its environment name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup(BASE_URL_ENV),
            session_file: lookup(SESSION_FILE_ENV).map(PathBuf::from),
            timeout_secs: lookup(TIMEOUT_SECS_ENV),
        }
    }

    /// Keeps every setting present in `self` and takes the rest from
    /// `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            base_url: self.base_url.or(fallback.base_url),
            session_file: self.session_file.or(fallback.session_file),
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
        }
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Gate service base URL, ending with `/`.
    pub base_url: Url,
    /// Where the CLI keeps its session.
    pub session_file: PathBuf,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GateConfig {
    /// Reads configuration from the process environment; settings present
    /// in `flags` win over their environment variables.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for invalid values.
    pub fn from_env(flags: ConfigOverrides) -> Result<Self, AppError> {
        let environment = ConfigOverrides::from_lookup(|key| std::env::var(key).ok());
        Self::resolve(flags.or(environment))
    }

    /// Reads configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for invalid values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        Self::resolve(ConfigOverrides::from_lookup(lookup))
    }

    /// Applies defaults and validates.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the URL fails the endpoint policy or
    /// the timeout is not a positive integer.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, AppError> {
        let raw_url = overrides
            .base_url
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = validate_gate_endpoint(&raw_url)
            .map_err(|error| AppError::Config(format!("{BASE_URL_ENV}: {error}")))?;

        let timeout_secs = match overrides.timeout_secs.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_TIMEOUT_SECS,
            Some(raw) => raw.parse::<u64>().map_err(|error| {
                AppError::Config(format!("{TIMEOUT_SECS_ENV}: `{raw}` is not a number: {error}"))
            })?,
        };
        if timeout_secs == 0 {
            return Err(AppError::Config(format!(
                "{TIMEOUT_SECS_ENV} must be greater than zero"
            )));
        }

        Ok(Self {
            base_url,
            session_file: overrides
                .session_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Log filter directive: `TICKET_GATE_LOG`, then `RUST_LOG`, then `info`.
pub fn log_filter_from_env() -> String {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string())
}
