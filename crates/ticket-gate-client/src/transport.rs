//! Gate-service transport seam and its `reqwest` implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use ticket_gate_core::{
    CLICK_ID_PARAM, CallbackResponse, IssueTicketResponse, LoginRequest, LoginResponse,
    RegisterRequest, StatusResponse, TicketId, parse_failure_reason,
};
use url::Url;

use crate::GateError;

const CREATE_PATH: &str = "gate/create";
const CALLBACK_PATH: &str = "gate/callback";
const REGISTER_PATH: &str = "gate/register";
const LOGIN_PATH: &str = "gate/login";

/// Abstract transport for the four gate-service operations.
///
/// Implementations return the decoded body for any 2xx response, even when
/// its `status` is not `SUCCESS`; non-2xx responses become
/// [`GateError::BackendRejected`].
#[async_trait]
pub trait GateTransport: Send + Sync {
    /// `POST /gate/create`.
    async fn create_ticket(&self) -> Result<IssueTicketResponse, GateError>;

    /// `GET /gate/callback?click_id=`.
    async fn callback(&self, ticket: &TicketId) -> Result<CallbackResponse, GateError>;

    /// `POST /gate/register`.
    async fn register(&self, request: &RegisterRequest) -> Result<StatusResponse, GateError>;

    /// `POST /gate/login`.
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, GateError>;
}

/// JSON-over-HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpGateTransport {
    base: Url,
    http: reqwest::Client,
}

impl HttpGateTransport {
    /// Creates a transport rooted at `base_url`.
    ///
    /// # Errors
    /// Returns [`GateError::InvalidEndpoint`] when the URL fails
    /// [`validate_gate_endpoint`] or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GateError> {
        let base = validate_gate_endpoint(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GateError::InvalidEndpoint(format!("http client init failed: {error}")))?;
        Ok(Self { base, http })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GateError> {
        self.base
            .join(path)
            .map_err(|error| GateError::InvalidEndpoint(format!("cannot join {path}: {error}")))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GateError> {
        let response = request
            .send()
            .await
            .map_err(|error| GateError::NetworkUnavailable(format!("{operation}: {error}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| GateError::NetworkUnavailable(format!("{operation}: {error}")))?;

        // Gateway errors mean the service is asleep or restarting, not that it refused us.
        if matches!(status.as_u16(), 502..=504) {
            return Err(GateError::NetworkUnavailable(format!(
                "{operation}: service answered HTTP {}",
                status.as_u16()
            )));
        }

        if !status.is_success() {
            let reason = parse_failure_reason(&body)
                .unwrap_or_else(|| format!("{operation} failed with HTTP {}", status.as_u16()));
            tracing::warn!(operation, status = status.as_u16(), "gate service refused request");
            return Err(GateError::BackendRejected {
                status: Some(status.as_u16()),
                reason,
            });
        }

        serde_json::from_str(&body)
            .map_err(|error| GateError::InvalidResponse(format!("{operation} body: {error}")))
    }
}

#[async_trait]
impl GateTransport for HttpGateTransport {
    async fn create_ticket(&self) -> Result<IssueTicketResponse, GateError> {
        let url = self.endpoint(CREATE_PATH)?;
        self.send("create", self.http.post(url)).await
    }

    async fn callback(&self, ticket: &TicketId) -> Result<CallbackResponse, GateError> {
        let mut url = self.endpoint(CALLBACK_PATH)?;
        url.query_pairs_mut()
            .append_pair(CLICK_ID_PARAM, ticket.as_str());
        self.send("callback", self.http.get(url)).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<StatusResponse, GateError> {
        let url = self.endpoint(REGISTER_PATH)?;
        self.send("register", self.http.post(url).json(request)).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, GateError> {
        let url = self.endpoint(LOGIN_PATH)?;
        self.send("login", self.http.post(url).json(request)).await
    }
}

/// Validates the gate-service base URL and normalizes it to end with `/`.
///
/// Remote hosts must use HTTPS. Loopback hosts (`localhost`, `127.0.0.1`,
/// `::1`) may use plain HTTP for local development.
///
/// # Errors
/// Returns [`GateError::InvalidEndpoint`] for unparseable URLs, unsupported
/// schemes, or URLs carrying a query or fragment.
pub fn validate_gate_endpoint(endpoint: &str) -> Result<Url, GateError> {
    let mut parsed = Url::parse(endpoint.trim())
        .map_err(|error| GateError::InvalidEndpoint(format!("invalid gate url: {error}")))?;

    let loopback = match parsed.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(address)) => address.is_loopback(),
        Some(url::Host::Ipv6(address)) => address.is_loopback(),
        None => false,
    };

    match parsed.scheme() {
        "https" => {}
        "http" if loopback => {}
        _ => {
            return Err(GateError::InvalidEndpoint(
                "gate endpoint must use https".to_string(),
            ));
        }
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(GateError::InvalidEndpoint(
            "gate endpoint must not carry a query or fragment".to_string(),
        ));
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    //! Unit tests for endpoint policy.

    use super::*;

    #[test]
    fn validates_expected_endpoint_policy() {
        validate_gate_endpoint("https://gate.example.test").expect("https should pass");
        validate_gate_endpoint("http://127.0.0.1:8080").expect("loopback http should pass");
        assert!(validate_gate_endpoint("http://gate.example.test").is_err());
        assert!(validate_gate_endpoint("https://gate.example.test/?x=1").is_err());
    }

    #[test]
    fn base_path_is_kept_when_joining() {
        let base = validate_gate_endpoint("https://gate.example.test/api")
            .expect("endpoint should pass");
        let joined = base.join(CREATE_PATH).expect("join should work");
        assert_eq!(joined.as_str(), "https://gate.example.test/api/gate/create");
    }
}
