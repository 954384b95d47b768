//! HTTP seam between [`RemoteClient`](crate::RemoteClient) and the network.
//!
//! The client only ever sees [`ApiRequest`] / [`ApiResponse`]; status
//! handling (429 cooldown, non-2xx failures) lives in the client so every
//! transport behaves the same.

use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use crate::error::RemoteError;

pub const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Patch,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing request. `body` is JSON when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn patch(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::Patch,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Status and raw body of a completed exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Sends requests to the remote API.
///
/// Implementations return `Ok` for every response that carries a status
/// code, including errors; `Err` is reserved for failures with no response.
pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError>;

    /// Drop pooled connections so the next request starts fresh.
    fn reconnect(&self) {}
}

/// Blocking transport over a `ureq` agent, authenticated with a static key.
pub struct UreqTransport {
    api_key: String,
    timeout: Duration,
    agent: RwLock<ureq::Agent>,
}

impl UreqTransport {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            timeout,
            agent: RwLock::new(build_agent(timeout)),
        }
    }

    fn agent(&self) -> ureq::Agent {
        match self.agent.read() {
            Ok(agent) => agent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
        let call = self
            .agent()
            .request(request.method.as_str(), &request.url)
            .set(API_KEY_HEADER, &self.api_key);

        let result = match &request.body {
            Some(body) => call
                .set("Content-Type", "application/json")
                .send_string(body),
            None => call.call(),
        };

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|err| RemoteError::Transport {
                        url: request.url.clone(),
                        message: format!("failed to read body: {err}"),
                    })?;
                Ok(ApiResponse { status, body })
            }
            Err(ureq::Error::Status(status, response)) => Ok(ApiResponse {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(err)) => Err(RemoteError::Transport {
                url: request.url.clone(),
                message: err.to_string(),
            }),
        }
    }

    fn reconnect(&self) {
        let fresh = build_agent(self.timeout);
        match self.agent.write() {
            Ok(mut agent) => *agent = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        tracing::debug!("http agent rebuilt");
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}
