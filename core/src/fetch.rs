//! Executing requests.
//!
//! # Design
//! `Transport` is the seam between the sans-IO core and the network. The
//! blocking `UreqTransport` is what Rust hosts and the integration tests
//! use; native hosts execute requests themselves and never link it in at
//! runtime. `fetch_body` applies the fetch policy on top of any transport:
//! one attempt, only a 200 counts, failures are logged and become `None`.

use std::time::Duration;

use tracing::{debug, error};

use crate::config::SearchConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one `HttpRequest`.
///
/// Non-2xx statuses are returned as data; `Err` means no response was
/// received at all.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking HTTP transport with connect and read timeouts.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(connect_timeout))
            .timeout_recv_response(Some(read_timeout))
            .timeout_recv_body(Some(read_timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.connect_timeout(), config.read_timeout())
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.agent.get(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder
            .call()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Fetch the body of `request`, or `None` when there is nothing usable.
///
/// A missing request short-circuits without touching the network.
pub fn fetch_body(transport: &dyn Transport, request: Option<&HttpRequest>) -> Option<String> {
    let Some(request) = request else {
        debug!("no request URL, skipping fetch");
        return None;
    };

    match transport.execute(request) {
        Ok(response) if response.status == 200 => Some(response.body),
        Ok(response) => {
            error!(url = %request.url, status = response.status, "error response code");
            None
        }
        Err(err) => {
            error!(url = %request.url, "problem retrieving the volumes response: {err}");
            None
        }
    }
}
