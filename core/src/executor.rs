//! Transport executors: the components performing the literal network
//! exchange.
//!
//! # Design
//! `Executor` is the single seam between the request pipeline and the
//! network. An executor never interprets status codes; a 404 with a JSON
//! body is a successful exchange at this layer. Only failures to complete
//! the exchange (connect, DNS, TLS, timeouts) are reported as
//! `TransportError`.

use std::time::Duration;

use tracing::trace;

use crate::config::ClientConfig;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, TransportError};

/// Performs one blocking HTTP round trip.
pub trait Executor: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking executor backed by a `ureq` agent.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses come back as data and the pipeline decides what they mean.
pub struct UreqExecutor {
    agent: ureq::Agent,
    connect_timeout: Duration,
    timeout: Duration,
}

impl UreqExecutor {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(connect_timeout))
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            connect_timeout,
            timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.connect_timeout(), config.timeout())
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for UreqExecutor {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl std::fmt::Debug for UreqExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqExecutor")
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Executor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers).call(),
            HttpMethod::Delete => {
                let builder = with_headers(self.agent.delete(url), &request.headers);
                match body {
                    Some(body) => builder.force_send_body().send(body),
                    None => builder.call(),
                }
            }
            HttpMethod::Post => send(with_headers(self.agent.post(url), &request.headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(url), &request.headers), body),
            HttpMethod::Patch => send(with_headers(self.agent.patch(url), &request.headers), body),
        };

        let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| TransportError::new(e.to_string()).with_status(status))?;

        trace!(status, bytes = body.len(), "ureq exchange complete");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body),
        None => builder.send_empty(),
    }
}
