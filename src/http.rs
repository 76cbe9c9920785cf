//! Blocking HTTP transport used by the release resolver and the downloader
//!
//! Redirects are never followed here: callers see every 3xx response and
//! decide for themselves. The resolver treats them as failures, the
//! downloader walks them.

use crate::config::schema::NetworkConfig;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use ureq::Agent;
use url::Url;

/// A transport-level failure (DNS, connect, TLS, timeout)
#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<ureq::Error> for TransportError {
    fn from(e: ureq::Error) -> Self {
        Self(e.to_string())
    }
}

/// A single GET request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Whole-call budget, on top of the client's connect timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Status line, redirect target and a streaming body
pub struct HttpResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Minimal HTTP client seam so the network stages can be exercised offline
pub trait HttpClient: Send + Sync {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `ureq`-backed client
pub struct UreqClient {
    agent: Agent,
    user_agent: String,
}

impl UreqClient {
    /// Build a client that identifies itself as `user_agent`
    pub fn new(network: &NetworkConfig, user_agent: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .timeout_connect(Some(network.connect_timeout()))
            .build()
            .into();

        Self {
            agent,
            user_agent: user_agent.into(),
        }
    }
}

impl HttpClient for UreqClient {
    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .agent
            .get(&request.url)
            .header("User-Agent", self.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.config().timeout_global(Some(timeout)).build();
        }

        let response = builder.call()?;
        let (parts, body) = response.into_parts();

        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Ok(HttpResponse {
            status: parts.status.as_u16(),
            location: header("location"),
            content_length: header("content-length").and_then(|v| v.parse().ok()),
            body: Box::new(body.into_reader()),
        })
    }
}

/// Resolve a `Location` header against the URL that produced it
pub fn resolve_location(base: &str, location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    let base = Url::parse(base).ok()?;
    base.join(location).ok().map(String::from)
}
