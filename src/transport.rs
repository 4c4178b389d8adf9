use std::fmt;
use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use crate::ClientError;

/// One HTTP request, built fresh for every attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    /// JSON payload, sent as `application/json` when present.
    pub body: Option<Value>,
}

impl Request {
    /// Creates a request without a body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    /// Sets or clears the JSON payload.
    #[must_use]
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }
}

/// A fully read HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    /// Reason phrase for `status`, empty when the code has none.
    pub reason: String,
    /// Final URL after redirects.
    pub url: String,
    pub text: String,
}

impl Response {
    /// Builds a response, filling the reason phrase from the status code.
    pub fn new(status: StatusCode, url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            url: url.into(),
            text: text.into(),
        }
    }

    /// Decodes the body as JSON.
    ///
    /// Returns [`Value::Null`] for an empty body.
    pub fn json(&self) -> Result<Value, ClientError> {
        if self.text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&self.text)?)
        }
    }
}

/// Performs single HTTP round-trips.
///
/// Implementations must not interpret status codes; a 4xx or 5xx
/// response is still `Ok`. Only network-level failures are errors.
pub trait Transport: fmt::Debug {
    fn perform(&self, request: &Request) -> Result<Response, ClientError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn perform(&self, request: &Request) -> Result<Response, ClientError> {
        (**self).perform(request)
    }
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport with `reqwest` defaults.
    pub fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Starts a builder for a configured transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn perform(&self, request: &Request) -> Result<Response, ClientError> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(json_body) = &request.body {
            builder = builder.json(json_body);
        }

        let response = builder.send()?;
        let status = response.status();
        let url = response.url().to_string();
        let text = response.text()?;

        Ok(Response::new(status, url, text))
    }
}

/// Builder for [`HttpTransport`].
#[derive(Clone, Debug, Default)]
pub struct HttpTransportBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpTransportBuilder {
    /// Per-request timeout covering connect through body read.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the default `petstore-client/<version>` user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the underlying `reqwest` client.
    pub fn build(self) -> Result<HttpTransport, ClientError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| concat!("petstore-client/", env!("CARGO_PKG_VERSION")).to_owned());
        builder = builder.user_agent(user_agent);

        Ok(HttpTransport {
            http: builder.build()?,
        })
    }
}
