use std::fmt;
use std::sync::Arc;

use reqwest::{Method, Url};
use serde_json::Value;

use crate::ClientError;
use crate::retry::{Acceptance, RetryPolicy};
use crate::trace::{CallTrace, TraceSink, TracingSink};
use crate::transport::{HttpTransport, Request, Transport};

/// Identifies one resource inside an endpoint's collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Name(String),
    Number(i64),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::Name(value.to_owned())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ResourceId {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for ResourceId {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

/// Blocking JSON client for endpoint-oriented REST resources.
///
/// URLs are built as `{base}/{endpoint}[/{id}]`. Every call goes through the
/// client's [`RetryPolicy`] and reports a [`CallTrace`] to its sink.
#[derive(Clone, Debug)]
pub struct ResourceClient<T = HttpTransport> {
    base_url: Url,
    transport: T,
    retry: RetryPolicy,
    sink: Arc<dyn TraceSink>,
}

const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceClient>();
};

impl ResourceClient {
    /// Creates a client that talks HTTP through a default [`HttpTransport`].
    ///
    /// The URL is normalized to include a trailing slash, so relative endpoint
    /// paths join correctly.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Self::with_transport(base_url, HttpTransport::new())
    }
}

impl<T: Transport> ResourceClient<T> {
    /// Creates a client that sends requests through `transport`.
    pub fn with_transport(base_url: impl AsRef<str>, transport: T) -> Result<Self, ClientError> {
        let invalid = || ClientError::InvalidBaseUrl(base_url.as_ref().to_owned());
        let parsed = Url::parse(base_url.as_ref()).map_err(|_| invalid())?;
        if parsed.cannot_be_a_base() {
            return Err(invalid());
        }

        Ok(Self {
            base_url: ensure_trailing_slash(parsed),
            transport,
            retry: RetryPolicy::default(),
            sink: Arc::new(TracingSink),
        })
    }

    /// Replaces the default [`RetryPolicy`].
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the default [`TracingSink`].
    #[must_use]
    pub fn with_trace_sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Returns the normalized base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the policy applied to every call.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Sends a `GET` and decodes the response as JSON.
    pub fn get(&self, endpoint: &str, id: Option<ResourceId>) -> Result<Value, ClientError> {
        self.get_with(endpoint, id, Acceptance::Success)
    }

    /// Sends a `GET`, letting `acceptance` decide which response is final.
    ///
    /// With [`Acceptance::AnyStatus`] the body of an error response is
    /// decoded and returned as-is.
    pub fn get_with(
        &self,
        endpoint: &str,
        id: Option<ResourceId>,
        acceptance: Acceptance,
    ) -> Result<Value, ClientError> {
        self.request(Method::GET, endpoint, id, None, acceptance)
    }

    /// Sends a `POST` with an optional JSON body and decodes the response.
    pub fn post(
        &self,
        endpoint: &str,
        id: Option<ResourceId>,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        self.request(Method::POST, endpoint, id, body, Acceptance::Success)
    }

    /// Sends a `DELETE` for one resource and decodes the response.
    pub fn delete(&self, endpoint: &str, id: impl Into<ResourceId>) -> Result<Value, ClientError> {
        self.request(
            Method::DELETE,
            endpoint,
            Some(id.into()),
            None,
            Acceptance::Success,
        )
    }

    /// Sends a request and decodes the final response as JSON.
    ///
    /// Returns [`Value::Null`] for an empty body and
    /// [`ClientError::Decode`] for a body that is not JSON. The final
    /// response is traced even when the retry policy rejects it.
    pub fn request(
        &self,
        method: Method,
        endpoint: &str,
        id: Option<ResourceId>,
        body: Option<Value>,
        acceptance: Acceptance,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint_url(endpoint, id.as_ref())?;
        let request = Request::new(method, url).with_body(body);
        let (response, rejected) = self.retry.run(&self.transport, &request, acceptance)?;
        let decoded = response.json();

        self.sink.record(&CallTrace {
            label: request.method.to_string(),
            url: response.url,
            status: response.status,
            reason: response.reason,
            raw_body: response.text,
            decoded: decoded.as_ref().ok().cloned(),
        });

        match rejected {
            Some(error) => Err(error),
            None => decoded,
        }
    }

    /// Builds `{base}/{endpoint}[/{id}]`.
    ///
    /// The identifier is percent-encoded as a single path segment. Endpoints
    /// that are empty or resolve outside the base URL are rejected.
    pub fn endpoint_url(&self, endpoint: &str, id: Option<&ResourceId>) -> Result<Url, ClientError> {
        let invalid = || ClientError::InvalidPath(endpoint.to_owned());
        let relative = endpoint.trim_matches('/');
        if relative.is_empty() {
            return Err(invalid());
        }

        let mut url = self.base_url.join(relative).map_err(|_| invalid())?;
        if !url.as_str().starts_with(self.base_url.as_str()) {
            return Err(invalid());
        }

        if let Some(id) = id {
            let segment = id.to_string();
            if segment.is_empty() {
                return Err(invalid());
            }
            url.path_segments_mut()
                .map_err(|()| invalid())?
                .pop_if_empty()
                .push(&segment);
        }

        Ok(url)
    }
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_owned();
        path.push('/');
        url.set_path(&path);
    }
    url
}
