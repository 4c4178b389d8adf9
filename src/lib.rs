//! Blocking client library for the Swagger pet-store REST API.
//!
//! Public API layers:
//! - [`ResourceClient`]: generic endpoint/id JSON client with bounded retries.
//! - [`UserApi`]/[`StoreApi`]: typed calls for the `user` and `store` resources.
//! - [`RetryPolicy`]: decides which responses end a call and how long to wait
//!   between attempts.
//! - [`Transport`]/[`TraceSink`]: injectable HTTP and diagnostics seams.
//! - [`ClientError`]: unified error type used by all clients.

mod client;
mod error;
mod models;
mod retry;
mod store_api;
mod trace;
mod transport;
mod user_api;

#[cfg(test)]
mod testing;

/// Default base URL of the public pet-store service.
pub const DEFAULT_BASE_URL: &str = "https://petstore.swagger.io/v2";

/// Generic endpoint-oriented JSON client.
pub use client::{ResourceClient, ResourceId};
/// Error type returned by all client operations.
pub use error::ClientError;
pub use models::{ApiResponse, Inventory, Order, OrderStatus, User};
pub use retry::{
    Acceptance, Backoff, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_STATUSES, RetryOn, RetryPolicy,
    RetryPolicyBuilder, SuccessStatus,
};
/// Typed resource clients.
pub use store_api::StoreApi;
pub use trace::{CallTrace, NullSink, TraceSink, TracingSink};
pub use transport::{HttpTransport, HttpTransportBuilder, Request, Response, Transport};
pub use user_api::UserApi;

/// HTTP method and status types used in the public API.
pub use reqwest::{Method, StatusCode};
