use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;

/// Diagnostic record of one completed call.
#[derive(Clone, Debug, PartialEq)]
pub struct CallTrace {
    /// HTTP method label, for example `GET`.
    pub label: String,
    pub url: String,
    pub status: StatusCode,
    pub reason: String,
    pub raw_body: String,
    /// Decoded body, `None` when decoding failed.
    pub decoded: Option<Value>,
}

/// Receives a [`CallTrace`] for every call made by a
/// [`crate::ResourceClient`].
pub trait TraceSink: fmt::Debug + Send + Sync {
    fn record(&self, trace: &CallTrace);
}

impl<T: TraceSink + ?Sized> TraceSink for Arc<T> {
    fn record(&self, trace: &CallTrace) {
        (**self).record(trace);
    }
}

/// Emits traces as `tracing` events.
///
/// Status lines are logged at `INFO`; bodies only at `DEBUG`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&self, trace: &CallTrace) {
        tracing::info!(
            method = %trace.label,
            url = %trace.url,
            status = trace.status.as_u16(),
            reason = %trace.reason,
            "call finished"
        );
        tracing::debug!(method = %trace.label, body = %trace.raw_body, "raw response body");
        match &trace.decoded {
            Some(decoded) => tracing::debug!(method = %trace.label, %decoded, "decoded response body"),
            None => tracing::debug!(method = %trace.label, "response body is not valid JSON"),
        }
    }
}

/// Discards every trace.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn record(&self, _trace: &CallTrace) {}
}
