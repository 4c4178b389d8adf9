//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use reqwest::StatusCode;

use crate::ClientError;
use crate::trace::{CallTrace, TraceSink};
use crate::transport::{Request, Response, Transport};

#[derive(Debug)]
enum Step {
    Respond(StatusCode, String),
    FailConnect,
}

/// Transport that replays a fixed script of responses and records every
/// request it receives.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Option<(StatusCode, String)>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, status: u16, body: &str) -> Self {
        self.push(Step::Respond(status_code(status), body.to_owned()));
        self
    }

    /// Answers with this response once the script is used up.
    pub(crate) fn respond_always(mut self, status: u16, body: &str) -> Self {
        self.fallback = Some((status_code(status), body.to_owned()));
        self
    }

    pub(crate) fn fail_connect(self) -> Self {
        self.push(Step::FailConnect);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn push(&self, step: Step) {
        self.script.lock().expect("script lock").push_back(step);
    }
}

impl Transport for ScriptedTransport {
    fn perform(&self, request: &Request) -> Result<Response, ClientError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let step = self.script.lock().expect("script lock").pop_front();
        let step = match (step, &self.fallback) {
            (Some(step), _) => step,
            (None, Some((status, body))) => Step::Respond(*status, body.clone()),
            (None, None) => panic!("scripted transport ran out of responses for {}", request.url),
        };

        match step {
            Step::Respond(status, body) => Ok(Response::new(status, request.url.as_str(), body)),
            Step::FailConnect => Err(ClientError::Transport(builder_error())),
        }
    }
}

/// Sink that keeps every trace for later assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    traces: Mutex<Vec<CallTrace>>,
}

impl RecordingSink {
    pub(crate) fn traces(&self) -> Vec<CallTrace> {
        self.traces.lock().expect("traces lock").clone()
    }
}

impl TraceSink for RecordingSink {
    fn record(&self, trace: &CallTrace) {
        self.traces.lock().expect("traces lock").push(trace.clone());
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).expect("valid status code")
}

// A `reqwest::Error` produced without touching the network.
fn builder_error() -> reqwest::Error {
    reqwest::blocking::Client::new()
        .get("not a url")
        .send()
        .expect_err("relative URL must be rejected")
}
