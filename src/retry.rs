//! Bounded retry loop around a [`Transport`].
//!
//! A call ends on the first response when the caller accepts any status,
//! on a success status, on a status the policy does not retry, when the
//! attempt budget runs out, when the deadline would be passed, or on a
//! transport error. Transport errors are never retried.

use std::thread;
use std::time::{Duration, Instant};

use reqwest::StatusCode;

use crate::ClientError;
use crate::transport::{Request, Response, Transport};

/// Default number of attempts per call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Statuses retried by the default policy.
pub const DEFAULT_RETRY_STATUSES: [StatusCode; 6] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Which response ends a call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Acceptance {
    /// Only a success status ends the call; other statuses are retried or
    /// reported according to the policy.
    #[default]
    Success,
    /// The first response ends the call whatever its status. Use this when
    /// an error status is the outcome under test.
    AnyStatus,
}

/// Statuses counted as success.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuccessStatus {
    /// Any `2xx` status.
    #[default]
    AnyOf2xx,
    /// Exactly one status code.
    Exactly(StatusCode),
}

impl SuccessStatus {
    /// Returns `true` when `status` counts as success.
    pub fn matches(self, status: StatusCode) -> bool {
        match self {
            Self::AnyOf2xx => status.is_success(),
            Self::Exactly(expected) => status == expected,
        }
    }
}

/// Unsuccessful statuses that trigger another attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryOn {
    /// Only the listed statuses; anything else is terminal.
    Statuses(Vec<StatusCode>),
    /// Every unsuccessful status.
    AnyFailure,
}

impl Default for RetryOn {
    fn default() -> Self {
        Self::Statuses(DEFAULT_RETRY_STATUSES.to_vec())
    }
}

impl RetryOn {
    /// Returns `true` when `status` should be retried.
    pub fn matches(&self, status: StatusCode) -> bool {
        match self {
            Self::Statuses(statuses) => statuses.contains(&status),
            Self::AnyFailure => true,
        }
    }
}

/// Exponential backoff schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
}

impl Backoff {
    /// Retry immediately.
    pub const fn none() -> Self {
        Self {
            initial: Duration::ZERO,
            multiplier: 1.0,
            max: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        if secs.is_nan() || secs <= 0.0 {
            Duration::ZERO
        } else if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            multiplier: 2.0,
            max: Duration::from_secs(5),
        }
    }
}

/// Decides when a call is finished and how long to wait between attempts.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    success: SuccessStatus,
    retry_on: RetryOn,
    deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
            success: SuccessStatus::default(),
            retry_on: RetryOn::default(),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Starts a builder from the default policy.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            policy: Self::default(),
        }
    }

    /// Polls until the service answers exactly `200 OK`, retrying every
    /// other status without delay, for at most `max_attempts` attempts.
    pub fn until_ok(max_attempts: u32) -> Result<Self, ClientError> {
        Self::builder()
            .max_attempts(max_attempts)
            .success(SuccessStatus::Exactly(StatusCode::OK))
            .retry_on(RetryOn::AnyFailure)
            .backoff(Backoff::none())
            .build()
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Total attempts per call, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay schedule between attempts.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Statuses that end a call successfully.
    pub fn success(&self) -> SuccessStatus {
        self.success
    }

    /// Unsuccessful statuses that are retried.
    pub fn retry_on(&self) -> &RetryOn {
        &self.retry_on
    }

    /// Bound on the total time spent in one call, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Runs `request` through `transport` until a terminal condition holds.
    pub fn execute<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: &Request,
        acceptance: Acceptance,
    ) -> Result<Response, ClientError> {
        match self.run(transport, request, acceptance)? {
            (response, None) => Ok(response),
            (_, Some(error)) => Err(error),
        }
    }

    /// Like [`Self::execute`], but also hands back the final response when
    /// the policy rejects it.
    ///
    /// The outer `Err` is a transport failure, for which no response exists.
    pub(crate) fn run<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: &Request,
        acceptance: Acceptance,
    ) -> Result<(Response, Option<ClientError>), ClientError> {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt,
                "sending request"
            );

            let response = transport.perform(request)?;

            if acceptance == Acceptance::AnyStatus || self.success.matches(response.status) {
                return Ok((response, None));
            }

            if !self.retry_on.matches(response.status) {
                let error = ClientError::UnexpectedStatus {
                    status: response.status,
                    url: response.url.clone(),
                    body: response.text.clone(),
                };
                return Ok((response, Some(error)));
            }

            if attempt >= self.max_attempts {
                let error = ClientError::RetriesExhausted {
                    attempts: attempt,
                    status: response.status,
                    url: response.url.clone(),
                    body: response.text.clone(),
                };
                return Ok((response, Some(error)));
            }

            let delay = self.backoff.delay(attempt);
            if let Some(deadline) = self.deadline {
                let elapsed = started.elapsed();
                if elapsed + delay > deadline {
                    let error = ClientError::DeadlineExceeded {
                        attempts: attempt,
                        elapsed,
                        last_status: response.status,
                    };
                    return Ok((response, Some(error)));
                }
            }

            tracing::warn!(
                method = %request.method,
                url = %request.url,
                status = response.status.as_u16(),
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "retrying request"
            );
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }
}

/// Builder for [`RetryPolicy`], starting from the defaults.
#[derive(Clone, Debug)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Total attempts per call, including the first. Must be at least 1.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    /// Delay schedule between attempts.
    #[must_use]
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.policy.backoff = backoff;
        self
    }

    /// Statuses that end a call successfully.
    #[must_use]
    pub fn success(mut self, success: SuccessStatus) -> Self {
        self.policy.success = success;
        self
    }

    /// Unsuccessful statuses that trigger another attempt.
    #[must_use]
    pub fn retry_on(mut self, retry_on: RetryOn) -> Self {
        self.policy.retry_on = retry_on;
        self
    }

    /// Upper bound on the total time spent in one call, checked before
    /// each backoff sleep.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.policy.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> Result<RetryPolicy, ClientError> {
        let policy = self.policy;
        if policy.max_attempts == 0 {
            return Err(ClientError::InvalidRetryPolicy(
                "max_attempts must be at least 1".to_owned(),
            ));
        }
        if !policy.backoff.multiplier.is_finite() || policy.backoff.multiplier < 1.0 {
            return Err(ClientError::InvalidRetryPolicy(format!(
                "backoff multiplier must be a finite value >= 1.0, got {}",
                policy.backoff.multiplier
            )));
        }
        if policy.backoff.initial > policy.backoff.max {
            return Err(ClientError::InvalidRetryPolicy(
                "initial backoff exceeds maximum backoff".to_owned(),
            ));
        }
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{Method, StatusCode, Url};

    use super::{Acceptance, Backoff, RetryOn, RetryPolicy, SuccessStatus};
    use crate::ClientError;
    use crate::testing::ScriptedTransport;
    use crate::transport::Request;

    fn request() -> Request {
        Request::new(
            Method::GET,
            Url::parse("https://example.com/v2/user/johndoe").expect("valid url"),
        )
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::builder()
            .backoff(Backoff::none())
            .build()
            .expect("valid policy")
    }

    #[test]
    fn returns_first_success_without_extra_attempts() {
        let transport = ScriptedTransport::new().respond(200, "{}").respond(200, "{}");
        let response = fast_policy()
            .execute(&transport, &request(), Acceptance::Success)
            .expect("success");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn retries_server_errors_until_ok() {
        let transport = ScriptedTransport::new()
            .respond(500, "oops")
            .respond(500, "oops")
            .respond(200, r#"{"ok":true}"#);
        let response = fast_policy()
            .execute(&transport, &request(), Acceptance::Success)
            .expect("eventually ok");
        assert_eq!(transport.calls(), 3);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text, r#"{"ok":true}"#);
    }

    #[test]
    fn until_ok_retries_every_failure() {
        let transport = ScriptedTransport::new()
            .respond(404, "")
            .respond(500, "")
            .respond(200, "{}");
        let policy = RetryPolicy::until_ok(10).expect("valid policy");
        policy
            .execute(&transport, &request(), Acceptance::Success)
            .expect("eventually ok");
        assert_eq!(transport.calls(), 3);
    }

    #[test]
    fn until_ok_does_not_accept_other_2xx() {
        let transport = ScriptedTransport::new().respond(201, "{}").respond(200, "{}");
        let policy = RetryPolicy::until_ok(3).expect("valid policy");
        let response = policy
            .execute(&transport, &request(), Acceptance::Success)
            .expect("ok");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn default_policy_accepts_created() {
        let transport = ScriptedTransport::new().respond(201, "{}");
        let response = fast_policy()
            .execute(&transport, &request(), Acceptance::Success)
            .expect("created is success");
        assert_eq!(response.status, StatusCode::CREATED);
    }

    #[test]
    fn any_status_returns_first_response() {
        let transport = ScriptedTransport::new().respond(404, "missing").respond(200, "{}");
        let response = fast_policy()
            .execute(&transport, &request(), Acceptance::AnyStatus)
            .expect("first response");
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn terminal_status_fails_after_one_attempt() {
        let transport = ScriptedTransport::new().respond(404, "missing");
        let error = fast_policy()
            .execute(&transport, &request(), Acceptance::Success)
            .expect_err("404 is terminal");
        assert_eq!(transport.calls(), 1);
        match error {
            ClientError::UnexpectedStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exhausts_attempts_on_persistent_retryable_status() {
        let transport = ScriptedTransport::new().respond_always(503, "busy");
        let policy = RetryPolicy::builder()
            .max_attempts(4)
            .backoff(Backoff::none())
            .build()
            .expect("valid policy");
        let error = policy
            .execute(&transport, &request(), Acceptance::Success)
            .expect_err("never succeeds");
        assert_eq!(transport.calls(), 4);
        assert!(matches!(
            error,
            ClientError::RetriesExhausted { attempts: 4, status, .. }
                if status == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[test]
    fn transport_errors_are_not_retried() {
        let transport = ScriptedTransport::new().fail_connect().respond(200, "{}");
        let error = fast_policy()
            .execute(&transport, &request(), Acceptance::Success)
            .expect_err("connection refused");
        assert!(matches!(error, ClientError::Transport(_)));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn deadline_stops_before_sleeping_past_it() {
        let transport = ScriptedTransport::new().respond_always(500, "");
        let policy = RetryPolicy::builder()
            .backoff(Backoff {
                initial: Duration::from_secs(60),
                multiplier: 2.0,
                max: Duration::from_secs(60),
            })
            .deadline(Duration::from_secs(1))
            .build()
            .expect("valid policy");
        let error = policy
            .execute(&transport, &request(), Acceptance::Success)
            .expect_err("deadline");
        assert_eq!(transport.calls(), 1);
        assert!(matches!(error, ClientError::DeadlineExceeded { attempts: 1, .. }));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let backoff = Backoff {
            initial: Duration::from_millis(100),
            multiplier: 2.0,
            max: Duration::from_millis(350),
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(350));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_millis(350));
        assert_eq!(Backoff::none().delay(7), Duration::ZERO);
    }

    #[test]
    fn backoff_never_goes_negative() {
        let shrinking = Backoff {
            initial: Duration::from_secs(1),
            multiplier: -2.0,
            max: Duration::from_secs(10),
        };
        assert_eq!(shrinking.delay(2), Duration::ZERO);
        assert_eq!(shrinking.delay(3), Duration::from_secs(4));

        let not_a_number = Backoff {
            multiplier: f64::NAN,
            ..shrinking
        };
        assert_eq!(not_a_number.delay(2), Duration::ZERO);
    }

    #[test]
    fn run_keeps_rejected_response() {
        let transport = ScriptedTransport::new().respond(404, "missing");
        let (response, error) = fast_policy()
            .run(&transport, &request(), Acceptance::Success)
            .expect("a response arrived");
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.text, "missing");
        assert!(matches!(error, Some(ClientError::UnexpectedStatus { .. })));
    }

    #[test]
    fn builder_rejects_zero_attempts_and_shrinking_backoff() {
        let zero = RetryPolicy::builder().max_attempts(0).build();
        assert!(matches!(zero, Err(ClientError::InvalidRetryPolicy(_))));

        let shrinking = RetryPolicy::builder()
            .backoff(Backoff {
                initial: Duration::from_millis(10),
                multiplier: 0.5,
                max: Duration::from_secs(1),
            })
            .build();
        assert!(matches!(shrinking, Err(ClientError::InvalidRetryPolicy(_))));
    }

    #[test]
    fn no_retry_makes_one_attempt() {
        let transport = ScriptedTransport::new().respond_always(500, "");
        let error = RetryPolicy::no_retry()
            .execute(&transport, &request(), Acceptance::Success)
            .expect_err("single attempt");
        assert_eq!(transport.calls(), 1);
        assert!(matches!(error, ClientError::RetriesExhausted { attempts: 1, .. }));
    }

    #[test]
    fn classification_helpers() {
        assert!(SuccessStatus::AnyOf2xx.matches(StatusCode::NO_CONTENT));
        assert!(!SuccessStatus::Exactly(StatusCode::OK).matches(StatusCode::CREATED));
        assert!(RetryOn::default().matches(StatusCode::TOO_MANY_REQUESTS));
        assert!(!RetryOn::default().matches(StatusCode::BAD_REQUEST));
        assert!(RetryOn::AnyFailure.matches(StatusCode::BAD_REQUEST));
    }
}
