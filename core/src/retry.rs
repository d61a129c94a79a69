//! Retry policy for client calls.
//!
//! # Design
//! `RetryPolicy::decide` is a pure function of the attempt number, the
//! request's idempotency and the error that ended the attempt. It never
//! sleeps or touches the transport; `SeeClient` owns the loop and does the
//! waiting. That keeps the policy testable without a network.

use std::time::Duration;

use rand::Rng;

use crate::error::{NetworkErrorKind, SeeError};

/// How to treat HTTP 429 responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitRetry {
    /// Surface 429 immediately.
    Never,
    /// Retry only when the server sent a `Retry-After` hint within
    /// `max_retry_after`, waiting exactly that long.
    #[default]
    HonorRetryAfter,
    /// Prefer the server hint; fall back to exponential backoff without one.
    RetryAfterOrBackoff,
}

/// Outcome of [`RetryPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of each backoff delay that may be randomly removed (0.0–1.0).
    pub jitter: f64,
    pub rate_limit: RateLimitRetry,
    /// Upper bound for honoring a server `Retry-After` hint.
    pub max_retry_after: Duration,
    /// Also retry POST requests on 5xx and timeouts.
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: 0.2,
            rate_limit: RateLimitRetry::default(),
            max_retry_after: Duration::from_secs(60),
            retry_non_idempotent: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_finite() { jitter.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitRetry) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_max_retry_after(mut self, bound: Duration) -> Self {
        self.max_retry_after = bound;
        self
    }

    pub fn with_retry_non_idempotent(mut self, enabled: bool) -> Self {
        self.retry_non_idempotent = enabled;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, attempt: u32, idempotent: bool, error: &SeeError) -> RetryDecision {
        if attempt >= self.attempts() {
            return RetryDecision::GiveUp;
        }

        match error {
            SeeError::RateLimited { retry_after, .. } => match (self.rate_limit, retry_after) {
                (RateLimitRetry::Never, _) => RetryDecision::GiveUp,
                (_, Some(hint)) if *hint <= self.max_retry_after => RetryDecision::Retry(*hint),
                (_, Some(_)) => RetryDecision::GiveUp,
                (RateLimitRetry::RetryAfterOrBackoff, None) => {
                    RetryDecision::Retry(self.backoff(attempt))
                }
                (RateLimitRetry::HonorRetryAfter, None) => RetryDecision::GiveUp,
            },
            // The request never reached the server, so even POST is safe to repeat.
            SeeError::Network {
                kind: NetworkErrorKind::Connect,
                ..
            } => RetryDecision::Retry(self.backoff(attempt)),
            err if err.is_transient() && (idempotent || self.retry_non_idempotent) => {
                RetryDecision::Retry(self.backoff(attempt))
            }
            _ => RetryDecision::GiveUp,
        }
    }

    /// Exponential delay before retry number `attempt`, without jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// `jitter` clamped to 0.0–1.0; NaN and infinities disable it.
    fn effective_jitter(&self) -> f64 {
        if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        let jitter = self.effective_jitter();
        if jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let cut = rand::rng().random_range(0.0..jitter);
        delay.mul_f64(1.0 - cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(0.0)
    }

    fn status(code: u16) -> SeeError {
        SeeError::from_response(&HttpResponse {
            status: code,
            headers: Vec::new(),
            body: String::new(),
        })
    }

    fn rate_limited(retry_after: Option<Duration>) -> SeeError {
        SeeError::RateLimited {
            message: "slow down".to_string(),
            status: Some(429),
            body: None,
            retry_after,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = policy().with_max_delay(Duration::from_millis(350));
        assert_eq!(p.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(p.backoff_delay(3), Duration::from_millis(350));
        assert_eq!(p.backoff_delay(40), Duration::from_millis(350));
    }

    #[test]
    fn retries_server_errors_on_idempotent_requests() {
        let p = policy();
        assert_eq!(p.decide(1, true, &status(500)), RetryDecision::Retry(Duration::from_millis(100)));
        assert_eq!(p.decide(2, true, &status(503)), RetryDecision::Retry(Duration::from_millis(200)));
        assert_eq!(p.decide(3, true, &status(503)), RetryDecision::GiveUp);
    }

    #[test]
    fn never_retries_client_errors() {
        let p = policy();
        for code in [400, 401, 403, 404, 409, 422] {
            assert_eq!(p.decide(1, true, &status(code)), RetryDecision::GiveUp, "HTTP {code}");
        }
        assert_eq!(p.decide(1, true, &SeeError::validation("bad")), RetryDecision::GiveUp);
    }

    #[test]
    fn post_retries_only_connect_failures_by_default() {
        let p = policy();
        let connect = SeeError::network(NetworkErrorKind::Connect, "refused", None);
        let timeout = SeeError::timeout(Duration::from_secs(1));
        assert!(matches!(p.decide(1, false, &connect), RetryDecision::Retry(_)));
        assert_eq!(p.decide(1, false, &timeout), RetryDecision::GiveUp);
        assert_eq!(p.decide(1, false, &status(502)), RetryDecision::GiveUp);

        let p = p.with_retry_non_idempotent(true);
        assert!(matches!(p.decide(1, false, &timeout), RetryDecision::Retry(_)));
        assert!(matches!(p.decide(1, false, &status(502)), RetryDecision::Retry(_)));
    }

    #[test]
    fn rate_limit_prefers_server_hint() {
        let p = policy();
        let hinted = rate_limited(Some(Duration::from_secs(2)));
        assert_eq!(p.decide(1, true, &hinted), RetryDecision::Retry(Duration::from_secs(2)));
        assert_eq!(p.decide(1, true, &rate_limited(None)), RetryDecision::GiveUp);

        let too_long = rate_limited(Some(Duration::from_secs(600)));
        assert_eq!(p.decide(1, true, &too_long), RetryDecision::GiveUp);

        let backoff = p.clone().with_rate_limit(RateLimitRetry::RetryAfterOrBackoff);
        assert_eq!(
            backoff.decide(1, true, &rate_limited(None)),
            RetryDecision::Retry(Duration::from_millis(100))
        );
        assert_eq!(backoff.decide(1, true, &hinted), RetryDecision::Retry(Duration::from_secs(2)));

        let never = p.with_rate_limit(RateLimitRetry::Never);
        assert_eq!(never.decide(1, true, &hinted), RetryDecision::GiveUp);
    }

    #[test]
    fn jitter_only_shortens_delay() {
        let p = policy().with_jitter(0.5);
        for _ in 0..50 {
            match p.decide(1, true, &status(500)) {
                RetryDecision::Retry(delay) => {
                    assert!(delay <= Duration::from_millis(100));
                    assert!(delay >= Duration::from_millis(50));
                }
                RetryDecision::GiveUp => panic!("expected retry"),
            }
        }
    }

    #[test]
    fn out_of_range_jitter_never_panics() {
        let timeout = SeeError::timeout(Duration::from_secs(1));
        for jitter in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.5, 3.0] {
            let mut p = policy();
            p.jitter = jitter;
            match p.decide(1, true, &timeout) {
                RetryDecision::Retry(delay) => assert!(delay <= Duration::from_millis(100), "jitter {jitter}"),
                RetryDecision::GiveUp => panic!("expected retry for jitter {jitter}"),
            }
        }

        let mut full = policy();
        full.jitter = 1.0;
        assert!(matches!(full.decide(1, true, &timeout), RetryDecision::Retry(_)));
    }

    #[test]
    fn envelope_code_outside_http_range_is_not_retried() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: r#"{"code":1001,"message":"quota exceeded"}"#.to_string(),
        };
        let err = SeeError::from_envelope(Some(1001), "quota exceeded".to_string(), &response);
        assert_eq!(policy().decide(1, true, &err), RetryDecision::GiveUp);

        let busy = SeeError::from_envelope(Some(503), "busy".to_string(), &response);
        assert!(matches!(policy().decide(1, true, &busy), RetryDecision::Retry(_)));
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        let p = RetryPolicy::none();
        assert_eq!(p.decide(1, true, &status(500)), RetryDecision::GiveUp);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).attempts(), 1);
    }
}
