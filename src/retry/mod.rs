//! Retry with exponential backoff for every remote call.
//!
//! [`execute`] wraps a single remote operation:
//!
//! 1. Waits for the service's minimum call interval ([`Pacer`]), even on the
//!    first attempt
//! 2. Runs the call
//! 3. On a transient failure, sleeps `base_delay * 2^(n-1)` (optionally
//!    jittered by up to ±20%) and tries again, up to `max_retries` times
//! 4. On a permanent failure, gives up immediately
//!
//! A definitive "no data" answer (`Ok(None)`) is returned straight away and
//! never retried. Callers always get a value back; nothing here panics or
//! aborts the batch.

mod pacer;

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

pub use pacer::Pacer;

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network trouble, server errors, rate limits
    Transient,
    /// Client errors, bad credentials, exhausted quota, malformed responses
    Permanent,
}

/// Errors from a remote data source or AI service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited - try again later")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request rejected (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl RemoteError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) | Self::Timeout | Self::RateLimited { .. } | Self::Server { .. } => {
                FailureKind::Transient
            }
            Self::Client { .. } | Self::Auth(_) | Self::QuotaExhausted(_) | Self::Parse(_) => {
                FailureKind::Permanent
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    /// Classify a non-success HTTP status.
    ///
    /// The body is truncated; some services echo the whole request back.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message: String = body.chars().take(200).collect();
        match status {
            401 | 403 => Self::Auth(format!("HTTP {}: {}", status, message)),
            402 => Self::QuotaExhausted(message),
            408 => Self::Timeout,
            429 => Self::RateLimited {
                retry_after_secs: None,
            },
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), &e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Retry budget and delay schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry
    pub base_delay: Duration,
    /// Randomize each delay by up to ±20%
    pub jitter: bool,
}

/// Maximum relative jitter applied to a delay.
const JITTER_FACTOR: f64 = 0.2;

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Un-jittered delay before retry `n` (1-based): `base * 2^(n-1)`.
    pub fn delay_for_retry(&self, n: u32) -> Duration {
        let exponent = n.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// The full un-jittered delay schedule, one entry per retry.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries)
            .map(|n| self.delay_for_retry(n))
            .collect()
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor = rand::rng().random_range(1.0 - JITTER_FACTOR..=1.0 + JITTER_FACTOR);
        delay.mul_f64(factor)
    }
}

/// Per-call bookkeeping, used for logging only.
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub operation: String,
    pub attempt: u32,
    pub next_delay: Option<Duration>,
}

impl RetryContext {
    fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            attempt: 0,
            next_delay: None,
        }
    }
}

/// A remote operation that did not produce an answer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{operation} failed after {attempts} attempt(s): {last}")]
pub struct RetryFailure {
    pub operation: String,
    pub attempts: u32,
    /// Last observed cause
    pub last: RemoteError,
}

impl RetryFailure {
    pub fn kind(&self) -> FailureKind {
        self.last.kind()
    }
}

/// Run `call` under `policy`, pacing attempts through `pacer`.
///
/// `operation` names the remote service; it keys the pacer and appears in
/// logs and in the returned failure.
pub async fn execute<T, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    pacer: &Pacer,
    mut call: F,
) -> Result<Option<T>, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, RemoteError>>,
{
    let mut ctx = RetryContext::new(operation);

    loop {
        pacer.wait(operation).await;
        ctx.attempt += 1;

        let error = match call().await {
            Ok(answer) => return Ok(answer),
            Err(e) => e,
        };

        if !error.is_transient() {
            debug!(
                "{} attempt {} failed permanently: {}",
                ctx.operation, ctx.attempt, error
            );
            return Err(RetryFailure {
                operation: ctx.operation,
                attempts: ctx.attempt,
                last: error,
            });
        }

        // attempt n failed; this is retry n
        if ctx.attempt > policy.max_retries {
            warn!(
                "{} gave up after {} attempts: {}",
                ctx.operation, ctx.attempt, error
            );
            return Err(RetryFailure {
                operation: ctx.operation,
                attempts: ctx.attempt,
                last: error,
            });
        }

        let mut delay = policy.jittered(policy.delay_for_retry(ctx.attempt));
        if let RemoteError::RateLimited {
            retry_after_secs: Some(secs),
        } = error
        {
            delay = delay.max(Duration::from_secs(secs));
        }
        ctx.next_delay = Some(delay);

        debug!(
            "{} attempt {} failed ({}), retrying in {:?}",
            ctx.operation, ctx.attempt, error, delay
        );
        tokio::time::sleep(delay).await;
    }
}
