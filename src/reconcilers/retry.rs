// SPDX-License-Identifier: Apache-2.0

//! Retry logic with exponential backoff.
//!
//! Transient Kubernetes API errors (429, 5xx, connection errors) and
//! transient function-runner gRPC errors (`Unavailable`, `DeadlineExceeded`,
//! `ResourceExhausted`) are retried with backoff; everything else fails
//! fast. Operation pipeline retries (spec.md I5) are a separate, bounded
//! concern handled by the Operation Reconciler itself — this module only
//! covers retrying the individual API/RPC calls beneath it.

use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;
use tracing::{debug, error, warn};

const MAX_ELAPSED_TIME_SECS: u64 = 300;
const INITIAL_INTERVAL_MILLIS: u64 = 100;
const MAX_INTERVAL_SECS: u64 = 30;
const BACKOFF_MULTIPLIER: f64 = 2.0;
const RANDOMIZATION_FACTOR: f64 = 0.1;

const GRPC_INITIAL_INTERVAL_MILLIS: u64 = 50;
const GRPC_MAX_INTERVAL_SECS: u64 = 10;
const GRPC_MAX_ELAPSED_TIME_SECS: u64 = 60;

/// Exponential backoff with jitter, to avoid a thundering herd of retries
/// against the API server or a function endpoint.
pub struct ExponentialBackoff {
    pub current_interval: Duration,
    #[allow(dead_code)]
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Option<Duration>,
    pub multiplier: f64,
    pub randomization_factor: f64,
    start_time: Instant,
}

impl ExponentialBackoff {
    fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Next interval to wait, or `None` if `max_elapsed_time` has passed.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let min = secs - delta;
        let max = secs + delta;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range(min..=max);

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff schedule for Kubernetes API retries: 100ms .. 30s, capped at 5
/// minutes total.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Backoff schedule for function-runner gRPC retries: 50ms .. 10s, capped
/// at 1 minute total. Shorter than the Kubernetes schedule since a
/// function call that can't recover quickly should surface to the
/// Operation Reconciler's own retry-limit bookkeeping instead.
#[must_use]
pub fn grpc_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(GRPC_INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(GRPC_MAX_INTERVAL_SECS),
        Some(Duration::from_secs(GRPC_MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Retry a Kubernetes API call with exponential backoff, retrying on 429,
/// 5xx, and service errors and failing fast on everything else.
///
/// # Errors
/// Returns the final error once the call is non-retryable, the backoff is
/// exhausted, or `max_elapsed_time` has passed.
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, elapsed = ?start_time.elapsed(), "Kubernetes API call succeeded after retries");
                } else {
                    debug!(operation = operation_name, "Kubernetes API call succeeded");
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable_kube_error(&e) {
                    error!(operation = operation_name, error = %e, "non-retryable Kubernetes API error, failing immediately");
                    return Err(e.into());
                }

                if let Some(max_elapsed) = backoff.max_elapsed_time {
                    if start_time.elapsed() >= max_elapsed {
                        error!(operation = operation_name, attempt, elapsed = ?start_time.elapsed(), error = %e, "max retry time exceeded, giving up");
                        return Err(anyhow::anyhow!("max retry time exceeded after {attempt} attempts: {e}"));
                    }
                }

                if let Some(duration) = backoff.next_backoff() {
                    warn!(operation = operation_name, attempt, retry_after = ?duration, error = %e, "retryable Kubernetes API error, will retry");
                    tokio::time::sleep(duration).await;
                } else {
                    error!(operation = operation_name, attempt, elapsed = ?start_time.elapsed(), error = %e, "backoff exhausted, giving up");
                    return Err(anyhow::anyhow!("backoff exhausted after {attempt} attempts: {e}"));
                }
            }
        }
    }
}

/// Retry a function-runner gRPC call with exponential backoff, retrying on
/// `Unavailable`, `DeadlineExceeded`, and `ResourceExhausted` statuses.
///
/// # Errors
/// Returns the final [`tonic::Status`] once the call is non-retryable or
/// the backoff is exhausted.
pub async fn retry_grpc_call<T, F, Fut>(mut operation: F, operation_name: &str) -> std::result::Result<T, tonic::Status>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, tonic::Status>>,
{
    let mut backoff = grpc_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(status) => {
                if !is_retryable_grpc_status(&status) {
                    error!(operation = operation_name, error = %status, "non-retryable function-runner error, failing immediately");
                    return Err(status);
                }

                match backoff.next_backoff() {
                    Some(duration) => {
                        warn!(operation = operation_name, attempt, retry_after = ?duration, error = %status, "retryable function-runner error, will retry");
                        tokio::time::sleep(duration).await;
                    }
                    None => {
                        error!(operation = operation_name, attempt, elapsed = ?start_time.elapsed(), error = %status, "backoff exhausted, giving up");
                        return Err(status);
                    }
                }
            }
        }
    }
}

/// Retryable: 429, 5xx, and network/connection errors. Non-retryable:
/// other 4xx errors (not found, invalid, unauthorized).
fn is_retryable_kube_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => api_err.code == 429 || (500..600).contains(&api_err.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Retryable: codes that indicate the function endpoint is transiently
/// overloaded or unreachable, not that the request itself is invalid.
#[must_use]
pub fn is_retryable_grpc_status(status: &tonic::Status) -> bool {
    matches!(
        status.code(),
        tonic::Code::Unavailable | tonic::Code::DeadlineExceeded | tonic::Code::ResourceExhausted
    )
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
