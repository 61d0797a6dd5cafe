use std::{future::Future, time::Duration};

use reqwest::{Response, StatusCode};

use crate::{Error, Result};
use sift_config::RetryConfig;

const RETRYABLE_STATUSES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
	/// Names the upstream in logs and in the exhaustion error.
	pub label: String,
	/// Total attempts, including the first one.
	pub retries: u32,
	pub initial_delay: Duration,
	pub backoff_factor: f64,
}
impl RetryPolicy {
	pub fn from_config(label: impl Into<String>, cfg: &RetryConfig) -> Self {
		Self {
			label: label.into(),
			retries: cfg.retries,
			initial_delay: Duration::from_millis(cfg.initial_backoff_ms),
			backoff_factor: cfg.backoff_factor,
		}
	}

	/// Delay slept after the failed `attempt` (1-based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
		let millis = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);

		if !millis.is_finite() || millis <= 0.0 {
			return Duration::ZERO;
		}

		Duration::from_millis(millis.min(u64::MAX as f64) as u64)
	}
}

pub fn is_retryable_status(status: StatusCode) -> bool {
	RETRYABLE_STATUSES.contains(&status.as_u16())
}

/// Races `request` against a timer. On expiry the request future is dropped, which
/// aborts the in-flight transport call.
pub async fn fetch_with_timeout<F, T>(timeout: Duration, request: F) -> Result<T>
where
	F: Future<Output = reqwest::Result<T>>,
{
	match tokio::time::timeout(timeout, request).await {
		Ok(result) => Ok(result?),
		Err(_) => Err(Error::Timeout { timeout_ms: timeout.as_millis() as u64 }),
	}
}

/// Runs `factory` until it yields a non-retryable outcome or `policy.retries` attempts
/// are spent.
///
/// Responses are returned as is, including error statuses; the last attempt's
/// response is returned even when its status is retryable. Network failures that
/// outlast every attempt surface as [`Error::Transient`].
pub async fn fetch_with_retry<F, Fut>(policy: &RetryPolicy, mut factory: F) -> Result<Response>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<Response>>,
{
	let attempts = policy.retries.max(1);
	let mut attempt = 1;

	loop {
		match factory().await {
			Ok(response) => {
				let status = response.status();

				if !is_retryable_status(status) || attempt >= attempts {
					return Ok(response);
				}

				let delay = policy.delay_for(attempt);

				tracing::warn!(
					label = %policy.label,
					status = status.as_u16(),
					attempt,
					delay_ms = delay.as_millis() as u64,
					"Retryable upstream status."
				);
				tokio::time::sleep(delay).await;
			},
			Err(err) if err.is_network() => {
				if attempt >= attempts {
					return Err(Error::Transient {
						label: policy.label.clone(),
						attempts,
						message: err.to_string(),
					});
				}

				let delay = policy.delay_for(attempt);

				tracing::warn!(
					label = %policy.label,
					error = %err,
					attempt,
					delay_ms = delay.as_millis() as u64,
					"Upstream request failed."
				);
				tokio::time::sleep(delay).await;
			},
			Err(err) => return Err(err),
		}

		attempt += 1;
	}
}
