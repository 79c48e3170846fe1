// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status-classified retry loop shared by the write path and cloud
//! augmentation.

use std::time::Duration;

use mnemo_config::model::RequestConfig;
use mnemo_core::types::ApiHost;
use mnemo_core::{CloudApi, MnemoError};
use serde_json::Value;
use tracing::warn;

/// Attempt count and exponential backoff base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub attempts: u32,
    /// Seconds slept after the first failed attempt; doubles each time.
    pub backoff_factor: f64,
}

/// Factor used when the configured one is zero, negative or not finite.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.0;

impl RetryPolicy {
    pub fn new(attempts: u32, backoff_factor: f64) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff_factor: if backoff_factor.is_finite() && backoff_factor > 0.0 {
                backoff_factor
            } else {
                DEFAULT_BACKOFF_FACTOR
            },
        }
    }

    pub fn from_config(config: &RequestConfig) -> Self {
        Self::new(config.num_backoff, config.backoff_factor)
    }

    /// Sleep after the zero-based `attempt` failed: `backoff_factor * 2^attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor * 2f64.powi(attempt.min(62) as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Why a retried post gave up.
#[derive(Debug)]
pub(crate) enum Exhausted {
    /// The last attempt failed at the transport level.
    Raised(MnemoError),
    /// Every attempt answered, none with an accepted status.
    Rejected { last_status: u16, attempts: u32 },
}

/// POSTs `body` until `accept` returns true for the answered status.
///
/// Unaccepted statuses and transport errors are both retried. No sleep
/// follows the last attempt.
pub(crate) async fn post_with_backoff<F>(
    cloud: &dyn CloudApi,
    host: ApiHost,
    route: &str,
    body: &Value,
    policy: RetryPolicy,
    accept: F,
) -> Result<u16, Exhausted>
where
    F: Fn(u16) -> bool,
{
    let mut last_error: Option<MnemoError> = None;
    let mut last_status: u16 = 0;

    for attempt in 0..policy.attempts {
        match cloud.post(host, route, body).await {
            Ok(status) if accept(status) => return Ok(status),
            Ok(status) => {
                warn!(route, attempt = attempt + 1, status, "cloud post not accepted");
                last_status = status;
                last_error = None;
            }
            Err(e) => {
                warn!(route, attempt = attempt + 1, error = %e, "cloud post failed");
                last_error = Some(e);
            }
        }

        if attempt + 1 < policy.attempts {
            tokio::time::sleep(policy.delay(attempt)).await;
        }
    }

    match last_error {
        Some(e) => Err(Exhausted::Raised(e)),
        None => Err(Exhausted::Rejected {
            last_status,
            attempts: policy.attempts,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_test_utils::{MockCloudApi, MockReply};
    use serde_json::json;

    #[test]
    fn policy_clamps_attempts_and_factor() {
        let policy = RetryPolicy::new(0, -2.0);
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.backoff_factor, 1.0);
        assert_eq!(RetryPolicy::new(3, f64::NAN).backoff_factor, 1.0);
        assert_eq!(RetryPolicy::new(3, 0.25).backoff_factor, 0.25);
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(5, 0.5);
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
    }

    #[test]
    fn policy_from_defaults() {
        let policy = RetryPolicy::from_config(&RequestConfig::default());
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.backoff_factor, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_on_last_attempt_is_raised() {
        let cloud = MockCloudApi::with_replies(vec![
            MockReply::Status(500),
            MockReply::TransportError("connection reset".into()),
        ]);
        let result = post_with_backoff(
            &cloud,
            ApiHost::Api,
            "r",
            &json!({}),
            RetryPolicy::new(2, 1.0),
            |s| s == 201,
        )
        .await;
        match result {
            Err(Exhausted::Raised(MnemoError::Transport { message, .. })) => {
                assert_eq!(message, "connection reset");
            }
            other => panic!("expected raised transport error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn soft_failure_after_transport_error_clears_it() {
        let cloud = MockCloudApi::with_replies(vec![
            MockReply::TransportError("boom".into()),
            MockReply::Status(503),
        ]);
        let result = post_with_backoff(
            &cloud,
            ApiHost::Api,
            "r",
            &json!({}),
            RetryPolicy::new(2, 1.0),
            |s| s == 201,
        )
        .await;
        assert!(matches!(
            result,
            Err(Exhausted::Rejected {
                last_status: 503,
                attempts: 2
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_backoff_falls_back_to_default_factor() {
        let cloud = MockCloudApi::with_statuses(&[500, 500, 201]);
        let start = tokio::time::Instant::now();
        let status = post_with_backoff(
            &cloud,
            ApiHost::Collector,
            "r",
            &json!({}),
            RetryPolicy::new(3, 0.0),
            |s| s == 201,
        )
        .await
        .unwrap();
        assert_eq!(status, 201);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}
