use crate::config::GatewayConfig;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::types::{
    AddressSubmission, CardCharge, GatewayEnvelope, OtpSubmission, PinSubmission,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded fixed-delay retry over transport failures. Gateway-level
/// rejections pass through untouched; only [`GatewayError::Network`] is
/// retried, and exhaustion collapses into [`GatewayError::Unavailable`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Single attempt, no delay.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() => {
                    if attempt < attempts {
                        warn!(attempt, max_attempts = attempts, error = %e, "gateway transport failure, retrying");
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(GatewayError::Unavailable { attempts })
    }
}

/// The transport seam the charge state machine drives. One method per
/// gateway endpoint; every call is a single logical attempt from the
/// caller's view, retries stay inside the implementation.
#[async_trait]
pub trait CardGateway: Send + Sync {
    async fn charge_card(&self, request: &CardCharge) -> GatewayResult<GatewayEnvelope>;

    async fn submit_pin(&self, submission: &PinSubmission) -> GatewayResult<GatewayEnvelope>;

    async fn submit_otp(&self, submission: &OtpSubmission) -> GatewayResult<GatewayEnvelope>;

    async fn submit_address(
        &self,
        submission: &AddressSubmission,
    ) -> GatewayResult<GatewayEnvelope>;
}

pub struct GatewayClient {
    http: Client,
    base_url: String,
    secret_key: String,
    /// Initial charge and address submission.
    charge_retry: RetryPolicy,
    /// PIN submission runs on a slower cadence.
    pin_retry: RetryPolicy,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            secret_key: config.secret_key.clone(),
            charge_retry: RetryPolicy::new(
                config.charge_max_retries,
                Duration::from_millis(config.charge_retry_delay_ms),
            ),
            pin_retry: RetryPolicy::new(
                config.pin_max_retries,
                Duration::from_millis(config.pin_retry_delay_ms),
            ),
        })
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}{}", self.base_url, suffix)
    }

    async fn attempt_post<B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> GatewayResult<GatewayEnvelope> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.secret_key)
            .header("Accept", "application/json")
            .header("Cache-Control", "no-cache")
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network {
                message: format!("gateway request failed: {}", e),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // A non-2xx with a parseable body is the gateway talking, not
            // the network failing: surface its message and stop.
            let message = serde_json::from_str::<GatewayEnvelope>(&text)
                .ok()
                .and_then(|env| env.data.and_then(|d| d.message).or(env.message))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(GatewayError::Rejected { message });
        }

        serde_json::from_str::<GatewayEnvelope>(&text).map_err(|e| GatewayError::UnexpectedShape {
            message: format!("invalid gateway JSON: {}", e),
        })
    }

    async fn post_with_policy<B: Serialize>(
        &self,
        suffix: &str,
        body: &B,
        policy: RetryPolicy,
    ) -> GatewayResult<GatewayEnvelope> {
        let url = self.endpoint(suffix);
        policy.run(|| self.attempt_post(&url, body)).await
    }
}

#[async_trait]
impl CardGateway for GatewayClient {
    async fn charge_card(&self, request: &CardCharge) -> GatewayResult<GatewayEnvelope> {
        self.post_with_policy("", request, self.charge_retry).await
    }

    async fn submit_pin(&self, submission: &PinSubmission) -> GatewayResult<GatewayEnvelope> {
        self.post_with_policy("/submit_pin", submission, self.pin_retry)
            .await
    }

    async fn submit_otp(&self, submission: &OtpSubmission) -> GatewayResult<GatewayEnvelope> {
        self.post_with_policy("/submit_otp", submission, RetryPolicy::once())
            .await
    }

    async fn submit_address(
        &self,
        submission: &AddressSubmission,
    ) -> GatewayResult<GatewayEnvelope> {
        self.post_with_policy("/submit_address", submission, self.charge_retry)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn transient_failures_below_budget_still_succeed() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(GatewayError::Network {
                        message: "connection reset".to_string(),
                    })
                } else {
                    Ok(42u32)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_collapse_to_unavailable() {
        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = fast_policy(3)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Network {
                    message: "connection reset".to_string(),
                })
            })
            .await;
        assert!(matches!(
            result,
            Err(GatewayError::Unavailable { attempts: 3 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gateway_rejections_are_never_retried() {
        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = fast_policy(3)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Rejected {
                    message: "Insufficient funds".to_string(),
                })
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Rejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempt_policy_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::new(0, Duration::ZERO)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1u8)
            })
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
