//! Bounded retries with jittered exponential backoff
//!
//! Only payment initialization is retried. Verification and the order
//! mutation that follows it never go through here.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::gateway::GatewayError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Deadline for each attempt
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            attempt_timeout,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }

    /// Full-jitter delay before retry number `attempt + 1`
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let cap_limit = (self.max_delay.as_millis() as u64).max(base);
        let exp = base.saturating_mul(1u64 << attempt.min(20));
        let cap = exp.min(cap_limit);
        let delay_ms = if cap > base {
            rand::thread_rng().gen_range(base..=cap)
        } else {
            base
        };
        Duration::from_millis(delay_ms)
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out
///
/// Each attempt is bounded by `policy.attempt_timeout`; an elapsed deadline
/// counts as [`GatewayError::Timeout`].
pub async fn with_retries<F, Fut, T>(desc: &str, policy: RetryPolicy, mut op: F) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let result = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() || attempt >= policy.max_retries => return Err(e),
            Err(e) => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    target: "payment",
                    op = desc,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient gateway error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
