//! Push distribution of the public key to downstream verifiers.

use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A downstream service that verifies our tokens and therefore needs the
/// current public key. The receiving call is idempotent; the sender retries
/// `UNAVAILABLE`-class failures up to a bounded attempt count.
#[async_trait]
pub trait PublicKeySubscriber: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Deliver the X.509/PEM-encoded public key.
    async fn set_public_key(&self, public_key_pem: &str) -> anyhow::Result<()>;
}

/// Retry policy with capped exponential backoff and jitter.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial call.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Add random jitter to backoff (±30%).
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Execute a fallible future with bounded retries. Returns the last error
/// once the attempt budget is exhausted.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut backoff = config.initial_backoff;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempt += 1;

                if attempt > config.max_retries {
                    return Err(err);
                }

                let delay = apply_jitter(backoff, config.jitter);
                warn!(
                    attempt,
                    max_retries = config.max_retries,
                    error = %err,
                    "retrying after {:?}",
                    delay
                );

                tokio::time::sleep(delay).await;

                backoff = Duration::from_millis(
                    ((backoff.as_millis() as f64 * config.backoff_multiplier)
                        .min(config.max_backoff.as_millis() as f64)) as u64,
                );
            }
        }
    }
}

fn apply_jitter(base: Duration, jitter: bool) -> Duration {
    if jitter {
        let factor = 1.0 + rand::thread_rng().gen_range(-0.3..0.3);
        Duration::from_millis((base.as_millis() as f64 * factor) as u64)
    } else {
        base
    }
}
