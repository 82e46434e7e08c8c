use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Backoff policy for calls to flaky upstreams
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

impl RetryConfig {
    pub fn new(max_attempts: usize, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            max_backoff: base_backoff * 10,
            jitter_max: Some(base_backoff / 2),
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter_max: None,
        }
    }

    /// Pause after the given failed attempt (1-based), before jitter
    fn backoff_after(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.base_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }

    fn jitter(&self) -> Duration {
        match self.jitter_max.map(|max| max.as_millis() as u64) {
            Some(max_ms) if max_ms > 0 => {
                Duration::from_millis(rand::rng().random_range(0..=max_ms))
            }
            _ => Duration::ZERO,
        }
    }
}

/// Runs `call` until it succeeds, `should_retry` rejects the error, or attempts run out
pub async fn retry_async_when<F, Fut, T, E, P>(
    config: &RetryConfig,
    should_retry: P,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if attempt >= max_attempts || !should_retry(&err) {
            return Err(err);
        }

        let pause = config.backoff_after(attempt) + config.jitter();
        tracing::debug!(attempt, max_attempts, ?pause, "Upstream call failed, retrying");
        tokio::time::sleep(pause).await;
        attempt += 1;
    }
}
