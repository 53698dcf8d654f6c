use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dbx_core::DbxError;

/// Tuning for the adaptive call pacer.
#[derive(Debug, Clone, Copy)]
pub struct PacerConfig {
    /// Delay floor, and the delay applied when the service is healthy.
    pub min_sleep: Duration,
    /// Delay ceiling under sustained throttling.
    pub max_sleep: Duration,
    /// Decay exponent towards `min_sleep` on success; bigger is slower.
    pub decay: u32,
    /// Attempt budget for retryable failures in [`Pacer::call`].
    pub retries: u32,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            min_sleep: Duration::from_millis(10),
            max_sleep: Duration::from_secs(2),
            decay: 2,
            retries: 10,
        }
    }
}

/// Paces outbound calls to the rate-limited service.
///
/// The delay bound is the only state shared between concurrent callers;
/// it grows on retryable failures, decays towards the floor on success,
/// and never leaves `[min_sleep, max_sleep]`. The lock is never held
/// across an await point.
#[derive(Debug)]
pub(crate) struct Pacer {
    config: PacerConfig,
    sleep: Mutex<Duration>,
}

impl Pacer {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            config,
            sleep: Mutex::new(config.min_sleep),
        }
    }

    /// Pace and issue `op`, re-issuing it on retryable failures until the
    /// attempt budget runs out.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, DbxError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbxError>>,
    {
        let budget = self.config.retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.pace().await;
            match op().await {
                Ok(value) => {
                    self.record_success();
                    return Ok(value);
                }
                Err(err) => {
                    self.record_failure();
                    if !err.is_retryable() || attempt >= budget {
                        return Err(err);
                    }
                    tracing::debug!(attempt, error = %err, "retrying paced call");
                }
            }
        }
    }

    /// Pace and issue `op` exactly once.
    ///
    /// Used where re-issuing a partially applied side effect would corrupt
    /// remote state (upload calls, deletes); the caller must restart from
    /// a known-good point if it wants to retry.
    pub async fn call_no_retry<T, F, Fut>(&self, mut op: F) -> Result<T, DbxError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbxError>>,
    {
        self.pace().await;
        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    async fn pace(&self) {
        let delay = *self.sleep.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn record_success(&self) {
        let mut sleep = self.sleep.lock().unwrap_or_else(PoisonError::into_inner);
        let gap = sleep.saturating_sub(self.config.min_sleep);
        *sleep = self.config.min_sleep + gap / (1u32 << self.config.decay.min(16));
    }

    fn record_failure(&self) {
        let mut sleep = self.sleep.lock().unwrap_or_else(PoisonError::into_inner);
        *sleep = (*sleep * 2).min(self.config.max_sleep);
    }

    #[cfg(test)]
    fn current_delay(&self) -> Duration {
        *self.sleep.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
