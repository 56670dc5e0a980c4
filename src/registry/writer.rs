use super::InvitationRegistry;
use rand::Rng;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{Instrument, Span, error, info, warn};

/// Bounded retries for the detached registry write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before `attempt` (1-based); the first attempt never waits.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.base_backoff.is_zero() {
            return Duration::ZERO;
        }

        let exponential = self
            .base_backoff
            .saturating_mul(2u32.saturating_pow(attempt - 2));

        // spread concurrent writers apart
        let jitter = rand::thread_rng().gen_range(0.8..1.0);
        exponential.mul_f64(jitter)
    }
}

/// Replace the invitation list in the background.
///
/// The caller's access decision is already made; failures are logged and the
/// task ends without reporting back.
pub fn spawn_update<R>(
    registry: Arc<R>,
    id: String,
    codes: Vec<String>,
    policy: RetryPolicy,
) -> JoinHandle<()>
where
    R: InvitationRegistry + ?Sized + 'static,
{
    let span = Span::current();

    tokio::spawn(
        async move {
            let max_attempts = policy.max_attempts.max(1);

            for attempt in 1..=max_attempts {
                let backoff_time = policy.backoff(attempt);
                if !backoff_time.is_zero() {
                    warn!("Backing off for {} ms", backoff_time.as_millis());
                    sleep(backoff_time).await;
                }

                match registry.update(&id, &codes).await {
                    Ok(()) => {
                        info!(remaining = codes.len(), "invitation list updated");
                        return;
                    }

                    Err(e) => {
                        if attempt == max_attempts {
                            error!(
                                "Failed to update invitation list after {} attempts: {}",
                                max_attempts, e
                            );
                            return;
                        }

                        warn!("Error updating invitation list (attempt {}): {}", attempt, e);
                    }
                }
            }
        }
        .instrument(span),
    )
}
