use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Adaptive pacing between redemption attempts.
///
/// The delay doubles after every unsuccessful attempt (capped at
/// `max_delay`) and snaps back to `min_delay` after a success. `wait` adds
/// up to 30% random jitter so the request cadence never looks mechanical.
/// Pure throttling; nothing here is load-bearing for correctness.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_delay: f64,
    max_delay: f64,
    delay: f64,
}

impl RateLimiter {
    pub fn new(min_delay: f64, max_delay: f64) -> Self {
        Self {
            min_delay,
            max_delay,
            delay: min_delay,
        }
    }

    /// Current base delay in seconds, before jitter.
    pub fn current_delay(&self) -> f64 {
        self.delay
    }

    /// Sleep for the current delay plus jitter.
    pub async fn wait(&self) {
        let duration = self.jittered_delay();
        tracing::debug!(delay_secs = duration.as_secs_f64(), "throttling");
        sleep(duration).await;
    }

    /// Double the delay, capped at the configured maximum.
    pub fn increase(&mut self) {
        self.delay = (self.delay * 2.0).min(self.max_delay);
    }

    /// Restore the delay to the configured minimum.
    pub fn reset(&mut self) {
        self.delay = self.min_delay;
    }

    /// `delay + uniform(0, 0.3 * delay)`, so always within [delay, 1.3 * delay].
    fn jittered_delay(&self) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.0..=0.3 * self.delay);
        Duration::from_secs_f64(self.delay + jitter)
    }
}
