//! Backoff computation and the sleep abstraction used between attempts.

use std::time::Duration;

use futures::future::BoxFuture;
use rand::Rng;

use crate::config::RetryPolicy;
use crate::error_handling::{Error, Result};

impl RetryPolicy {
    /// Whether `status` is in the retryable set.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Delay before retry number `retry` (1-based), before jitter.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = self.multiplier.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// [`backoff_delay`](Self::backoff_delay) plus a random jitter in
    /// `[0, jitter * delay]`.
    pub fn jittered_delay<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let delay = self.backoff_delay(retry);
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let extra = rng.random_range(0.0..=self.jitter);
        delay.mul_f64(1.0 + extra)
    }

    /// Rejects policies that could never make an attempt or would shrink
    /// delays.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::config("retry policy needs at least one attempt"));
        }
        if self.multiplier == 0 {
            return Err(Error::config("retry multiplier must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(Error::config(format!(
                "retry jitter must be between 0 and 1, got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}

/// Waits between retry attempts.
///
/// Production code sleeps on the tokio timer; tests inject an implementation
/// that records the requested delays and returns immediately.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()>;
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}
