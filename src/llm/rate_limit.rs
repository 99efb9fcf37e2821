/// Token-bucket limiter gating requests to the model provider.
use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter as GovRateLimiter};

use super::LlmError;

pub struct RateLimiter {
    limiter: GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    jitter: Jitter,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_minute`, with a burst of the
    /// same size.
    pub fn new(requests_per_minute: u32) -> Result<Self, LlmError> {
        let rpm = NonZeroU32::new(requests_per_minute)
            .ok_or_else(|| LlmError::Config("requests_per_minute must be positive".into()))?;

        Ok(Self {
            limiter: GovRateLimiter::direct(Quota::per_minute(rpm)),
            jitter: Jitter::new(Duration::from_millis(10), Duration::from_millis(100)),
        })
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        self.limiter.until_ready_with_jitter(self.jitter).await;
    }

    /// Take a permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
