//! Production environment.

use std::time::{Duration, Instant};

use aunbridge_core::Environment;
use tracing::error;

/// Real clock, Tokio timers and OS entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        // A predictable IV would expose trunk traffic; stopping is the only
        // safe answer.
        if let Err(e) = getrandom::fill(buffer) {
            error!(error = %e, "OS entropy unavailable, aborting");
            std::process::abort();
        }
    }
}
