//! Deterministic environment for unit tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use crate::env::Environment;

/// Frozen clock, counting byte generator.
#[derive(Clone, Default)]
pub(crate) struct TestEnv {
    next: Arc<AtomicU8>,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Environment for TestEnv {
    type Instant = Duration;

    fn now(&self) -> Self::Instant {
        Duration::ZERO
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for byte in buffer {
            *byte = self.next.fetch_add(1, Ordering::Relaxed);
        }
    }
}
