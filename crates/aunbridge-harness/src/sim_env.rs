//! Turmoil-based Environment implementation for deterministic testing.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use aunbridge_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Simulation environment using Turmoil's virtual time and seeded RNG.
///
/// - **Virtual Time**: `now()` and `sleep()` go through Tokio's clock, which
///   Turmoil advances instantly.
/// - **Seeded RNG**: `random_bytes()` draws from a ChaCha20 generator, so
///   trunk IVs repeat across runs with the same seed.
///
/// Clones share one generator.
///
/// # Panics
///
/// `now()` panics outside a Tokio runtime.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SimEnv {
    /// Environment seeded with 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now().into()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        // Turmoil runs every host on one thread, so the lock is never
        // contended and poisoning leaves the generator usable.
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
