//! Environment abstraction for deterministic testing.
//!
//! Bridge logic never reads the clock or draws entropy directly. Everything
//! goes through [`Environment`], so the same code runs against the system
//! clock and OS entropy in production and against virtual time and a seeded
//! generator under simulation.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` never goes backwards
//! - Determinism: given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: implementations do not share global state

use std::time::Duration;

use aunbridge_crypto::IV_SIZE;

/// Time, sleeping and randomness for the bridge.
///
/// # Implementations
///
/// - Simulation (`aunbridge-harness::SimEnv`): virtual time, ChaCha20 RNG
///   seeded per test.
/// - Production (`aunbridge-server::SystemEnv`): real clock, OS entropy.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Point in time. Only differences are meaningful.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time. Never decreases.
    fn now(&self) -> Self::Instant;

    /// Sleep for `duration`.
    ///
    /// Only driver code sleeps. Bridge logic returns what it wants done and
    /// lets the runtime decide how long to wait.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    ///
    /// # Security
    ///
    /// Production implementations MUST draw from OS entropy. Trunk IVs come
    /// from here.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// A fresh CBC initialisation vector.
    fn random_iv(&self) -> [u8; IV_SIZE] {
        let mut iv = [0u8; IV_SIZE];
        self.random_bytes(&mut iv);
        iv
    }
}
