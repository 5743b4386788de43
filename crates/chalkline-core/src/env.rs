//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (time, randomness). The
//! production driver supplies real clocks and OS entropy; tests supply
//! [`test_utils::MockEnv`] with a virtual clock and a seeded RNG so every
//! retry delay and typing expiry is reproducible.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - This method MUST return values that never decrease within a single
    ///   execution context. Subsequent calls must return times >= previous
    ///   calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by driver code (not protocol logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Convenience for jitter computation and request identifiers.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Deterministic environments for tests.
pub mod test_utils {
    #![allow(clippy::disallowed_types, clippy::disallowed_methods)]

    use std::{
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::Environment;

    /// Deterministic environment with a manually advanced clock and a seeded
    /// RNG.
    ///
    /// Clones share the same clock and RNG state, so a test can hold one
    /// handle while the component under test holds another.
    #[derive(Clone)]
    pub struct MockEnv {
        base: Instant,
        offset: Arc<Mutex<Duration>>,
        rng: Arc<Mutex<ChaCha8Rng>>,
    }

    impl MockEnv {
        /// Create a mock environment with seed 0.
        pub fn new() -> Self {
            Self::with_seed(0)
        }

        /// Create a mock environment with the given RNG seed.
        pub fn with_seed(seed: u64) -> Self {
            Self {
                base: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
                rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            }
        }

        /// Advance the virtual clock.
        pub fn advance(&self, by: Duration) {
            let mut offset = self.offset.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *offset += by;
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Environment for MockEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            let offset = self.offset.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            self.base + *offset
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            // Virtual time: sleeping is a no-op, tests advance the clock.
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let mut rng = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            rng.fill_bytes(buffer);
        }
    }

}
