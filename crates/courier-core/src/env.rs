//! Environment abstraction for deterministic testing.
//!
//! Binding elements need wall-clock time (expiration timestamps) and
//! randomness (nonces). The `Environment` trait supplies both so that the
//! channel and its elements never reach for system resources directly:
//!
//! - Deterministic tests: the harness `SimEnv` provides a virtual clock that
//!   only moves when told to, and a seeded RNG.
//!
//! - Production: [`SystemEnv`] reads the system clock and the OS entropy
//!   pool.
//!
//! # Invariants
//!
//! - Determinism: given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: implementations must not share global state

use std::time::SystemTime;

use rand::{RngCore, rngs::OsRng};

/// Abstract environment providing wall-clock time and randomness.
///
/// The trait is object safe; a channel holds it as `Arc<dyn Environment>`
/// and lends it to binding elements through
/// [`BindingContext`](crate::binding::BindingContext).
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// 1. RNG quality: `random_bytes()` uses cryptographically secure entropy in
///    production
/// 2. Thread safety: methods may be called concurrently from every thread
///    that uses the channel
pub trait Environment: Send + Sync + 'static {
    /// Current wall-clock time.
    ///
    /// Unlike a monotonic instant this value is meaningful to the remote
    /// party, so it is what gets written into expiring messages.
    fn now(&self) -> SystemTime;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Security
    ///
    /// Production implementations MUST draw from the OS entropy pool, not a
    /// userspace PRNG seeded once.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Production environment: system clock and OS randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        OsRng.fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_produces_distinct_randomness() {
        let env = SystemEnv;
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn system_env_clock_is_after_epoch() {
        assert!(SystemEnv.now() > SystemTime::UNIX_EPOCH);
    }
}
