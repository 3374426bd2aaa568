//! Deterministic `Environment` with a virtual clock.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use courier_core::env::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Seconds since the epoch at which every `SimEnv` clock starts
/// (2023-11-14T22:13:20Z).
pub const DEFAULT_START_SECS: u64 = 1_700_000_000;

/// Simulation environment with a manually advanced clock and seeded RNG.
///
/// - **Virtual time**: `now()` only moves when [`advance`](Self::advance)
///   or [`set_now`](Self::set_now) is called.
/// - **Seeded RNG**: `random_bytes()` draws from ChaCha20 seeded with a
///   fixed value, so nonces are reproducible.
///
/// Clones share both the clock and the RNG, so a test can keep a handle
/// and advance the time seen by a channel it built with another clone.
#[derive(Clone, Debug)]
pub struct SimEnv {
    clock: Arc<Mutex<SystemTime>>,
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SimEnv {
    /// Environment with seed 0
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self::starting_at(UNIX_EPOCH + Duration::from_secs(DEFAULT_START_SECS), seed)
    }

    /// Environment whose clock starts at `start`
    pub fn starting_at(start: SystemTime, seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(start)),
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock += by;
    }

    /// Move the clock backwards, for clock skew scenarios
    pub fn rewind(&self, by: Duration) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock -= by;
    }

    /// Set the clock
    pub fn set_now(&self, at: SystemTime) {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn now(&self) -> SystemTime {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
