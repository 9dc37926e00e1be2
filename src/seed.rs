//! Process-wide pseudo-random generator.
//!
//! The `Rnd` and `Shuffle` opcodes draw from a single generator shared by the
//! whole process. It starts seeded with 0, so results are reproducible until
//! [`randomize`] is called. Nothing reseeds it implicitly.

use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Seed used at startup and by [`derandomize`].
pub const DEFAULT_SEED: u64 = 0;

static GENERATOR: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn generator() -> &'static Mutex<StdRng> {
    GENERATOR.get_or_init(|| Mutex::new(StdRng::seed_from_u64(DEFAULT_SEED)))
}

/// Run `f` with exclusive access to the shared generator.
pub(crate) fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    // A panic while holding the lock cannot leave a StdRng in an invalid state.
    let mut guard = generator()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

fn reseed(seed: u64) {
    with_rng(|rng| *rng = StdRng::seed_from_u64(seed));
}

/// Reseed the generator from the system clock.
pub fn randomize() {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(DEFAULT_SEED);
    log::debug!("seed: randomized generator");
    reseed(seed);
}

/// Reseed the generator with [`DEFAULT_SEED`], restoring the startup sequence.
pub fn derandomize() {
    log::debug!("seed: generator reset to {}", DEFAULT_SEED);
    reseed(DEFAULT_SEED);
}

/// Reseed the generator with an explicit value.
pub fn set_seed(seed: u64) {
    reseed(seed);
}

/// Serializes unit tests that draw from the shared generator.
#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
    static GUARD: Mutex<()> = Mutex::new(());
    GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
