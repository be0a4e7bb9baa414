//! Test-only helpers shared across the CLI unit tests.

use std::sync::{Mutex, MutexGuard, OnceLock};

static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

/// Serialize tests that touch process environment variables.
///
/// Tests should restore any variables they modify before asserting, so a
/// failing test does not poison the mutex for the rest of the suite.
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env mutex poisoned")
}
