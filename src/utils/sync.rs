//! Poison-tolerant locking.
//!
//! Teardown must make progress even if another thread panicked while holding
//! a lock, so these helpers recover the guard instead of propagating poison.

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the guard if the lock is poisoned.
pub fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
