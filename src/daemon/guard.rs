use std::sync::{Mutex, TryLockError};

pub const BUSY: &str = "a digest run is already in progress";

/// Admits one run at a time. The lock is released when the run returns or
/// unwinds; a lock poisoned by a panicking run is reclaimed.
#[derive(Default)]
pub struct RunGuard {
    lock: Mutex<()>,
}

impl RunGuard {
    /// Run `f` unless another run holds the guard, in which case `None`.
    pub fn try_run<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let _held = match self.lock.try_lock() {
            Ok(held) => held,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(f())
    }
}
