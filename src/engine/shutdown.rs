//! Process-wide stop signal
//!
//! A monotonic flag paired with a condition variable. Loops check it at their
//! suspension points and use `wait_timeout` instead of a plain sleep, so a
//! shutdown wakes them immediately.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::debug;

/// Cloneable handle to the shared shutdown signal
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.inner.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Request shutdown and wake every waiter
    ///
    /// Returns `true` only for the call that actually flipped the flag; later
    /// calls from any thread are no-ops.
    pub fn signal(&self) -> bool {
        let mut signaled = self.flag();
        if *signaled {
            return false;
        }
        *signaled = true;
        self.inner.1.notify_all();
        debug!("Shutdown signaled");
        true
    }

    pub fn is_signaled(&self) -> bool {
        *self.flag()
    }

    /// Block until shutdown is signaled
    pub fn wait(&self) {
        let mut signaled = self.flag();
        while !*signaled {
            signaled = self
                .inner
                .1
                .wait(signaled)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Sleep for up to `timeout`, returning early if shutdown is signaled
    ///
    /// Returns `true` if shutdown has been signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut signaled = self.flag();
        while !*signaled {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                break;
            }
            // Spurious wakeups loop back and re-check against the deadline
            let (guard, _) = self
                .inner
                .1
                .wait_timeout(signaled, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            signaled = guard;
        }
        *signaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_signal_is_idempotent() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_signaled());
        assert!(shutdown.signal());
        assert!(!shutdown.signal());
        assert!(shutdown.is_signaled());
    }

    #[test]
    fn test_wait_timeout_expires_without_signal() {
        let shutdown = Shutdown::new();
        let start = Instant::now();
        assert!(!shutdown.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_timeout_wakes_early() {
        let shutdown = Shutdown::new();
        let signaler = shutdown.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaler.signal();
        });

        let start = Instant::now();
        assert!(shutdown.wait_timeout(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(10));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_returns_after_signal() {
        let shutdown = Shutdown::new();
        let signaler = shutdown.clone();
        let handle = thread::spawn(move || signaler.signal());
        shutdown.wait();
        assert!(shutdown.is_signaled());
        handle.join().unwrap();
    }
}
