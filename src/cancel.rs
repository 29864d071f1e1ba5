// src/cancel.rs

//! A cancellation flag that sleeping threads can wait on.
//!
//! Long-running loops check [`CancelToken::is_cancelled`] at their suspension
//! points and sleep with [`CancelToken::sleep`], which returns as soon as
//! [`CancelToken::cancel`] is called from any thread.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Shared cancellation signal. Clones observe the same flag.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken {
            inner: Arc::new(Inner {
                cancelled: Mutex::new(false),
                wake: Condvar::new(),
            }),
        }
    }

    /// Requests cancellation and wakes every sleeper. Idempotent.
    pub fn cancel(&self) {
        *self.lock() = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        self.sleep_until(Instant::now() + duration)
    }

    /// Sleeps until `deadline` unless cancelled first.
    ///
    /// Returns `true` if the deadline was reached, `false` if cancelled.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self.lock();
        loop {
            if *cancelled {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            cancelled = match self.inner.wake.wait_timeout(cancelled, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use test_log::test;

    #[test]
    fn it_should_sleep_the_full_duration_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(token.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn it_should_return_immediately_once_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert!(!token.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn it_should_wake_a_sleeper_from_another_thread() {
        let token = CancelToken::new();
        let sleeper = {
            let token = token.clone();
            thread::spawn(move || token.sleep(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(!sleeper.join().unwrap());
        assert!(token.is_cancelled());
    }
}
