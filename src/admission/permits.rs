//! Counting-semaphore admission gate.
//!
//! Bounds concurrently active sandboxes to the capacity computed at startup.
//! Acquisition is scoped: a [`PermitGuard`] releases its permit on drop, so
//! every exit path out of an execution (success, error, timeout, panic)
//! returns the permit.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

struct GateInner {
    total: usize,
    available: Mutex<usize>,
    freed: Condvar,
}

impl GateInner {
    fn release_one(&self) {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        if *available < self.total {
            *available += 1;
        }
        self.freed.notify_one();
    }
}

/// Fixed-capacity permit counter. `0 <= available <= total` at all times.
/// Cloning yields another handle to the same permits.
#[derive(Clone)]
pub struct PermitGate {
    inner: Arc<GateInner>,
}

impl PermitGate {
    pub fn new(total: usize) -> Self {
        let total = total.max(1);
        Self {
            inner: Arc::new(GateInner {
                total,
                available: Mutex::new(total),
                freed: Condvar::new(),
            }),
        }
    }

    /// Non-blocking acquisition. Returns a guard iff a permit was free.
    pub fn try_acquire(&self) -> Option<PermitGuard> {
        let mut available = self
            .inner
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(PermitGuard {
            gate: Arc::clone(&self.inner),
        })
    }

    /// Blocking acquisition. Used only by the overflow dispatcher, never by
    /// caller threads.
    pub fn acquire(&self) -> PermitGuard {
        let mut available = self
            .inner
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = self
                .inner
                .freed
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        PermitGuard {
            gate: Arc::clone(&self.inner),
        }
    }

    /// Current free-permit snapshot.
    pub fn available(&self) -> usize {
        *self
            .inner
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn total(&self) -> usize {
        self.inner.total
    }
}

/// Scoped permit. Dropping the guard releases the permit exactly once.
pub struct PermitGuard {
    gate: Arc<GateInner>,
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        self.gate.release_one();
    }
}
