//! Overflow backlog and its background dispatcher.
//!
//! Requests that arrive while every permit is held are appended to a strict
//! FIFO backlog. The calling thread never blocks on the backlog itself; it
//! waits on the task's own result slot with a caller-visible deadline. One
//! dispatcher thread drains the backlog head-first, performing a blocking
//! permit acquisition per task and running the execution inline.

use crate::config::types::ExecutionOutcome;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Single-resolution result slot shared between the dispatcher (producer) and
/// the original caller (consumer). The first `resolve` wins; later attempts
/// are reported as rejected so an abandoned task cannot resolve twice.
pub struct ResultSlot {
    value: Mutex<Option<ExecutionOutcome>>,
    ready: Condvar,
}

impl ResultSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        })
    }

    /// Store the outcome if the slot is still empty. Returns false when a
    /// value had already landed.
    pub fn resolve(&self, outcome: ExecutionOutcome) -> bool {
        let mut value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if value.is_some() {
            return false;
        }
        *value = Some(outcome);
        self.ready.notify_all();
        true
    }

    /// Wait up to `timeout` for the outcome. `None` means the deadline
    /// elapsed with the slot still empty.
    pub fn wait(&self, timeout: Duration) -> Option<ExecutionOutcome> {
        let deadline = Instant::now() + timeout;
        let mut value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = value.clone() {
                return Some(outcome);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, _) = self
                .ready
                .wait_timeout(value, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            value = guard;
        }
    }
}

/// One queued execution request.
pub struct PendingTask {
    pub source: String,
    pub slot: Arc<ResultSlot>,
    pub enqueued_at: Instant,
}

/// Monitor-guarded FIFO backlog.
pub struct OverflowQueue {
    backlog: Mutex<VecDeque<PendingTask>>,
    arrived: Condvar,
}

impl OverflowQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            backlog: Mutex::new(VecDeque::new()),
            arrived: Condvar::new(),
        })
    }

    pub fn push(&self, task: PendingTask) {
        let mut backlog = self.backlog.lock().unwrap_or_else(PoisonError::into_inner);
        backlog.push_back(task);
        self.arrived.notify_one();
    }

    pub fn len(&self) -> usize {
        self.backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pop the head task, parking up to `timeout` when the backlog is empty.
    fn pop_wait(&self, timeout: Duration) -> Option<PendingTask> {
        let mut backlog = self.backlog.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = backlog.pop_front() {
            return Some(task);
        }
        let (mut backlog, _) = self
            .arrived
            .wait_timeout(backlog, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        backlog.pop_front()
    }
}

/// Background worker draining the overflow backlog in FIFO order.
pub struct Dispatcher {
    shutdown_tx: crossbeam_channel::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn the dispatcher thread. `run` executes one admitted request and
    /// is called with a permit held; the permit is released when the guard
    /// drops, on every path out of the closure.
    pub fn spawn<F>(
        queue: Arc<OverflowQueue>,
        gate: crate::admission::permits::PermitGate,
        run: F,
    ) -> Self
    where
        F: Fn(&str) -> ExecutionOutcome + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let Some(task) = queue.pop_wait(Duration::from_millis(100)) else {
                continue;
            };

            let permit = gate.acquire();
            log::debug!(
                "dispatching queued execution after {}ms in backlog",
                task.enqueued_at.elapsed().as_millis()
            );
            let outcome = run(&task.source);
            drop(permit);

            if !task.slot.resolve(outcome) {
                log::debug!("caller abandoned queued execution; discarding result");
            }
        });

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Signal the dispatcher and join it. Idempotent.
    pub fn stop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("overflow dispatcher thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
