//! # In-process test harness for the IPC protocol.
//!
//! [`LocalIpc`] implements [`Ipc`] over plain process-local synchronization:
//! a mutexed [`SharedState`], two condvar-backed counting gates standing in
//! for the empty/full semaphores, and a bounded in-memory command queue.
//! Blocking behavior is real — a push on a full belt genuinely parks the
//! calling thread — so protocol tests exercise the same control flow as the
//! cross-process build without touching kernel resources.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::error::IpcError;
use crate::ipc::{Command, Ipc, RecipientTag};
use crate::state::{SharedState, BELT_SLOTS};

/// Poll interval for blocked gates to observe cancellation.
const WAIT_SLICE: Duration = Duration::from_millis(20);

/// Condvar-backed counting semaphore.
struct Gate {
    count: Mutex<u32>,
    cv: Condvar,
}

impl Gate {
    fn new(initial: u32) -> Self {
        Gate {
            count: Mutex::new(initial),
            cv: Condvar::new(),
        }
    }

    fn wait(&self, cancelled: &AtomicBool) -> Result<(), IpcError> {
        let mut count = self.count.lock().expect("gate poisoned");
        loop {
            if cancelled.load(Ordering::SeqCst) {
                return Err(IpcError::ShuttingDown);
            }
            if *count > 0 {
                *count -= 1;
                return Ok(());
            }
            let (guard, _timeout) = self
                .cv
                .wait_timeout(count, WAIT_SLICE)
                .expect("gate poisoned");
            count = guard;
        }
    }

    fn post(&self) {
        let mut count = self.count.lock().expect("gate poisoned");
        *count += 1;
        self.cv.notify_one();
    }

    fn value(&self) -> u32 {
        *self.count.lock().expect("gate poisoned")
    }
}

/// In-process [`Ipc`] implementation for tests.
pub struct LocalIpc {
    state: Mutex<SharedState>,
    empty: Gate,
    full: Gate,
    queue: Mutex<VecDeque<(i64, Command)>>,
    queue_cv: Condvar,
    queue_capacity: usize,
    cancelled: AtomicBool,
}

impl LocalIpc {
    /// Harness with the default belt capacity.
    pub fn new() -> Self {
        Self::with_capacity(BELT_SLOTS as u32)
    }

    /// Harness with an effective belt capacity of `k`.
    pub fn with_capacity(k: u32) -> Self {
        let mut state = SharedState::default();
        state.init(k);
        let k = state.capacity();
        LocalIpc {
            state: Mutex::new(state),
            empty: Gate::new(k),
            full: Gate::new(0),
            queue: Mutex::new(VecDeque::new()),
            queue_cv: Condvar::new(),
            queue_capacity: 64,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Shrinks the queue bound (to provoke `QueueFull`).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// The token analog: cancels every current and future blocking wait.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.empty.cv.notify_all();
        self.full.cv.notify_all();
        self.queue_cv.notify_all();
    }

    /// Current empty/full gate values (`empty + full == K` when idle).
    pub fn gate_values(&self) -> (u32, u32) {
        (self.empty.value(), self.full.value())
    }

    /// Removes and returns every queued command addressed to `tag`.
    pub fn drain_messages_for(&self, tag: RecipientTag) -> Vec<Command> {
        let mut queue = self.queue.lock().expect("queue poisoned");
        let mut matched = Vec::new();
        queue.retain(|&(to, cmd)| {
            if to == tag.raw() {
                matched.push(cmd);
                false
            } else {
                true
            }
        });
        matched
    }

    /// Total queued commands, all recipients.
    pub fn pending_messages(&self) -> usize {
        self.queue.lock().expect("queue poisoned").len()
    }
}

impl Default for LocalIpc {
    fn default() -> Self {
        Self::new()
    }
}

impl Ipc for LocalIpc {
    fn with_belt<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> Result<R, IpcError> {
        // Mirrors the real facade: cancellation interrupts *blocked* waits;
        // an uncontended mutex still admits post-cancellation cleanup.
        let mut state = self.state.lock().expect("state poisoned");
        Ok(f(&mut state))
    }

    fn with_dock<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> Result<R, IpcError> {
        self.with_belt(f)
    }

    fn wait_empty_slot(&self) -> Result<(), IpcError> {
        self.empty.wait(&self.cancelled)
    }

    fn post_empty_slot(&self) -> Result<(), IpcError> {
        self.empty.post();
        Ok(())
    }

    fn wait_full_slot(&self) -> Result<(), IpcError> {
        self.full.wait(&self.cancelled)
    }

    fn post_full_slot(&self) -> Result<(), IpcError> {
        self.full.post();
        Ok(())
    }

    fn send(&self, to: RecipientTag, command: Command) -> Result<(), IpcError> {
        if to.raw() <= 0 {
            return Err(IpcError::InvariantViolation {
                detail: format!("non-positive recipient tag {}", to.raw()),
            });
        }
        let mut queue = self.queue.lock().expect("queue poisoned");
        if queue.len() >= self.queue_capacity {
            return Err(IpcError::QueueFull);
        }
        queue.push_back((to.raw(), command));
        self.queue_cv.notify_all();
        Ok(())
    }

    fn recv_blocking(&self, me: RecipientTag) -> Result<Command, IpcError> {
        let mut queue = self.queue.lock().expect("queue poisoned");
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(IpcError::ShuttingDown);
            }
            if let Some(pos) = queue.iter().position(|&(to, _)| to == me.raw()) {
                let (_, cmd) = queue.remove(pos).expect("position just found");
                return Ok(cmd);
            }
            let (guard, _timeout) = self
                .queue_cv
                .wait_timeout(queue, WAIT_SLICE)
                .expect("queue poisoned");
            queue = guard;
        }
    }

    fn recv_nonblocking(&self, me: RecipientTag) -> Result<Option<Command>, IpcError> {
        let mut queue = self.queue.lock().expect("queue poisoned");
        match queue.iter().position(|&(to, _)| to == me.raw()) {
            Some(pos) => Ok(queue.remove(pos).map(|(_, cmd)| cmd)),
            None => Ok(None),
        }
    }

    fn is_running(&self) -> bool {
        self.state.lock().expect("state poisoned").running
    }

    fn request_halt(&self) {
        self.state.lock().expect("state poisoned").running = false;
    }
}
