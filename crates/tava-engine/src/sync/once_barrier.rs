//! One-shot initialization barrier
//!
//! Guarantees a side effect runs exactly once. The first caller executes the
//! closure while every concurrent caller blocks until it completes; callers
//! arriving after completion return immediately. This is the primitive behind
//! the default-constructor accessibility promotion: the winning thread
//! performs the one-time marking and nobody re-checks afterwards.
//!
//! A failed attempt resets the barrier so a later caller can retry; waiters
//! blocked on the failed attempt wake up and compete to become the next
//! runner.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BarrierState {
    /// Nobody has run the closure yet
    Idle,
    /// Some thread is currently running the closure
    Running,
    /// The closure completed successfully; permanent
    Done,
}

/// A one-shot, exactly-once initialization barrier with blocking waiters
pub struct OnceBarrier {
    state: Mutex<BarrierState>,
    cond: Condvar,
}

impl OnceBarrier {
    /// Create a new, untriggered barrier
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BarrierState::Idle),
            cond: Condvar::new(),
        }
    }

    /// Whether the one-time side effect has completed
    pub fn is_complete(&self) -> bool {
        *self.state.lock() == BarrierState::Done
    }

    /// Run `f` at most once across all callers.
    ///
    /// Returns `Ok(true)` if this caller ran the closure, `Ok(false)` if it
    /// had already completed (possibly after blocking on the running
    /// thread). On `Err` the barrier is reset and the error is returned to
    /// the caller that ran the closure; waiters then retry.
    pub fn call_once<E>(&self, f: impl FnOnce() -> Result<(), E>) -> Result<bool, E> {
        let mut state = self.state.lock();
        loop {
            match *state {
                BarrierState::Done => return Ok(false),
                BarrierState::Idle => {
                    *state = BarrierState::Running;
                    break;
                }
                BarrierState::Running => self.cond.wait(&mut state),
            }
        }
        drop(state);

        // Reset on unwind so a panicking runner does not strand waiters.
        struct Reset<'a>(&'a OnceBarrier, bool);
        impl Drop for Reset<'_> {
            fn drop(&mut self) {
                let mut state = self.0.state.lock();
                *state = if self.1 {
                    BarrierState::Done
                } else {
                    BarrierState::Idle
                };
                self.0.cond.notify_all();
            }
        }

        let mut reset = Reset(self, false);
        let result = f();
        reset.1 = result.is_ok();
        drop(reset);
        result.map(|_| true)
    }
}

impl Default for OnceBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OnceBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnceBarrier")
            .field("complete", &self.is_complete())
            .finish()
    }
}
