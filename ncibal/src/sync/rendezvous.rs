// ncibal/src/sync/rendezvous.rs

//! Request/response correlation between a caller thread and the hardware
//! callback thread.
//!
//! A caller arms the rendezvous *before* issuing the hardware request, so a
//! completion that races ahead of the wait is still captured. A notification
//! that arrives while nothing is armed is dropped: this is a rendezvous, not
//! a queue. Only one request per rendezvous is in flight at a time; the
//! [`Pending`] token holds the gate for the whole request/wait pair.

use std::time::{Duration, Instant};

use log::trace;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::types::NfaStatus;

/// How a request/wait pair ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// The hardware refused the request; nothing was awaited.
    Rejected(NfaStatus),
    /// The matching completion arrived.
    Completed(T),
    /// The bound elapsed without a completion.
    TimedOut,
    /// Teardown woke the waiter.
    Aborted,
}

impl<T> WaitOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, WaitOutcome::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            WaitOutcome::Completed(v) => Some(v),
            _ => None,
        }
    }
}

impl WaitOutcome<NfaStatus> {
    /// Collapse to a single status: the completion status, the rejection
    /// status, `Timeout` on expiry and `Failed` on abort.
    pub fn status(&self) -> NfaStatus {
        match self {
            WaitOutcome::Rejected(s) | WaitOutcome::Completed(s) => *s,
            WaitOutcome::TimedOut => NfaStatus::Timeout,
            WaitOutcome::Aborted => NfaStatus::Failed,
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    armed: bool,
    aborted: bool,
    value: Option<T>,
}

/// Single-slot wait/notify primitive.
#[derive(Debug)]
pub struct Rendezvous<T> {
    name: &'static str,
    gate: Mutex<()>,
    slot: Mutex<Slot<T>>,
    cond: Condvar,
}

impl<T> Rendezvous<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            gate: Mutex::new(()),
            slot: Mutex::new(Slot {
                armed: false,
                aborted: false,
                value: None,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Serialize against other users of this rendezvous and start accepting
    /// a notification.
    pub fn arm(&self) -> Pending<'_, T> {
        let gate = self.gate.lock();
        {
            let mut slot = self.slot.lock();
            slot.armed = true;
            slot.aborted = false;
            slot.value = None;
        }
        Pending {
            owner: self,
            _gate: gate,
        }
    }

    /// Arm, issue the request and wait only if the request was accepted.
    pub fn call<F>(&self, timeout: Option<Duration>, issue: F) -> WaitOutcome<T>
    where
        F: FnOnce() -> NfaStatus,
    {
        let pending = self.arm();
        let status = issue();
        if !status.is_ok() {
            trace!("{}: request rejected ({})", self.name, status);
            return WaitOutcome::Rejected(status);
        }
        pending.wait(timeout)
    }

    /// Deliver a completion. Returns false when no request was armed.
    pub fn notify(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if !slot.armed {
            trace!("{}: notification with no pending request", self.name);
            return false;
        }
        slot.value = Some(value);
        self.cond.notify_all();
        true
    }

    /// Wake an armed waiter with [`WaitOutcome::Aborted`].
    pub fn abort(&self) {
        let mut slot = self.slot.lock();
        if slot.armed {
            slot.aborted = true;
            self.cond.notify_all();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().armed
    }
}

/// Armed request; dropping it disarms the rendezvous.
#[must_use = "an armed rendezvous must be waited on or dropped"]
pub struct Pending<'a, T> {
    owner: &'a Rendezvous<T>,
    _gate: MutexGuard<'a, ()>,
}

impl<T> Pending<'_, T> {
    /// Block until notified, aborted, or `timeout` elapses (`None` waits
    /// indefinitely).
    pub fn wait(self, timeout: Option<Duration>) -> WaitOutcome<T> {
        let owner = self.owner;
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut slot = owner.slot.lock();
        loop {
            if let Some(v) = slot.value.take() {
                return WaitOutcome::Completed(v);
            }
            if slot.aborted {
                return WaitOutcome::Aborted;
            }
            match deadline {
                Some(deadline) => {
                    if owner.cond.wait_until(&mut slot, deadline).timed_out() {
                        return match slot.value.take() {
                            Some(v) => WaitOutcome::Completed(v),
                            None => {
                                trace!("{}: wait timed out", owner.name);
                                WaitOutcome::TimedOut
                            }
                        };
                    }
                }
                None => owner.cond.wait(&mut slot),
            }
        }
    }
}

impl<T> Drop for Pending<'_, T> {
    fn drop(&mut self) {
        let mut slot = self.owner.slot.lock();
        slot.armed = false;
        slot.aborted = false;
        slot.value = None;
    }
}
