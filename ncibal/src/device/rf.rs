// ncibal/src/device/rf.rs

//! RF discovery and polling control, serialized with tag operations through
//! the shared RF-field lock.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::device::state::{DiscoveryState, NfcState};
use crate::hal::NciHal;
use crate::sync::{Rendezvous, WaitOutcome};
use crate::types::{NfaStatus, TechMask};

/// Recursive lock guarding the RF field: tag I/O, selection and discovery
/// start/stop all run under it.
pub type RfFieldLock = Arc<ReentrantMutex<()>>;

pub fn new_rf_field_lock() -> RfFieldLock {
    Arc::new(ReentrantMutex::new(()))
}

pub struct RfControl {
    hal: Arc<dyn NciHal>,
    state: Arc<NfcState>,
    field: RfFieldLock,
    polling: Rendezvous<NfaStatus>,
    wait: Duration,
}

impl RfControl {
    pub fn new(
        hal: Arc<dyn NciHal>,
        state: Arc<NfcState>,
        field: RfFieldLock,
        wait: Duration,
    ) -> Self {
        Self {
            hal,
            state,
            field,
            polling: Rendezvous::new("polling"),
            wait,
        }
    }

    /// Hold the RF field across several steps.
    pub fn lock_field(&self) -> ReentrantMutexGuard<'_, ()> {
        self.field.lock()
    }

    pub fn is_rf_enabled(&self) -> bool {
        self.state.is_rf_enabled()
    }

    /// Start or stop RF discovery; `rf_enabled` follows only a successful
    /// completion.
    pub fn start_rf_discovery(&self, start: bool) -> bool {
        let _field = self.field.lock();
        debug!("rf discovery {}", if start { "start" } else { "stop" });
        let outcome = self.polling.call(Some(self.wait), || {
            if start {
                self.hal.start_rf_discovery()
            } else {
                self.hal.stop_rf_discovery()
            }
        });
        self.commit("rf discovery", outcome, |s| s.rf_enabled = start)
    }

    pub fn start_polling(&self, mask: TechMask) -> bool {
        let _field = self.field.lock();
        debug!("enable polling {:?}", mask);
        let outcome = self
            .polling
            .call(Some(self.wait), || self.hal.enable_polling(mask));
        self.commit("enable polling", outcome, |s| s.polling_enabled = true)
    }

    pub fn stop_polling(&self) -> bool {
        let _field = self.field.lock();
        let outcome = self
            .polling
            .call(Some(self.wait), || self.hal.disable_polling());
        self.commit("disable polling", outcome, |s| s.polling_enabled = false)
    }

    /// Completion of any polling or RF discovery request.
    pub fn notify_polling(&self, status: NfaStatus) {
        self.polling.notify(status);
    }

    pub fn abort(&self) {
        self.polling.abort();
    }

    fn commit(
        &self,
        what: &str,
        outcome: WaitOutcome<NfaStatus>,
        apply: impl FnOnce(&mut DiscoveryState),
    ) -> bool {
        match outcome {
            WaitOutcome::Completed(NfaStatus::Ok) => {
                self.state.update(apply);
                true
            }
            WaitOutcome::Rejected(s) => {
                warn!("{}: rejected ({})", what, s);
                false
            }
            other => {
                warn!("{}: not completed ({:?})", what, other);
                false
            }
        }
    }
}
