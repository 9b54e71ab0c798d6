// ncibal/src/device/listener.rs

use std::sync::{Arc, Weak};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::tag::TagEndpoint;
use crate::types::TechMask;

/// Receiver of hardware-originated notifications.
///
/// Methods are invoked on the controller's callback thread and must not
/// block on bridge operations that wait for a completion.
pub trait DeviceHostListener: Send + Sync {
    fn on_remote_field_activated(&self) {}
    fn on_remote_field_deactivated(&self) {}
    fn on_hce_activated(&self, _technology: TechMask) {}
    fn on_hce_deactivated(&self, _technology: TechMask) {}
    fn on_hce_data_received(&self, _technology: TechMask, _data: Vec<u8>) {}
    fn on_tag_discovered(&self, _endpoint: Arc<TagEndpoint>) {}
    fn on_off_host_transaction(&self, _aid: Vec<u8>, _data: Vec<u8>, _se_name: String) {}
    fn on_ee_update(&self) {}
}

/// The single registered listener, held weakly.
#[derive(Default)]
pub struct ListenerSlot {
    inner: Mutex<Option<Weak<dyn DeviceHostListener>>>,
}

impl ListenerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, listener: Weak<dyn DeviceHostListener>) {
        *self.inner.lock() = Some(listener);
    }

    pub fn clear(&self) {
        *self.inner.lock() = None;
    }

    pub fn is_live(&self) -> bool {
        self.upgrade().is_some()
    }

    fn upgrade(&self) -> Option<Arc<dyn DeviceHostListener>> {
        self.inner.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Run `f` against the listener if it is still alive. The slot lock is
    /// released before the call.
    pub fn dispatch(&self, what: &str, f: impl FnOnce(&dyn DeviceHostListener)) {
        match self.upgrade() {
            Some(listener) => {
                trace!("dispatch {}", what);
                f(listener.as_ref());
            }
            None => debug!("no listener for {}", what),
        }
    }
}
