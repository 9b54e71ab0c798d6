// ncibal/src/device/state.rs

use parking_lot::Mutex;

use crate::constants::screen;

/// Process-wide discovery flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryState {
    pub is_enabled: bool,
    pub is_disabling: bool,
    pub rf_enabled: bool,
    pub discovery_enabled: bool,
    pub polling_enabled: bool,
    pub reader_mode_enabled: bool,
    pub is_tag_active: bool,
    pub is_reconnecting: bool,
    pub current_screen_state: u8,
    pub discovery_duration_ms: u16,
}

impl DiscoveryState {
    pub fn new(discovery_duration_ms: u16) -> Self {
        Self {
            is_enabled: false,
            is_disabling: false,
            rf_enabled: false,
            discovery_enabled: false,
            polling_enabled: false,
            reader_mode_enabled: false,
            is_tag_active: false,
            is_reconnecting: false,
            current_screen_state: screen::OFF_LOCKED,
            discovery_duration_ms,
        }
    }

    /// Enabled and not on the way down.
    pub fn is_nfc_active(&self) -> bool {
        self.is_enabled && !self.is_disabling
    }
}

/// Shared handle over [`DiscoveryState`].
///
/// Every component reads and mutates the flags through short critical
/// sections; the lock is never held across a hardware wait.
#[derive(Debug)]
pub struct NfcState {
    inner: Mutex<DiscoveryState>,
}

impl NfcState {
    pub fn new(discovery_duration_ms: u16) -> Self {
        Self {
            inner: Mutex::new(DiscoveryState::new(discovery_duration_ms)),
        }
    }

    pub fn snapshot(&self) -> DiscoveryState {
        *self.inner.lock()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut DiscoveryState) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn is_nfc_active(&self) -> bool {
        self.inner.lock().is_nfc_active()
    }

    /// NFC is active and a tag is currently activated in the field.
    pub fn is_tag_ready(&self) -> bool {
        let s = self.inner.lock();
        s.is_nfc_active() && s.is_tag_active
    }

    pub fn is_rf_enabled(&self) -> bool {
        self.inner.lock().rf_enabled
    }
}
