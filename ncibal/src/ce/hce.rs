// ncibal/src/ce/hce.rs

use log::warn;
use parking_lot::Mutex;

use crate::types::NfaStatus;

/// Reassembles host card emulation data split across `Continue` fragments.
#[derive(Debug, Default)]
pub struct HceAssembler {
    buf: Mutex<Vec<u8>>,
}

impl HceAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one data event. Returns the complete APDU once a fragment with
    /// `Ok` status closes it; any other status drops what was collected.
    pub fn push(&self, status: NfaStatus, data: &[u8]) -> Option<Vec<u8>> {
        let mut buf = self.buf.lock();
        match status {
            NfaStatus::Ok | NfaStatus::Continue => buf.extend_from_slice(data),
            other => {
                warn!("hce data dropped ({}), {} bytes pending", other, buf.len());
                buf.clear();
                return None;
            }
        }
        if status == NfaStatus::Ok {
            Some(std::mem::take(&mut *buf))
        } else {
            None
        }
    }

    pub fn reset(&self) {
        self.buf.lock().clear();
    }
}
