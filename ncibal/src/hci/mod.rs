// ncibal/src/hci/mod.rs

//! HCI transaction events from off-host secure elements.

pub mod nfcee;

use std::sync::Arc;

use log::{debug, error, warn};

use crate::config::HciConfig;
use crate::constants::{HCI_APP_NAME, HCI_EVT_TRANSACTION, se_name};
use crate::hal::{HciEvent, NciHal};
use crate::protocol::decode_transaction;
use crate::types::NfaStatus;
use crate::{Error, Result};

/// Off-host transaction reported to the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffHostTransaction {
    pub aid: Vec<u8>,
    pub data: Vec<u8>,
    pub se_name: String,
}

/// Turns EVT_TRANSACTION buffers into [`OffHostTransaction`]s.
pub struct TransactionDecoder {
    hal: Arc<dyn NciHal>,
    config: HciConfig,
}

impl TransactionDecoder {
    pub fn new(hal: Arc<dyn NciHal>, config: HciConfig) -> Self {
        Self { hal, config }
    }

    /// Register the HCI application with the controller.
    pub fn initialize(&self) -> bool {
        debug!("hci: register as {}", HCI_APP_NAME);
        let status = self.hal.hci_register(HCI_APP_NAME);
        if status != NfaStatus::Ok {
            error!("hci register failed: {}", status);
            return false;
        }
        true
    }

    /// Name of the secure element behind `pipe`.
    ///
    /// The eSE pipe reports `DHSE1` when NFCEE 0x84 is the connected even
    /// element; the SIM pipe reports `SIM1` only when NFCEE 0x81 is the
    /// connected odd element.
    pub fn se_name_for_pipe(&self, pipe: u8) -> Result<&'static str> {
        if pipe == self.config.ese_pipe {
            let id = nfcee::connected_nfcee_id(self.hal.as_ref(), 0x82);
            Ok(if id == 0x84 { se_name::DHSE } else { se_name::ESE })
        } else if pipe == self.config.sim_pipe {
            let id = nfcee::connected_nfcee_id(self.hal.as_ref(), 0x81);
            Ok(if id == 0x81 {
                se_name::SIM1
            } else {
                se_name::SIM2
            })
        } else {
            Err(Error::UnknownPipe(pipe))
        }
    }

    /// Decode a transaction received on `pipe`.
    pub fn decode(&self, pipe: u8, buf: &[u8]) -> Result<OffHostTransaction> {
        let se_name = self.se_name_for_pipe(pipe)?;
        let t = decode_transaction(buf)?;
        Ok(OffHostTransaction {
            aid: t.aid,
            data: t.data,
            se_name: se_name.to_string(),
        })
    }

    /// Handle one HCI event; only transaction events produce a result.
    pub fn handle_event(&self, event: &HciEvent) -> Option<OffHostTransaction> {
        let HciEvent::EventReceived {
            pipe,
            evt_code,
            data,
        } = event
        else {
            debug!("hci: ignoring {:?}", event);
            return None;
        };
        debug!(
            "hci: evt_code={:#04x} pipe={:#04x} len={}",
            evt_code,
            pipe,
            data.len()
        );
        if *evt_code != HCI_EVT_TRANSACTION {
            return None;
        }
        match self.decode(*pipe, data) {
            Ok(t) => Some(t),
            Err(e @ Error::UnknownPipe(_)) => {
                error!("hci: {}", e);
                None
            }
            Err(e) => {
                warn!("hci: transaction skipped: {}", e);
                None
            }
        }
    }
}
