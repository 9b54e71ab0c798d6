// ncibal/src/hci/nfcee.rs

//! Lookup of the NFCEE currently connected for a secure element family.

use log::{debug, error};

use crate::hal::{EeInfo, NciHal};
use crate::constants::nfcee;

/// Selectors whose family is identified by odd NFCEE handles (SIM slots).
const ODD_FAMILY: [u8; 3] = [0x81, 0x83, 0x85];
/// Selectors whose family is identified by even NFCEE handles (eSE).
const EVEN_FAMILY: [u8; 3] = [0x82, 0x84, 0x86];

/// First active NFCEE in `ees` whose handle parity matches `selector`.
///
/// Returns `0x00` (the device host) when nothing matches, which callers treat
/// as "no off-host destination".
pub fn select_connected(ees: &[EeInfo], selector: u8) -> u8 {
    let want_odd = if ODD_FAMILY.contains(&selector) {
        true
    } else if EVEN_FAMILY.contains(&selector) {
        false
    } else {
        debug!("no nfcee family for selector {:#04x}", selector);
        return 0x00;
    };
    ees.iter()
        .find(|ee| ee.status == nfcee::STATUS_ACTIVE && ((ee.handle.0 & 0x01) != 0) == want_odd)
        .map(|ee| ee.handle.nfcee_id())
        .unwrap_or(0x00)
}

/// Query the controller and resolve the connected NFCEE for `selector`.
pub fn connected_nfcee_id(hal: &dyn NciHal, selector: u8) -> u8 {
    match hal.ee_get_info() {
        Ok(ees) => select_connected(&ees, selector),
        Err(status) => {
            error!("ee_get_info failed: {}", status);
            0x00
        }
    }
}
