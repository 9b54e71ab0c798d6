// ncibal/src/tag/extras.rs

use crate::constants::{
    NFCB_APP_DATA_LEN, NFCB_PROTOCOL_INFO_LEN, ULTRALIGHT_C_BLANK_OTP, ULTRALIGHT_C_NDEF_CC,
    ULTRALIGHT_C_NDEF_MAJOR_VERSION, ULTRALIGHT_C_NDEF_TAG_SIZE, ULTRALIGHT_C_RESPONSE_LEN,
};
use crate::tag::DiscoveredTechnology;
use crate::types::{NdefMode, Technology};

/// Technology-specific details attached to one slot of a tag endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TechExtras {
    NfcA {
        sak: Option<u8>,
        atqa: Vec<u8>,
    },
    NfcB {
        app_data: Vec<u8>,
        protocol_info: Vec<u8>,
    },
    /// ISO 14443-4 over NFC-A.
    IsoDepA {
        historical_bytes: Vec<u8>,
    },
    /// ISO 14443-4 over NFC-B.
    IsoDepB {
        hi_layer_response: Vec<u8>,
    },
    NfcV {
        response_flags: u8,
        dsfid: u8,
    },
    MifareUltralight {
        is_ultralight_c: bool,
    },
    Ndef {
        message: Vec<u8>,
        forum_type: i32,
        length: u32,
        mode: NdefMode,
    },
    None,
}

/// Extras derivable from the captured bytes alone.
///
/// Mifare Ultralight needs a live probe and NDEF slots carry their extras
/// from creation; both yield `None` here.
pub fn from_bytes(slot: &DiscoveredTechnology, has_a_sibling: bool) -> TechExtras {
    match slot.technology {
        t if t.is_nfc_a() => TechExtras::NfcA {
            sak: slot.act.first().copied(),
            atqa: slot.poll.clone(),
        },
        Technology::Iso14443_3B => {
            if slot.poll.len() < NFCB_APP_DATA_LEN + NFCB_PROTOCOL_INFO_LEN {
                return TechExtras::None;
            }
            TechExtras::NfcB {
                app_data: slot.poll[..NFCB_APP_DATA_LEN].to_vec(),
                protocol_info: slot.poll
                    [NFCB_APP_DATA_LEN..NFCB_APP_DATA_LEN + NFCB_PROTOCOL_INFO_LEN]
                    .to_vec(),
            }
        }
        Technology::Iso14443_4 => {
            if has_a_sibling {
                TechExtras::IsoDepA {
                    historical_bytes: slot.act.clone(),
                }
            } else {
                TechExtras::IsoDepB {
                    hi_layer_response: slot.act.clone(),
                }
            }
        }
        Technology::Iso15693 => match slot.poll.as_slice() {
            [flags, dsfid, ..] => TechExtras::NfcV {
                response_flags: *flags,
                dsfid: *dsfid,
            },
            _ => TechExtras::None,
        },
        _ => TechExtras::None,
    }
}

/// Classify the answer to READ page 2 of a Mifare Ultralight.
///
/// A blank Ultralight-C reads zero lock and OTP bytes followed by `02 00`;
/// a formatted one carries an NDEF capability container announcing a major
/// version below 2 and more than 48 bytes of data area.
pub fn is_ultralight_c(response: &[u8]) -> bool {
    if response.len() != ULTRALIGHT_C_RESPONSE_LEN {
        return false;
    }
    let blank = response[2..8].iter().all(|&b| b == 0) && response[8..10] == ULTRALIGHT_C_BLANK_OTP;
    let formatted = response[4] == ULTRALIGHT_C_NDEF_CC
        && response[5] < ULTRALIGHT_C_NDEF_MAJOR_VERSION
        && response[6] > ULTRALIGHT_C_NDEF_TAG_SIZE;
    blank || formatted
}
