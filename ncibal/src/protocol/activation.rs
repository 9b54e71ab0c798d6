// ncibal/src/protocol/activation.rs

//! Interpretation of activation notifications: which technologies a target
//! exposes, its UID, the raw poll/activation bytes kept per technology, and
//! the datasheet signatures used by the formattability heuristics.

use log::{debug, warn};

use crate::constants::{
    self, FELICA_LITE_SYSTEM_CODE, NFCB_APP_DATA_LEN, TOPAZ96_HR0, TOPAZ96_MAX_MESSAGE_SIZE,
    TOPAZ512_HR0, TOPAZ512_MAX_MESSAGE_SIZE, interface, mode, protocol,
};
use crate::hal::{InterfaceParams, ProtocolParams, RfActivation, RfTechParams};
use crate::types::Technology;

/// Length of the NFC-F poll bytes: PAD/PMm followed by the system code.
pub const F_POLL_LEN: usize = 10;
const SENSF_PMM_OFFSET: usize = 8;
const SENSF_PMM_LEN: usize = 8;

pub fn is_a_mode(m: u8) -> bool {
    matches!(
        m,
        mode::POLL_A | mode::POLL_A_ACTIVE | mode::LISTEN_A | mode::LISTEN_A_ACTIVE
    )
}

pub fn is_b_mode(m: u8) -> bool {
    matches!(
        m,
        mode::POLL_B | mode::POLL_B_PRIME | mode::LISTEN_B | mode::LISTEN_B_PRIME
    )
}

pub fn is_f_mode(m: u8) -> bool {
    matches!(
        m,
        mode::POLL_F | mode::POLL_F_ACTIVE | mode::LISTEN_F | mode::LISTEN_F_ACTIVE
    )
}

pub fn is_v_mode(m: u8) -> bool {
    matches!(m, mode::POLL_V | mode::LISTEN_ISO15693)
}

/// Poll-side modes live below 0x80.
pub fn is_poll_mode(m: u8) -> bool {
    m < mode::LISTEN_A
}

/// RF interface used to select a target speaking `protocol`.
pub fn rf_interface(protocol_code: u8) -> u8 {
    match protocol_code {
        protocol::ISO_DEP => interface::ISO_DEP,
        protocol::MIFARE => interface::MIFARE,
        _ => interface::FRAME,
    }
}

/// Technologies exposed by one activation, in the order they are listed.
///
/// ISO-DEP targets expose the underlying NFC-A/NFC-B technology first and
/// then ISO 14443-4; every other protocol maps to a single technology.
pub fn technologies(act: &RfActivation) -> Vec<Technology> {
    match act.protocol {
        protocol::T1T => vec![Technology::Iso14443_3A],
        protocol::T2T => match &act.tech_params {
            RfTechParams::A {
                nfcid1, sel_rsp, ..
            } if nfcid1.first() == Some(&0x04) && *sel_rsp == 0 => {
                vec![Technology::MifareUltralight]
            }
            _ => vec![Technology::Iso14443_3A],
        },
        protocol::T3T => vec![Technology::Felica],
        protocol::ISO_DEP => {
            if is_a_mode(act.mode) {
                vec![Technology::Iso14443_3A, Technology::Iso14443_4]
            } else if is_b_mode(act.mode) {
                vec![Technology::Iso14443_3B, Technology::Iso14443_4]
            } else {
                vec![Technology::Iso14443_4]
            }
        }
        protocol::T5T => vec![Technology::Iso15693],
        protocol::MIFARE => vec![Technology::MifareClassic],
        other => {
            debug!("unmapped activation protocol {:#04x}", other);
            vec![Technology::Unknown]
        }
    }
}

fn i93_params(act: &RfActivation) -> Option<([u8; 8], u8, u8)> {
    match (&act.protocol_params, &act.tech_params) {
        (ProtocolParams::T5t { uid, afi, dsfid }, _) => Some((*uid, *afi, *dsfid)),
        (_, RfTechParams::V { uid, afi, dsfid }) => Some((*uid, *afi, *dsfid)),
        _ => None,
    }
}

/// Target identifier: NFCID1, NFCID0, NFCID2 or the byte-reversed
/// ISO 15693 UID depending on the RF mode.
pub fn uid(act: &RfActivation) -> Vec<u8> {
    match &act.tech_params {
        RfTechParams::A { nfcid1, .. } if is_a_mode(act.mode) => nfcid1.clone(),
        RfTechParams::B { nfcid0, .. } if is_b_mode(act.mode) => nfcid0.to_vec(),
        RfTechParams::F { nfcid2, .. } if is_f_mode(act.mode) => nfcid2.to_vec(),
        _ if is_v_mode(act.mode) => match i93_params(act) {
            Some((uid, _, _)) => uid.iter().rev().copied().collect(),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Raw poll bytes: SENS_RES for NFC-A, SENSB_RES without NFCID0 for NFC-B,
/// PAD/PMm plus system code for NFC-F and `[AFI, DSFID]` for NFC-V.
pub fn poll_bytes(act: &RfActivation) -> Vec<u8> {
    match &act.tech_params {
        RfTechParams::A { sens_res, .. } if is_a_mode(act.mode) => sens_res.to_vec(),
        RfTechParams::B { sensb_res, .. } if is_b_mode(act.mode) => {
            if sensb_res.len() > NFCB_APP_DATA_LEN {
                sensb_res[NFCB_APP_DATA_LEN..].to_vec()
            } else {
                warn!("sensb_res length {} too short", sensb_res.len());
                Vec::new()
            }
        }
        RfTechParams::F { sensf_res, .. } if is_f_mode(act.mode) => {
            let mut out = [0u8; F_POLL_LEN];
            if let Some(pmm) = sensf_res.get(SENSF_PMM_OFFSET..SENSF_PMM_OFFSET + SENSF_PMM_LEN) {
                out[..SENSF_PMM_LEN].copy_from_slice(pmm);
            }
            if let ProtocolParams::T3t { system_codes } = &act.protocol_params {
                if let Some(code) = system_codes.first() {
                    out[SENSF_PMM_LEN..].copy_from_slice(&code.to_be_bytes());
                }
            }
            out.to_vec()
        }
        _ if is_v_mode(act.mode) => match i93_params(act) {
            Some((_, afi, dsfid)) => vec![afi, dsfid],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn sel_rsp(act: &RfActivation) -> Vec<u8> {
    match &act.tech_params {
        RfTechParams::A { sel_rsp, .. } => vec![*sel_rsp],
        _ => Vec::new(),
    }
}

/// Raw activation bytes kept for the slot of `tech`.
pub fn act_bytes(act: &RfActivation, tech: Technology) -> Vec<u8> {
    match act.protocol {
        protocol::T1T | protocol::T2T | protocol::MIFARE => sel_rsp(act),
        protocol::ISO_DEP => match tech {
            Technology::Iso14443_3A => sel_rsp(act),
            Technology::Iso14443_4 => match &act.interface_params {
                InterfaceParams::IsoDepA { historical_bytes } if is_a_mode(act.mode) => {
                    historical_bytes.clone()
                }
                InterfaceParams::IsoDepB { hi_info } if is_b_mode(act.mode) => hi_info.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        },
        protocol::T5T => match i93_params(act) {
            Some((_, afi, dsfid)) => vec![afi, dsfid],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Maximum NDEF size of a Topaz T1T, selected by HR0; zero otherwise.
pub fn t1t_max_message_size(act: &RfActivation) -> u32 {
    if act.protocol != protocol::T1T {
        return 0;
    }
    match &act.protocol_params {
        ProtocolParams::T1t { hr } => match hr[0] {
            TOPAZ96_HR0 => TOPAZ96_MAX_MESSAGE_SIZE,
            TOPAZ512_HR0 => TOPAZ512_MAX_MESSAGE_SIZE,
            other => {
                warn!("unknown t1t hr0 {:#04x}", other);
                0
            }
        },
        _ => 0,
    }
}

/// Product signatures recognised at activation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagSignatures {
    pub felica_lite: bool,
    pub mifare_ultralight: bool,
    pub infineon_my_d_move: bool,
    pub kovio_type2: bool,
    pub mifare_desfire: bool,
}

impl TagSignatures {
    pub fn from_activation(act: &RfActivation) -> Self {
        let mut sig = TagSignatures::default();

        if act.protocol == protocol::T3T {
            if let ProtocolParams::T3t { system_codes } = &act.protocol_params {
                sig.felica_lite = system_codes.contains(&FELICA_LITE_SYSTEM_CODE);
            }
        }

        if let RfTechParams::A {
            sens_res,
            nfcid1,
            sel_rsp,
        } = &act.tech_params
        {
            let id0 = nfcid1.first().copied();
            if act.mode == mode::POLL_A {
                // MF0ICU1: ATQA 0x0044, SAK 0x00 or 0x04, NXP manufacturer.
                sig.mifare_ultralight = sens_res == &[0x44, 0x00]
                    && (*sel_rsp == 0x00 || *sel_rsp == 0x04)
                    && id0 == Some(0x04);
                // my-d move: Infineon manufacturer, product nibble 0x3.
                sig.infineon_my_d_move =
                    id0 == Some(0x05) && nfcid1.get(1).is_some_and(|b| b & 0xF0 == 0x30);
                sig.kovio_type2 = id0 == Some(0x37);
            }
            if matches!(
                act.mode,
                mode::POLL_A | mode::LISTEN_A | mode::LISTEN_A_ACTIVE
            ) {
                sig.mifare_desfire = sens_res == &[0x44, 0x03] && *sel_rsp == 0x20;
            }
        }
        sig
    }

    /// Formattability of a T2T target.
    pub fn t2t_formattable(&self) -> bool {
        self.mifare_ultralight || self.infineon_my_d_move || self.kovio_type2
    }
}

/// Whether a multi-protocol discovery result names a target that can be
/// selected by the reader (anything but NFC-DEP).
pub fn is_selectable(protocol_code: u8) -> bool {
    protocol_code != constants::protocol::NFC_DEP
}
