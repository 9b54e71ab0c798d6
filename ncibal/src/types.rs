// ncibal/src/types.rs

use crate::Error;
use crate::constants::{MAX_AID_LEN, NFCEE_HANDLE_GROUP, protocol};
use bitflags::bitflags;
use derive_more::Display;
use std::convert::TryFrom;

/// Immediate or completion status reported by the controller.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NfaStatus {
    #[display(fmt = "ok")]
    Ok,
    #[display(fmt = "rejected")]
    Rejected,
    #[display(fmt = "failed")]
    Failed,
    #[display(fmt = "busy")]
    Busy,
    #[display(fmt = "timeout")]
    Timeout,
    /// More data follows in a later event.
    #[display(fmt = "continue")]
    Continue,
    #[display(fmt = "status {:#04x}", _0)]
    Other(u8),
}

impl NfaStatus {
    pub fn is_ok(self) -> bool {
        self == NfaStatus::Ok
    }
}

/// Target technology of one discovery slot.
///
/// The numeric codes double as indices into the per-technology timeout table.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Technology {
    Iso14443_3A,
    Iso14443_3B,
    Iso14443_4,
    Felica,
    Iso15693,
    Ndef,
    NdefFormatable,
    MifareClassic,
    MifareUltralight,
    KovioBarcode,
    Unknown,
}

impl Technology {
    /// Number of entries in the per-technology timeout table.
    pub const TABLE_SIZE: usize = 10;

    pub const fn code(self) -> i32 {
        match self {
            Technology::Unknown => -1,
            Technology::Iso14443_3A => 1,
            Technology::Iso14443_3B => 2,
            Technology::Iso14443_4 => 3,
            Technology::Felica => 4,
            Technology::Iso15693 => 5,
            Technology::Ndef => 6,
            Technology::NdefFormatable => 7,
            Technology::MifareClassic => 8,
            Technology::MifareUltralight => 9,
            Technology::KovioBarcode => 10,
        }
    }

    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Technology::Iso14443_3A,
            2 => Technology::Iso14443_3B,
            3 => Technology::Iso14443_4,
            4 => Technology::Felica,
            5 => Technology::Iso15693,
            6 => Technology::Ndef,
            7 => Technology::NdefFormatable,
            8 => Technology::MifareClassic,
            9 => Technology::MifareUltralight,
            10 => Technology::KovioBarcode,
            _ => Technology::Unknown,
        }
    }

    /// NFC-A family technologies share SAK/ATQA extras.
    pub fn is_nfc_a(self) -> bool {
        matches!(self, Technology::Iso14443_3A | Technology::MifareClassic)
    }
}

/// Coarse technology kind exposed to tag consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagTechnology {
    Invalid = 0,
    Ndef = 1,
    IsoDep = 2,
    MifareClassic = 3,
    MifareUltralight = 4,
    Iso15693 = 5,
    Felica = 6,
    NdefFormatable = 7,
}

impl From<Technology> for TagTechnology {
    fn from(t: Technology) -> Self {
        match t {
            Technology::Iso14443_3A | Technology::Iso14443_3B | Technology::Iso14443_4 => {
                TagTechnology::IsoDep
            }
            Technology::Felica => TagTechnology::Felica,
            Technology::Iso15693 => TagTechnology::Iso15693,
            Technology::Ndef => TagTechnology::Ndef,
            Technology::NdefFormatable => TagTechnology::NdefFormatable,
            Technology::MifareClassic => TagTechnology::MifareClassic,
            Technology::MifareUltralight => TagTechnology::MifareUltralight,
            Technology::KovioBarcode | Technology::Unknown => TagTechnology::Invalid,
        }
    }
}

bitflags! {
    /// RF technology selection for polling and listening.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TechMask: u8 {
        const A = 0x01;
        const B = 0x02;
        const F = 0x04;
        const V = 0x08;
    }
}

impl TechMask {
    /// Technologies polled when the caller asks for the default set.
    pub const DEFAULT_POLL: Self = Self::A.union(Self::B).union(Self::F).union(Self::V);
}

bitflags! {
    /// Protocol selection for default protocol routing.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ProtocolMask: u8 {
        const T1T = 0x01;
        const T2T = 0x02;
        const T3T = 0x04;
        const ISO_DEP = 0x08;
        const NFC_DEP = 0x10;
    }
}

bitflags! {
    /// Flags reported with an NDEF detection result.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NdefFlags: u8 {
        const READ_ONLY = 0x01;
        const FORMATED = 0x02;
        const SUPPORTED = 0x04;
        const UNKNOWN = 0x08;
        const FORMATABLE = 0x10;
    }
}

/// Read/write mode of an NDEF tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NdefMode {
    ReadOnly = 1,
    ReadWrite = 2,
    Unknown = 3,
}

/// Size and access mode returned by a successful NDEF check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdefInfo {
    pub max_size: u32,
    pub mode: NdefMode,
}

/// NDEF forum tag type reported to consumers.
pub fn ndef_forum_type(protocol_code: u8) -> i32 {
    match protocol_code {
        protocol::T1T => 1,
        protocol::T2T => 2,
        protocol::T3T => 3,
        protocol::ISO_DEP => 4,
        protocol::MIFARE => 101,
        _ => -1,
    }
}

/// Application identifier (0-16 bytes; empty selects the default route).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Aid(Vec<u8>);

impl Aid {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(&self.0)
    }
}

impl TryFrom<&[u8]> for Aid {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() > MAX_AID_LEN {
            return Err(Error::InvalidAidLength {
                max: MAX_AID_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.to_vec()))
    }
}

/// AID matching qualifier attached to a routing entry.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[display(fmt = "{:#04x}", _0)]
pub struct AidInfo(pub u8);

impl AidInfo {
    pub const EXACT: Self = Self(0x00);
    pub const PREFIX: Self = Self(0x10);
    pub const SUBSET: Self = Self(0x20);
}

/// How the controller matches AIDs in the routing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AidMatchingMode {
    #[default]
    ExactOnly = 0,
    ExactOrPrefix = 1,
    PrefixOnly = 2,
    ExactOrSubsetOrPrefix = 3,
}

/// NFCEE handle (NFCEE id in the low byte, `0x400` group prefix).
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[display(fmt = "{:#06x}", _0)]
pub struct EeHandle(pub u16);

impl EeHandle {
    /// The device host.
    pub const HOST: Self = Self(0x400);

    pub const fn from_nfcee_id(id: u8) -> Self {
        Self(NFCEE_HANDLE_GROUP | id as u16)
    }

    /// NFCEE id carried in the low byte.
    pub const fn nfcee_id(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

/// One AID routing table edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingEntry {
    pub aid: Aid,
    pub route: EeHandle,
    pub power_state: u8,
    pub aid_info: AidInfo,
}
