// ncibal/src/config.rs
//! Tunable timing and routing parameters.
//!
//! Every default here is a vendor-tuned value; hosts override them through
//! [`BalConfig`] (optionally deserialized with the `serde` feature).

use crate::constants::{self, tag_timeout};
use crate::types::{AidMatchingMode, TechMask, Technology};
use crate::{Error, Result};

/// Per-technology transceive timeouts (milliseconds).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TagTimeouts {
    pub default_ms: u64,
    pub iso14443_3a_ms: u64,
    pub iso14443_3b_ms: u64,
    pub iso14443_4_ms: u64,
    pub felica_ms: u64,
    pub iso15693_ms: u64,
    pub ndef_ms: u64,
    pub ndef_formatable_ms: u64,
    pub mifare_classic_ms: u64,
    pub mifare_ultralight_ms: u64,
}

impl Default for TagTimeouts {
    fn default() -> Self {
        Self {
            default_ms: constants::DEFAULT_TIMEOUT_MS,
            iso14443_3a_ms: tag_timeout::ISO14443_3A,
            iso14443_3b_ms: tag_timeout::ISO14443_3B,
            iso14443_4_ms: tag_timeout::ISO14443_4,
            felica_ms: tag_timeout::FELICA,
            iso15693_ms: tag_timeout::ISO15693,
            ndef_ms: tag_timeout::NDEF,
            ndef_formatable_ms: tag_timeout::NDEF_FORMATABLE,
            mifare_classic_ms: tag_timeout::MIFARE_CLASSIC,
            mifare_ultralight_ms: tag_timeout::MIFARE_ULTRALIGHT,
        }
    }
}

impl TagTimeouts {
    /// Default timeout for a technology.
    pub fn for_technology(&self, tech: Technology) -> u64 {
        match tech {
            Technology::Iso14443_3A => self.iso14443_3a_ms,
            Technology::Iso14443_3B => self.iso14443_3b_ms,
            Technology::Iso14443_4 => self.iso14443_4_ms,
            Technology::Felica => self.felica_ms,
            Technology::Iso15693 => self.iso15693_ms,
            Technology::Ndef => self.ndef_ms,
            Technology::NdefFormatable => self.ndef_formatable_ms,
            Technology::MifareClassic => self.mifare_classic_ms,
            Technology::MifareUltralight => self.mifare_ultralight_ms,
            Technology::KovioBarcode | Technology::Unknown => self.default_ms,
        }
    }
}

/// Card emulation routing defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RoutingConfig {
    /// NFCEE id receiving the empty (default) AID.
    pub default_route: u8,
    /// NFCEE id used for technology and protocol routing off the host.
    pub default_offhost_route: u8,
    pub default_isodep_route: u8,
    pub aid_matching_mode: AidMatchingMode,
    pub offhost_aid_power_state: u8,
    pub host_listen_tech: TechMask,
    pub offhost_route_uicc: Vec<u8>,
    pub offhost_route_ese: Vec<u8>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_route: constants::ROUTE_HOST,
            default_offhost_route: constants::ROUTE_HOST,
            default_isodep_route: constants::ROUTE_HOST,
            aid_matching_mode: AidMatchingMode::ExactOnly,
            offhost_aid_power_state: 0x01,
            host_listen_tech: TechMask::A | TechMask::F,
            offhost_route_uicc: Vec::new(),
            offhost_route_ese: Vec::new(),
        }
    }
}

/// HCI pipe ids used to name the secure element of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HciConfig {
    pub ese_pipe: u8,
    pub sim_pipe: u8,
}

impl Default for HciConfig {
    fn default() -> Self {
        Self {
            ese_pipe: constants::DEFAULT_ESE_PIPE,
            sim_pipe: constants::DEFAULT_SIM_PIPE,
        }
    }
}

/// Top-level configuration for a [`crate::DeviceHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BalConfig {
    pub tag_timeouts: TagTimeouts,
    /// Bound applied to discovery, NDEF and presence completions.
    pub default_timeout_ms: u64,
    /// Bound applied to routing and NFCEE completions.
    pub ce_timeout_ms: u64,
    pub presence_check_delay_ms: u64,
    pub discovery_duration_ms: u16,
    pub reader_mode_discovery_duration_ms: u16,
    pub iso_dep_max_transceive: usize,
    pub presence_check_option: u8,
    pub routing: RoutingConfig,
    pub hci: HciConfig,
}

impl Default for BalConfig {
    fn default() -> Self {
        Self {
            tag_timeouts: TagTimeouts::default(),
            default_timeout_ms: constants::DEFAULT_TIMEOUT_MS,
            ce_timeout_ms: constants::DEFAULT_TIMEOUT_MS,
            presence_check_delay_ms: constants::DEFAULT_PRESENCE_CHECK_DELAY_MS,
            discovery_duration_ms: constants::DEFAULT_DISCOVERY_DURATION_MS,
            reader_mode_discovery_duration_ms: constants::READER_MODE_DISCOVERY_DURATION_MS,
            iso_dep_max_transceive: constants::ISO_DEP_MAX_TRANSCEIVE,
            presence_check_option: constants::PRESENCE_CHECK_DEFAULT,
            routing: RoutingConfig::default(),
            hci: HciConfig::default(),
        }
    }
}

impl BalConfig {
    /// Reject values that would turn bounded waits into instant failures.
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 || self.ce_timeout_ms == 0 {
            return Err(Error::Config("wait timeouts must be non-zero".into()));
        }
        if self.tag_timeouts.default_ms == 0 {
            return Err(Error::Config("default tag timeout must be non-zero".into()));
        }
        if self.presence_check_delay_ms == 0 {
            return Err(Error::Config("presence check delay must be non-zero".into()));
        }
        if self.hci.ese_pipe == self.hci.sim_pipe {
            return Err(Error::Config(format!(
                "ese and sim pipes must differ (both {:#04x})",
                self.hci.ese_pipe
            )));
        }
        Ok(())
    }
}
