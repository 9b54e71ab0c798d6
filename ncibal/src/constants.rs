// ncibal/src/constants.rs
//! NCI/NFA protocol constants used across the crate

/// RF protocol codes reported in activation and discovery notifications.
pub mod protocol {
    pub const UNKNOWN: u8 = 0x00;
    pub const T1T: u8 = 0x01;
    pub const T2T: u8 = 0x02;
    pub const T3T: u8 = 0x03;
    pub const ISO_DEP: u8 = 0x04;
    pub const NFC_DEP: u8 = 0x05;
    /// Type 5 tag (ISO 15693)
    pub const T5T: u8 = 0x06;
    /// Proprietary MIFARE Classic protocol
    pub const MIFARE: u8 = 0x80;
}

/// RF technology and mode codes (poll side below 0x80, listen side above).
pub mod mode {
    pub const POLL_A: u8 = 0x00;
    pub const POLL_B: u8 = 0x01;
    pub const POLL_F: u8 = 0x02;
    pub const POLL_A_ACTIVE: u8 = 0x03;
    pub const POLL_F_ACTIVE: u8 = 0x05;
    pub const POLL_V: u8 = 0x06;
    pub const POLL_B_PRIME: u8 = 0x74;
    pub const POLL_KOVIO: u8 = 0x77;
    pub const LISTEN_A: u8 = 0x80;
    pub const LISTEN_B: u8 = 0x81;
    pub const LISTEN_F: u8 = 0x82;
    pub const LISTEN_A_ACTIVE: u8 = 0x83;
    pub const LISTEN_F_ACTIVE: u8 = 0x85;
    pub const LISTEN_ISO15693: u8 = 0x86;
    pub const LISTEN_B_PRIME: u8 = 0xF4;
}

/// RF interface codes used by select and activation.
pub mod interface {
    pub const EE_DIRECT_RF: u8 = 0x00;
    pub const FRAME: u8 = 0x01;
    pub const ISO_DEP: u8 = 0x02;
    pub const NFC_DEP: u8 = 0x03;
    pub const MIFARE: u8 = 0x80;
}

/// NCI version codes returned by the controller.
pub const NCI_VERSION_1_0: u8 = 0x10;
pub const NCI_VERSION_2_0: u8 = 0x20;

/// Screen state codes passed to the power sub-state command.
pub mod screen {
    pub const UNKNOWN: u8 = 0x00;
    pub const ON_UNLOCKED: u8 = 0x01;
    pub const OFF_UNLOCKED: u8 = 0x02;
    pub const ON_LOCKED: u8 = 0x04;
    pub const OFF_LOCKED: u8 = 0x08;
    /// Bits of a caller mask that carry the screen state.
    pub const STATE_MASK: u8 = 0x0F;
    /// Caller mask bit requesting tag polling while the screen is locked.
    pub const POLLING_TAG_MASK: u8 = 0x10;
}

/// Discovery parameter configuration (`CON_DISCOVERY_PARAM`).
pub mod discovery_param {
    pub const PARAM_ID: u8 = 0x02;
    pub const POLL_DH_ENABLE: u8 = 0x01;
    pub const POLL_DH_DISABLE: u8 = 0x00;
    pub const LISTEN_DH_NFCEE_ENABLE: u8 = 0x00;
}

/// Discovery durations in milliseconds.
pub const DEFAULT_DISCOVERY_DURATION_MS: u16 = 500;
pub const READER_MODE_DISCOVERY_DURATION_MS: u16 = 200;

/// Default wait applied to hardware completions, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Per-technology transceive timeouts, in milliseconds.
pub mod tag_timeout {
    pub const ISO14443_3A: u64 = 618;
    pub const ISO14443_3B: u64 = 1000;
    pub const ISO14443_4: u64 = 618;
    pub const FELICA: u64 = 255;
    pub const ISO15693: u64 = 1000;
    pub const NDEF: u64 = 1000;
    pub const NDEF_FORMATABLE: u64 = 1000;
    pub const MIFARE_CLASSIC: u64 = 618;
    pub const MIFARE_ULTRALIGHT: u64 = 618;
}

/// Presence-check watchdog delay used when callers pass a non-positive delay.
pub const DEFAULT_PRESENCE_CHECK_DELAY_MS: u64 = 125;

/// Largest ISO-DEP frame the controller accepts without extended APDUs.
pub const ISO_DEP_MAX_TRANSCEIVE: usize = 261;

/// Maximum AID length in bytes.
pub const MAX_AID_LEN: usize = 16;

/// AID value used to clear the whole AID routing table.
pub const REMOVE_ALL_AID: [u8; 8] = [0xFF; 8];

/// Device host route id.
pub const ROUTE_HOST: u8 = 0x00;

/// Handle prefix applied to NFCEE ids.
pub const NFCEE_HANDLE_GROUP: u16 = 0x400;

/// Power state used for device host routes.
pub const ROUTE_POWER_STATE_HOST: u8 = 0x11;
/// Power state used when secure NFC is on (switch-on only).
pub const ROUTE_POWER_STATE_SECURE: u8 = 0x01;

/// NFCEE status and mode values.
pub mod nfcee {
    pub const STATUS_ACTIVE: u8 = 0x00;
    pub const STATUS_INACTIVE: u8 = 0x01;
    pub const MODE_DEACTIVATE: u8 = 0x00;
    pub const MODE_ACTIVATE: u8 = 0x01;
    pub const INTERFACE_HCI_ACCESS: u8 = 0x01;
}

/// HCI event code for off-host transaction notifications.
pub const HCI_EVT_TRANSACTION: u8 = 0x12;

/// Default HCI pipe ids for the embedded secure element and the SIM.
pub const DEFAULT_ESE_PIPE: u8 = 0x16;
pub const DEFAULT_SIM_PIPE: u8 = 0x0A;

/// HCI application name registered at start-up.
pub const HCI_APP_NAME: &str = "ncibal";

/// Secure element names attached to off-host transactions.
pub mod se_name {
    pub const ESE: &str = "eSE1";
    pub const DHSE: &str = "DHSE1";
    pub const SIM1: &str = "SIM1";
    pub const SIM2: &str = "SIM2";
}

/// Topaz (T1T) maximum NDEF sizes selected by the HR0 byte.
pub const TOPAZ96_MAX_MESSAGE_SIZE: u32 = 90;
pub const TOPAZ512_MAX_MESSAGE_SIZE: u32 = 462;
pub const TOPAZ96_HR0: u8 = 0x11;
pub const TOPAZ512_HR0: u8 = 0x12;

/// Felica Lite system code.
pub const FELICA_LITE_SYSTEM_CODE: u16 = 0x88B4;

/// DESFire "get version" command and its expected continuation marker.
pub const DESFIRE_GET_VERSION: [u8; 5] = [0x90, 0x60, 0x00, 0x00, 0x00];
pub const DESFIRE_RESPONSE_LEN: usize = 9;
pub const DESFIRE_MARKER: [u8; 2] = [0x91, 0xAF];

/// MIFARE Classic authentication commands (never retried).
pub const MIFARE_AUTH_A: u8 = 0x60;
pub const MIFARE_AUTH_B: u8 = 0x61;

/// Ultralight-C probe: READ page 2.
pub const ULTRALIGHT_READ_PAGE2: [u8; 2] = [0x30, 0x02];
pub const ULTRALIGHT_C_RESPONSE_LEN: usize = 16;
/// Page 3 of a blank Ultralight-C: zero lock bytes, OTP `02 00`.
pub const ULTRALIGHT_C_BLANK_OTP: [u8; 2] = [0x02, 0x00];
/// Capability container of an NDEF-formatted Ultralight-C.
pub const ULTRALIGHT_C_NDEF_CC: u8 = 0xE1;
pub const ULTRALIGHT_C_NDEF_MAJOR_VERSION: u8 = 0x20;
pub const ULTRALIGHT_C_NDEF_TAG_SIZE: u8 = 0x06;

/// NDEF message holding a single empty record (MB|ME|SR, TNF empty).
pub const EMPTY_NDEF_MESSAGE: [u8; 3] = [0xD0, 0x00, 0x00];

/// Length of the NFC-B application data and protocol info fields.
pub const NFCB_APP_DATA_LEN: usize = 4;
pub const NFCB_PROTOCOL_INFO_LEN: usize = 3;

/// Presence-check option passed to the controller (default algorithm).
pub const PRESENCE_CHECK_DEFAULT: u8 = 0x00;
