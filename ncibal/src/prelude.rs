// ncibal/src/prelude.rs

pub use crate::config::{BalConfig, HciConfig, RoutingConfig, TagTimeouts};
pub use crate::device::{DeviceHost, DeviceHostBuilder, DeviceHostListener};
pub use crate::hal::{NciCallbacks, NciHal, RfActivation};
pub use crate::hci::OffHostTransaction;
pub use crate::tag::{TagEndpoint, TechExtras};
pub use crate::{
    Aid, AidInfo, AidMatchingMode, EeHandle, Error, NdefInfo, NdefMode, NfaStatus, Result,
    TagTechnology, TechMask, Technology,
};

// Re-export small utilities for convenience
pub use crate::utils::{bytes_to_hex, ms, parse_hex};
