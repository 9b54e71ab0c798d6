// ncibal/src/hal/traits.rs

use std::sync::Arc;

use crate::hal::events::{EeInfo, NciCallbacks, PowerStateRouting};
use crate::types::{Aid, EeHandle, NfaStatus, ProtocolMask, RoutingEntry, TechMask};

/// Controller primitives the bridge drives.
///
/// Each request returns its immediate status; anything other than
/// [`NfaStatus::Ok`] means no completion event will follow. Completions are
/// delivered to the [`NciCallbacks`] registered by [`NciHal::enable`], from a
/// thread owned by the implementation.
pub trait NciHal: Send + Sync {
    // Adaptation layer
    fn adaptation_initialize(&self);
    fn adaptation_finalize(&self);
    fn download_firmware(&self);
    fn dump(&self, fd: i32);
    fn factory_reset(&self);
    fn device_shutdown(&self);
    fn nci_version(&self) -> u8;

    // Stack lifecycle
    fn enable(&self, callbacks: Arc<dyn NciCallbacks>) -> NfaStatus;
    fn disable(&self, graceful: bool) -> NfaStatus;

    // Discovery
    fn enable_polling(&self, mask: TechMask) -> NfaStatus;
    fn disable_polling(&self) -> NfaStatus;
    fn enable_listening(&self) -> NfaStatus;
    fn disable_listening(&self) -> NfaStatus;
    fn start_rf_discovery(&self) -> NfaStatus;
    fn stop_rf_discovery(&self) -> NfaStatus;
    fn set_rf_discovery_duration(&self, duration_ms: u16) -> NfaStatus;
    fn set_power_sub_state(&self, screen_state: u8) -> NfaStatus;
    fn set_config(&self, param_id: u8, value: &[u8]) -> NfaStatus;

    // Reader/writer
    fn select(&self, disc_id: u8, protocol: u8, interface: u8) -> NfaStatus;
    fn deactivate(&self, sleep: bool) -> NfaStatus;
    fn send_raw_frame(&self, data: &[u8], presence_check_delay: u16) -> NfaStatus;
    fn register_ndef_handler(&self) -> NfaStatus;
    fn detect_ndef(&self) -> NfaStatus;
    fn read_ndef(&self) -> NfaStatus;
    fn write_ndef(&self, message: &[u8]) -> NfaStatus;
    fn presence_check(&self, option: u8) -> NfaStatus;
    fn format_tag(&self) -> NfaStatus;
    fn set_tag_read_only(&self, hard_lock: bool) -> NfaStatus;

    // NFCEE and routing
    fn hci_register(&self, app_name: &str) -> NfaStatus;
    fn ee_get_info(&self) -> Result<Vec<EeInfo>, NfaStatus>;
    fn ee_register(&self) -> NfaStatus;
    fn ee_deregister(&self) -> NfaStatus;
    fn ee_set_default_tech_routing(
        &self,
        handle: EeHandle,
        routing: PowerStateRouting<TechMask>,
    ) -> NfaStatus;
    fn ee_clear_default_tech_routing(&self, handle: EeHandle, mask: TechMask) -> NfaStatus;
    fn ee_set_default_proto_routing(
        &self,
        handle: EeHandle,
        routing: PowerStateRouting<ProtocolMask>,
    ) -> NfaStatus;
    fn ee_clear_default_proto_routing(&self, handle: EeHandle, mask: ProtocolMask) -> NfaStatus;
    fn ee_add_aid_routing(&self, entry: &RoutingEntry) -> NfaStatus;
    fn ee_remove_aid_routing(&self, aid: &[u8]) -> NfaStatus;
    fn ee_update_now(&self) -> NfaStatus;
    fn ee_mode_set(&self, handle: EeHandle, mode: u8) -> NfaStatus;
    fn ee_get_remaining_size(&self) -> NfaStatus;
    fn aid_table_size(&self) -> u16;

    // Host card emulation
    fn ce_set_iso_dep_listen_tech(&self, mask: TechMask) -> NfaStatus;
    fn ce_register_aid_on_dh(&self, aid: &Aid) -> NfaStatus;
}
