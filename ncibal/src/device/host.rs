// ncibal/src/device/host.rs

use std::sync::Arc;

use log::debug;

use crate::ce::CardEmulationRouter;
use crate::constants::ISO_DEP_MAX_TRANSCEIVE;
use crate::device::controller::DiscoveryController;
use crate::device::listener::{DeviceHostListener, ListenerSlot};
use crate::types::{Aid, AidInfo, AidMatchingMode, TechMask};
use crate::Result;

/// Public entry point of the bridge.
///
/// Owns the controller context and forwards every call to the component
/// responsible for it. Dropping the host deinitializes the stack.
pub struct DeviceHost {
    controller: Arc<DiscoveryController>,
    listener: Arc<ListenerSlot>,
}

impl DeviceHost {
    pub(crate) fn new(controller: Arc<DiscoveryController>, listener: Arc<ListenerSlot>) -> Self {
        Self {
            controller,
            listener,
        }
    }

    fn ce(&self) -> &Arc<CardEmulationRouter> {
        self.controller.card_emulation()
    }

    /// Register the listener receiving hardware notifications. Only a weak
    /// reference is kept; a dropped listener silently stops receiving them.
    pub fn set_listener(&self, listener: &Arc<dyn DeviceHostListener>) {
        debug!("DeviceHost::set_listener");
        self.listener.set(Arc::downgrade(listener));
    }

    pub fn initialize(&self) -> bool {
        debug!("DeviceHost::initialize");
        self.controller.initialize()
    }

    pub fn deinitialize(&self) -> bool {
        debug!("DeviceHost::deinitialize");
        self.controller.deinitialize()
    }

    pub fn is_nfc_active(&self) -> bool {
        self.controller.is_nfc_active()
    }

    /// Start discovery. `tech_mask` of `None` polls the default technology
    /// set.
    pub fn enable_discovery(
        &self,
        tech_mask: Option<TechMask>,
        enable_reader_mode: bool,
        enable_host_routing: bool,
        restart: bool,
    ) {
        debug!("DeviceHost::enable_discovery");
        self.controller
            .enable_discovery(tech_mask, enable_reader_mode, enable_host_routing, restart);
    }

    pub fn disable_discovery(&self) {
        debug!("DeviceHost::disable_discovery");
        self.controller.disable_discovery();
    }

    pub fn send_raw_frame(&self, data: &[u8]) -> bool {
        debug!("DeviceHost::send_raw_frame");
        self.controller.send_raw_frame(data)
    }

    pub fn set_screen_status(&self, screen_state_mask: u8) -> bool {
        debug!("DeviceHost::set_screen_status");
        self.controller.set_screen_status(screen_state_mask);
        true
    }

    pub fn get_nci_version(&self) -> u8 {
        debug!("DeviceHost::get_nci_version");
        self.controller.get_nci_version()
    }

    pub fn set_secure_nfc(&self, secure: bool) -> bool {
        debug!("DeviceHost::set_secure_nfc");
        self.ce().set_secure_nfc(secure)
    }

    pub fn get_iso_dep_max_transceive_length(&self) -> usize {
        debug!("DeviceHost::get_iso_dep_max_transceive_length");
        self.controller.get_iso_dep_max_transceive_length()
    }

    pub fn register_t3t_identifier(&self, identifier: &[u8]) -> bool {
        debug!("DeviceHost::register_t3t_identifier");
        self.controller.register_t3t_identifier(identifier)
    }

    pub fn deregister_t3t_identifier(&self, identifier: &[u8]) {
        debug!("DeviceHost::deregister_t3t_identifier");
        if !identifier.is_empty() {
            self.controller.deregister_t3t_identifier(-1);
        }
    }

    pub fn clear_t3t_identifiers_cache(&self) {
        debug!("DeviceHost::clear_t3t_identifiers_cache");
        self.controller.clear_t3t_identifiers_cache();
    }

    pub fn get_lf_t3t_max(&self) -> i32 {
        debug!("DeviceHost::get_lf_t3t_max");
        self.controller.get_lf_t3t_max()
    }

    pub fn get_last_error(&self) -> i32 {
        debug!("DeviceHost::get_last_error");
        self.controller.get_last_error()
    }

    /// Wake every thread blocked on a hardware completion.
    pub fn abort(&self) {
        debug!("DeviceHost::abort");
        self.controller.abort();
    }

    pub fn check_firmware(&self) -> bool {
        debug!("DeviceHost::check_firmware");
        self.controller.check_firmware()
    }

    pub fn dump(&self, fd: i32) {
        debug!("DeviceHost::dump");
        self.controller.dump(fd);
    }

    pub fn factory_reset(&self) {
        debug!("DeviceHost::factory_reset");
        self.controller.factory_reset();
    }

    pub fn shutdown(&self) {
        debug!("DeviceHost::shutdown");
        self.controller.shutdown();
    }

    /// Add an AID route. Fails with [`crate::Error::InvalidAidLength`] for
    /// AIDs over 16 bytes.
    pub fn add_aid_routing(&self, aid: &[u8], route: u8, aid_info: AidInfo) -> Result<bool> {
        debug!("DeviceHost::add_aid_routing");
        let aid = Aid::try_from(aid)?;
        Ok(self.ce().add_aid_routing(&aid, route, aid_info))
    }

    pub fn remove_aid_routing(&self, aid: &[u8]) -> Result<bool> {
        debug!("DeviceHost::remove_aid_routing");
        let aid = Aid::try_from(aid)?;
        Ok(self.ce().remove_aid_routing(&aid))
    }

    pub fn clear_aid_table(&self) -> bool {
        debug!("DeviceHost::clear_aid_table");
        self.ce().clear_aid_table()
    }

    /// Commit pending routing edits; RF discovery is paused around the
    /// commit when running.
    pub fn commit_routing(&self) -> bool {
        debug!("DeviceHost::commit_routing");
        self.ce().commit_routing()
    }

    pub fn get_aid_routing_table_size(&self) -> u16 {
        debug!("DeviceHost::get_aid_routing_table_size");
        self.ce().aid_routing_table_size()
    }

    pub fn get_remain_routing_table_size(&self) -> u16 {
        debug!("DeviceHost::get_remain_routing_table_size");
        self.ce().remain_routing_table_size()
    }

    pub fn get_default_route(&self) -> u8 {
        debug!("DeviceHost::get_default_route");
        self.ce().default_route()
    }

    pub fn get_default_offhost_route(&self) -> u8 {
        debug!("DeviceHost::get_default_offhost_route");
        self.ce().default_offhost_route()
    }

    pub fn get_offhost_uicc_route(&self) -> Vec<u8> {
        debug!("DeviceHost::get_offhost_uicc_route");
        self.ce().offhost_uicc_route()
    }

    pub fn get_offhost_ese_route(&self) -> Vec<u8> {
        debug!("DeviceHost::get_offhost_ese_route");
        self.ce().offhost_ese_route()
    }

    pub fn get_aid_matching_mode(&self) -> AidMatchingMode {
        debug!("DeviceHost::get_aid_matching_mode");
        self.ce().aid_matching_mode()
    }

    pub fn get_default_isodep_route_destination(&self) -> u8 {
        debug!("DeviceHost::get_default_isodep_route_destination");
        self.ce().default_isodep_route()
    }

    /// Only NFC Forum type 1 and type 2 tags can be locked.
    pub fn can_make_read_only(&self, ndef_type: i32) -> bool {
        ndef_type == 1 || ndef_type == 2
    }

    pub fn get_extended_length_apdus_supported(&self) -> bool {
        self.controller.get_iso_dep_max_transceive_length() > ISO_DEP_MAX_TRANSCEIVE
    }

    /// Direct access to the discovery controller.
    pub fn controller(&self) -> &Arc<DiscoveryController> {
        &self.controller
    }
}

impl Drop for DeviceHost {
    fn drop(&mut self) {
        self.controller.deinitialize();
    }
}
