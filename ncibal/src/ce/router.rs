// ncibal/src/ce/router.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::ce::hce::HceAssembler;
use crate::config::RoutingConfig;
use crate::constants::{
    NCI_VERSION_1_0, NCI_VERSION_2_0, REMOVE_ALL_AID, ROUTE_HOST, ROUTE_POWER_STATE_HOST,
    ROUTE_POWER_STATE_SECURE, nfcee,
};
use crate::device::listener::ListenerSlot;
use crate::device::rf::RfControl;
use crate::hal::{CeEvent, EeDiscoverInfo, EeEvent, NciHal, PowerStateRouting};
use crate::hci::nfcee::connected_nfcee_id;
use crate::sync::{Rendezvous, WaitOutcome};
use crate::types::{
    Aid, AidInfo, AidMatchingMode, EeHandle, NfaStatus, ProtocolMask, RoutingEntry, TechMask,
};
use crate::utils::HexSlice;

/// Routing destination for a configured route id.
fn route_handle(route: u8) -> EeHandle {
    if route == ROUTE_HOST {
        EeHandle::HOST
    } else {
        EeHandle::from_nfcee_id(route)
    }
}

/// Card emulation and NFCEE routing.
///
/// Every table edit is a bounded request/wait pair; the routing table
/// itself lives in the controller.
pub struct CardEmulationRouter {
    hal: Arc<dyn NciHal>,
    rf: Arc<RfControl>,
    listener: Arc<ListenerSlot>,
    config: RoutingConfig,
    wait: Duration,
    secure: AtomicBool,
    se_tech: Mutex<TechMask>,
    discovered_ees: Mutex<Vec<EeDiscoverInfo>>,
    hce: HceAssembler,
    ee_register: Rendezvous<NfaStatus>,
    routing_cfg: Rendezvous<NfaStatus>,
    aid: Rendezvous<NfaStatus>,
    commit: Rendezvous<()>,
    mode_set: Rendezvous<NfaStatus>,
    remain_size: Rendezvous<u16>,
}

impl CardEmulationRouter {
    pub fn new(
        hal: Arc<dyn NciHal>,
        rf: Arc<RfControl>,
        listener: Arc<ListenerSlot>,
        config: RoutingConfig,
        wait: Duration,
    ) -> Self {
        Self {
            hal,
            rf,
            listener,
            config,
            wait,
            secure: AtomicBool::new(false),
            se_tech: Mutex::new(TechMask::empty()),
            discovered_ees: Mutex::new(Vec::new()),
            hce: HceAssembler::new(),
            ee_register: Rendezvous::new("ee register"),
            routing_cfg: Rendezvous::new("routing config"),
            aid: Rendezvous::new("aid routing"),
            commit: Rendezvous::new("routing commit"),
            mode_set: Rendezvous::new("ee mode set"),
            remain_size: Rendezvous::new("remaining size"),
        }
    }

    fn is_secure(&self) -> bool {
        self.secure.load(Ordering::SeqCst)
    }

    /// Register for NFCEE events and establish the default routes.
    ///
    /// Only a rejected registration is fatal; later steps log and carry on.
    pub fn initialize(&self) -> bool {
        match self.ee_register.call(Some(self.wait), || self.hal.ee_register()) {
            WaitOutcome::Rejected(s) => {
                error!("ee register rejected: {}", s);
                return false;
            }
            WaitOutcome::Completed(s) if s.is_ok() => {}
            other => warn!("ee register not confirmed: {:?}", other),
        }

        self.activate_inactive_ees();

        let se_tech = self.update_ee_tech();
        *self.se_tech.lock() = se_tech;

        let listen = self.config.host_listen_tech & (TechMask::A | TechMask::B);
        let status = self.hal.ce_set_iso_dep_listen_tech(listen);
        if !status.is_ok() {
            warn!("iso-dep listen tech {:?} not set: {}", listen, status);
        }
        let status = self.hal.ce_register_aid_on_dh(&Aid::empty());
        if !status.is_ok() {
            error!("wildcard aid registration failed: {}", status);
        }

        self.update_default_route();
        self.update_ee_proto();
        info!("card emulation ready (se tech {:?})", se_tech);
        true
    }

    /// Deactivate NFCEEs and unregister from NFCEE events.
    pub fn deinitialize(&self) {
        self.deactivate_ees();
        let status = self.hal.ee_deregister();
        if !status.is_ok() {
            warn!("ee deregister: {}", status);
        }
    }

    fn activate_inactive_ees(&self) {
        let ees = match self.hal.ee_get_info() {
            Ok(ees) => ees,
            Err(s) => {
                error!("ee_get_info failed: {}", s);
                return;
            }
        };
        for ee in ees.iter().filter(|ee| ee.status == nfcee::STATUS_INACTIVE) {
            debug!("activating nfcee {}", ee.handle);
            let out = self.mode_set.call(Some(self.wait), || {
                self.hal.ee_mode_set(ee.handle, nfcee::MODE_ACTIVATE)
            });
            if !out.is_completed() {
                warn!("nfcee {} activation: {:?}", ee.handle, out);
            }
        }
    }

    fn deactivate_ees(&self) {
        if self.config.default_offhost_route == ROUTE_HOST {
            return;
        }
        let ees = match self.hal.ee_get_info() {
            Ok(ees) if !ees.is_empty() => ees,
            Ok(_) => return,
            Err(s) => {
                error!("ee_get_info failed: {}", s);
                return;
            }
        };
        let nci_1_0 = self.hal.nci_version() == NCI_VERSION_1_0;
        for ee in &ees {
            let active = if nci_1_0 {
                !ee.interfaces.is_empty()
            } else {
                ee.interfaces.first() != Some(&nfcee::INTERFACE_HCI_ACCESS)
                    && ee.status == nfcee::STATUS_ACTIVE
            };
            if !active {
                continue;
            }
            debug!("deactivating nfcee {}", ee.handle);
            let out = self.mode_set.call(Some(self.wait), || {
                self.hal.ee_mode_set(ee.handle, nfcee::MODE_DEACTIVATE)
            });
            if !out.is_completed() {
                warn!("nfcee {} deactivation: {:?}", ee.handle, out);
            }
        }
    }

    /// Issue one routing-config request and wait for its completion.
    fn routing_request(&self, what: &str, issue: impl FnOnce() -> NfaStatus) -> bool {
        match self.routing_cfg.call(Some(self.wait), issue) {
            WaitOutcome::Completed(s) if s.is_ok() => true,
            other => {
                warn!("{}: {:?}", what, other);
                false
            }
        }
    }

    /// Route technologies of the off-host secure element; returns the
    /// technologies now routed off host.
    fn update_ee_tech(&self) -> TechMask {
        let offhost = self.config.default_offhost_route;
        if offhost == ROUTE_HOST {
            return TechMask::empty();
        }
        let target = EeHandle::from_nfcee_id(offhost);
        let secure = self.is_secure();
        let ees = self.discovered_ees.lock().clone();

        let mut se_tech = TechMask::empty();
        for ee in ees.iter().filter(|ee| ee.handle == target) {
            let mut mask = TechMask::empty();
            if ee.la_protocol != 0 {
                mask |= TechMask::A;
            }
            if ee.lb_protocol != 0 {
                mask |= TechMask::B;
            }
            if mask.is_empty() {
                continue;
            }
            self.routing_request("clear tech routing", || {
                self.hal.ee_clear_default_tech_routing(ee.handle, mask)
            });
            self.routing_request("set tech routing", || {
                self.hal
                    .ee_set_default_tech_routing(ee.handle, PowerStateRouting::off_host(mask, secure))
            });
            se_tech |= mask;
        }

        let host_listen = self.config.host_listen_tech;
        for tech in [TechMask::A, TechMask::B] {
            if host_listen.contains(tech) && se_tech.contains(tech) {
                self.routing_request("clear host tech routing", || {
                    self.hal.ee_clear_default_tech_routing(EeHandle::HOST, tech)
                });
            }
        }
        se_tech
    }

    fn update_default_route(&self) {
        if self.hal.nci_version() != NCI_VERSION_2_0 {
            return;
        }
        let route = connected_nfcee_id(self.hal.as_ref(), self.config.default_route);
        let entry = RoutingEntry {
            aid: Aid::empty(),
            route: route_handle(route),
            power_state: self.aid_power_state(route),
            aid_info: AidInfo::PREFIX,
        };
        if !self.aid_request(|| self.hal.ee_add_aid_routing(&entry)) {
            warn!("default aid route to {} not acknowledged", entry.route);
        }
    }

    fn update_ee_proto(&self) {
        let secure = self.is_secure();
        let iso_route = connected_nfcee_id(self.hal.as_ref(), self.config.default_offhost_route);
        let handle = route_handle(iso_route);
        self.routing_request("clear iso-dep routing", || {
            self.hal
                .ee_clear_default_proto_routing(handle, ProtocolMask::ISO_DEP)
        });
        let routing = if iso_route != ROUTE_HOST {
            PowerStateRouting::off_host(ProtocolMask::ISO_DEP, secure)
        } else {
            PowerStateRouting::host(ProtocolMask::ISO_DEP, secure)
        };
        self.routing_request("set iso-dep routing", || {
            self.hal.ee_set_default_proto_routing(handle, routing)
        });
    }

    fn aid_power_state(&self, route: u8) -> u8 {
        if self.is_secure() {
            ROUTE_POWER_STATE_SECURE
        } else if route != ROUTE_HOST {
            self.config.offhost_aid_power_state
        } else {
            ROUTE_POWER_STATE_HOST
        }
    }

    fn aid_request(&self, issue: impl FnOnce() -> NfaStatus) -> bool {
        matches!(
            self.aid.call(Some(self.wait), issue),
            WaitOutcome::Completed(NfaStatus::Ok)
        )
    }

    /// Add one AID routing entry towards `route` (an NFCEE id, `0x00` for
    /// the host).
    pub fn add_aid_routing(&self, aid: &Aid, route: u8, aid_info: AidInfo) -> bool {
        let entry = RoutingEntry {
            aid: aid.clone(),
            route: route_handle(route),
            power_state: self.aid_power_state(route),
            aid_info,
        };
        debug!(
            "add aid {} -> {} power {:#04x} info {}",
            aid.to_hex(),
            entry.route,
            entry.power_state,
            aid_info
        );
        self.aid_request(|| self.hal.ee_add_aid_routing(&entry))
    }

    pub fn remove_aid_routing(&self, aid: &Aid) -> bool {
        self.remove_aid_bytes(aid.as_bytes())
    }

    fn remove_aid_bytes(&self, aid: &[u8]) -> bool {
        debug!("remove aid {}", HexSlice(aid));
        self.aid_request(|| self.hal.ee_remove_aid_routing(aid))
    }

    /// Drop every AID entry from the routing table.
    pub fn clear_aid_table(&self) -> bool {
        self.remove_aid_bytes(&REMOVE_ALL_AID)
    }

    /// Commit pending routing edits.
    ///
    /// The controller cannot take a commit while RF discovery runs, so a
    /// running discovery is stopped first and restarted afterwards.
    pub fn commit_routing(&self) -> bool {
        let _field = self.rf.lock_field();
        let restart = self.rf.is_rf_enabled();
        if restart && !self.rf.start_rf_discovery(false) {
            error!("routing commit skipped: rf discovery did not stop");
            return false;
        }
        let committed = self
            .commit
            .call(Some(self.wait), || self.hal.ee_update_now())
            .is_completed();
        if !committed {
            warn!("routing commit not confirmed");
        }
        if restart {
            self.rf.start_rf_discovery(true);
        }
        committed
    }

    /// Point ISO-DEP and the host-listen technologies at the device host, or
    /// withdraw those routes.
    pub fn enable_host_routing(&self, enable: bool) {
        let secure = self.is_secure();
        let se_tech = *self.se_tech.lock();
        let host_listen = self.config.host_listen_tech;
        let isodep_on_host = self.config.default_isodep_route == ROUTE_HOST;

        if isodep_on_host {
            if enable {
                self.routing_request("host iso-dep routing", || {
                    self.hal.ee_set_default_proto_routing(
                        EeHandle::HOST,
                        PowerStateRouting::host(ProtocolMask::ISO_DEP, secure),
                    )
                });
            } else {
                self.routing_request("clear host iso-dep routing", || {
                    self.hal
                        .ee_clear_default_proto_routing(EeHandle::HOST, ProtocolMask::ISO_DEP)
                });
            }
        }

        for tech in [TechMask::A, TechMask::B] {
            if !host_listen.contains(tech) || se_tech.contains(tech) {
                continue;
            }
            if enable {
                self.routing_request("host tech routing", || {
                    self.hal.ee_set_default_tech_routing(
                        EeHandle::HOST,
                        PowerStateRouting::host(tech, secure),
                    )
                });
            } else {
                self.routing_request("clear host tech routing", || {
                    self.hal.ee_clear_default_tech_routing(EeHandle::HOST, tech)
                });
            }
        }
    }

    pub fn set_secure_nfc(&self, secure: bool) -> bool {
        self.secure.store(secure, Ordering::SeqCst);
        true
    }

    pub fn aid_routing_table_size(&self) -> u16 {
        self.hal.aid_table_size()
    }

    /// Ask the controller for the free routing table space.
    pub fn remain_routing_table_size(&self) -> u16 {
        self.remain_size
            .call(Some(self.wait), || self.hal.ee_get_remaining_size())
            .completed()
            .unwrap_or(0)
    }

    pub fn default_route(&self) -> u8 {
        self.config.default_route
    }

    pub fn default_offhost_route(&self) -> u8 {
        self.config.default_offhost_route
    }

    pub fn offhost_uicc_route(&self) -> Vec<u8> {
        self.config.offhost_route_uicc.clone()
    }

    pub fn offhost_ese_route(&self) -> Vec<u8> {
        self.config.offhost_route_ese.clone()
    }

    pub fn aid_matching_mode(&self) -> AidMatchingMode {
        self.config.aid_matching_mode
    }

    pub fn default_isodep_route(&self) -> u8 {
        self.config.default_isodep_route
    }

    /// Wake every thread blocked on a routing completion.
    pub fn abort_wait(&self) {
        self.ee_register.abort();
        self.routing_cfg.abort();
        self.aid.abort();
        self.commit.abort();
        self.mode_set.abort();
        self.remain_size.abort();
    }

    pub fn handle_ee_event(&self, event: EeEvent) {
        match event {
            EeEvent::Registered { status } => {
                self.ee_register.notify(status);
            }
            EeEvent::SetTechConfig { status }
            | EeEvent::ClearTechConfig { status }
            | EeEvent::SetProtoConfig { status }
            | EeEvent::ClearProtoConfig { status } => {
                self.routing_cfg.notify(status);
            }
            EeEvent::AddAid { status } | EeEvent::RemoveAid { status } => {
                self.aid.notify(status);
            }
            EeEvent::Updated => {
                self.commit.notify(());
            }
            EeEvent::DiscoverReq { status, ees } => {
                debug!("ee discover: {} ({} nfcees)", status, ees.len());
                *self.discovered_ees.lock() = ees;
                self.listener.dispatch("ee update", |l| l.on_ee_update());
            }
            EeEvent::ModeSet { status } => {
                self.mode_set.notify(status);
            }
            EeEvent::RemainingSize { size } => {
                self.remain_size.notify(size);
            }
        }
    }

    pub fn handle_ce_event(&self, event: CeEvent) {
        match event {
            CeEvent::Activated { protocol } => {
                debug!("hce activated, protocol {:#04x}", protocol);
                self.hce.reset();
                self.listener
                    .dispatch("hce activated", |l| l.on_hce_activated(TechMask::A));
            }
            CeEvent::Deactivated => {
                self.hce.reset();
                self.listener
                    .dispatch("hce deactivated", |l| l.on_hce_deactivated(TechMask::A));
            }
            CeEvent::Data { status, data } => {
                if let Some(apdu) = self.hce.push(status, &data) {
                    self.listener.dispatch("hce data", |l| {
                        l.on_hce_data_received(TechMask::A, apdu)
                    });
                }
            }
        }
    }
}
