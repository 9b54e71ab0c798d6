// ncibal/src/device/controller.rs

//! Stack lifecycle and RF discovery, plus the routing of every controller
//! event to the component that waits for it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::ce::CardEmulationRouter;
use crate::config::BalConfig;
use crate::constants::{NCI_VERSION_2_0, discovery_param, interface, protocol, screen};
use crate::device::listener::ListenerSlot;
use crate::device::rf::{RfControl, new_rf_field_lock};
use crate::device::state::NfcState;
use crate::hal::{
    CeEvent, ConnectionEvent, DeviceEvent, EeEvent, HciEvent, NciCallbacks, NciHal, NdefEvent,
    RfActivation,
};
use crate::hci::TransactionDecoder;
use crate::protocol::activation::is_poll_mode;
use crate::sync::{Rendezvous, WaitOutcome};
use crate::tag::TagSession;
use crate::types::{NfaStatus, TechMask};
use crate::utils::{HexSlice, ms};

/// Owns the discovery state and every component driven by it.
pub struct DiscoveryController {
    hal: Arc<dyn NciHal>,
    config: BalConfig,
    state: Arc<NfcState>,
    rf: Arc<RfControl>,
    tag: Arc<TagSession>,
    ce: Arc<CardEmulationRouter>,
    hci: TransactionDecoder,
    listener: Arc<ListenerSlot>,
    /// Serializes lifecycle and discovery-mode changes.
    op_lock: Mutex<()>,
    wait: Duration,
    enable: Rendezvous<NfaStatus>,
    disable: Rendezvous<()>,
    power_sub_state: Rendezvous<NfaStatus>,
    set_config: Rendezvous<NfaStatus>,
}

impl DiscoveryController {
    pub fn new(hal: Arc<dyn NciHal>, config: BalConfig, listener: Arc<ListenerSlot>) -> Arc<Self> {
        let wait = ms(config.default_timeout_ms);
        let state = Arc::new(NfcState::new(config.discovery_duration_ms));
        let field = new_rf_field_lock();
        let rf = Arc::new(RfControl::new(
            Arc::clone(&hal),
            Arc::clone(&state),
            Arc::clone(&field),
            wait,
        ));
        let tag = Arc::new(TagSession::new(
            Arc::clone(&hal),
            Arc::clone(&state),
            field,
            &config,
        ));
        let ce = Arc::new(CardEmulationRouter::new(
            Arc::clone(&hal),
            Arc::clone(&rf),
            Arc::clone(&listener),
            config.routing.clone(),
            ms(config.ce_timeout_ms),
        ));
        let hci = TransactionDecoder::new(Arc::clone(&hal), config.hci.clone());
        Arc::new(Self {
            hal,
            config,
            state,
            rf,
            tag,
            ce,
            hci,
            listener,
            op_lock: Mutex::new(()),
            wait,
            enable: Rendezvous::new("nfa enable"),
            disable: Rendezvous::new("nfa disable"),
            power_sub_state: Rendezvous::new("power sub-state"),
            set_config: Rendezvous::new("set config"),
        })
    }

    pub fn tag_session(&self) -> &Arc<TagSession> {
        &self.tag
    }

    pub fn card_emulation(&self) -> &Arc<CardEmulationRouter> {
        &self.ce
    }

    pub fn state(&self) -> &Arc<NfcState> {
        &self.state
    }

    pub fn config(&self) -> &BalConfig {
        &self.config
    }

    pub fn is_nfc_active(&self) -> bool {
        self.state.is_nfc_active()
    }

    pub fn is_rf_enabled(&self) -> bool {
        self.rf.is_rf_enabled()
    }

    /// Bring the stack up. Succeeds immediately when already enabled.
    pub fn initialize(self: &Arc<Self>) -> bool {
        let _op = self.op_lock.lock();
        if self.state.snapshot().is_enabled {
            debug!("already enabled");
            return true;
        }

        self.hal.adaptation_initialize();
        let callbacks: Arc<dyn NciCallbacks> = Arc::new(CallbackRouter {
            controller: Arc::downgrade(self),
        });
        let outcome = self
            .enable
            .call(None, || self.hal.enable(Arc::clone(&callbacks)));

        if outcome.status().is_ok() && self.state.snapshot().is_enabled {
            self.tag.register_ndef_handler();
            if !self.ce.initialize() {
                warn!("card emulation not initialized");
            }
            if !self.hci.initialize() {
                warn!("hci transactions unavailable");
            }
            let duration = self.config.discovery_duration_ms;
            self.state.update(|s| s.discovery_duration_ms = duration);
            let status = self.hal.set_rf_discovery_duration(duration);
            if !status.is_ok() {
                warn!("discovery duration {} ms not set: {}", duration, status);
            }
            info!("nfc enabled");
            return true;
        }

        error!("nfa enable failed: {:?}", outcome);
        if self.state.snapshot().is_enabled {
            let status = self.hal.disable(false);
            debug!("ungraceful disable: {}", status);
        }
        self.hal.adaptation_finalize();
        false
    }

    /// Tear the stack down and release every blocked waiter.
    pub fn deinitialize(&self) -> bool {
        if !self.state.is_nfc_active() {
            debug!("deinitialize: nfc not active");
            return true;
        }
        let _op = self.op_lock.lock();
        self.state.update(|s| s.is_disabling = true);

        self.ce.deinitialize();
        if self.rf.is_rf_enabled() {
            self.rf.start_rf_discovery(false);
        }

        let mut ok = true;
        if self.state.snapshot().is_enabled {
            match self.disable.call(None, || self.hal.disable(true)) {
                WaitOutcome::Rejected(s) => {
                    warn!("graceful disable rejected: {}", s);
                    ok = false;
                }
                other => debug!("disable: {:?}", other),
            }
        }

        self.state.update(|s| {
            s.is_enabled = false;
            s.is_disabling = false;
            s.discovery_enabled = false;
            s.polling_enabled = false;
            s.rf_enabled = false;
            s.is_tag_active = false;
            s.is_reconnecting = false;
        });
        self.tag.abort_wait();
        self.rf.abort();
        self.ce.abort_wait();
        self.hal.adaptation_finalize();
        info!("nfc disabled");
        ok
    }

    /// Configure polling and listening, then (re)start RF discovery.
    ///
    /// `tech_mask` of `None` polls the default technologies; an explicit
    /// mask is restricted to them.
    pub fn enable_discovery(
        &self,
        tech_mask: Option<TechMask>,
        reader_mode: bool,
        host_routing: bool,
        restart: bool,
    ) {
        let _op = self.op_lock.lock();
        let snap = self.state.snapshot();
        if !snap.is_nfc_active() {
            error!("enable discovery: nfc not active");
            return;
        }
        if snap.discovery_enabled && !restart {
            debug!("already discovering");
            return;
        }
        if snap.rf_enabled {
            self.rf.start_rf_discovery(false);
        }

        let mask = tech_mask.map_or(TechMask::DEFAULT_POLL, |m| m & TechMask::DEFAULT_POLL);
        debug!("discovery mask {:?} reader_mode={}", mask, reader_mode);
        self.rf.stop_polling();
        if !mask.is_empty() {
            self.rf.start_polling(mask);
            if self.state.snapshot().polling_enabled {
                self.switch_reader_mode(reader_mode);
            }
        }

        self.ce.enable_host_routing(host_routing);
        self.ce.commit_routing();

        self.rf.start_rf_discovery(true);
        self.state.update(|s| {
            s.discovery_enabled = true;
            s.is_reconnecting = false;
        });
    }

    /// Listening is switched only on an actual reader-mode change.
    fn switch_reader_mode(&self, reader_mode: bool) {
        let was = self.state.snapshot().reader_mode_enabled;
        if reader_mode == was {
            return;
        }
        let (status, duration) = if reader_mode {
            (
                self.hal.disable_listening(),
                self.config.reader_mode_discovery_duration_ms,
            )
        } else {
            (
                self.hal.enable_listening(),
                self.config.discovery_duration_ms,
            )
        };
        if !status.is_ok() {
            warn!("listening switch for reader mode {}: {}", reader_mode, status);
        }
        let dur_status = self.hal.set_rf_discovery_duration(duration);
        if !dur_status.is_ok() {
            warn!("discovery duration {} ms not set: {}", duration, dur_status);
        }
        self.state.update(|s| {
            s.reader_mode_enabled = reader_mode;
            s.discovery_duration_ms = duration;
        });
    }

    pub fn disable_discovery(&self) {
        let _op = self.op_lock.lock();
        let snap = self.state.snapshot();
        if !snap.is_nfc_active() {
            error!("disable discovery: nfc not active");
            return;
        }
        if !snap.discovery_enabled {
            debug!("discovery already disabled");
            return;
        }
        self.rf.start_rf_discovery(false);
        if self.state.snapshot().polling_enabled {
            self.rf.stop_polling();
        }
        self.state.update(|s| {
            s.discovery_enabled = false;
            s.reader_mode_enabled = false;
        });
    }

    pub fn start_rf_discovery(&self, start: bool) -> bool {
        self.rf.start_rf_discovery(start)
    }

    pub fn start_polling(&self, mask: TechMask) -> bool {
        self.rf.start_polling(mask)
    }

    pub fn stop_polling(&self) -> bool {
        self.rf.stop_polling()
    }

    /// Send a raw frame outside any tag session.
    pub fn send_raw_frame(&self, data: &[u8]) -> bool {
        let _op = self.op_lock.lock();
        debug!("raw frame {}", HexSlice(data));
        let status = self.hal.send_raw_frame(data, 0);
        if !status.is_ok() {
            warn!("raw frame rejected: {}", status);
        }
        status.is_ok()
    }

    /// Apply a screen state to the controller's discovery parameters.
    ///
    /// On NCI 2.0 the power sub-state is updated before the discovery
    /// parameters, except when leaving the unlocked state, where it follows
    /// them. Nothing is sent when the masked state is unchanged.
    pub fn set_screen_status(&self, mask: u8) {
        let _op = self.op_lock.lock();
        let screen_state = mask & screen::STATE_MASK;
        let current = self.state.snapshot().current_screen_state;
        if current == screen_state {
            debug!("screen state {:#04x} unchanged", screen_state);
            return;
        }
        if !self.state.is_nfc_active() || self.hal.nci_version() != NCI_VERSION_2_0 {
            self.state.update(|s| s.current_screen_state = screen_state);
            return;
        }

        let leaving_unlocked = current == screen::ON_UNLOCKED;
        if !leaving_unlocked && !self.update_power_sub_state(screen_state) {
            return;
        }

        let poll = match screen_state {
            screen::OFF_LOCKED | screen::OFF_UNLOCKED => discovery_param::POLL_DH_DISABLE,
            screen::ON_LOCKED if mask & screen::POLLING_TAG_MASK == 0 => {
                discovery_param::POLL_DH_DISABLE
            }
            _ => discovery_param::POLL_DH_ENABLE,
        };
        let param = [poll | discovery_param::LISTEN_DH_NFCEE_ENABLE];
        let outcome = self.set_config.call(Some(self.wait), || {
            self.hal.set_config(discovery_param::PARAM_ID, &param)
        });
        if !outcome.is_completed() {
            warn!("discovery parameter update: {:?}", outcome);
            return;
        }

        if leaving_unlocked && !self.update_power_sub_state(screen_state) {
            return;
        }
        self.state
            .update(|s| s.current_screen_state = screen_state);
        debug!("screen state now {:#04x}", screen_state);
    }

    fn update_power_sub_state(&self, screen_state: u8) -> bool {
        let outcome = self.power_sub_state.call(Some(self.wait), || {
            self.hal.set_power_sub_state(screen_state)
        });
        if !outcome.is_completed() {
            warn!("power sub-state {:#04x}: {:?}", screen_state, outcome);
        }
        outcome.is_completed()
    }

    pub fn screen_state(&self) -> u8 {
        self.state.snapshot().current_screen_state
    }

    pub fn get_nci_version(&self) -> u8 {
        self.hal.nci_version()
    }

    pub fn get_iso_dep_max_transceive_length(&self) -> usize {
        self.config.iso_dep_max_transceive
    }

    pub fn register_t3t_identifier(&self, identifier: &[u8]) -> bool {
        debug!("register t3t identifier {} (unsupported)", HexSlice(identifier));
        false
    }

    pub fn deregister_t3t_identifier(&self, handle: i32) {
        debug!("deregister t3t identifier {} (unsupported)", handle);
    }

    pub fn clear_t3t_identifiers_cache(&self) {
        debug!("clear t3t identifiers cache");
    }

    pub fn get_lf_t3t_max(&self) -> i32 {
        0
    }

    pub fn get_last_error(&self) -> i32 {
        0
    }

    /// Wake every thread blocked on any completion.
    pub fn abort(&self) {
        info!("aborting all waits");
        self.enable.abort();
        self.disable.abort();
        self.power_sub_state.abort();
        self.set_config.abort();
        self.rf.abort();
        self.tag.abort_wait();
        self.ce.abort_wait();
    }

    pub fn check_firmware(&self) -> bool {
        let _op = self.op_lock.lock();
        self.hal.adaptation_initialize();
        self.hal.download_firmware();
        self.hal.adaptation_finalize();
        true
    }

    pub fn dump(&self, fd: i32) {
        self.hal.dump(fd);
    }

    pub fn factory_reset(&self) {
        self.hal.factory_reset();
    }

    pub fn shutdown(&self) {
        self.hal.device_shutdown();
    }

    // ---- controller events ----------------------------------------------

    fn handle_device_event(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::EnableComplete { status } => {
                debug!("enable complete: {}", status);
                self.state.update(|s| {
                    s.is_enabled = status.is_ok();
                    s.is_disabling = false;
                });
                self.enable.notify(status);
            }
            DeviceEvent::DisableComplete => {
                debug!("disable complete");
                self.state.update(|s| {
                    s.is_enabled = false;
                    s.is_disabling = false;
                });
                self.disable.notify(());
            }
            DeviceEvent::RfField { status, on } => {
                if !status.is_ok() {
                    debug!("rf field event with status {}", status);
                } else if on {
                    self.listener
                        .dispatch("remote field on", |l| l.on_remote_field_activated());
                } else {
                    self.listener
                        .dispatch("remote field off", |l| l.on_remote_field_deactivated());
                }
            }
            DeviceEvent::NfccTransportError | DeviceEvent::NfccTimeout => {
                error!("controller failure ({:?}), forcing disable", event);
                self.tag.abort_wait();
                self.rf.abort();
                self.enable.abort();
                self.disable.abort();
                let active = self.state.update(|s| {
                    s.discovery_enabled = false;
                    s.polling_enabled = false;
                    s.is_nfc_active()
                });
                if active {
                    let status = self.hal.disable(false);
                    debug!("ungraceful disable: {}", status);
                    self.state.update(|s| s.is_disabling = true);
                } else {
                    self.state.update(|s| {
                        s.is_enabled = false;
                        s.is_disabling = false;
                    });
                }
            }
            DeviceEvent::SetConfig { status } => {
                self.set_config.notify(status);
            }
            DeviceEvent::PowerSubState { status } => {
                debug!("power sub-state: {}", status);
                self.power_sub_state.notify(status);
            }
        }
    }

    fn handle_activation(&self, act: RfActivation) {
        if self.state.snapshot().is_disabling {
            return;
        }
        if act.protocol == protocol::NFC_DEP {
            debug!("peer-to-peer activation ignored");
            return;
        }
        if !is_poll_mode(act.mode) || act.interface == interface::EE_DIRECT_RF {
            debug!("listen or ee-direct activation, mode {:#04x}", act.mode);
            return;
        }
        let reconnecting = self.state.update(|s| {
            s.is_tag_active = true;
            s.is_reconnecting
        });
        if reconnecting {
            self.tag.notify_activated();
            return;
        }
        if let Some(endpoint) = self.tag.create_tag_endpoint(&act) {
            self.listener
                .dispatch("tag discovered", |l| l.on_tag_discovered(endpoint));
        }
    }

    fn handle_connection_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::PollEnabled { status }
            | ConnectionEvent::PollDisabled { status }
            | ConnectionEvent::RfDiscoveryStarted { status }
            | ConnectionEvent::RfDiscoveryStopped { status } => {
                self.rf.notify_polling(status);
            }
            ConnectionEvent::Activated(act) => self.handle_activation(act),
            ConnectionEvent::Deactivated { sleep: true } => {
                debug!("tag asleep");
                self.state.update(|s| s.is_reconnecting = true);
                self.tag.notify_deactivated();
            }
            ConnectionEvent::Deactivated { sleep: false } => {
                self.state.update(|s| {
                    s.is_tag_active = false;
                    s.is_reconnecting = false;
                });
                self.tag.reset();
            }
            ConnectionEvent::DiscoveryResult {
                status,
                notification,
            } => {
                if status.is_ok() {
                    self.tag.handle_discovery_result(notification);
                } else {
                    debug!("discovery result status {}", status);
                }
            }
            other => self.tag.handle_connection_event(other),
        }
    }

    fn handle_ndef_event(&self, event: NdefEvent) {
        match event {
            NdefEvent::Registered { status } => {
                if !status.is_ok() {
                    warn!("ndef handler registration: {}", status);
                }
            }
            NdefEvent::Data(data) => self.tag.handle_ndef_data(data),
        }
    }

    fn handle_ee_event(&self, event: EeEvent) {
        self.ce.handle_ee_event(event);
    }

    fn handle_ce_event(&self, event: CeEvent) {
        self.ce.handle_ce_event(event);
    }

    fn handle_hci_event(&self, event: HciEvent) {
        if let Some(t) = self.hci.handle_event(&event) {
            debug!(
                "off-host transaction from {} aid {}",
                t.se_name,
                HexSlice(&t.aid)
            );
            self.listener.dispatch("off-host transaction", |l| {
                l.on_off_host_transaction(t.aid, t.data, t.se_name)
            });
        }
    }
}

/// Callback sink registered with the controller stack. Holds the controller
/// weakly so a dropped host stops receiving events.
struct CallbackRouter {
    controller: Weak<DiscoveryController>,
}

impl CallbackRouter {
    fn with(&self, what: &str, f: impl FnOnce(&DiscoveryController)) {
        match self.controller.upgrade() {
            Some(c) => f(&c),
            None => debug!("{} after controller dropped", what),
        }
    }
}

impl NciCallbacks for CallbackRouter {
    fn on_device_event(&self, event: DeviceEvent) {
        self.with("device event", |c| c.handle_device_event(event));
    }

    fn on_connection_event(&self, event: ConnectionEvent) {
        self.with("connection event", |c| c.handle_connection_event(event));
    }

    fn on_ndef_event(&self, event: NdefEvent) {
        self.with("ndef event", |c| c.handle_ndef_event(event));
    }

    fn on_ee_event(&self, event: EeEvent) {
        self.with("ee event", |c| c.handle_ee_event(event));
    }

    fn on_ce_event(&self, event: CeEvent) {
        self.with("ce event", |c| c.handle_ce_event(event));
    }

    fn on_hci_event(&self, event: HciEvent) {
        self.with("hci event", |c| c.handle_hci_event(event));
    }
}
