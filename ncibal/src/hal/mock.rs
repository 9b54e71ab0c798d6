// ncibal/src/hal/mock.rs

//! Scripted controller for tests.
//!
//! Every primitive is recorded in call order. Accepted requests answer with
//! their usual completion event, delivered from a dedicated callback thread
//! the way a real controller stack would. Tests can reject requests, silence
//! completions to provoke timeouts, and inject unsolicited events.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Sender};
use log::{error, trace};
use parking_lot::Mutex;

use crate::constants::NCI_VERSION_2_0;
use crate::hal::events::*;
use crate::hal::traits::NciHal;
use crate::types::{Aid, EeHandle, NdefFlags, NfaStatus, ProtocolMask, RoutingEntry, TechMask};

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalCall {
    AdaptationInitialize,
    AdaptationFinalize,
    DownloadFirmware,
    Dump { fd: i32 },
    FactoryReset,
    DeviceShutdown,
    Enable,
    Disable { graceful: bool },
    EnablePolling { mask: TechMask },
    DisablePolling,
    EnableListening,
    DisableListening,
    StartRfDiscovery,
    StopRfDiscovery,
    SetRfDiscoveryDuration { duration_ms: u16 },
    SetPowerSubState { screen_state: u8 },
    SetConfig { param_id: u8, value: Vec<u8> },
    Select { disc_id: u8, protocol: u8, interface: u8 },
    Deactivate { sleep: bool },
    SendRawFrame { data: Vec<u8> },
    RegisterNdefHandler,
    DetectNdef,
    ReadNdef,
    WriteNdef { message: Vec<u8> },
    PresenceCheck { option: u8 },
    FormatTag,
    SetTagReadOnly { hard_lock: bool },
    HciRegister { app_name: String },
    EeGetInfo,
    EeRegister,
    EeDeregister,
    EeSetDefaultTechRouting { handle: EeHandle, routing: PowerStateRouting<TechMask> },
    EeClearDefaultTechRouting { handle: EeHandle, mask: TechMask },
    EeSetDefaultProtoRouting { handle: EeHandle, routing: PowerStateRouting<ProtocolMask> },
    EeClearDefaultProtoRouting { handle: EeHandle, mask: ProtocolMask },
    EeAddAidRouting(RoutingEntry),
    EeRemoveAidRouting { aid: Vec<u8> },
    EeUpdateNow,
    EeModeSet { handle: EeHandle, mode: u8 },
    EeGetRemainingSize,
    CeSetIsoDepListenTech { mask: TechMask },
    CeRegisterAidOnDh { aid: Vec<u8> },
}

/// Call discriminant used to script behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    AdaptationInitialize,
    AdaptationFinalize,
    DownloadFirmware,
    Dump,
    FactoryReset,
    DeviceShutdown,
    Enable,
    Disable,
    EnablePolling,
    DisablePolling,
    EnableListening,
    DisableListening,
    StartRfDiscovery,
    StopRfDiscovery,
    SetRfDiscoveryDuration,
    SetPowerSubState,
    SetConfig,
    Select,
    Deactivate,
    SendRawFrame,
    RegisterNdefHandler,
    DetectNdef,
    ReadNdef,
    WriteNdef,
    PresenceCheck,
    FormatTag,
    SetTagReadOnly,
    HciRegister,
    EeGetInfo,
    EeRegister,
    EeDeregister,
    EeSetDefaultTechRouting,
    EeClearDefaultTechRouting,
    EeSetDefaultProtoRouting,
    EeClearDefaultProtoRouting,
    EeAddAidRouting,
    EeRemoveAidRouting,
    EeUpdateNow,
    EeModeSet,
    EeGetRemainingSize,
    CeSetIsoDepListenTech,
    CeRegisterAidOnDh,
}

impl HalCall {
    pub fn kind(&self) -> CallKind {
        match self {
            HalCall::AdaptationInitialize => CallKind::AdaptationInitialize,
            HalCall::AdaptationFinalize => CallKind::AdaptationFinalize,
            HalCall::DownloadFirmware => CallKind::DownloadFirmware,
            HalCall::Dump { .. } => CallKind::Dump,
            HalCall::FactoryReset => CallKind::FactoryReset,
            HalCall::DeviceShutdown => CallKind::DeviceShutdown,
            HalCall::Enable => CallKind::Enable,
            HalCall::Disable { .. } => CallKind::Disable,
            HalCall::EnablePolling { .. } => CallKind::EnablePolling,
            HalCall::DisablePolling => CallKind::DisablePolling,
            HalCall::EnableListening => CallKind::EnableListening,
            HalCall::DisableListening => CallKind::DisableListening,
            HalCall::StartRfDiscovery => CallKind::StartRfDiscovery,
            HalCall::StopRfDiscovery => CallKind::StopRfDiscovery,
            HalCall::SetRfDiscoveryDuration { .. } => CallKind::SetRfDiscoveryDuration,
            HalCall::SetPowerSubState { .. } => CallKind::SetPowerSubState,
            HalCall::SetConfig { .. } => CallKind::SetConfig,
            HalCall::Select { .. } => CallKind::Select,
            HalCall::Deactivate { .. } => CallKind::Deactivate,
            HalCall::SendRawFrame { .. } => CallKind::SendRawFrame,
            HalCall::RegisterNdefHandler => CallKind::RegisterNdefHandler,
            HalCall::DetectNdef => CallKind::DetectNdef,
            HalCall::ReadNdef => CallKind::ReadNdef,
            HalCall::WriteNdef { .. } => CallKind::WriteNdef,
            HalCall::PresenceCheck { .. } => CallKind::PresenceCheck,
            HalCall::FormatTag => CallKind::FormatTag,
            HalCall::SetTagReadOnly { .. } => CallKind::SetTagReadOnly,
            HalCall::HciRegister { .. } => CallKind::HciRegister,
            HalCall::EeGetInfo => CallKind::EeGetInfo,
            HalCall::EeRegister => CallKind::EeRegister,
            HalCall::EeDeregister => CallKind::EeDeregister,
            HalCall::EeSetDefaultTechRouting { .. } => CallKind::EeSetDefaultTechRouting,
            HalCall::EeClearDefaultTechRouting { .. } => CallKind::EeClearDefaultTechRouting,
            HalCall::EeSetDefaultProtoRouting { .. } => CallKind::EeSetDefaultProtoRouting,
            HalCall::EeClearDefaultProtoRouting { .. } => CallKind::EeClearDefaultProtoRouting,
            HalCall::EeAddAidRouting(_) => CallKind::EeAddAidRouting,
            HalCall::EeRemoveAidRouting { .. } => CallKind::EeRemoveAidRouting,
            HalCall::EeUpdateNow => CallKind::EeUpdateNow,
            HalCall::EeModeSet { .. } => CallKind::EeModeSet,
            HalCall::EeGetRemainingSize => CallKind::EeGetRemainingSize,
            HalCall::CeSetIsoDepListenTech { .. } => CallKind::CeSetIsoDepListenTech,
            HalCall::CeRegisterAidOnDh { .. } => CallKind::CeRegisterAidOnDh,
        }
    }
}

/// Scripted NDEF detection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdefDetectScript {
    pub status: NfaStatus,
    pub max_size: u32,
    pub cur_size: u32,
    pub flags: NdefFlags,
}

impl Default for NdefDetectScript {
    fn default() -> Self {
        Self {
            status: NfaStatus::Failed,
            max_size: 0,
            cur_size: 0,
            flags: NdefFlags::empty(),
        }
    }
}

enum Delivery {
    Event(Arc<dyn NciCallbacks>, NciEvent),
    Barrier(Sender<()>),
}

struct MockState {
    calls: Vec<HalCall>,
    callbacks: Option<Arc<dyn NciCallbacks>>,
    rejections: HashMap<CallKind, NfaStatus>,
    one_shot_rejections: HashMap<CallKind, VecDeque<NfaStatus>>,
    completion_status: HashMap<CallKind, NfaStatus>,
    silenced: HashSet<CallKind>,
    nci_version: u8,
    aid_table_size: u16,
    remaining_size: u16,
    ee_info: Result<Vec<EeInfo>, NfaStatus>,
    ee_discover: Vec<EeDiscoverInfo>,
    transceive_responses: VecDeque<Vec<u8>>,
    present: bool,
    ndef_detect: NdefDetectScript,
    queued_ndef_detects: VecDeque<NdefDetectScript>,
    ndef_message: Vec<u8>,
    last_activation: Option<RfActivation>,
    reactivate_on_select: bool,
}

/// Scripted [`NciHal`] implementation.
pub struct MockNci {
    state: Mutex<MockState>,
    tx: Option<Sender<Delivery>>,
}

impl MockNci {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = channel::unbounded::<Delivery>();
        let spawned = thread::Builder::new()
            .name("mock-nci-callbacks".into())
            .spawn(move || {
                for delivery in rx.iter() {
                    match delivery {
                        Delivery::Event(callbacks, event) => {
                            trace!("mock nci delivering {:?}", event);
                            event.dispatch(callbacks.as_ref());
                        }
                        Delivery::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            });
        let tx = match spawned {
            Ok(_) => Some(tx),
            Err(e) => {
                error!("mock nci: failed to spawn callback thread: {}", e);
                None
            }
        };
        Arc::new(Self {
            state: Mutex::new(MockState {
                calls: Vec::new(),
                callbacks: None,
                rejections: HashMap::new(),
                one_shot_rejections: HashMap::new(),
                completion_status: HashMap::new(),
                silenced: HashSet::new(),
                nci_version: NCI_VERSION_2_0,
                aid_table_size: 0,
                remaining_size: 0,
                ee_info: Ok(Vec::new()),
                ee_discover: Vec::new(),
                transceive_responses: VecDeque::new(),
                present: true,
                ndef_detect: NdefDetectScript::default(),
                queued_ndef_detects: VecDeque::new(),
                ndef_message: Vec::new(),
                last_activation: None,
                reactivate_on_select: false,
            }),
            tx,
        })
    }

    // ---- scripting -------------------------------------------------------

    /// Make every request of `kind` return `status` immediately.
    pub fn reject(&self, kind: CallKind, status: NfaStatus) {
        self.state.lock().rejections.insert(kind, status);
    }

    /// Make the next request of `kind` return `status` immediately.
    pub fn reject_once(&self, kind: CallKind, status: NfaStatus) {
        self.state
            .lock()
            .one_shot_rejections
            .entry(kind)
            .or_default()
            .push_back(status);
    }

    pub fn clear_rejections(&self) {
        let mut st = self.state.lock();
        st.rejections.clear();
        st.one_shot_rejections.clear();
    }

    /// Accept requests of `kind` but never complete them.
    pub fn silence(&self, kind: CallKind) {
        self.state.lock().silenced.insert(kind);
    }

    pub fn unsilence(&self, kind: CallKind) {
        self.state.lock().silenced.remove(&kind);
    }

    /// Status carried by the completion event of `kind`.
    pub fn complete_with(&self, kind: CallKind, status: NfaStatus) {
        self.state.lock().completion_status.insert(kind, status);
    }

    pub fn set_nci_version(&self, version: u8) {
        self.state.lock().nci_version = version;
    }

    pub fn set_aid_table_size(&self, size: u16) {
        self.state.lock().aid_table_size = size;
    }

    pub fn set_remaining_size(&self, size: u16) {
        self.state.lock().remaining_size = size;
    }

    pub fn set_ee_info(&self, info: Result<Vec<EeInfo>, NfaStatus>) {
        self.state.lock().ee_info = info;
    }

    /// NFCEEs announced after EE registration.
    pub fn set_ee_discover(&self, ees: Vec<EeDiscoverInfo>) {
        self.state.lock().ee_discover = ees;
    }

    /// Queue the response to the next raw frame. With nothing queued a raw
    /// frame gets no answer.
    pub fn push_transceive_response(&self, response: Vec<u8>) {
        self.state.lock().transceive_responses.push_back(response);
    }

    pub fn set_present(&self, present: bool) {
        self.state.lock().present = present;
    }

    pub fn set_ndef_detect(&self, script: NdefDetectScript) {
        self.state.lock().ndef_detect = script;
    }

    /// Answer the next NDEF detection with `script`, ahead of the standing one.
    pub fn push_ndef_detect(&self, script: NdefDetectScript) {
        self.state.lock().queued_ndef_detects.push_back(script);
    }

    pub fn set_ndef_message(&self, message: Vec<u8>) {
        self.state.lock().ndef_message = message;
    }

    /// Whether a select re-delivers the last activation, as a tag woken
    /// from sleep would. Off by default.
    pub fn set_reactivate_on_select(&self, enabled: bool) {
        self.state.lock().reactivate_on_select = enabled;
    }

    /// Bring a target into the field.
    pub fn activate(&self, activation: RfActivation) {
        self.state.lock().last_activation = Some(activation.clone());
        self.deliver(NciEvent::Connection(ConnectionEvent::Activated(activation)));
    }

    /// Deliver an unsolicited event on the callback thread.
    pub fn deliver(&self, event: NciEvent) {
        let callbacks = self.state.lock().callbacks.clone();
        self.send(callbacks, event);
    }

    /// Block until every event queued so far has been dispatched.
    pub fn flush(&self) {
        if let Some(tx) = &self.tx {
            let (done_tx, done_rx) = channel::bounded(1);
            if tx.send(Delivery::Barrier(done_tx)).is_ok() {
                let _ = done_rx.recv();
            }
        }
    }

    // ---- inspection ------------------------------------------------------

    pub fn calls(&self) -> Vec<HalCall> {
        self.state.lock().calls.clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<HalCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    /// Kinds of the recorded calls, in order.
    pub fn kinds(&self) -> Vec<CallKind> {
        self.state.lock().calls.iter().map(HalCall::kind).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    // ---- internals -------------------------------------------------------

    fn send(&self, callbacks: Option<Arc<dyn NciCallbacks>>, event: NciEvent) {
        let (Some(callbacks), Some(tx)) = (callbacks, &self.tx) else {
            trace!("mock nci: dropping {:?} (no callbacks registered)", event);
            return;
        };
        let _ = tx.send(Delivery::Event(callbacks, event));
    }

    /// Record `call`, apply scripted rejections and, when accepted, queue the
    /// completion events produced by `complete`.
    fn request<F>(&self, call: HalCall, complete: F) -> NfaStatus
    where
        F: FnOnce(&mut MockState, NfaStatus) -> Vec<NciEvent>,
    {
        let kind = call.kind();
        let (status, callbacks, events) = {
            let mut st = self.state.lock();
            st.calls.push(call);
            let one_shot = st
                .one_shot_rejections
                .get_mut(&kind)
                .and_then(VecDeque::pop_front);
            let immediate = one_shot
                .or_else(|| st.rejections.get(&kind).copied())
                .unwrap_or(NfaStatus::Ok);
            if !immediate.is_ok() {
                return immediate;
            }
            let completion = st
                .completion_status
                .get(&kind)
                .copied()
                .unwrap_or(NfaStatus::Ok);
            let events = complete(&mut *st, completion);
            let events = if st.silenced.contains(&kind) {
                Vec::new()
            } else {
                events
            };
            (immediate, st.callbacks.clone(), events)
        };
        for event in events {
            self.send(callbacks.clone(), event);
        }
        status
    }

    fn record(&self, call: HalCall) {
        self.state.lock().calls.push(call);
    }
}

fn conn(event: ConnectionEvent) -> Vec<NciEvent> {
    vec![NciEvent::Connection(event)]
}

fn ee(event: EeEvent) -> Vec<NciEvent> {
    vec![NciEvent::Ee(event)]
}

impl NciHal for MockNci {
    fn adaptation_initialize(&self) {
        self.record(HalCall::AdaptationInitialize);
    }

    fn adaptation_finalize(&self) {
        self.record(HalCall::AdaptationFinalize);
    }

    fn download_firmware(&self) {
        self.record(HalCall::DownloadFirmware);
    }

    fn dump(&self, fd: i32) {
        self.record(HalCall::Dump { fd });
    }

    fn factory_reset(&self) {
        self.record(HalCall::FactoryReset);
    }

    fn device_shutdown(&self) {
        self.record(HalCall::DeviceShutdown);
    }

    fn nci_version(&self) -> u8 {
        self.state.lock().nci_version
    }

    fn enable(&self, callbacks: Arc<dyn NciCallbacks>) -> NfaStatus {
        self.state.lock().callbacks = Some(callbacks);
        self.request(HalCall::Enable, |_, status| {
            vec![NciEvent::Device(DeviceEvent::EnableComplete { status })]
        })
    }

    fn disable(&self, graceful: bool) -> NfaStatus {
        self.request(HalCall::Disable { graceful }, |_, _| {
            vec![NciEvent::Device(DeviceEvent::DisableComplete)]
        })
    }

    fn enable_polling(&self, mask: TechMask) -> NfaStatus {
        self.request(HalCall::EnablePolling { mask }, |_, status| {
            conn(ConnectionEvent::PollEnabled { status })
        })
    }

    fn disable_polling(&self) -> NfaStatus {
        self.request(HalCall::DisablePolling, |_, status| {
            conn(ConnectionEvent::PollDisabled { status })
        })
    }

    fn enable_listening(&self) -> NfaStatus {
        self.request(HalCall::EnableListening, |_, _| Vec::new())
    }

    fn disable_listening(&self) -> NfaStatus {
        self.request(HalCall::DisableListening, |_, _| Vec::new())
    }

    fn start_rf_discovery(&self) -> NfaStatus {
        self.request(HalCall::StartRfDiscovery, |_, status| {
            conn(ConnectionEvent::RfDiscoveryStarted { status })
        })
    }

    fn stop_rf_discovery(&self) -> NfaStatus {
        self.request(HalCall::StopRfDiscovery, |_, status| {
            conn(ConnectionEvent::RfDiscoveryStopped { status })
        })
    }

    fn set_rf_discovery_duration(&self, duration_ms: u16) -> NfaStatus {
        self.request(HalCall::SetRfDiscoveryDuration { duration_ms }, |_, _| {
            Vec::new()
        })
    }

    fn set_power_sub_state(&self, screen_state: u8) -> NfaStatus {
        self.request(HalCall::SetPowerSubState { screen_state }, |_, status| {
            vec![NciEvent::Device(DeviceEvent::PowerSubState { status })]
        })
    }

    fn set_config(&self, param_id: u8, value: &[u8]) -> NfaStatus {
        let call = HalCall::SetConfig {
            param_id,
            value: value.to_vec(),
        };
        self.request(call, |_, status| {
            vec![NciEvent::Device(DeviceEvent::SetConfig { status })]
        })
    }

    fn select(&self, disc_id: u8, protocol: u8, interface: u8) -> NfaStatus {
        let call = HalCall::Select {
            disc_id,
            protocol,
            interface,
        };
        self.request(call, |st, status| {
            let mut events = conn(ConnectionEvent::SelectResult { status });
            if status.is_ok() && st.reactivate_on_select {
                if let Some(mut act) = st.last_activation.clone() {
                    act.disc_id = disc_id;
                    act.protocol = protocol;
                    act.interface = interface;
                    events.push(NciEvent::Connection(ConnectionEvent::Activated(act)));
                }
            }
            events
        })
    }

    fn deactivate(&self, sleep: bool) -> NfaStatus {
        self.request(HalCall::Deactivate { sleep }, |_, _| {
            conn(ConnectionEvent::Deactivated { sleep })
        })
    }

    fn send_raw_frame(&self, data: &[u8], _presence_check_delay: u16) -> NfaStatus {
        let call = HalCall::SendRawFrame {
            data: data.to_vec(),
        };
        self.request(call, |st, status| match st.transceive_responses.pop_front() {
            Some(data) => conn(ConnectionEvent::Data { status, data }),
            None => Vec::new(),
        })
    }

    fn register_ndef_handler(&self) -> NfaStatus {
        self.request(HalCall::RegisterNdefHandler, |_, status| {
            vec![NciEvent::Ndef(NdefEvent::Registered { status })]
        })
    }

    fn detect_ndef(&self) -> NfaStatus {
        self.request(HalCall::DetectNdef, |st, _| {
            let script = st
                .queued_ndef_detects
                .pop_front()
                .unwrap_or(st.ndef_detect);
            let protocol = st
                .last_activation
                .as_ref()
                .map(|a| a.protocol)
                .unwrap_or_default();
            conn(ConnectionEvent::NdefDetect {
                status: script.status,
                protocol,
                max_size: script.max_size,
                cur_size: script.cur_size,
                flags: script.flags,
            })
        })
    }

    fn read_ndef(&self) -> NfaStatus {
        self.request(HalCall::ReadNdef, |st, status| {
            vec![
                NciEvent::Ndef(NdefEvent::Data(st.ndef_message.clone())),
                NciEvent::Connection(ConnectionEvent::ReadComplete { status }),
            ]
        })
    }

    fn write_ndef(&self, message: &[u8]) -> NfaStatus {
        let call = HalCall::WriteNdef {
            message: message.to_vec(),
        };
        self.request(call, |st, status| {
            if status.is_ok() {
                st.ndef_message = message.to_vec();
            }
            conn(ConnectionEvent::WriteComplete { status })
        })
    }

    fn presence_check(&self, option: u8) -> NfaStatus {
        self.request(HalCall::PresenceCheck { option }, |st, _| {
            let status = if st.present {
                NfaStatus::Ok
            } else {
                NfaStatus::Failed
            };
            conn(ConnectionEvent::PresenceCheck { status })
        })
    }

    fn format_tag(&self) -> NfaStatus {
        self.request(HalCall::FormatTag, |_, status| {
            conn(ConnectionEvent::FormatComplete { status })
        })
    }

    fn set_tag_read_only(&self, hard_lock: bool) -> NfaStatus {
        self.request(HalCall::SetTagReadOnly { hard_lock }, |_, status| {
            conn(ConnectionEvent::SetTagReadOnly { status })
        })
    }

    fn hci_register(&self, app_name: &str) -> NfaStatus {
        let call = HalCall::HciRegister {
            app_name: app_name.to_string(),
        };
        self.request(call, |_, _| Vec::new())
    }

    fn ee_get_info(&self) -> Result<Vec<EeInfo>, NfaStatus> {
        let mut st = self.state.lock();
        st.calls.push(HalCall::EeGetInfo);
        st.ee_info.clone()
    }

    fn ee_register(&self) -> NfaStatus {
        // Discovered NFCEEs are announced before registration completes.
        self.request(HalCall::EeRegister, |st, status| {
            let mut events = Vec::new();
            if !st.ee_discover.is_empty() {
                events.push(NciEvent::Ee(EeEvent::DiscoverReq {
                    status: NfaStatus::Ok,
                    ees: st.ee_discover.clone(),
                }));
            }
            events.push(NciEvent::Ee(EeEvent::Registered { status }));
            events
        })
    }

    fn ee_deregister(&self) -> NfaStatus {
        self.request(HalCall::EeDeregister, |_, _| Vec::new())
    }

    fn ee_set_default_tech_routing(
        &self,
        handle: EeHandle,
        routing: PowerStateRouting<TechMask>,
    ) -> NfaStatus {
        self.request(
            HalCall::EeSetDefaultTechRouting { handle, routing },
            |_, status| ee(EeEvent::SetTechConfig { status }),
        )
    }

    fn ee_clear_default_tech_routing(&self, handle: EeHandle, mask: TechMask) -> NfaStatus {
        self.request(
            HalCall::EeClearDefaultTechRouting { handle, mask },
            |_, status| ee(EeEvent::ClearTechConfig { status }),
        )
    }

    fn ee_set_default_proto_routing(
        &self,
        handle: EeHandle,
        routing: PowerStateRouting<ProtocolMask>,
    ) -> NfaStatus {
        self.request(
            HalCall::EeSetDefaultProtoRouting { handle, routing },
            |_, status| ee(EeEvent::SetProtoConfig { status }),
        )
    }

    fn ee_clear_default_proto_routing(&self, handle: EeHandle, mask: ProtocolMask) -> NfaStatus {
        self.request(
            HalCall::EeClearDefaultProtoRouting { handle, mask },
            |_, status| ee(EeEvent::ClearProtoConfig { status }),
        )
    }

    fn ee_add_aid_routing(&self, entry: &RoutingEntry) -> NfaStatus {
        self.request(HalCall::EeAddAidRouting(entry.clone()), |_, status| {
            ee(EeEvent::AddAid { status })
        })
    }

    fn ee_remove_aid_routing(&self, aid: &[u8]) -> NfaStatus {
        let call = HalCall::EeRemoveAidRouting { aid: aid.to_vec() };
        self.request(call, |_, status| ee(EeEvent::RemoveAid { status }))
    }

    fn ee_update_now(&self) -> NfaStatus {
        self.request(HalCall::EeUpdateNow, |_, _| ee(EeEvent::Updated))
    }

    fn ee_mode_set(&self, handle: EeHandle, mode: u8) -> NfaStatus {
        self.request(HalCall::EeModeSet { handle, mode }, |_, status| {
            ee(EeEvent::ModeSet { status })
        })
    }

    fn ee_get_remaining_size(&self) -> NfaStatus {
        self.request(HalCall::EeGetRemainingSize, |st, _| {
            ee(EeEvent::RemainingSize {
                size: st.remaining_size,
            })
        })
    }

    fn aid_table_size(&self) -> u16 {
        self.state.lock().aid_table_size
    }

    fn ce_set_iso_dep_listen_tech(&self, mask: TechMask) -> NfaStatus {
        self.request(HalCall::CeSetIsoDepListenTech { mask }, |_, _| Vec::new())
    }

    fn ce_register_aid_on_dh(&self, aid: &Aid) -> NfaStatus {
        let call = HalCall::CeRegisterAidOnDh {
            aid: aid.as_bytes().to_vec(),
        };
        self.request(call, |_, _| Vec::new())
    }
}
