// ncibal/src/hal/events.rs

//! Completion events delivered by the controller on its callback thread, and
//! the activation structures they carry.

use bitflags::Flags;

use crate::types::{EeHandle, NdefFlags, NfaStatus};

/// Per-technology parameters captured during RF discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RfTechParams {
    A {
        sens_res: [u8; 2],
        nfcid1: Vec<u8>,
        sel_rsp: u8,
    },
    B {
        /// Full SENSB_RES; the first four bytes carry NFCID0.
        sensb_res: Vec<u8>,
        nfcid0: [u8; 4],
    },
    F {
        /// Full SENSF_RES (NFCID2 at 0..8, PAD/PMm at 8..16).
        sensf_res: Vec<u8>,
        nfcid2: [u8; 8],
    },
    V {
        uid: [u8; 8],
        afi: u8,
        dsfid: u8,
    },
    None,
}

/// Parameters of the activated RF interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceParams {
    IsoDepA { historical_bytes: Vec<u8> },
    IsoDepB { hi_info: Vec<u8> },
    None,
}

/// Protocol-specific activation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolParams {
    T1t { hr: [u8; 2] },
    T3t { system_codes: Vec<u16> },
    T5t { uid: [u8; 8], afi: u8, dsfid: u8 },
    None,
}

/// Activation notification for one discovered target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfActivation {
    pub disc_id: u8,
    pub protocol: u8,
    pub mode: u8,
    pub interface: u8,
    pub tech_params: RfTechParams,
    pub interface_params: InterfaceParams,
    pub protocol_params: ProtocolParams,
}

/// One entry of a multi-target discovery notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryNotification {
    pub disc_id: u8,
    pub protocol: u8,
    /// More notifications follow for the same field.
    pub more: bool,
}

/// Device management events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    EnableComplete { status: NfaStatus },
    DisableComplete,
    RfField { status: NfaStatus, on: bool },
    NfccTransportError,
    NfccTimeout,
    SetConfig { status: NfaStatus },
    PowerSubState { status: NfaStatus },
}

/// Connection (reader/writer) events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    PollEnabled { status: NfaStatus },
    PollDisabled { status: NfaStatus },
    RfDiscoveryStarted { status: NfaStatus },
    RfDiscoveryStopped { status: NfaStatus },
    Activated(RfActivation),
    Deactivated { sleep: bool },
    DiscoveryResult {
        status: NfaStatus,
        notification: DiscoveryNotification,
    },
    SelectResult { status: NfaStatus },
    Data { status: NfaStatus, data: Vec<u8> },
    PresenceCheck { status: NfaStatus },
    ReadComplete { status: NfaStatus },
    WriteComplete { status: NfaStatus },
    FormatComplete { status: NfaStatus },
    SetTagReadOnly { status: NfaStatus },
    NdefDetect {
        status: NfaStatus,
        protocol: u8,
        max_size: u32,
        cur_size: u32,
        flags: NdefFlags,
    },
}

/// NDEF type handler events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdefEvent {
    Registered { status: NfaStatus },
    Data(Vec<u8>),
}

/// NFCEE discovered during EE discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EeDiscoverInfo {
    pub handle: EeHandle,
    pub la_protocol: u8,
    pub lb_protocol: u8,
}

/// NFCEE management and routing events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EeEvent {
    Registered { status: NfaStatus },
    SetTechConfig { status: NfaStatus },
    ClearTechConfig { status: NfaStatus },
    SetProtoConfig { status: NfaStatus },
    ClearProtoConfig { status: NfaStatus },
    AddAid { status: NfaStatus },
    RemoveAid { status: NfaStatus },
    Updated,
    DiscoverReq {
        status: NfaStatus,
        ees: Vec<EeDiscoverInfo>,
    },
    ModeSet { status: NfaStatus },
    RemainingSize { size: u16 },
}

/// Host card emulation events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeEvent {
    Activated { protocol: u8 },
    Deactivated,
    Data { status: NfaStatus, data: Vec<u8> },
}

/// HCI events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HciEvent {
    EventReceived {
        pipe: u8,
        evt_code: u8,
        data: Vec<u8>,
    },
    Other { event: u8 },
}

/// Snapshot of one NFCEE returned by `ee_get_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EeInfo {
    pub handle: EeHandle,
    pub status: u8,
    pub interfaces: Vec<u8>,
}

/// Routing masks for each power state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerStateRouting<M> {
    pub switch_on: M,
    pub switch_off: M,
    pub battery_off: M,
    pub screen_lock: M,
    pub screen_off: M,
    pub screen_off_lock: M,
}

impl<M: Flags + Copy> PowerStateRouting<M> {
    /// Mask routed in every state except battery-off; secure NFC keeps
    /// only switch-on.
    pub fn off_host(mask: M, secure: bool) -> Self {
        let unless_secure = if secure { M::empty() } else { mask };
        Self {
            switch_on: mask,
            switch_off: unless_secure,
            battery_off: M::empty(),
            screen_lock: unless_secure,
            screen_off: unless_secure,
            screen_off_lock: unless_secure,
        }
    }

    /// Mask routed to the host while on, plus screen-lock unless secure.
    pub fn host(mask: M, secure: bool) -> Self {
        Self {
            switch_on: mask,
            switch_off: M::empty(),
            battery_off: M::empty(),
            screen_lock: if secure { M::empty() } else { mask },
            screen_off: M::empty(),
            screen_off_lock: M::empty(),
        }
    }
}

/// Receiver for every controller event; registered at enable time.
///
/// Every method defaults to dropping the event.
pub trait NciCallbacks: Send + Sync {
    fn on_device_event(&self, _event: DeviceEvent) {}
    fn on_connection_event(&self, _event: ConnectionEvent) {}
    fn on_ndef_event(&self, _event: NdefEvent) {}
    fn on_ee_event(&self, _event: EeEvent) {}
    fn on_ce_event(&self, _event: CeEvent) {}
    fn on_hci_event(&self, _event: HciEvent) {}
}

/// Any controller event, tagged by the callback it is delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NciEvent {
    Device(DeviceEvent),
    Connection(ConnectionEvent),
    Ndef(NdefEvent),
    Ee(EeEvent),
    Ce(CeEvent),
    Hci(HciEvent),
}

impl NciEvent {
    /// Hand the event to the matching callback.
    pub fn dispatch(self, callbacks: &dyn NciCallbacks) {
        match self {
            NciEvent::Device(e) => callbacks.on_device_event(e),
            NciEvent::Connection(e) => callbacks.on_connection_event(e),
            NciEvent::Ndef(e) => callbacks.on_ndef_event(e),
            NciEvent::Ee(e) => callbacks.on_ee_event(e),
            NciEvent::Ce(e) => callbacks.on_ce_event(e),
            NciEvent::Hci(e) => callbacks.on_hci_event(e),
        }
    }
}
