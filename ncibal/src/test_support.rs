//! Test support helpers intended for use by unit and integration tests.
//!
//! These helpers centralize common MockNci setup so tests across the crate
//! and the tests/ directory can reuse the same fixtures.
#![allow(dead_code)]

use std::sync::{Arc, Weak};

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::BalConfig;
use crate::device::{DeviceHost, DeviceHostBuilder, DeviceHostListener};
use crate::hal::{ConnectionEvent, NciCallbacks, NdefEvent, MockNci};
use crate::tag::{TagEndpoint, TagSession};
use crate::types::TechMask;
use crate::Result;

/// Callback sink that drops every event.
#[doc(hidden)]
pub struct NullCallbacks;

impl NciCallbacks for NullCallbacks {}

/// Routes connection and NDEF events straight into a [`TagSession`], for
/// tests that drive the session without a full controller.
#[doc(hidden)]
pub struct SessionCallbacks {
    session: Weak<TagSession>,
}

impl SessionCallbacks {
    pub fn new(session: &Arc<TagSession>) -> Self {
        Self {
            session: Arc::downgrade(session),
        }
    }
}

impl NciCallbacks for SessionCallbacks {
    fn on_connection_event(&self, event: ConnectionEvent) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        match event {
            ConnectionEvent::Activated(_) => session.notify_activated(),
            ConnectionEvent::Deactivated { .. } => session.notify_deactivated(),
            ConnectionEvent::DiscoveryResult {
                status,
                notification,
            } => {
                if status.is_ok() {
                    session.handle_discovery_result(notification);
                }
            }
            other => session.handle_connection_event(other),
        }
    }

    fn on_ndef_event(&self, event: NdefEvent) {
        if let (Some(session), NdefEvent::Data(data)) = (self.session.upgrade(), event) {
            session.handle_ndef_data(data);
        }
    }
}

/// Notification captured by [`RecordingListener`].
#[doc(hidden)]
#[derive(Debug, Clone)]
pub enum Notification {
    RemoteFieldOn,
    RemoteFieldOff,
    HceActivated(TechMask),
    HceDeactivated(TechMask),
    HceData(TechMask, Vec<u8>),
    TagDiscovered(Arc<TagEndpoint>),
    OffHostTransaction {
        aid: Vec<u8>,
        data: Vec<u8>,
        se_name: String,
    },
    EeUpdate,
}

/// Listener forwarding every notification into a channel.
#[doc(hidden)]
pub struct RecordingListener {
    tx: Sender<Notification>,
}

impl RecordingListener {
    /// The listener as a trait object plus the receiving end.
    pub fn new() -> (Arc<dyn DeviceHostListener>, Receiver<Notification>) {
        let (tx, rx) = channel::unbounded();
        (Arc::new(Self { tx }), rx)
    }

    fn send(&self, n: Notification) {
        let _ = self.tx.send(n);
    }
}

impl DeviceHostListener for RecordingListener {
    fn on_remote_field_activated(&self) {
        self.send(Notification::RemoteFieldOn);
    }

    fn on_remote_field_deactivated(&self) {
        self.send(Notification::RemoteFieldOff);
    }

    fn on_hce_activated(&self, technology: TechMask) {
        self.send(Notification::HceActivated(technology));
    }

    fn on_hce_deactivated(&self, technology: TechMask) {
        self.send(Notification::HceDeactivated(technology));
    }

    fn on_hce_data_received(&self, technology: TechMask, data: Vec<u8>) {
        self.send(Notification::HceData(technology, data));
    }

    fn on_tag_discovered(&self, endpoint: Arc<TagEndpoint>) {
        self.send(Notification::TagDiscovered(endpoint));
    }

    fn on_off_host_transaction(&self, aid: Vec<u8>, data: Vec<u8>, se_name: String) {
        self.send(Notification::OffHostTransaction { aid, data, se_name });
    }

    fn on_ee_update(&self) {
        self.send(Notification::EeUpdate);
    }
}

/// Build a host over a fresh [`MockNci`].
#[doc(hidden)]
pub fn mock_host(config: BalConfig) -> Result<(Arc<MockNci>, DeviceHost)> {
    let mock = MockNci::new();
    let host = DeviceHostBuilder::new()
        .with_hal(mock.clone())
        .with_config(config)
        .build()?;
    Ok((mock, host))
}

/// Convenience: a host that is already initialized, with the recorded call
/// log cleared so assertions start from a clean slate.
#[doc(hidden)]
pub fn initialized_mock_host(config: BalConfig) -> Result<(Arc<MockNci>, DeviceHost)> {
    let (mock, host) = mock_host(config)?;
    host.initialize();
    mock.flush();
    mock.clear_calls();
    Ok((mock, host))
}

/// Activation notifications for common tag families.
#[doc(hidden)]
pub mod sample {
    use crate::constants::{interface, mode, protocol};
    use crate::hal::{InterfaceParams, ProtocolParams, RfActivation, RfTechParams};

    /// NFCID1 of [`nfc_a_iso_dep`].
    pub const NFCID1: [u8; 7] = [0x04, 0x5A, 0x31, 0x22, 0x7C, 0x10, 0x80];

    fn nfc_a(sens_res: [u8; 2], nfcid1: &[u8], sel_rsp: u8) -> RfTechParams {
        RfTechParams::A {
            sens_res,
            nfcid1: nfcid1.to_vec(),
            sel_rsp,
        }
    }

    /// ISO-DEP card over NFC-A (a payment or transit card).
    pub fn nfc_a_iso_dep(disc_id: u8) -> RfActivation {
        RfActivation {
            disc_id,
            protocol: protocol::ISO_DEP,
            mode: mode::POLL_A,
            interface: interface::ISO_DEP,
            tech_params: nfc_a([0x04, 0x00], &NFCID1, 0x20),
            interface_params: InterfaceParams::IsoDepA {
                historical_bytes: vec![0x80, 0x31, 0x80, 0x65],
            },
            protocol_params: ProtocolParams::None,
        }
    }

    /// Topaz 96 (T1T, HR0 0x11).
    pub fn topaz(disc_id: u8) -> RfActivation {
        RfActivation {
            disc_id,
            protocol: protocol::T1T,
            mode: mode::POLL_A,
            interface: interface::FRAME,
            tech_params: nfc_a([0x0C, 0x00], &[0x18, 0x2A, 0x3B, 0x4C], 0x00),
            interface_params: InterfaceParams::None,
            protocol_params: ProtocolParams::T1t { hr: [0x11, 0x48] },
        }
    }

    /// Mifare Ultralight (NXP T2T).
    pub fn ultralight(disc_id: u8) -> RfActivation {
        RfActivation {
            disc_id,
            protocol: protocol::T2T,
            mode: mode::POLL_A,
            interface: interface::FRAME,
            tech_params: nfc_a(
                [0x44, 0x00],
                &[0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66],
                0x00,
            ),
            interface_params: InterfaceParams::None,
            protocol_params: ProtocolParams::None,
        }
    }

    /// T2T from a vendor with no formattability signature.
    pub fn plain_t2t(disc_id: u8) -> RfActivation {
        RfActivation {
            disc_id,
            protocol: protocol::T2T,
            mode: mode::POLL_A,
            interface: interface::FRAME,
            tech_params: nfc_a(
                [0x44, 0x00],
                &[0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66],
                0x00,
            ),
            interface_params: InterfaceParams::None,
            protocol_params: ProtocolParams::None,
        }
    }

    /// FeliCa card answering with `system_code`.
    pub fn felica(disc_id: u8, system_code: u16) -> RfActivation {
        let nfcid2 = [0x01, 0x2E, 0x4C, 0x7A, 0x1B, 0x09, 0x33, 0x21];
        let mut sensf_res = nfcid2.to_vec();
        sensf_res.extend_from_slice(&[0x03, 0x01, 0x4B, 0x02, 0x4F, 0x49, 0x93, 0xFF]);
        RfActivation {
            disc_id,
            protocol: protocol::T3T,
            mode: mode::POLL_F,
            interface: interface::FRAME,
            tech_params: RfTechParams::F { sensf_res, nfcid2 },
            interface_params: InterfaceParams::None,
            protocol_params: ProtocolParams::T3t {
                system_codes: vec![system_code],
            },
        }
    }

    /// Mifare DESFire (ATQA 0x0344, SAK 0x20).
    pub fn desfire(disc_id: u8) -> RfActivation {
        RfActivation {
            disc_id,
            protocol: protocol::ISO_DEP,
            mode: mode::POLL_A,
            interface: interface::ISO_DEP,
            tech_params: nfc_a(
                [0x44, 0x03],
                &[0x04, 0x52, 0x61, 0x0A, 0x2B, 0x3C, 0x80],
                0x20,
            ),
            interface_params: InterfaceParams::IsoDepA {
                historical_bytes: vec![0x80],
            },
            protocol_params: ProtocolParams::None,
        }
    }

    /// Mifare Classic 1K behind the MIFARE RF interface.
    pub fn mifare_classic(disc_id: u8) -> RfActivation {
        RfActivation {
            disc_id,
            protocol: protocol::MIFARE,
            mode: mode::POLL_A,
            interface: interface::MIFARE,
            tech_params: nfc_a([0x04, 0x00], &[0xDE, 0xAD, 0xBE, 0xEF], 0x08),
            interface_params: InterfaceParams::None,
            protocol_params: ProtocolParams::None,
        }
    }

    /// NFC-DEP peer; never surfaced to the listener.
    pub fn p2p_peer(disc_id: u8) -> RfActivation {
        RfActivation {
            disc_id,
            protocol: protocol::NFC_DEP,
            mode: mode::POLL_A,
            interface: interface::NFC_DEP,
            tech_params: nfc_a([0x00, 0x01], &[0x08, 0x01, 0x02, 0x03], 0x40),
            interface_params: InterfaceParams::None,
            protocol_params: ProtocolParams::None,
        }
    }
}
