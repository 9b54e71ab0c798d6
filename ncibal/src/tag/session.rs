// ncibal/src/tag/session.rs

//! Synchronous reader/writer operations on the activated tag.
//!
//! Every hardware request runs under the recursive RF-field lock and waits
//! on its own rendezvous. Completions arrive through the `handle_*` and
//! `notify_*` entry points, called from the controller's callback thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::config::BalConfig;
use crate::constants::{
    DESFIRE_GET_VERSION, DESFIRE_MARKER, DESFIRE_RESPONSE_LEN, EMPTY_NDEF_MESSAGE, MIFARE_AUTH_A,
    MIFARE_AUTH_B, protocol,
};
use crate::device::rf::RfFieldLock;
use crate::device::state::NfcState;
use crate::hal::{ConnectionEvent, DiscoveryNotification, NciHal, RfActivation};
use crate::protocol::TagSignatures;
use crate::protocol::activation::{self, is_selectable, rf_interface};
use crate::sync::{Rendezvous, WaitOutcome};
use crate::tag::{DiscoveredTechnology, TagEndpoint, TimeoutTable};
use crate::types::{NdefFlags, NdefInfo, NdefMode, NfaStatus, Technology};
use crate::utils::{HexSlice, ms};

/// Outcome of the last NDEF detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdefCheck {
    /// NDEF present; `cur_size` is the stored message length.
    Ndef { info: NdefInfo, cur_size: u32 },
    /// No NDEF, but the tag supports it once formatted.
    FailedFormatable,
    FailedUnformatable,
    TimedOut,
}

impl NdefCheck {
    /// Interpret a detection completion. `t1t_max` replaces the reported
    /// size for Topaz tags.
    pub fn from_detect(
        status: NfaStatus,
        protocol_code: u8,
        max_size: u32,
        cur_size: u32,
        flags: NdefFlags,
        t1t_max: u32,
    ) -> Self {
        let mode = if flags.contains(NdefFlags::READ_ONLY) {
            NdefMode::ReadOnly
        } else {
            NdefMode::ReadWrite
        };
        match status {
            NfaStatus::Ok => NdefCheck::Ndef {
                info: NdefInfo {
                    max_size: if protocol_code == protocol::T1T {
                        t1t_max
                    } else {
                        max_size
                    },
                    mode,
                },
                cur_size,
            },
            NfaStatus::Timeout => NdefCheck::TimedOut,
            _ if flags.contains(NdefFlags::SUPPORTED) && !flags.contains(NdefFlags::UNKNOWN) => {
                NdefCheck::FailedFormatable
            }
            _ => NdefCheck::FailedUnformatable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Connection {
    handle: u8,
    protocol: u8,
    technology: Technology,
}

struct SessionState {
    connection: Option<Connection>,
    timeouts: TimeoutTable,
    techs: Vec<DiscoveredTechnology>,
    pending_disc: Vec<DiscoveryNotification>,
    protocol: u8,
    signatures: TagSignatures,
    t1t_max_size: u32,
    last_check: Option<NdefCheck>,
}

/// Marks a transceive in flight for the lifetime of the guard.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        InFlight(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn is_mifare_auth(request: &[u8]) -> bool {
    matches!(request.first(), Some(&MIFARE_AUTH_A) | Some(&MIFARE_AUTH_B))
}

fn is_nak(response: &[u8]) -> bool {
    response.len() == 1 && response[0] != 0
}

pub struct TagSession {
    hal: Arc<dyn NciHal>,
    state: Arc<NfcState>,
    field: RfFieldLock,
    wait: Duration,
    presence_option: u8,
    presence_delay_ms: u64,
    inner: Mutex<SessionState>,
    in_transceive: AtomicBool,
    present: AtomicBool,
    rx_buf: Mutex<Vec<u8>>,
    ndef_buf: Mutex<Vec<u8>>,
    select: Rendezvous<NfaStatus>,
    activated: Rendezvous<()>,
    deactivated: Rendezvous<()>,
    transceive: Rendezvous<NfaStatus>,
    presence: Rendezvous<NfaStatus>,
    read: Rendezvous<NfaStatus>,
    write: Rendezvous<NfaStatus>,
    format: Rendezvous<NfaStatus>,
    read_only: Rendezvous<NfaStatus>,
    check: Rendezvous<NdefCheck>,
}

impl TagSession {
    pub fn new(
        hal: Arc<dyn NciHal>,
        state: Arc<NfcState>,
        field: RfFieldLock,
        config: &BalConfig,
    ) -> Self {
        Self {
            hal,
            state,
            field,
            wait: ms(config.default_timeout_ms),
            presence_option: config.presence_check_option,
            presence_delay_ms: config.presence_check_delay_ms,
            inner: Mutex::new(SessionState {
                connection: None,
                timeouts: TimeoutTable::new(config.tag_timeouts.clone()),
                techs: Vec::new(),
                pending_disc: Vec::new(),
                protocol: protocol::UNKNOWN,
                signatures: TagSignatures::default(),
                t1t_max_size: 0,
                last_check: None,
            }),
            in_transceive: AtomicBool::new(false),
            present: AtomicBool::new(true),
            rx_buf: Mutex::new(Vec::new()),
            ndef_buf: Mutex::new(Vec::new()),
            select: Rendezvous::new("select"),
            activated: Rendezvous::new("activated"),
            deactivated: Rendezvous::new("deactivated"),
            transceive: Rendezvous::new("transceive"),
            presence: Rendezvous::new("presence check"),
            read: Rendezvous::new("ndef read"),
            write: Rendezvous::new("ndef write"),
            format: Rendezvous::new("ndef format"),
            read_only: Rendezvous::new("set read-only"),
            check: Rendezvous::new("ndef detect"),
        }
    }

    /// Default presence watchdog delay handed to new endpoints.
    pub fn presence_delay_ms(&self) -> u64 {
        self.presence_delay_ms
    }

    fn set_connection(&self, handle: u8, protocol_code: u8, technology: Technology) {
        self.inner.lock().connection = Some(Connection {
            handle,
            protocol: protocol_code,
            technology,
        });
    }

    /// Select a target for the first time.
    pub fn connect(&self, handle: u8, protocol_code: u8, technology: Technology) -> NfaStatus {
        if !self.state.is_tag_ready() {
            warn!("connect {}: no active tag", handle);
            return NfaStatus::Busy;
        }
        let _field = self.field.lock();
        debug!(
            "connect handle={} protocol={:#04x} tech={:?}",
            handle, protocol_code, technology
        );
        let outcome = self.select.call(Some(self.wait), || {
            self.hal
                .select(handle, protocol_code, rf_interface(protocol_code))
        });
        match outcome {
            WaitOutcome::Completed(NfaStatus::Ok) => {
                self.set_connection(handle, protocol_code, technology);
                NfaStatus::Ok
            }
            WaitOutcome::Completed(s) | WaitOutcome::Rejected(s) => {
                warn!("select {} failed: {}", handle, s);
                s
            }
            WaitOutcome::TimedOut => {
                warn!("select {} timed out, deactivating", handle);
                let status = self.hal.deactivate(false);
                if !status.is_ok() {
                    debug!("deactivate after select timeout: {}", status);
                }
                NfaStatus::Timeout
            }
            WaitOutcome::Aborted => NfaStatus::Failed,
        }
    }

    /// Re-select a target through a sleep/select cycle.
    ///
    /// Returns immediately when already connected with `protocol_code` and
    /// no restart is forced.
    pub fn reconnect(
        &self,
        handle: u8,
        protocol_code: u8,
        technology: Technology,
        restart: bool,
    ) -> bool {
        if !self.state.is_tag_ready() {
            warn!("reconnect {}: no active tag", handle);
            return false;
        }
        let _field = self.field.lock();
        let current = self.inner.lock().connection;
        if !restart && current.is_some_and(|c| c.protocol == protocol_code) {
            return true;
        }
        debug!(
            "reconnect handle={} protocol={:#04x} restart={}",
            handle, protocol_code, restart
        );

        match self
            .deactivated
            .call(Some(self.wait), || self.hal.deactivate(true))
        {
            WaitOutcome::Rejected(s) => {
                warn!("deactivate to sleep rejected: {}", s);
                return false;
            }
            WaitOutcome::Completed(()) => {}
            other => debug!("deactivate to sleep not confirmed: {:?}", other),
        }

        let activation = self.activated.arm();
        match self.select.call(Some(self.wait), || {
            self.hal
                .select(handle, protocol_code, rf_interface(protocol_code))
        }) {
            WaitOutcome::Completed(NfaStatus::Ok) => {}
            WaitOutcome::TimedOut => {
                warn!("reselect {} timed out", handle);
                let status = self.hal.deactivate(false);
                if !status.is_ok() {
                    debug!("deactivate after reselect timeout: {}", status);
                }
                return false;
            }
            other => {
                warn!("reselect {} failed: {:?}", handle, other);
                return false;
            }
        }
        if !activation.wait(Some(self.wait)).is_completed() {
            warn!("no activation after reselecting {}", handle);
            return false;
        }

        self.set_connection(handle, protocol_code, technology);
        true
    }

    /// Deactivate to idle. Connection state is cleared whatever the
    /// controller answers.
    pub fn disconnect(&self) -> bool {
        let _field = self.field.lock();
        let status = self.hal.deactivate(false);
        {
            let mut inner = self.inner.lock();
            inner.connection = None;
            inner.timeouts.reset();
        }
        self.state.update(|s| s.is_reconnecting = false);
        if !status.is_ok() {
            debug!("deactivate to idle: {}", status);
        }
        status.is_ok()
    }

    /// Exchange a raw frame with the connected tag.
    ///
    /// A one-byte NAK from a MIFARE Classic tag on a non-auth command is
    /// retried once; a NAK after that forces a reconnect.
    pub fn transceive(&self, request: &[u8], response: &mut Vec<u8>) -> NfaStatus {
        if !self.state.is_tag_ready() {
            return NfaStatus::Busy;
        }
        let _in_flight = InFlight::enter(&self.in_transceive);
        let _field = self.field.lock();
        let (connection, timeout_ms) = {
            let inner = self.inner.lock();
            let tech = inner
                .connection
                .map(|c| c.technology)
                .unwrap_or(Technology::Unknown);
            (inner.connection, inner.timeouts.get(tech))
        };
        let mifare = connection.is_some_and(|c| c.protocol == protocol::MIFARE);

        let mut retried = false;
        loop {
            let status = self.exchange(request, timeout_ms, response);
            if mifare && is_nak(response) {
                if !retried && !is_mifare_auth(request) {
                    debug!("mifare nak {:#04x}, retrying once", response[0]);
                    retried = true;
                    continue;
                }
                if let Some(c) = connection {
                    warn!("mifare nak {:#04x} persists, reconnecting", response[0]);
                    self.reconnect(c.handle, protocol::MIFARE, Technology::MifareClassic, true);
                }
            }
            return status;
        }
    }

    fn exchange(&self, request: &[u8], timeout_ms: u64, response: &mut Vec<u8>) -> NfaStatus {
        let pending = self.transceive.arm();
        self.rx_buf.lock().clear();
        response.clear();
        let delay = u16::try_from(self.presence_delay_ms).unwrap_or(u16::MAX);
        let status = self.hal.send_raw_frame(request, delay);
        if !status.is_ok() {
            warn!("raw frame rejected: {}", status);
            return status;
        }
        let outcome = pending.wait(Some(ms(timeout_ms)));
        *response = std::mem::take(&mut *self.rx_buf.lock());
        match outcome {
            WaitOutcome::Completed(s) | WaitOutcome::Rejected(s) => s,
            WaitOutcome::TimedOut => {
                debug!("transceive timed out after {} ms", timeout_ms);
                NfaStatus::Timeout
            }
            WaitOutcome::Aborted => NfaStatus::Failed,
        }
    }

    /// Probe the tag. Never blocks behind a transceive: while one is in
    /// flight or the RF field is held elsewhere the tag counts as present.
    pub fn presence_check(&self) -> bool {
        if !self.state.is_tag_ready() {
            return false;
        }
        if self.in_transceive.load(Ordering::SeqCst) {
            return true;
        }
        let Some(_field) = self.field.try_lock() else {
            return true;
        };
        let present = match self.presence.call(Some(self.wait), || {
            self.hal.presence_check(self.presence_option)
        }) {
            WaitOutcome::Completed(s) => s.is_ok(),
            WaitOutcome::Rejected(s) => {
                debug!("presence check rejected: {}", s);
                self.present.load(Ordering::SeqCst)
            }
            WaitOutcome::TimedOut | WaitOutcome::Aborted => false,
        };
        self.present.store(present, Ordering::SeqCst);
        present
    }

    /// Run NDEF detection and keep its outcome for later reads and writes.
    pub fn check_ndef_status(&self) -> Option<NdefCheck> {
        if !self.state.is_tag_ready() {
            return None;
        }
        let _field = self.field.lock();
        self.state.update(|s| s.is_reconnecting = false);
        let check = match self
            .check
            .call(Some(self.wait), || self.hal.detect_ndef())
        {
            WaitOutcome::Completed(c) => c,
            WaitOutcome::Rejected(s) => {
                warn!("ndef detect rejected: {}", s);
                return None;
            }
            WaitOutcome::TimedOut | WaitOutcome::Aborted => NdefCheck::TimedOut,
        };
        self.inner.lock().last_check = Some(check);
        Some(check)
    }

    /// Size and access mode of the NDEF message, if the tag carries one.
    pub fn check_ndef(&self) -> Option<NdefInfo> {
        match self.check_ndef_status()? {
            NdefCheck::Ndef { info, .. } => Some(info),
            _ => None,
        }
    }

    pub fn last_ndef_check(&self) -> Option<NdefCheck> {
        self.inner.lock().last_check
    }

    /// Read the NDEF message found by the last check.
    pub fn read_ndef(&self) -> Option<Vec<u8>> {
        if !self.state.is_tag_ready() {
            return None;
        }
        let _field = self.field.lock();
        self.ndef_buf.lock().clear();
        let has_message = matches!(
            self.inner.lock().last_check,
            Some(NdefCheck::Ndef { cur_size, .. }) if cur_size > 0
        );
        if !has_message {
            debug!("read ndef: nothing to read");
            return None;
        }
        match self.read.call(Some(self.wait), || self.hal.read_ndef()) {
            WaitOutcome::Completed(NfaStatus::Ok) => {}
            other => {
                warn!("ndef read: {:?}", other);
                self.ndef_buf.lock().clear();
                return None;
            }
        }
        let data = std::mem::take(&mut *self.ndef_buf.lock());
        if data.is_empty() { None } else { Some(data) }
    }

    /// Write `message`; an empty message writes a single empty record. A
    /// tag whose last check reported "formatable" is formatted first.
    pub fn write_ndef(&self, message: &[u8]) -> bool {
        if !self.state.is_tag_ready() {
            return false;
        }
        let _field = self.field.lock();
        if self.inner.lock().last_check == Some(NdefCheck::FailedFormatable) {
            info!("formatting before first ndef write");
            if !self.format_ndef() {
                warn!("format before write failed");
                return false;
            }
        }
        let payload: &[u8] = if message.is_empty() {
            &EMPTY_NDEF_MESSAGE
        } else {
            message
        };
        debug!("write ndef {}", HexSlice(payload));
        matches!(
            self.write
                .call(Some(self.wait), || self.hal.write_ndef(payload)),
            WaitOutcome::Completed(NfaStatus::Ok)
        )
    }

    pub fn format_ndef(&self) -> bool {
        if !self.state.is_tag_ready() {
            return false;
        }
        let _field = self.field.lock();
        matches!(
            self.format.call(Some(self.wait), || self.hal.format_tag()),
            WaitOutcome::Completed(NfaStatus::Ok)
        )
    }

    /// Lock the tag; a rejected hard lock falls back to a soft lock.
    pub fn make_read_only(&self) -> bool {
        if !self.state.is_tag_ready() {
            return false;
        }
        let _field = self.field.lock();
        let outcome = match self
            .read_only
            .call(Some(self.wait), || self.hal.set_tag_read_only(true))
        {
            WaitOutcome::Rejected(NfaStatus::Rejected) => {
                info!("hard lock rejected, trying soft lock");
                self.read_only
                    .call(Some(self.wait), || self.hal.set_tag_read_only(false))
            }
            other => other,
        };
        matches!(outcome, WaitOutcome::Completed(NfaStatus::Ok))
    }

    /// Whether the activated tag can be NDEF-formatted.
    pub fn is_ndef_formattable(&self) -> bool {
        let (protocol_code, sig) = {
            let inner = self.inner.lock();
            (inner.protocol, inner.signatures)
        };
        match protocol_code {
            protocol::T1T | protocol::T5T | protocol::MIFARE => true,
            protocol::T2T => sig.t2t_formattable(),
            protocol::T3T => sig.felica_lite,
            protocol::ISO_DEP => sig.mifare_desfire && self.probe_desfire(),
            _ => false,
        }
    }

    fn probe_desfire(&self) -> bool {
        let mut response = Vec::new();
        let status = self.transceive(&DESFIRE_GET_VERSION, &mut response);
        status.is_ok()
            && response.len() == DESFIRE_RESPONSE_LEN
            && response[DESFIRE_RESPONSE_LEN - 2..] == DESFIRE_MARKER
    }

    pub fn set_timeout(&self, technology: Technology, timeout_ms: u64) -> bool {
        self.inner.lock().timeouts.set(technology, timeout_ms)
    }

    pub fn get_timeout(&self, technology: Technology) -> u64 {
        self.inner.lock().timeouts.get(technology)
    }

    pub fn reset_timeouts(&self) {
        self.inner.lock().timeouts.reset();
    }

    pub fn register_ndef_handler(&self) -> bool {
        let status = self.hal.register_ndef_handler();
        if !status.is_ok() {
            error!("ndef handler registration failed: {}", status);
        }
        status.is_ok()
    }

    /// Record a new activation and build the endpoint for it.
    ///
    /// Technologies accumulate across activations until the tag leaves the
    /// field, so a multi-protocol tag's later endpoints list every slot seen
    /// so far.
    pub fn create_tag_endpoint(self: &Arc<Self>, act: &RfActivation) -> Option<Arc<TagEndpoint>> {
        let (techs, uid) = {
            let mut inner = self.inner.lock();
            if inner.techs.len() >= Technology::TABLE_SIZE {
                warn!("technology list full, activation {} ignored", act.disc_id);
                return None;
            }
            inner.protocol = act.protocol;
            inner.t1t_max_size = activation::t1t_max_message_size(act);
            inner.signatures = TagSignatures::from_activation(act);
            inner.techs.extend(DiscoveredTechnology::from_activation(act));
            (inner.techs.clone(), activation::uid(act))
        };
        self.present.store(true, Ordering::SeqCst);
        debug!(
            "tag discovered: id={} protocol={:#04x} techs={:?} uid={}",
            act.disc_id,
            act.protocol,
            techs.iter().map(|t| t.technology).collect::<Vec<_>>(),
            HexSlice(&uid)
        );
        Some(TagEndpoint::new(Arc::clone(self), techs, uid))
    }

    /// Forget the tag that left the field.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.connection = None;
        inner.techs.clear();
        inner.pending_disc.clear();
        inner.protocol = protocol::UNKNOWN;
        inner.signatures = TagSignatures::default();
        inner.t1t_max_size = 0;
        inner.last_check = None;
        inner.timeouts.reset();
    }

    /// Collect multi-protocol discovery notifications and select the first
    /// target the reader can talk to once the last one arrives.
    pub fn handle_discovery_result(&self, notification: DiscoveryNotification) {
        debug!(
            "discovery result id={} protocol={:#04x} more={}",
            notification.disc_id, notification.protocol, notification.more
        );
        let target = {
            let mut inner = self.inner.lock();
            inner.pending_disc.push(notification);
            if notification.more {
                return;
            }
            let pending = std::mem::take(&mut inner.pending_disc);
            pending.into_iter().find(|n| is_selectable(n.protocol))
        };
        let Some(target) = target else {
            debug!("only nfc-dep targets discovered");
            return;
        };
        let Some(_field) = self.field.try_lock_for(self.wait) else {
            warn!("rf field busy, target {} not selected", target.disc_id);
            return;
        };
        let status = self.hal.select(
            target.disc_id,
            target.protocol,
            rf_interface(target.protocol),
        );
        if !status.is_ok() {
            error!("select {} failed: {}", target.disc_id, status);
        }
        self.set_connection(target.disc_id, target.protocol, Technology::Unknown);
    }

    pub fn notify_activated(&self) {
        self.activated.notify(());
    }

    pub fn notify_deactivated(&self) {
        self.deactivated.notify(());
    }

    pub fn handle_ndef_data(&self, data: Vec<u8>) {
        debug!("ndef data {} bytes", data.len());
        *self.ndef_buf.lock() = data;
    }

    /// Completion events addressed to the tag session.
    pub fn handle_connection_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::SelectResult { status } => {
                self.select.notify(status);
            }
            ConnectionEvent::Data { status, data } => match status {
                NfaStatus::Ok => {
                    self.rx_buf.lock().extend_from_slice(&data);
                    self.transceive.notify(status);
                }
                NfaStatus::Continue => self.rx_buf.lock().extend_from_slice(&data),
                other => {
                    self.transceive.notify(other);
                }
            },
            ConnectionEvent::PresenceCheck { status } => {
                self.presence.notify(status);
            }
            ConnectionEvent::ReadComplete { status } => {
                if !status.is_ok() {
                    self.ndef_buf.lock().clear();
                }
                self.read.notify(status);
            }
            ConnectionEvent::WriteComplete { status } => {
                self.write.notify(status);
            }
            ConnectionEvent::FormatComplete { status } => {
                self.format.notify(status);
            }
            ConnectionEvent::SetTagReadOnly { status } => {
                self.read_only.notify(status);
            }
            ConnectionEvent::NdefDetect {
                status,
                protocol: protocol_code,
                max_size,
                cur_size,
                flags,
            } => {
                let t1t_max = self.inner.lock().t1t_max_size;
                let check =
                    NdefCheck::from_detect(status, protocol_code, max_size, cur_size, flags, t1t_max);
                debug!("ndef detect {} -> {:?}", status, check);
                self.check.notify(check);
            }
            other => debug!("tag session ignoring {:?}", other),
        }
    }

    /// Wake every thread blocked on a tag completion.
    pub fn abort_wait(&self) {
        self.select.abort();
        self.activated.abort();
        self.deactivated.abort();
        self.transceive.abort();
        self.presence.abort();
        self.read.abort();
        self.write.abort();
        self.format.abort();
        self.read_only.abort();
        self.check.abort();
    }
}
