// ncibal/src/tag/endpoint.rs

//! Per-tag handle given to the listener when a tag is discovered.
//!
//! An endpoint lists every technology one physical tag exposed, in detection
//! order. Index 0 is the primary slot: its handle identifies the tag for
//! presence checks and [`TagEndpoint::get_handle`]. NDEF and NDEF-formatable
//! pseudo-technologies are appended lazily by [`TagEndpoint::add_ndef_tech`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};
use parking_lot::{Mutex, ReentrantMutex};

use crate::constants::ULTRALIGHT_READ_PAGE2;
use crate::sync::Rendezvous;
use crate::tag::extras::{self, TechExtras};
use crate::tag::{DiscoveredTechnology, TagSession};
use crate::types::{NdefInfo, NfaStatus, TagTechnology, Technology, ndef_forum_type};
use crate::utils::{HexSlice, presence_delay};

#[derive(Debug, Default, Clone, Copy)]
struct Connected {
    handle: Option<u8>,
    index: Option<usize>,
}

/// Suspends hardware presence checks while an endpoint operation runs.
struct PauseGuard<'a>(&'a AtomicUsize);

impl<'a> PauseGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        PauseGuard(counter)
    }
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct TagEndpoint {
    session: Arc<TagSession>,
    techs: Mutex<Vec<DiscoveredTechnology>>,
    uid: Vec<u8>,
    extras: Mutex<HashMap<usize, TechExtras>>,
    connected: Mutex<Connected>,
    io: ReentrantMutex<()>,
    present: AtomicBool,
    paused: AtomicUsize,
    ndef_added: AtomicBool,
    /// Id of the running presence loop; zero when none runs.
    loop_id: AtomicU64,
    next_loop_id: AtomicU64,
    watchdog: Arc<Rendezvous<()>>,
    default_delay_ms: u64,
}

impl std::fmt::Debug for TagEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagEndpoint")
            .field("uid", &self.uid)
            .field("present", &self.present)
            .finish_non_exhaustive()
    }
}

impl TagEndpoint {
    pub fn new(session: Arc<TagSession>, techs: Vec<DiscoveredTechnology>, uid: Vec<u8>) -> Arc<Self> {
        let default_delay_ms = session.presence_delay_ms();
        Arc::new(Self {
            session,
            techs: Mutex::new(techs),
            uid,
            extras: Mutex::new(HashMap::new()),
            connected: Mutex::new(Connected::default()),
            io: ReentrantMutex::new(()),
            present: AtomicBool::new(true),
            paused: AtomicUsize::new(0),
            ndef_added: AtomicBool::new(false),
            loop_id: AtomicU64::new(0),
            next_loop_id: AtomicU64::new(0),
            watchdog: Arc::new(Rendezvous::new("presence watchdog")),
            default_delay_ms,
        })
    }

    fn pause(&self) -> PauseGuard<'_> {
        PauseGuard::new(&self.paused)
    }

    fn slot(&self, index: usize) -> Option<DiscoveredTechnology> {
        self.techs.lock().get(index).cloned()
    }

    /// Connect to the first slot exposing `technology`.
    ///
    /// A slot on another handle is selected for the first time or reselected;
    /// a slot on the connected handle is reselected, which the session skips
    /// when the protocol is unchanged. NDEF has no interface of its own and
    /// always reselects the primary slot.
    pub fn connect(&self, technology: TagTechnology) -> bool {
        let _pause = self.pause();
        let _io = self.io.lock();
        let techs = self.techs.lock().clone();
        let Some(found) = techs
            .iter()
            .position(|t| TagTechnology::from(t.technology) == technology)
        else {
            debug!("connect: {:?} not exposed by this tag", technology);
            return false;
        };

        let connected = self.connected.lock().handle;
        let index = if connected == Some(techs[found].handle) && technology == TagTechnology::Ndef {
            0
        } else {
            found
        };
        let slot = &techs[index];
        let ok = match connected {
            None => self
                .session
                .connect(slot.handle, slot.protocol, slot.technology)
                .is_ok(),
            Some(_) => self
                .session
                .reconnect(slot.handle, slot.protocol, slot.technology, false),
        };

        if ok {
            *self.connected.lock() = Connected {
                handle: Some(slot.handle),
                index: Some(index),
            };
            self.present.store(true, Ordering::SeqCst);
        }
        debug!("connect {:?} -> slot {} ok={}", technology, index, ok);
        ok
    }

    pub fn disconnect(&self) -> bool {
        let _io = self.io.lock();
        *self.connected.lock() = Connected::default();
        self.present.store(false, Ordering::SeqCst);
        let ok = self.session.disconnect();
        self.watchdog.notify(());
        ok
    }

    /// Reselect the connected slot; trivially true when nothing is connected.
    pub fn reconnect(&self) -> bool {
        let Some(index) = self.connected.lock().index else {
            return true;
        };
        let _pause = self.pause();
        let _io = self.io.lock();
        match self.slot(index) {
            Some(slot) => self
                .session
                .reconnect(slot.handle, slot.protocol, slot.technology, false),
            None => false,
        }
    }

    pub fn transceive(&self, request: &[u8], response: &mut Vec<u8>) -> NfaStatus {
        let _pause = self.pause();
        let _io = self.io.lock();
        self.session.transceive(request, response)
    }

    pub fn presence_check(&self) -> bool {
        let _pause = self.pause();
        let _io = self.io.lock();
        let present = self.session.presence_check();
        self.present.store(present, Ordering::SeqCst);
        present
    }

    pub fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    /// Start the background presence watchdog.
    ///
    /// Every `delay_ms` (the configured default when not positive) the loop
    /// probes the tag unless an operation has paused it. When the tag is gone
    /// or the endpoint is disconnected, the loop disconnects the session and
    /// hands the primary handle to `on_lost`. Returns false if a loop is
    /// already running.
    pub fn start_presence_checking<F>(self: &Arc<Self>, delay_ms: i64, on_lost: F) -> bool
    where
        F: FnOnce(u8) + Send + 'static,
    {
        let id = self.next_loop_id.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .loop_id
            .compare_exchange(0, id, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("presence checking already running");
            return false;
        }
        self.present.store(true, Ordering::SeqCst);
        let delay = presence_delay(delay_ms, self.default_delay_ms);
        let weak = Arc::downgrade(self);
        let watchdog = Arc::clone(&self.watchdog);
        let spawned = thread::Builder::new()
            .name("tag-presence".into())
            .spawn(move || presence_loop(weak, watchdog, id, delay, on_lost));
        if let Err(e) = spawned {
            error!("failed to spawn presence loop: {}", e);
            self.loop_id.store(0, Ordering::SeqCst);
            return false;
        }
        debug!("presence checking every {:?}", delay);
        true
    }

    /// Stop the watchdog; the lost-tag callback is not invoked.
    pub fn stop_presence_checking(&self) {
        debug!("stop presence checking");
        self.loop_id.store(0, Ordering::SeqCst);
        self.watchdog.notify(());
    }

    pub fn is_presence_checking(&self) -> bool {
        self.loop_id.load(Ordering::SeqCst) != 0
    }

    /// Coarse technology of every slot, in slot order.
    pub fn get_tech_list(&self) -> Vec<TagTechnology> {
        self.techs
            .lock()
            .iter()
            .map(|t| TagTechnology::from(t.technology))
            .collect()
    }

    pub fn remove_technology(&self, technology: Option<TagTechnology>) {
        match technology {
            None => debug!("remove technology: all"),
            Some(t) => debug!("remove technology: {:?}", t),
        }
    }

    pub fn get_uid(&self) -> Vec<u8> {
        self.uid.clone()
    }

    /// Handle of the primary slot, 0 for an empty endpoint.
    pub fn get_handle(&self) -> u8 {
        self.techs.lock().first().map_or(0, |t| t.handle)
    }

    pub fn get_connected_technology(&self) -> Option<Technology> {
        let index = self.connected.lock().index?;
        self.slot(index).map(|t| t.technology)
    }

    /// Technology-specific extras of slot `index`, computed on first request.
    pub fn get_tech_extras(&self, index: usize) -> Option<TechExtras> {
        if let Some(cached) = self.extras.lock().get(&index) {
            return Some(cached.clone());
        }
        let (slot, has_a_sibling) = {
            let techs = self.techs.lock();
            let slot = techs.get(index)?.clone();
            let has_a = techs.iter().any(|t| t.technology == Technology::Iso14443_3A);
            (slot, has_a)
        };
        let computed = match slot.technology {
            Technology::MifareUltralight => TechExtras::MifareUltralight {
                is_ultralight_c: self.is_ultralight_c(),
            },
            _ => extras::from_bytes(&slot, has_a_sibling),
        };
        self.extras.lock().insert(index, computed.clone());
        Some(computed)
    }

    fn is_ultralight_c(&self) -> bool {
        let _pause = self.pause();
        let _io = self.io.lock();
        let mut response = Vec::new();
        self.session.transceive(&ULTRALIGHT_READ_PAGE2, &mut response);
        let is_c = extras::is_ultralight_c(&response);
        debug!("ultralight page 2 {} -> c={}", HexSlice(&response), is_c);
        is_c
    }

    fn push_slot(&self, slot: DiscoveredTechnology) -> usize {
        let mut techs = self.techs.lock();
        techs.push(slot);
        techs.len() - 1
    }

    /// Append the NDEF or NDEF-formatable pseudo-technology. Runs once.
    ///
    /// Slots are reselected in order; the first holding NDEF gets an NDEF
    /// slot with the message read from it. Failing that, the first slot the
    /// session reports formattable gets an NDEF-formatable slot. Slots that
    /// cannot be reselected are skipped.
    pub fn add_ndef_tech(&self) {
        if self.ndef_added.swap(true, Ordering::SeqCst) {
            return;
        }
        let _io = self.io.lock();
        let slots = self.techs.lock().clone();
        let mut formatable: Option<&DiscoveredTechnology> = None;
        for slot in &slots {
            if !self
                .session
                .reconnect(slot.handle, slot.protocol, slot.technology, false)
            {
                warn!("reselect of {:?} failed, skipping ndef check", slot.technology);
                continue;
            }
            if let Some(info) = self.session.check_ndef() {
                let message = self.session.read_ndef().unwrap_or_default();
                let index = self.push_slot(slot.derived(Technology::Ndef));
                debug!("ndef slot {} added from {:?}", index, slot.technology);
                self.extras.lock().insert(
                    index,
                    TechExtras::Ndef {
                        message,
                        forum_type: ndef_forum_type(slot.protocol),
                        length: info.max_size,
                        mode: info.mode,
                    },
                );
                return;
            }
            if formatable.is_none() && self.session.is_ndef_formattable() {
                formatable = Some(slot);
            }
        }
        if let Some(slot) = formatable {
            let index = self.push_slot(slot.derived(Technology::NdefFormatable));
            self.extras.lock().insert(index, TechExtras::None);
            debug!("ndef-formatable slot {} added", index);
        }
    }

    pub fn read_ndef(&self) -> Option<Vec<u8>> {
        let _pause = self.pause();
        self.add_ndef_tech();
        let _io = self.io.lock();
        self.session.read_ndef()
    }

    pub fn write_ndef(&self, message: &[u8]) -> bool {
        let _pause = self.pause();
        let _io = self.io.lock();
        self.session.write_ndef(message)
    }

    pub fn check_ndef(&self) -> Option<NdefInfo> {
        let _pause = self.pause();
        let _io = self.io.lock();
        let info = self.session.check_ndef();
        debug!("ndef supported: {}", info.is_some());
        info
    }

    /// Format for NDEF. An empty key is refused.
    pub fn format_ndef(&self, key: &[u8]) -> bool {
        if key.is_empty() {
            debug!("format ndef: empty key");
            return false;
        }
        let _pause = self.pause();
        let _io = self.io.lock();
        self.session.format_ndef()
    }

    pub fn make_read_only(&self) -> bool {
        let _pause = self.pause();
        let _io = self.io.lock();
        self.session.make_read_only()
    }

    pub fn is_ndef_formattable(&self) -> bool {
        self.session.is_ndef_formattable()
    }
}

impl Drop for TagEndpoint {
    fn drop(&mut self) {
        self.loop_id.store(0, Ordering::SeqCst);
        self.watchdog.abort();
    }
}

fn presence_loop<F>(
    endpoint: Weak<TagEndpoint>,
    watchdog: Arc<Rendezvous<()>>,
    id: u64,
    delay: Duration,
    on_lost: F,
) where
    F: FnOnce(u8),
{
    let ended = loop {
        let woken = watchdog.arm().wait(Some(delay));
        let Some(ep) = endpoint.upgrade() else {
            debug!("endpoint dropped, presence loop {} exits", id);
            return;
        };
        if woken.is_completed()
            || ep.loop_id.load(Ordering::SeqCst) != id
            || !ep.present.load(Ordering::SeqCst)
        {
            break ep;
        }
        if ep.paused.load(Ordering::SeqCst) > 0 {
            continue;
        }
        if !ep.session.presence_check() {
            debug!("tag {} lost", ep.get_handle());
            break ep;
        }
    };

    ended.present.store(false, Ordering::SeqCst);
    ended.session.disconnect();
    if ended
        .loop_id
        .compare_exchange(id, 0, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
        && !ended.techs.lock().is_empty()
    {
        let handle = ended.get_handle();
        debug!("presence loop {} reports tag {} gone", id, handle);
        on_lost(handle);
    }
}
