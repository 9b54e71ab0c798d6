// helpers.rs: host construction and listener plumbing for integration tests

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Receiver;
use ncibal::config::BalConfig;
use ncibal::hal::{MockNci, RfActivation};
use ncibal::tag::TagEndpoint;
use ncibal::test_support::{self, Notification, RecordingListener};
use ncibal::{DeviceHost, DeviceHostListener};

use super::fixtures;

pub const EVENT_WAIT: Duration = Duration::from_secs(2);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Host over a mock with a recording listener attached.
pub struct Harness {
    pub mock: Arc<MockNci>,
    pub host: DeviceHost,
    pub events: Receiver<Notification>,
    // The host only holds the listener weakly.
    listener: Arc<dyn DeviceHostListener>,
}

impl Harness {
    /// Initialized host; the call log is cleared.
    pub fn initialized(config: BalConfig) -> anyhow::Result<Self> {
        init_logging();
        let (mock, host) = test_support::initialized_mock_host(config)?;
        anyhow::ensure!(host.is_nfc_active(), "host did not come up");
        let (listener, events) = RecordingListener::new();
        host.set_listener(&listener);
        Ok(Self {
            mock,
            host,
            events,
            listener,
        })
    }

    /// Initialized host with default discovery running.
    pub fn discovering() -> anyhow::Result<Self> {
        let h = Self::initialized(fixtures::fast_config())?;
        h.host.enable_discovery(None, false, true, false);
        h.mock.flush();
        h.mock.clear_calls();
        Ok(h)
    }

    pub fn drop_listener(&mut self) {
        let (replacement, _) = RecordingListener::new();
        self.listener = replacement;
    }

    /// Next notification, failing the test after [`EVENT_WAIT`].
    pub fn next_event(&self) -> anyhow::Result<Notification> {
        Ok(self.events.recv_timeout(EVENT_WAIT)?)
    }

    /// Deliver `act` and return the endpoint handed to the listener.
    pub fn discover(&self, act: RfActivation) -> anyhow::Result<Arc<TagEndpoint>> {
        self.mock.activate(act);
        self.mock.flush();
        match self.next_event()? {
            Notification::TagDiscovered(ep) => Ok(ep),
            other => anyhow::bail!("expected tag discovery, got {:?}", other),
        }
    }

    pub fn assert_no_event(&self) {
        self.mock.flush();
        assert!(
            self.events.try_recv().is_err(),
            "unexpected listener notification"
        );
    }
}
