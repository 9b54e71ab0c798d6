use std::thread;
use std::time::{Duration, Instant};

use ncibal::hal::mock::{CallKind, HalCall};
use ncibal::hal::{DeviceEvent, NciEvent};
use ncibal::config::TagTimeouts;
use ncibal::test_support::{mock_host, sample};
use ncibal::{NfaStatus, TagTechnology, TechMask};
use serial_test::serial;

use crate::common::fixtures::fast_config;
use crate::common::helpers::{Harness, init_logging};

#[test]
fn initialize_then_deinitialize() -> anyhow::Result<()> {
    init_logging();
    let (mock, host) = mock_host(fast_config())?;
    assert!(host.initialize());
    assert!(host.is_nfc_active());
    assert!(host.initialize());
    assert_eq!(mock.count(CallKind::Enable), 1);

    assert!(host.deinitialize());
    assert!(!host.is_nfc_active());
    assert!(mock.calls().contains(&HalCall::Disable { graceful: true }));
    // Already down: nothing more is sent.
    let n = mock.calls().len();
    assert!(host.deinitialize());
    assert_eq!(mock.calls().len(), n);
    Ok(())
}

#[test]
fn rejected_enable_leaves_stack_down() -> anyhow::Result<()> {
    let (mock, host) = mock_host(fast_config())?;
    mock.reject(CallKind::Enable, NfaStatus::Failed);
    assert!(!host.initialize());
    assert!(!host.is_nfc_active());
    assert_eq!(mock.kinds().last(), Some(&CallKind::AdaptationFinalize));
    Ok(())
}

#[test]
fn discovery_restart_brackets_rf() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.host
        .enable_discovery(Some(TechMask::A | TechMask::B), false, true, true);
    let kinds = h.mock.kinds();
    assert_eq!(kinds.first(), Some(&CallKind::StopRfDiscovery));
    assert_eq!(kinds.last(), Some(&CallKind::StartRfDiscovery));
    assert!(h.mock.calls().contains(&HalCall::EnablePolling {
        mask: TechMask::A | TechMask::B
    }));

    h.mock.clear_calls();
    h.host.disable_discovery();
    assert_eq!(
        h.mock.kinds(),
        vec![CallKind::StopRfDiscovery, CallKind::DisablePolling]
    );
    Ok(())
}

#[test]
fn reader_mode_toggles_listening_once() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.host.enable_discovery(None, true, false, true);
    h.host.enable_discovery(None, true, false, true);
    assert_eq!(h.mock.count(CallKind::DisableListening), 1);
    h.host.enable_discovery(None, false, true, true);
    assert_eq!(h.mock.count(CallKind::EnableListening), 1);
    Ok(())
}

#[test]
fn raw_frame_outside_session() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    assert!(h.host.send_raw_frame(&[0x26]));
    h.mock.reject(CallKind::SendRawFrame, NfaStatus::Busy);
    assert!(!h.host.send_raw_frame(&[0x26]));
    Ok(())
}

#[test]
fn transport_error_forces_ungraceful_disable() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock
        .deliver(NciEvent::Device(DeviceEvent::NfccTimeout));
    h.mock.flush();
    h.mock.flush();
    assert!(h.mock.calls().contains(&HalCall::Disable { graceful: false }));
    assert!(!h.host.is_nfc_active());
    let snap = h.host.controller().state().snapshot();
    assert!(!snap.discovery_enabled && !snap.polling_enabled);
    Ok(())
}

// Timing-sensitive: keep clear of other threaded tests.
#[test]
#[serial]
fn abort_wakes_blocked_transceive() -> anyhow::Result<()> {
    let mut config = fast_config();
    config.tag_timeouts = TagTimeouts {
        iso14443_3a_ms: 10_000,
        ..TagTimeouts::default()
    };
    let h = Harness::initialized(config)?;
    h.host.enable_discovery(None, false, true, false);
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert!(ep.connect(TagTechnology::IsoDep));

    // No response is queued, so the exchange blocks until aborted.
    let worker = {
        let ep = ep.clone();
        thread::spawn(move || {
            let started = Instant::now();
            let mut response = Vec::new();
            let status = ep.transceive(&[0x00, 0xB0, 0x00, 0x00, 0x02], &mut response);
            (status, started.elapsed())
        })
    };
    thread::sleep(Duration::from_millis(150));
    h.host.abort();
    let (status, elapsed) = worker.join().expect("transceive thread panicked");
    assert_eq!(status, NfaStatus::Failed);
    assert!(elapsed < Duration::from_secs(5));
    Ok(())
}
