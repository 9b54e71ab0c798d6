use std::thread;
use std::time::Duration;

use ncibal::constants::{interface, protocol};
use ncibal::hal::mock::{CallKind, HalCall};
use ncibal::test_support::sample;
use ncibal::{NfaStatus, TagTechnology};
use serial_test::serial;

use crate::common::fixtures::{ppse_aid, select_apdu};
use crate::common::helpers::Harness;

#[test]
fn iso_dep_exchange() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert!(ep.connect(TagTechnology::IsoDep));
    h.mock.clear_calls();

    let apdu = select_apdu(&ppse_aid());
    h.mock.push_transceive_response(vec![0x6F, 0x00, 0x90, 0x00]);
    let mut response = Vec::new();
    assert_eq!(ep.transceive(&apdu, &mut response), NfaStatus::Ok);
    assert_eq!(response, vec![0x6F, 0x00, 0x90, 0x00]);
    assert_eq!(h.mock.calls(), vec![HalCall::SendRawFrame { data: apdu }]);
    Ok(())
}

#[test]
fn rejected_frame_returns_controller_status() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert!(ep.connect(TagTechnology::IsoDep));
    h.mock.reject_once(CallKind::SendRawFrame, NfaStatus::Busy);
    let mut response = vec![0xAA];
    assert_eq!(ep.transceive(&[0x00], &mut response), NfaStatus::Busy);
    assert!(response.is_empty());
    Ok(())
}

#[test]
fn mifare_nak_is_retried_then_reconnects() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::mifare_classic(1))?;
    assert!(ep.connect(TagTechnology::MifareClassic));
    // Only now: a reselect re-delivers the activation, which must not be
    // taken for a new tag.
    h.mock.set_reactivate_on_select(true);
    h.mock.clear_calls();

    h.mock.push_transceive_response(vec![0x04]);
    h.mock.push_transceive_response(vec![0x04]);
    let mut response = Vec::new();
    let read_block = [0x30, 0x04];
    assert_eq!(ep.transceive(&read_block, &mut response), NfaStatus::Ok);
    assert_eq!(response, vec![0x04]);
    assert_eq!(
        h.mock.calls(),
        vec![
            HalCall::SendRawFrame {
                data: read_block.to_vec()
            },
            HalCall::SendRawFrame {
                data: read_block.to_vec()
            },
            HalCall::Deactivate { sleep: true },
            HalCall::Select {
                disc_id: 1,
                protocol: protocol::MIFARE,
                interface: interface::MIFARE,
            },
        ]
    );
    h.assert_no_event();
    Ok(())
}

#[test]
fn mifare_auth_nak_is_not_retried() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::mifare_classic(1))?;
    assert!(ep.connect(TagTechnology::MifareClassic));
    h.mock.set_reactivate_on_select(true);
    h.mock.clear_calls();

    h.mock.push_transceive_response(vec![0x04]);
    let mut response = Vec::new();
    let auth = [0x60, 0x04, 0xDE, 0xAD, 0xBE, 0xEF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    ep.transceive(&auth, &mut response);
    assert_eq!(h.mock.count(CallKind::SendRawFrame), 1);
    assert_eq!(h.mock.count(CallKind::Deactivate), 1);
    Ok(())
}

#[test]
fn single_byte_reply_from_iso_dep_is_plain_data() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert!(ep.connect(TagTechnology::IsoDep));
    h.mock.clear_calls();
    h.mock.push_transceive_response(vec![0x0A]);
    let mut response = Vec::new();
    assert_eq!(ep.transceive(&[0xB2], &mut response), NfaStatus::Ok);
    assert_eq!(h.mock.kinds(), vec![CallKind::SendRawFrame]);
    Ok(())
}

// Timing-sensitive: keep clear of other threaded tests.
#[test]
#[serial]
fn presence_check_during_transceive_skips_hardware() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert!(ep.connect(TagTechnology::IsoDep));

    let worker = {
        let ep = ep.clone();
        thread::spawn(move || {
            let mut response = Vec::new();
            ep.transceive(&[0x00, 0xCA, 0x00, 0x00], &mut response)
        })
    };
    thread::sleep(Duration::from_millis(100));
    let session = h.host.controller().tag_session();
    assert!(session.presence_check());
    assert_eq!(h.mock.count(CallKind::PresenceCheck), 0);
    assert_eq!(
        worker.join().expect("transceive thread panicked"),
        NfaStatus::Timeout
    );
    Ok(())
}

#[test]
fn presence_check_reports_lost_tag() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::ultralight(1))?;
    assert!(ep.presence_check());
    h.mock.set_present(false);
    assert!(!ep.presence_check());
    assert!(!ep.is_present());
    Ok(())
}

#[test]
fn watchdog_reports_lost_tag_once() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::ultralight(7))?;
    let (tx, rx) = crossbeam::channel::bounded(1);
    assert!(ep.start_presence_checking(0, move |handle| {
        let _ = tx.send(handle);
    }));
    assert!(!ep.start_presence_checking(0, |_| {}));

    h.mock.set_present(false);
    assert_eq!(rx.recv_timeout(Duration::from_secs(2))?, 7);
    assert!(!ep.is_presence_checking());
    assert!(h.mock.calls().contains(&HalCall::Deactivate { sleep: false }));
    Ok(())
}
