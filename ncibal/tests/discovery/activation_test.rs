use ncibal::constants::{interface, mode, protocol};
use ncibal::hal::mock::HalCall;
use ncibal::hal::{ConnectionEvent, DeviceEvent, DiscoveryNotification, NciEvent};
use ncibal::test_support::{Notification, sample};
use ncibal::{NfaStatus, TagTechnology};

use crate::common::helpers::Harness;

#[test]
fn discovered_tag_reaches_listener() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert_eq!(
        ep.get_tech_list(),
        vec![TagTechnology::IsoDep, TagTechnology::IsoDep]
    );
    assert_eq!(ep.get_uid(), sample::NFCID1.to_vec());
    assert_eq!(ep.get_handle(), 1);
    assert!(h.host.controller().state().is_tag_ready());
    Ok(())
}

#[test]
fn peer_to_peer_and_listen_activations_are_ignored() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.activate(sample::p2p_peer(1));
    h.assert_no_event();

    let mut listen = sample::nfc_a_iso_dep(2);
    listen.mode = mode::LISTEN_A;
    h.mock.activate(listen);
    h.assert_no_event();

    let mut ee_direct = sample::nfc_a_iso_dep(3);
    ee_direct.interface = interface::EE_DIRECT_RF;
    h.mock.activate(ee_direct);
    h.assert_no_event();
    assert!(!h.host.controller().state().is_tag_ready());
    Ok(())
}

#[test]
fn technologies_accumulate_until_tag_leaves() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.discover(sample::nfc_a_iso_dep(1))?;
    let second = h.discover(sample::felica(2, 0x12FC))?;
    assert_eq!(
        second.get_tech_list(),
        vec![
            TagTechnology::IsoDep,
            TagTechnology::IsoDep,
            TagTechnology::Felica
        ]
    );

    h.mock.deliver(NciEvent::Connection(ConnectionEvent::Deactivated {
        sleep: false,
    }));
    let fresh = h.discover(sample::felica(1, 0x12FC))?;
    assert_eq!(fresh.get_tech_list(), vec![TagTechnology::Felica]);
    Ok(())
}

#[test]
fn remote_field_forwarded_only_on_success() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.deliver(NciEvent::Device(DeviceEvent::RfField {
        status: NfaStatus::Failed,
        on: true,
    }));
    h.assert_no_event();

    h.mock.deliver(NciEvent::Device(DeviceEvent::RfField {
        status: NfaStatus::Ok,
        on: true,
    }));
    h.mock.deliver(NciEvent::Device(DeviceEvent::RfField {
        status: NfaStatus::Ok,
        on: false,
    }));
    assert!(matches!(h.next_event()?, Notification::RemoteFieldOn));
    assert!(matches!(h.next_event()?, Notification::RemoteFieldOff));
    Ok(())
}

#[test]
fn multi_protocol_discovery_selects_first_reader_target() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let result = |disc_id, protocol, more| {
        NciEvent::Connection(ConnectionEvent::DiscoveryResult {
            status: NfaStatus::Ok,
            notification: DiscoveryNotification {
                disc_id,
                protocol,
                more,
            },
        })
    };
    h.mock.deliver(result(1, protocol::NFC_DEP, true));
    h.mock.deliver(result(2, protocol::ISO_DEP, true));
    h.mock.flush();
    assert!(h.mock.calls().is_empty());

    h.mock.deliver(result(3, protocol::T2T, false));
    h.mock.flush();
    assert_eq!(
        h.mock.calls(),
        vec![HalCall::Select {
            disc_id: 2,
            protocol: protocol::ISO_DEP,
            interface: interface::ISO_DEP,
        }]
    );
    Ok(())
}

#[test]
fn only_peer_targets_select_nothing() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock
        .deliver(NciEvent::Connection(ConnectionEvent::DiscoveryResult {
            status: NfaStatus::Ok,
            notification: DiscoveryNotification {
                disc_id: 1,
                protocol: protocol::NFC_DEP,
                more: false,
            },
        }));
    h.mock.flush();
    assert!(h.mock.calls().is_empty());
    Ok(())
}

#[test]
fn dropped_listener_stops_notifications() -> anyhow::Result<()> {
    let mut h = Harness::discovering()?;
    h.drop_listener();
    h.mock.activate(sample::ultralight(1));
    h.mock.flush();
    // The tag is still tracked; only the notification is dropped.
    assert!(h.host.controller().state().is_tag_ready());
    assert!(h.events.try_recv().is_err());
    Ok(())
}
