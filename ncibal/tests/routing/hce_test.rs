use ncibal::config::{BalConfig, RoutingConfig};
use ncibal::constants::{nfcee, protocol};
use ncibal::hal::mock::{CallKind, HalCall};
use ncibal::hal::{CeEvent, EeDiscoverInfo, EeEvent, EeInfo, NciEvent, PowerStateRouting};
use ncibal::test_support::{Notification, mock_host};
use ncibal::{EeHandle, NfaStatus, TechMask};

use crate::common::fixtures::{fast_config, ppse_aid, select_apdu};
use crate::common::helpers::{Harness, init_logging};

#[test]
fn hce_session_reaches_listener() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.deliver(NciEvent::Ce(CeEvent::Activated {
        protocol: protocol::ISO_DEP,
    }));
    let apdu = select_apdu(&ppse_aid());
    let (head, tail) = apdu.split_at(6);
    h.mock.deliver(NciEvent::Ce(CeEvent::Data {
        status: NfaStatus::Continue,
        data: head.to_vec(),
    }));
    h.mock.deliver(NciEvent::Ce(CeEvent::Data {
        status: NfaStatus::Ok,
        data: tail.to_vec(),
    }));
    h.mock.deliver(NciEvent::Ce(CeEvent::Deactivated));

    assert!(matches!(
        h.next_event()?,
        Notification::HceActivated(TechMask::A)
    ));
    match h.next_event()? {
        Notification::HceData(tech, data) => {
            assert_eq!(tech, TechMask::A);
            assert_eq!(data, apdu);
        }
        other => anyhow::bail!("expected hce data, got {:?}", other),
    }
    assert!(matches!(
        h.next_event()?,
        Notification::HceDeactivated(TechMask::A)
    ));
    Ok(())
}

#[test]
fn failed_fragment_drops_partial_apdu() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.deliver(NciEvent::Ce(CeEvent::Data {
        status: NfaStatus::Continue,
        data: vec![0x00, 0xA4],
    }));
    h.mock.deliver(NciEvent::Ce(CeEvent::Data {
        status: NfaStatus::Failed,
        data: vec![0x04],
    }));
    h.assert_no_event();
    h.mock.deliver(NciEvent::Ce(CeEvent::Data {
        status: NfaStatus::Ok,
        data: vec![0x00, 0xB0],
    }));
    match h.next_event()? {
        Notification::HceData(_, data) => assert_eq!(data, vec![0x00, 0xB0]),
        other => anyhow::bail!("expected hce data, got {:?}", other),
    }
    Ok(())
}

#[test]
fn ee_discovery_notifies_listener() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    h.mock.deliver(NciEvent::Ee(EeEvent::DiscoverReq {
        status: NfaStatus::Ok,
        ees: vec![EeDiscoverInfo {
            handle: EeHandle::from_nfcee_id(0x86),
            la_protocol: 0,
            lb_protocol: 0,
        }],
    }));
    assert!(matches!(h.next_event()?, Notification::EeUpdate));
    Ok(())
}

#[test]
fn inactive_nfcees_are_activated_at_start() -> anyhow::Result<()> {
    init_logging();
    let (mock, host) = mock_host(fast_config())?;
    let sleeping = EeHandle::from_nfcee_id(0x82);
    mock.set_ee_info(Ok(vec![
        EeInfo {
            handle: EeHandle::from_nfcee_id(0x81),
            status: nfcee::STATUS_ACTIVE,
            interfaces: vec![0x00],
        },
        EeInfo {
            handle: sleeping,
            status: nfcee::STATUS_INACTIVE,
            interfaces: vec![0x00],
        },
    ]));
    assert!(host.initialize());
    assert_eq!(
        mock.calls_of(CallKind::EeModeSet),
        vec![HalCall::EeModeSet {
            handle: sleeping,
            mode: nfcee::MODE_ACTIVATE,
        }]
    );
    Ok(())
}

#[test]
fn offhost_technologies_stay_off_host() -> anyhow::Result<()> {
    init_logging();
    let ese = EeHandle::from_nfcee_id(0xC0);
    let config = BalConfig {
        routing: RoutingConfig {
            default_offhost_route: 0xC0,
            ..RoutingConfig::default()
        },
        ..fast_config()
    };
    let (mock, host) = mock_host(config)?;
    mock.set_ee_discover(vec![EeDiscoverInfo {
        handle: ese,
        la_protocol: 0x04,
        lb_protocol: 0,
    }]);
    assert!(host.initialize());
    let calls = mock.calls();
    assert!(calls.contains(&HalCall::EeSetDefaultTechRouting {
        handle: ese,
        routing: PowerStateRouting::off_host(TechMask::A, false),
    }));
    // Host listening on A is withdrawn in favour of the secure element.
    assert!(calls.contains(&HalCall::EeClearDefaultTechRouting {
        handle: EeHandle::HOST,
        mask: TechMask::A,
    }));

    mock.clear_calls();
    host.enable_discovery(None, false, true, false);
    let host_tech_routes = mock
        .calls_of(CallKind::EeSetDefaultTechRouting)
        .into_iter()
        .filter(|c| matches!(c, HalCall::EeSetDefaultTechRouting { handle, .. } if *handle == EeHandle::HOST))
        .count();
    assert_eq!(host_tech_routes, 0);
    Ok(())
}
