use ncibal::constants::{interface, protocol};
use ncibal::hal::mock::{CallKind, HalCall};
use ncibal::hal::{ConnectionEvent, NciEvent};
use ncibal::test_support::sample;
use ncibal::{TagTechnology, Technology};

use crate::common::helpers::Harness;

#[test]
fn first_connect_selects_the_slot() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert!(ep.connect(TagTechnology::IsoDep));
    assert_eq!(
        h.mock.calls(),
        vec![HalCall::Select {
            disc_id: 1,
            protocol: protocol::ISO_DEP,
            interface: interface::ISO_DEP,
        }]
    );
    assert_eq!(
        ep.get_connected_technology(),
        Some(Technology::Iso14443_3A)
    );
    Ok(())
}

#[test]
fn unexposed_technology_is_refused() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::felica(1, 0x12FC))?;
    assert!(!ep.connect(TagTechnology::IsoDep));
    assert!(h.mock.calls().is_empty());
    assert!(ep.connect(TagTechnology::Felica));
    Ok(())
}

#[test]
fn connect_without_active_tag_issues_no_select() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    h.mock
        .deliver(NciEvent::Connection(ConnectionEvent::Deactivated {
            sleep: false,
        }));
    h.mock.flush();
    assert!(!ep.connect(TagTechnology::IsoDep));
    assert_eq!(h.mock.count(CallKind::Select), 0);
    Ok(())
}

#[test]
fn reconnect_to_same_protocol_is_free() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert!(ep.connect(TagTechnology::IsoDep));
    h.mock.clear_calls();

    assert!(ep.connect(TagTechnology::IsoDep));
    assert!(ep.reconnect());
    assert!(h.mock.calls().is_empty());
    Ok(())
}

#[test]
fn reconnect_when_never_connected_is_trivial() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::topaz(1))?;
    assert!(ep.reconnect());
    assert!(h.mock.calls().is_empty());
    Ok(())
}

#[test]
fn select_timeout_deactivates_to_idle() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    h.mock.silence(CallKind::Select);
    assert!(!ep.connect(TagTechnology::IsoDep));
    assert_eq!(ep.get_connected_technology(), None);
    assert!(h.mock.calls().contains(&HalCall::Deactivate { sleep: false }));
    Ok(())
}

#[test]
fn disconnect_clears_connection_and_timeouts() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    assert!(ep.connect(TagTechnology::IsoDep));
    let session = h.host.controller().tag_session();
    let default = session.get_timeout(Technology::Iso14443_3A);
    assert!(session.set_timeout(Technology::Iso14443_3A, default + 500));

    assert!(ep.disconnect());
    h.mock.flush();
    assert_eq!(ep.get_connected_technology(), None);
    assert!(!ep.is_present());
    assert_eq!(session.get_timeout(Technology::Iso14443_3A), default);
    // The idle deactivation also retires the tag.
    assert!(!h.host.controller().state().is_tag_ready());
    Ok(())
}
