use ncibal::constants::HCI_EVT_TRANSACTION;
use ncibal::hal::{EeInfo, HciEvent, NciEvent};
use ncibal::test_support::Notification;
use ncibal::EeHandle;

use crate::common::fixtures::{fast_config, transaction_event};
use crate::common::helpers::Harness;

fn transaction_on(pipe: u8) -> NciEvent {
    NciEvent::Hci(HciEvent::EventReceived {
        pipe,
        evt_code: HCI_EVT_TRANSACTION,
        data: transaction_event(),
    })
}

fn active_ee(id: u8) -> EeInfo {
    EeInfo {
        handle: EeHandle::from_nfcee_id(id),
        status: 0x00,
        interfaces: vec![0x00],
    }
}

#[test]
fn ese_transaction_reaches_listener() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    h.mock.deliver(transaction_on(0x16));
    match h.next_event()? {
        Notification::OffHostTransaction { aid, data, se_name } => {
            assert_eq!(hex::encode(aid), "a000000003101001");
            assert_eq!(data, vec![0x90, 0x00]);
            assert_eq!(se_name, "eSE1");
        }
        other => anyhow::bail!("expected off-host transaction, got {:?}", other),
    }
    Ok(())
}

#[test]
fn sim_name_follows_connected_nfcee() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    h.mock.set_ee_info(Ok(vec![active_ee(0x81)]));
    h.mock.deliver(transaction_on(0x0A));
    h.mock.flush();
    h.mock.set_ee_info(Ok(vec![active_ee(0x83)]));
    h.mock.deliver(transaction_on(0x0A));

    let names: Vec<String> = (0..2)
        .map(|_| match h.next_event() {
            Ok(Notification::OffHostTransaction { se_name, .. }) => Ok(se_name),
            Ok(other) => Err(anyhow::anyhow!("unexpected {:?}", other)),
            Err(e) => Err(e),
        })
        .collect::<anyhow::Result<_>>()?;
    assert_eq!(names, vec!["SIM1", "SIM2"]);
    Ok(())
}

#[test]
fn non_transaction_and_malformed_events_are_dropped() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    h.mock.deliver(NciEvent::Hci(HciEvent::EventReceived {
        pipe: 0x16,
        evt_code: 0x10,
        data: transaction_event(),
    }));
    h.mock.deliver(NciEvent::Hci(HciEvent::EventReceived {
        pipe: 0x16,
        evt_code: HCI_EVT_TRANSACTION,
        data: vec![0x81, 0x01],
    }));
    h.mock.deliver(transaction_on(0x55));
    h.mock.deliver(NciEvent::Hci(HciEvent::Other { event: 0x03 }));
    h.assert_no_event();
    Ok(())
}
