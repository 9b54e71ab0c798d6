use ncibal::config::{BalConfig, RoutingConfig};
use ncibal::constants::{REMOVE_ALL_AID, ROUTE_POWER_STATE_HOST, ROUTE_POWER_STATE_SECURE};
use ncibal::hal::mock::{CallKind, HalCall};
use ncibal::{Aid, AidInfo, AidMatchingMode, EeHandle, Error, NfaStatus, RoutingEntry};

use crate::common::fixtures::{fast_config, ppse_aid};
use crate::common::helpers::Harness;

const ESE_ROUTE: u8 = 0xC0;

fn routed_config() -> BalConfig {
    BalConfig {
        routing: RoutingConfig {
            aid_matching_mode: AidMatchingMode::ExactOrPrefix,
            offhost_aid_power_state: 0x3B,
            offhost_route_ese: vec![ESE_ROUTE],
            ..RoutingConfig::default()
        },
        ..fast_config()
    }
}

#[test]
fn host_route_uses_host_power_state() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    let aid = ppse_aid();
    assert_eq!(h.host.add_aid_routing(&aid, 0x00, AidInfo::PREFIX), Ok(true));
    assert_eq!(
        h.mock.calls(),
        vec![HalCall::EeAddAidRouting(RoutingEntry {
            aid: Aid::try_from(aid.as_slice())?,
            route: EeHandle::HOST,
            power_state: ROUTE_POWER_STATE_HOST,
            aid_info: AidInfo::PREFIX,
        })]
    );
    Ok(())
}

#[test]
fn offhost_route_and_secure_nfc_power_states() -> anyhow::Result<()> {
    let h = Harness::initialized(routed_config())?;
    let aid = ppse_aid();
    h.host.add_aid_routing(&aid, ESE_ROUTE, AidInfo::EXACT)?;
    assert!(h.host.set_secure_nfc(true));
    h.host.add_aid_routing(&aid, ESE_ROUTE, AidInfo::EXACT)?;

    let states: Vec<(EeHandle, u8)> = h
        .mock
        .calls_of(CallKind::EeAddAidRouting)
        .into_iter()
        .filter_map(|c| match c {
            HalCall::EeAddAidRouting(e) => Some((e.route, e.power_state)),
            _ => None,
        })
        .collect();
    let ese = EeHandle::from_nfcee_id(ESE_ROUTE);
    assert_eq!(states, vec![(ese, 0x3B), (ese, ROUTE_POWER_STATE_SECURE)]);
    Ok(())
}

#[test]
fn rejected_edit_reports_false() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    h.mock.reject(CallKind::EeAddAidRouting, NfaStatus::Failed);
    assert_eq!(h.host.add_aid_routing(&ppse_aid(), 0, AidInfo::EXACT), Ok(false));
    h.mock
        .complete_with(CallKind::EeRemoveAidRouting, NfaStatus::Failed);
    assert_eq!(h.host.remove_aid_routing(&ppse_aid()), Ok(false));
    Ok(())
}

#[test]
fn oversized_aid_never_reaches_controller() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    let aid = [0xA0; 17];
    assert_eq!(
        h.host.remove_aid_routing(&aid),
        Err(Error::InvalidAidLength {
            max: 16,
            actual: 17
        })
    );
    assert!(h.mock.calls().is_empty());
    Ok(())
}

#[test]
fn remove_and_clear() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    assert_eq!(h.host.remove_aid_routing(&ppse_aid()), Ok(true));
    assert!(h.host.clear_aid_table());
    assert_eq!(
        h.mock.calls(),
        vec![
            HalCall::EeRemoveAidRouting { aid: ppse_aid() },
            HalCall::EeRemoveAidRouting {
                aid: REMOVE_ALL_AID.to_vec()
            },
        ]
    );
    Ok(())
}

#[test]
fn commit_while_discovering_pauses_rf() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    assert!(h.host.commit_routing());
    assert_eq!(
        h.mock.kinds(),
        vec![
            CallKind::StopRfDiscovery,
            CallKind::EeUpdateNow,
            CallKind::StartRfDiscovery
        ]
    );
    assert!(h.host.controller().is_rf_enabled());
    Ok(())
}

#[test]
fn commit_while_idle_touches_nothing_else() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    assert!(h.host.commit_routing());
    assert_eq!(h.mock.kinds(), vec![CallKind::EeUpdateNow]);
    Ok(())
}

#[test]
fn unconfirmed_commit_still_restarts_rf() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.silence(CallKind::EeUpdateNow);
    assert!(!h.host.commit_routing());
    assert_eq!(h.mock.kinds().last(), Some(&CallKind::StartRfDiscovery));
    Ok(())
}

#[test]
fn table_sizes_and_route_accessors() -> anyhow::Result<()> {
    let h = Harness::initialized(routed_config())?;
    h.mock.set_aid_table_size(512);
    h.mock.set_remaining_size(388);
    assert_eq!(h.host.get_aid_routing_table_size(), 512);
    assert_eq!(h.host.get_remain_routing_table_size(), 388);
    h.mock.silence(CallKind::EeGetRemainingSize);
    assert_eq!(h.host.get_remain_routing_table_size(), 0);

    assert_eq!(h.host.get_default_route(), 0x00);
    assert_eq!(h.host.get_default_offhost_route(), 0x00);
    assert_eq!(h.host.get_default_isodep_route_destination(), 0x00);
    assert_eq!(h.host.get_offhost_ese_route(), vec![ESE_ROUTE]);
    assert!(h.host.get_offhost_uicc_route().is_empty());
    assert_eq!(h.host.get_aid_matching_mode(), AidMatchingMode::ExactOrPrefix);
    Ok(())
}
