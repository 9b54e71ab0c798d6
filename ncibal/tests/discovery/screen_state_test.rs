use ncibal::constants::{NCI_VERSION_1_0, screen};
use ncibal::hal::mock::{CallKind, HalCall};
use ncibal::NfaStatus;

use crate::common::fixtures::fast_config;
use crate::common::helpers::Harness;

fn screen_calls(h: &Harness) -> Vec<HalCall> {
    h.mock
        .calls()
        .into_iter()
        .filter(|c| matches!(c.kind(), CallKind::SetPowerSubState | CallKind::SetConfig))
        .collect()
}

#[test]
fn unlock_then_lock_orders_power_sub_state() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    assert_eq!(h.host.controller().screen_state(), screen::OFF_LOCKED);

    assert!(h.host.set_screen_status(screen::ON_UNLOCKED));
    assert!(h.host.set_screen_status(screen::ON_LOCKED));
    assert_eq!(
        screen_calls(&h),
        vec![
            HalCall::SetPowerSubState {
                screen_state: screen::ON_UNLOCKED
            },
            HalCall::SetConfig {
                param_id: 0x02,
                value: vec![0x01]
            },
            // Leaving the unlocked state: discovery parameters first.
            HalCall::SetConfig {
                param_id: 0x02,
                value: vec![0x00]
            },
            HalCall::SetPowerSubState {
                screen_state: screen::ON_LOCKED
            },
        ]
    );
    assert_eq!(h.host.controller().screen_state(), screen::ON_LOCKED);
    Ok(())
}

#[test]
fn repeated_state_sends_nothing() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    h.host.set_screen_status(screen::ON_UNLOCKED);
    h.mock.clear_calls();
    // The polling bit is outside the state mask.
    h.host
        .set_screen_status(screen::ON_UNLOCKED | screen::POLLING_TAG_MASK);
    assert!(h.mock.calls().is_empty());
    Ok(())
}

#[test]
fn rejected_set_config_keeps_cached_state() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    h.mock.reject(CallKind::SetConfig, NfaStatus::Failed);
    h.host.set_screen_status(screen::ON_UNLOCKED);
    assert_eq!(h.host.controller().screen_state(), screen::OFF_LOCKED);
    assert_eq!(h.mock.count(CallKind::SetPowerSubState), 1);
    Ok(())
}

#[test]
fn nci_1_0_controller_only_caches() -> anyhow::Result<()> {
    let h = Harness::initialized(fast_config())?;
    h.mock.set_nci_version(NCI_VERSION_1_0);
    h.host.set_screen_status(screen::ON_UNLOCKED);
    assert!(screen_calls(&h).is_empty());
    assert_eq!(h.host.controller().screen_state(), screen::ON_UNLOCKED);
    assert_eq!(h.host.get_nci_version(), NCI_VERSION_1_0);
    Ok(())
}
