use ncibal::constants::{TOPAZ96_MAX_MESSAGE_SIZE, interface, protocol};
use ncibal::hal::mock::{CallKind, HalCall, NdefDetectScript};
use ncibal::tag::TechExtras;
use ncibal::test_support::sample;
use ncibal::{NdefFlags, NdefInfo, NdefMode, NfaStatus, TagTechnology};

use crate::common::fixtures::uri_ndef_message;
use crate::common::helpers::Harness;

fn ndef_present(max_size: u32, cur_size: u32) -> NdefDetectScript {
    NdefDetectScript {
        status: NfaStatus::Ok,
        max_size,
        cur_size,
        flags: NdefFlags::SUPPORTED | NdefFlags::FORMATED,
    }
}

fn formatable() -> NdefDetectScript {
    NdefDetectScript {
        status: NfaStatus::Failed,
        flags: NdefFlags::SUPPORTED,
        ..NdefDetectScript::default()
    }
}

#[test]
fn check_then_read() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let message = uri_ndef_message();
    h.mock.set_ndef_detect(ndef_present(137, message.len() as u32));
    h.mock.set_ndef_message(message.clone());
    let ep = h.discover(sample::ultralight(1))?;
    assert!(ep.connect(TagTechnology::MifareUltralight));

    assert_eq!(
        ep.check_ndef(),
        Some(NdefInfo {
            max_size: 137,
            mode: NdefMode::ReadWrite
        })
    );
    assert_eq!(ep.read_ndef(), Some(message.clone()));
    assert_eq!(
        ep.get_tech_list(),
        vec![TagTechnology::MifareUltralight, TagTechnology::Ndef]
    );
    assert_eq!(
        ep.get_tech_extras(1),
        Some(TechExtras::Ndef {
            message,
            forum_type: 2,
            length: 137,
            mode: NdefMode::ReadWrite,
        })
    );
    Ok(())
}

#[test]
fn read_only_flag_sets_mode() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let mut script = ndef_present(48, 0);
    script.flags |= NdefFlags::READ_ONLY;
    h.mock.set_ndef_detect(script);
    let ep = h.discover(sample::ultralight(1))?;
    assert!(ep.connect(TagTechnology::MifareUltralight));
    let info = ep.check_ndef().expect("ndef expected");
    assert_eq!(info.mode, NdefMode::ReadOnly);
    // Nothing stored: no read is attempted.
    assert_eq!(ep.read_ndef(), None);
    assert_eq!(h.mock.count(CallKind::ReadNdef), 0);
    Ok(())
}

#[test]
fn topaz_size_comes_from_header_rom() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.set_ndef_detect(ndef_present(500, 0));
    let ep = h.discover(sample::topaz(1))?;
    let info = ep.check_ndef().expect("ndef expected");
    assert_eq!(info.max_size, TOPAZ96_MAX_MESSAGE_SIZE);
    assert!(ep.is_ndef_formattable());
    Ok(())
}

#[test]
fn ndef_slot_is_added_once() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.set_ndef_detect(ndef_present(137, 0));
    let ep = h.discover(sample::ultralight(1))?;
    assert!(ep.connect(TagTechnology::MifareUltralight));
    ep.add_ndef_tech();
    ep.add_ndef_tech();
    assert_eq!(h.mock.count(CallKind::DetectNdef), 1);
    assert_eq!(ep.get_tech_list().len(), 2);
    Ok(())
}

#[test]
fn formatable_slot_when_no_ndef() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.set_ndef_detect(formatable());
    let ep = h.discover(sample::ultralight(1))?;
    assert!(ep.connect(TagTechnology::MifareUltralight));
    ep.add_ndef_tech();
    assert_eq!(
        ep.get_tech_list(),
        vec![
            TagTechnology::MifareUltralight,
            TagTechnology::NdefFormatable
        ]
    );
    Ok(())
}

#[test]
fn slot_that_cannot_be_reselected_gets_no_ndef() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.set_ndef_detect(ndef_present(137, 0));
    let ep = h.discover(sample::nfc_a_iso_dep(1))?;
    h.mock.set_reactivate_on_select(true);
    h.mock.reject_once(CallKind::Select, NfaStatus::Rejected);
    h.mock.clear_calls();

    ep.add_ndef_tech();

    let select = HalCall::Select {
        disc_id: 1,
        protocol: protocol::ISO_DEP,
        interface: interface::ISO_DEP,
    };
    let relevant: Vec<HalCall> = h
        .mock
        .calls()
        .into_iter()
        .filter(|c| {
            matches!(
                c.kind(),
                CallKind::Deactivate | CallKind::Select | CallKind::DetectNdef
            )
        })
        .collect();
    assert_eq!(
        relevant,
        vec![
            HalCall::Deactivate { sleep: true },
            select.clone(),
            HalCall::Deactivate { sleep: true },
            select,
            // Detection runs only once the second slot is selected.
            HalCall::DetectNdef,
        ]
    );
    assert_eq!(
        ep.get_tech_list(),
        vec![
            TagTechnology::IsoDep,
            TagTechnology::IsoDep,
            TagTechnology::Ndef
        ]
    );
    assert!(matches!(
        ep.get_tech_extras(2),
        Some(TechExtras::Ndef { forum_type: 4, length: 137, .. })
    ));
    Ok(())
}

#[test]
fn later_ndef_slot_wins_over_earlier_formatable_one() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::desfire(1))?;
    h.mock.set_reactivate_on_select(true);
    // First slot: no NDEF, but a DESFire answering GET VERSION is formattable.
    h.mock.push_ndef_detect(formatable());
    h.mock.push_transceive_response(vec![
        0x04, 0x01, 0x01, 0x01, 0x00, 0x18, 0x05, 0x91, 0xAF,
    ]);
    // Second slot: NDEF present.
    h.mock.set_ndef_detect(ndef_present(137, 0));

    ep.add_ndef_tech();

    assert_eq!(h.mock.count(CallKind::DetectNdef), 2);
    assert_eq!(h.mock.count(CallKind::SendRawFrame), 1);
    let techs = ep.get_tech_list();
    assert_eq!(
        techs.iter().filter(|t| **t == TagTechnology::Ndef).count(),
        1
    );
    assert!(!techs.contains(&TagTechnology::NdefFormatable));
    Ok(())
}

#[test]
fn formatable_tag_is_formatted_before_write() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.set_ndef_detect(formatable());
    let ep = h.discover(sample::ultralight(1))?;
    assert!(ep.connect(TagTechnology::MifareUltralight));
    assert_eq!(ep.check_ndef(), None);
    h.mock.clear_calls();

    let message = uri_ndef_message();
    assert!(ep.write_ndef(&message));
    assert_eq!(
        h.mock.calls(),
        vec![HalCall::FormatTag, HalCall::WriteNdef { message }]
    );
    Ok(())
}

#[test]
fn failed_format_aborts_write() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.set_ndef_detect(formatable());
    h.mock.complete_with(CallKind::FormatTag, NfaStatus::Failed);
    let ep = h.discover(sample::ultralight(1))?;
    ep.check_ndef();
    assert!(!ep.write_ndef(&uri_ndef_message()));
    assert_eq!(h.mock.count(CallKind::WriteNdef), 0);
    Ok(())
}

#[test]
fn empty_write_stores_empty_record() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    h.mock.set_ndef_detect(ndef_present(137, 0));
    let ep = h.discover(sample::ultralight(1))?;
    ep.check_ndef();
    assert!(ep.write_ndef(&[]));
    assert_eq!(
        h.mock.calls_of(CallKind::WriteNdef),
        vec![HalCall::WriteNdef {
            message: vec![0xD0, 0x00, 0x00]
        }]
    );
    Ok(())
}

#[test]
fn rejected_hard_lock_falls_back_to_soft_lock() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::ultralight(1))?;
    h.mock
        .reject_once(CallKind::SetTagReadOnly, NfaStatus::Rejected);
    assert!(ep.make_read_only());
    assert_eq!(
        h.mock.calls_of(CallKind::SetTagReadOnly),
        vec![
            HalCall::SetTagReadOnly { hard_lock: true },
            HalCall::SetTagReadOnly { hard_lock: false },
        ]
    );
    Ok(())
}

#[test]
fn format_needs_a_key() -> anyhow::Result<()> {
    let h = Harness::discovering()?;
    let ep = h.discover(sample::ultralight(1))?;
    assert!(!ep.format_ndef(&[]));
    assert_eq!(h.mock.count(CallKind::FormatTag), 0);
    assert!(ep.format_ndef(&[0xFF; 6]));
    Ok(())
}
