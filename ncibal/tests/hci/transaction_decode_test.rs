use ncibal::config::HciConfig;
use ncibal::hal::MockNci;
use ncibal::hci::TransactionDecoder;
use ncibal::protocol::ber_tlv;
use ncibal::protocol::decode_transaction;
use ncibal::Error;
use log::LevelFilter;
use proptest::prelude::*;
use serial_test::serial;

use crate::common::fixtures::transaction_event;

#[test]
fn payment_applet_event() -> anyhow::Result<()> {
    let t = decode_transaction(&transaction_event())?;
    assert_eq!(hex::encode(&t.aid), "a000000003101001");
    assert_eq!(t.data, vec![0x90, 0x00]);
    Ok(())
}

#[test]
fn long_form_data_lengths() -> anyhow::Result<()> {
    let data = vec![0x5A; 300];
    let mut buf = hex::decode("8102a000")?;
    buf.push(0x82);
    buf.extend(hex::decode("82012c")?);
    buf.extend_from_slice(&data);
    assert_eq!(decode_transaction(&buf)?.data, data);
    Ok(())
}

#[test]
fn unknown_pipe_is_an_error() {
    let decoder = TransactionDecoder::new(MockNci::new(), HciConfig::default());
    assert_eq!(
        decoder.decode(0x42, &transaction_event()),
        Err(Error::UnknownPipe(0x42))
    );
}

#[test]
#[serial]
fn malformed_data_is_dropped_at_any_log_level() -> anyhow::Result<()> {
    let mismatched = hex::decode("8102a0008203aabb")?;
    let saved = log::max_level();
    for level in [LevelFilter::Off, LevelFilter::Trace] {
        log::set_max_level(level);
        let t = decode_transaction(&mismatched)?;
        assert_eq!(t.aid, vec![0xA0, 0x00]);
        assert!(t.data.is_empty());
    }
    log::set_max_level(saved);
    Ok(())
}

fn length_header(form: usize, len: usize) -> Vec<u8> {
    match form {
        0 => vec![len as u8],
        1 => vec![0x81, len as u8],
        2 => vec![0x82, (len >> 8) as u8, len as u8],
        3 => vec![0x83, 0, (len >> 8) as u8, len as u8],
        _ => vec![0x84, 0, 0, (len >> 8) as u8, len as u8],
    }
}

proptest! {
    #[test]
    fn every_length_form_decodes(
        form in 0usize..5,
        data in proptest::collection::vec(any::<u8>(), 0..0x7F),
    ) {
        let mut buf = length_header(form, data.len());
        buf.extend_from_slice(&data);
        prop_assert_eq!(ber_tlv::decode_value(&buf).ok(), Some(&data[..]));
    }

    #[test]
    fn decoded_aid_matches_event(
        aid in proptest::collection::vec(any::<u8>(), 5..=16),
        data in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let decoder = TransactionDecoder::new(MockNci::new(), HciConfig::default());
        let mut buf = vec![0x81, aid.len() as u8];
        buf.extend_from_slice(&aid);
        buf.push(0x82);
        buf.extend(ber_tlv::encode_value(&data));
        let t = decoder.decode(HciConfig::default().ese_pipe, &buf).unwrap();
        prop_assert_eq!(t.aid, aid);
        prop_assert_eq!(t.data, data);
        prop_assert_eq!(t.se_name.as_str(), "eSE1");
    }
}
