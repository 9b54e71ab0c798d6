// fixtures.rs: configuration and payloads shared by the integration tests

use ncibal::config::BalConfig;

/// Short waits so negative paths finish quickly.
pub fn fast_config() -> BalConfig {
    BalConfig {
        default_timeout_ms: 300,
        ce_timeout_ms: 300,
        presence_check_delay_ms: 20,
        ..BalConfig::default()
    }
}

/// PPSE AID, `2PAY.SYS.DDF01`.
pub fn ppse_aid() -> Vec<u8> {
    hex::decode("325041592e5359532e4444463031").unwrap()
}

/// Transaction event from an eSE applet: AID `A000000003101001`, data
/// `9000` with a short-form length.
pub fn transaction_event() -> Vec<u8> {
    hex::decode("8108a00000000310100182029000").unwrap()
}

/// SELECT by name for `aid`.
pub fn select_apdu(aid: &[u8]) -> Vec<u8> {
    let mut apdu = vec![0x00, 0xA4, 0x04, 0x00, aid.len() as u8];
    apdu.extend_from_slice(aid);
    apdu.push(0x00);
    apdu
}

/// A one-record NDEF message carrying the URI `https://example.com`.
pub fn uri_ndef_message() -> Vec<u8> {
    let mut msg = vec![0xD1, 0x01, 0x0C, 0x55, 0x04];
    msg.extend_from_slice(b"example.com");
    msg
}
