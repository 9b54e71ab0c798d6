// ncibal/src/protocol/transaction.rs

//! Off-host transaction event payload.
//!
//! ```text
//! 0x81 | aid_len | aid[aid_len] | 0x82 | length | data
//! ```
//!
//! The AID part is mandatory; the data part is optional and carries its own
//! BER-TLV length.

use log::debug;

use crate::protocol::ber_tlv;
use crate::utils::HexSlice;
use crate::{Error, Result};

/// Tag opening the AID part.
pub const AID_TAG: u8 = 0x81;
/// Tag opening the optional data part.
pub const DATA_TAG: u8 = 0x82;
/// Shortest payload that may carry an AID (tag, length, one byte).
pub const MIN_EVENT_LEN: usize = 3;

const AID_LEN_POS: usize = 1;
const AID_POS: usize = 2;

/// Decoded transaction payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub aid: Vec<u8>,
    pub data: Vec<u8>,
}

/// Decode an EVT_TRANSACTION payload.
///
/// Fails only when the AID part is missing. A malformed data part yields an
/// empty `data` rather than an error; an AID length running past the buffer
/// keeps the bytes that are present.
pub fn decode_transaction(buf: &[u8]) -> Result<Transaction> {
    if buf.len() <= MIN_EVENT_LEN {
        return Err(Error::Transaction(format!(
            "payload too short ({} bytes)",
            buf.len()
        )));
    }
    if buf[0] != AID_TAG {
        return Err(Error::Transaction(format!(
            "expected aid tag {:#04x}, got {:#04x}",
            AID_TAG, buf[0]
        )));
    }

    let aid_len = buf[AID_LEN_POS] as usize;
    let aid_end = (AID_POS + aid_len).min(buf.len());
    let aid = buf[AID_POS..aid_end].to_vec();

    // Tag byte plus at least one length byte must follow the AID.
    let data = match buf.get(AID_POS + aid_len..) {
        Some(rest) if rest.len() > 1 && rest[0] == DATA_TAG => ber_tlv::value_or_empty(&rest[1..]),
        _ => Vec::new(),
    };

    debug!(
        "transaction aid={} data={}",
        HexSlice(&aid),
        HexSlice(&data)
    );
    Ok(Transaction { aid, data })
}
