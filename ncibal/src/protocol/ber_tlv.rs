// ncibal/src/protocol/ber_tlv.rs

//! BER-TLV length decoding for HCI transaction payloads.
//!
//! The first byte is either a short-form length (`< 0x80`) or one of the
//! long-form markers `0x81..=0x84` followed by 1-4 big-endian length bytes.
//! The declared length must match the remaining buffer exactly.

use log::error;

use crate::protocol::parser::{be_uint_at, byte_at};
use crate::utils::HexSlice;
use crate::{Error, Result};

/// Tag announcing an 8-bit length in the following byte.
pub const LENGTH_ONE: u8 = 0x81;
/// Tag announcing a 16-bit length.
pub const LENGTH_TWO: u8 = 0x82;
/// Tag announcing a 24-bit length.
pub const LENGTH_THREE: u8 = 0x83;
/// Tag announcing a 32-bit length.
pub const LENGTH_FOUR: u8 = 0x84;
/// Short-form lengths are strictly below this value.
pub const SHORT_FORM_LIMIT: u8 = 0x80;

/// Number of bytes that encode the length, including the leading byte.
fn header_len(first: u8) -> Result<usize> {
    match first {
        b if b < SHORT_FORM_LIMIT => Ok(1),
        LENGTH_ONE => Ok(2),
        LENGTH_TWO => Ok(3),
        LENGTH_THREE => Ok(4),
        LENGTH_FOUR => Ok(5),
        other => Err(Error::BerTlv(format!(
            "unsupported length tag {:#04x}",
            other
        ))),
    }
}

/// Return the value bytes of a length-prefixed buffer.
pub fn decode_value(buf: &[u8]) -> Result<&[u8]> {
    let first = byte_at(buf, 0).map_err(|_| Error::BerTlv("empty buffer".into()))?;
    let header = header_len(first)?;
    let declared = if header == 1 {
        first as usize
    } else {
        be_uint_at(buf, 1, header - 1)
            .map_err(|_| Error::BerTlv(format!("truncated length after {:#04x}", first)))?
    };
    let actual = buf.len() - header;
    if declared != actual {
        return Err(Error::BerTlv(format!(
            "declared length {} but {} bytes follow",
            declared, actual
        )));
    }
    Ok(&buf[header..])
}

/// Like [`decode_value`], but logs and yields an empty value on failure.
pub fn value_or_empty(buf: &[u8]) -> Vec<u8> {
    match decode_value(buf) {
        Ok(v) => v.to_vec(),
        Err(e) => {
            error!("tlv length encoding rejected ({}): {}", e, HexSlice(buf));
            Vec::new()
        }
    }
}

/// Encode `value` with the shortest length form.
pub fn encode_value(value: &[u8]) -> Vec<u8> {
    let len = value.len();
    let mut out = Vec::with_capacity(len + 5);
    if len < SHORT_FORM_LIMIT as usize {
        out.push(len as u8);
    } else {
        let bytes = (len as u32).to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        let width = bytes.len() - skip;
        out.push(LENGTH_ONE + width as u8 - 1);
        out.extend_from_slice(&bytes[skip..]);
    }
    out.extend_from_slice(value);
    out
}
