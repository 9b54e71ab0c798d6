//! Hex rendering for byte buffers in log lines and test fixtures.

use std::fmt;

/// Lowercase hex without separators: `&[0x81, 0x05]` -> `"8105"`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    HexSlice(bytes).to_string()
}

/// Parse a hex string, ignoring ASCII whitespace.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<u8> = s.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err("hex string has odd length".to_string());
    }
    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(text, 16).map_err(|e| format!("invalid hex pair '{}': {}", text, e))
        })
        .collect()
}

/// Lazy hex formatter, so `debug!("{}", HexSlice(data))` costs nothing when
/// the log level is disabled.
#[derive(Clone, Copy)]
pub struct HexSlice<'a>(pub &'a [u8]);

impl fmt::Display for HexSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self)
    }
}
