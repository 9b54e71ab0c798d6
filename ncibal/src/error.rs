// ncibal/src/error.rs

use thiserror::Error;

/// Errors for contract violations and malformed input.
///
/// Expected hardware outcomes (rejection, timeout, reported failure) are not
/// errors; public operations report those through `bool` / [`crate::NfaStatus`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("no hardware interface configured")]
    HalMissing,

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("aid too long: max {max} bytes, got {actual}")]
    InvalidAidLength { max: usize, actual: usize },

    #[error("ber-tlv error: {0}")]
    BerTlv(String),

    #[error("transaction event malformed: {0}")]
    Transaction(String),

    #[error("unknown hci pipe {0:#04x}")]
    UnknownPipe(u8),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
