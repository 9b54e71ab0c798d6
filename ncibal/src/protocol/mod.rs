// ncibal/src/protocol/mod.rs

//! Byte-level decoding: activation parameters, BER-TLV lengths and HCI
//! transaction payloads.

pub mod activation;
pub mod ber_tlv;
pub mod parser;
pub mod transaction;

pub use activation::TagSignatures;
pub use transaction::{Transaction, decode_transaction};
