// ncibal/src/lib.rs

//! ncibal
//!
//! Synchronous bridge over an asynchronous NCI/NFA controller API: tag
//! reader/writer sessions, card emulation routing, RF discovery control and
//! off-host transaction decoding.
#![warn(missing_docs)]

pub mod ce;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod hal;
pub mod hci;
pub mod prelude;
pub mod protocol;
pub mod sync;
pub mod tag;
pub mod test_support;
pub mod types;
pub mod utils;

// Re-export common types at crate root so `crate::Error`, `crate::Result`
// and the value types in `types` are available for consumers and for the
// `prelude` re-exports.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
