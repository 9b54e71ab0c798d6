//! Small helpers shared across the crate: hex rendering for logs and
//! millisecond/`Duration` conversions for bounded waits.

pub mod hex;
pub mod timeout;

pub use hex::*;
pub use timeout::*;
