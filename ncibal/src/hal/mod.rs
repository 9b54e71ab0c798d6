// ncibal/src/hal/mod.rs

//! Hardware-facing boundary: the controller primitives the bridge calls and
//! the completion events it receives back.

pub mod events;
pub mod mock;
pub mod traits;

pub use events::*;
pub use mock::MockNci;
pub use traits::NciHal;
