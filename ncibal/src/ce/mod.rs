// ncibal/src/ce/mod.rs

//! Card emulation: NFCEE routing table management and host card emulation
//! data delivery.

pub mod hce;
pub mod router;

pub use router::CardEmulationRouter;
