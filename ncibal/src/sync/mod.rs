//! Blocking rendezvous over asynchronous hardware completions.

pub mod rendezvous;

pub use rendezvous::{Pending, Rendezvous, WaitOutcome};
