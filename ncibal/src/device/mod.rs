// ncibal/src/device/mod.rs

//! Device-level orchestration: discovery state, RF control, the controller
//! event router and the public [`DeviceHost`] facade.

pub mod builder;
pub mod controller;
pub mod host;
pub mod listener;
pub mod rf;
pub mod state;

pub use builder::DeviceHostBuilder;
pub use controller::DiscoveryController;
pub use host::DeviceHost;
pub use listener::{DeviceHostListener, ListenerSlot};
pub use state::{DiscoveryState, NfcState};
