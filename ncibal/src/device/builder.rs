// ncibal/src/device/builder.rs

use std::sync::Arc;

use crate::config::BalConfig;
use crate::device::controller::DiscoveryController;
use crate::device::host::DeviceHost;
use crate::device::listener::ListenerSlot;
use crate::hal::NciHal;
use crate::{Error, Result};

/// Assembles a [`DeviceHost`] around a hardware interface.
#[derive(Default)]
pub struct DeviceHostBuilder {
    hal: Option<Arc<dyn NciHal>>,
    config: BalConfig,
}

impl DeviceHostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hardware interface every request goes to (a [`crate::hal::MockNci`]
    /// in tests).
    pub fn with_hal(mut self, hal: Arc<dyn NciHal>) -> Self {
        self.hal = Some(hal);
        self
    }

    pub fn with_config(mut self, config: BalConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the host. The stack is not
    /// enabled until [`DeviceHost::initialize`].
    pub fn build(self) -> Result<DeviceHost> {
        let hal = self.hal.ok_or(Error::HalMissing)?;
        self.config.validate()?;
        let listener = Arc::new(ListenerSlot::new());
        let controller = DiscoveryController::new(hal, self.config, Arc::clone(&listener));
        Ok(DeviceHost::new(controller, listener))
    }
}
