mod gpio;
mod simulator;

pub use gpio::{DEFAULT_SYSFS_ROOT, GpioDriver, GpioPlugV1Interface};
pub use simulator::{PinWrite, SimulatedDriver, SimulatedPlugV1Interface};

use domain::DomainError;
use domain::driver::{Driver, DriverKind};
use std::sync::Arc;

/// Factory for creating the process-wide driver
pub struct DriverFactory;

impl DriverFactory {
    /// Create the driver backend for `kind`
    pub fn create(kind: DriverKind) -> Arc<dyn Driver> {
        match kind {
            DriverKind::RpiZ => Arc::new(GpioDriver::new()),
            DriverKind::Test => Arc::new(SimulatedDriver::new()),
        }
    }

    /// Resolve a configured driver name and create the backend
    pub fn create_from_name(name: &str) -> Result<Arc<dyn Driver>, DomainError> {
        let kind: DriverKind = name.parse()?;
        Ok(Self::create(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::driver::Model;

    #[test]
    fn test_create_test_driver() {
        let driver = DriverFactory::create_from_name("TEST").unwrap();
        assert_eq!(driver.name(), "TestDriver");
        assert!(!driver.is_initialized());

        driver.init().unwrap();
        assert!(driver.get_interface(Model::PlugV1).is_ok());
    }

    #[test]
    fn test_create_gpio_driver() {
        let driver = DriverFactory::create(DriverKind::RpiZ);
        assert_eq!(driver.name(), "RPiZDriver");
        assert!(!driver.is_initialized());
    }

    #[test]
    fn test_unknown_driver_name() {
        let result = DriverFactory::create_from_name("ARDUINO");
        assert!(matches!(result, Err(DomainError::UnknownDriver(name)) if name == "ARDUINO"));
    }
}
