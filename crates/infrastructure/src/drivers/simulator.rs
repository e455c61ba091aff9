use domain::DomainError;
use domain::driver::{Driver, HardwareInterface, Model};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, trace};

/// A write the simulator accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: u32,
    pub value: bool,
}

#[derive(Debug, Default)]
struct SimulatorState {
    initialized: bool,
    writes: Vec<PinWrite>,
}

/// State shared between the driver and every interface it issued
struct SimulatorShared {
    name: String,
    state: Mutex<SimulatorState>,
}

impl SimulatorShared {
    fn lock(&self) -> MutexGuard<'_, SimulatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, pin: u32, value: bool) {
        let mut state = self.lock();
        if !state.initialized {
            error!(driver = %self.name, pin, "write(): Not initialized!");
            return;
        }

        state.writes.push(PinWrite { pin, value });
        trace!(driver = %self.name, pin, value, "write(): Write performed");
    }
}

/// Driver with the same init/shutdown/write sequencing as the GPIO driver
/// but no physical effect. Accepted writes are kept in memory.
pub struct SimulatedDriver {
    shared: Arc<SimulatorShared>,
    models: Vec<Model>,
}

impl SimulatedDriver {
    pub const NAME: &'static str = "TestDriver";

    pub fn new() -> Self {
        Self::with_models(&Model::ALL)
    }

    /// Simulator that only supports `models`
    pub fn with_models(models: &[Model]) -> Self {
        Self {
            shared: Arc::new(SimulatorShared {
                name: Self::NAME.to_string(),
                state: Mutex::new(SimulatorState::default()),
            }),
            models: models.to_vec(),
        }
    }

    /// Every write performed so far, oldest first
    pub fn writes(&self) -> Vec<PinWrite> {
        self.shared.lock().writes.clone()
    }

    /// Writes performed on `pin`, oldest first
    pub fn writes_for(&self, pin: u32) -> Vec<PinWrite> {
        self.shared
            .lock()
            .writes
            .iter()
            .filter(|w| w.pin == pin)
            .copied()
            .collect()
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for SimulatedDriver {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn init(&self) -> Result<(), DomainError> {
        let mut state = self.shared.lock();
        if state.initialized {
            error!(driver = %self.shared.name, "init(): Already initialized!");
            return Err(DomainError::AlreadyInitialized(self.shared.name.clone()));
        }

        state.initialized = true;
        info!(driver = %self.shared.name, "Initialized!");
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.shared.lock();
        if !state.initialized {
            error!(driver = %self.shared.name, "shutdown(): Not initialized!");
            return;
        }

        state.initialized = false;
        info!(driver = %self.shared.name, "Stopped");
    }

    fn is_initialized(&self) -> bool {
        self.shared.lock().initialized
    }

    fn get_interface(&self, model: Model) -> Result<Box<dyn HardwareInterface>, DomainError> {
        if !self.is_initialized() {
            return Err(DomainError::DriverNotInitialized(self.shared.name.clone()));
        }

        if !self.models.contains(&model) {
            return Err(DomainError::UnsupportedModel {
                driver: self.shared.name.clone(),
                model: model.to_string(),
            });
        }

        match model {
            Model::PlugV1 => Ok(Box::new(SimulatedPlugV1Interface {
                pin: 0,
                driver: Arc::clone(&self.shared),
            })),
        }
    }
}

/// Single-relay plug handle on the simulator
pub struct SimulatedPlugV1Interface {
    pin: u32,
    driver: Arc<SimulatorShared>,
}

impl HardwareInterface for SimulatedPlugV1Interface {
    fn set_pin(&mut self, pin: u32) {
        self.pin = pin;
    }

    fn on(&mut self) {
        self.driver.write(self.pin, true);
    }

    fn off(&mut self) {
        self.driver.write(self.pin, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_reported() {
        let driver = SimulatedDriver::new();
        assert!(driver.init().is_ok());
        assert_eq!(
            driver.init(),
            Err(DomainError::AlreadyInitialized("TestDriver".to_string()))
        );
        assert!(driver.is_initialized());
    }

    #[test]
    fn test_shutdown_before_init_is_noop() {
        let driver = SimulatedDriver::new();
        driver.shutdown();
        assert!(!driver.is_initialized());
    }

    #[test]
    fn test_reinit_after_shutdown() {
        let driver = SimulatedDriver::new();
        driver.init().unwrap();
        driver.shutdown();
        assert!(!driver.is_initialized());
        assert!(driver.init().is_ok());
    }

    #[test]
    fn test_interface_before_init_is_error() {
        let driver = SimulatedDriver::new();
        let result = driver.get_interface(Model::PlugV1);
        assert!(matches!(result, Err(DomainError::DriverNotInitialized(_))));
    }

    #[test]
    fn test_unsupported_model_leaves_driver_untouched() {
        let driver = SimulatedDriver::with_models(&[]);
        driver.init().unwrap();

        let result = driver.get_interface(Model::PlugV1);
        assert!(matches!(result, Err(DomainError::UnsupportedModel { .. })));
        assert!(driver.is_initialized());
        assert!(driver.writes().is_empty());
    }

    #[test]
    fn test_writes_are_recorded_per_pin() {
        let driver = SimulatedDriver::new();
        driver.init().unwrap();

        let mut first = driver.get_interface(Model::PlugV1).unwrap();
        let mut second = driver.get_interface(Model::PlugV1).unwrap();
        first.set_pin(17);
        second.set_pin(27);

        first.on();
        second.on();
        first.off();

        assert_eq!(
            driver.writes_for(17),
            vec![
                PinWrite { pin: 17, value: true },
                PinWrite { pin: 17, value: false },
            ]
        );
        assert_eq!(driver.writes_for(27), vec![PinWrite { pin: 27, value: true }]);
        assert_eq!(driver.writes().len(), 3);
    }

    #[test]
    fn test_interface_is_inert_after_shutdown() {
        let driver = SimulatedDriver::new();
        driver.init().unwrap();
        let mut interface = driver.get_interface(Model::PlugV1).unwrap();
        interface.set_pin(5);

        driver.shutdown();
        interface.on();

        assert!(driver.writes().is_empty());
    }
}
