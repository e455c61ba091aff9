use super::model::Model;
use crate::error::DomainError;

/// Owner of a hardware subsystem. One instance per process, shared by every plug.
///
/// Lifecycle: `init` once before any interface is used, `shutdown` once at
/// teardown. Interfaces handed out by a driver refuse to write after
/// `shutdown` (the refusal is logged, never propagated).
pub trait Driver: Send + Sync {
    /// Logging context of this driver
    fn name(&self) -> &str;

    /// One-time subsystem setup.
    ///
    /// Fails with [`DomainError::AlreadyInitialized`] when called twice and
    /// [`DomainError::DriverInit`] when the subsystem cannot come up. May be
    /// called again after a successful `shutdown`.
    fn init(&self) -> Result<(), DomainError>;

    /// Tear the subsystem down. Logs an error and does nothing if not initialized.
    fn shutdown(&self);

    fn is_initialized(&self) -> bool;

    /// Issue a handle able to drive `model`.
    ///
    /// Never mutates driver state, so it is safe to call once per plug.
    fn get_interface(&self, model: Model) -> Result<Box<dyn HardwareInterface>, DomainError>;
}

/// Per-pin handle issued by a [`Driver`]
pub trait HardwareInterface: Send {
    /// Bind the handle to a pin and prepare it as an output.
    /// Must happen before the first `on`/`off`; failures are logged by the driver.
    fn set_pin(&mut self, pin: u32);

    /// Drive the pin high. Physical write failures are logged by the driver.
    fn on(&mut self);

    /// Drive the pin low. Physical write failures are logged by the driver.
    fn off(&mut self);
}
