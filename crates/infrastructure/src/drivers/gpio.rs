use domain::DomainError;
use domain::driver::{Driver, HardwareInterface, Model};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default location of the Linux sysfs GPIO controller
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Labels of the SoC pin controllers that carry the header pins
const SOC_CHIP_LABELS: &[&str] = &["pinctrl-bcm2835", "pinctrl-bcm2711", "pinctrl-rp1"];

// udev fixes permissions on a freshly exported line asynchronously
const DIRECTION_ATTEMPTS: u32 = 10;
const DIRECTION_RETRY_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct GpioState {
    initialized: bool,
    /// First sysfs line number of the SoC controller
    base: u32,
    // Pending write: one pin+value pair per driver
    pin: u32,
    value: bool,
    // Header pins (not sysfs lines) currently exported
    exported: BTreeSet<u32>,
}

struct GpioShared {
    name: String,
    root: PathBuf,
    state: Mutex<GpioState>,
}

impl GpioShared {
    fn lock(&self) -> MutexGuard<'_, GpioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn line_dir(&self, line: u32) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    /// Export `pin` and configure it as an output
    fn bind(&self, pin: u32) {
        let mut state = self.lock();
        if !state.initialized {
            error!(driver = %self.name, pin, "bind(): GPIO not initialized!");
            return;
        }

        if let Err(e) = self.ensure_exported(&mut state, pin) {
            error!(driver = %self.name, pin, error = %e, "bind(): Failed to export pin");
        }
    }

    /// Set the pending pin/value and perform the physical write
    fn set_and_write(&self, pin: u32, value: bool) {
        let mut state = self.lock();
        state.pin = pin;
        state.value = value;
        self.write(&mut state);
    }

    fn write(&self, state: &mut GpioState) {
        if !state.initialized {
            error!(driver = %self.name, pin = state.pin, "write(): GPIO not initialized!");
            return;
        }

        if let Err(e) = self.write_pending(state) {
            error!(driver = %self.name, pin = state.pin, error = %e, "write(): Write failed");
        }
    }

    fn write_pending(&self, state: &mut GpioState) -> io::Result<()> {
        let pin = state.pin;
        // Normally done at bind time; retried here if binding failed
        self.ensure_exported(state, pin)?;

        let level = if state.value { "1" } else { "0" };
        fs::write(self.line_dir(state.base + pin).join("value"), level)
    }

    fn ensure_exported(&self, state: &mut GpioState, pin: u32) -> io::Result<()> {
        if state.exported.contains(&pin) {
            return Ok(());
        }

        let line = state.base + pin;
        let line_dir = self.line_dir(line);
        if !line_dir.exists() {
            fs::write(self.root.join("export"), line.to_string())?;
        }
        self.set_output(&line_dir)?;

        state.exported.insert(pin);
        debug!(driver = %self.name, pin, line, "Exported pin as output");
        Ok(())
    }

    fn set_output(&self, line_dir: &Path) -> io::Result<()> {
        let direction = line_dir.join("direction");
        let mut attempt = 1;
        loop {
            match fs::write(&direction, "out") {
                Ok(()) => return Ok(()),
                Err(e)
                    if attempt < DIRECTION_ATTEMPTS
                        && matches!(
                            e.kind(),
                            io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
                        ) =>
                {
                    debug!(driver = %self.name, path = %direction.display(), attempt, "Line not ready yet");
                    attempt += 1;
                    thread::sleep(DIRECTION_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Sysfs line number of the first SoC GPIO.
///
/// Kernels from 6.6 number the SoC controller from 512 instead of 0, so the
/// base is read from the `gpiochip*` entries rather than assumed.
fn discover_base(root: &Path) -> io::Result<u32> {
    let mut chips = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let is_chip = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("gpiochip"));
        if !is_chip {
            continue;
        }

        let base = fs::read_to_string(path.join("base"))?;
        let base: u32 = base
            .trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let label = fs::read_to_string(path.join("label")).unwrap_or_default();
        chips.push((base, label.trim().to_string()));
    }

    let soc = chips
        .iter()
        .find(|(_, label)| SOC_CHIP_LABELS.contains(&label.as_str()));
    Ok(match soc {
        Some((base, _)) => *base,
        None => chips.iter().map(|(base, _)| *base).min().unwrap_or(0),
    })
}

/// Raspberry Pi GPIO driver backed by the sysfs controller
pub struct GpioDriver {
    shared: Arc<GpioShared>,
}

impl GpioDriver {
    pub const NAME: &'static str = "RPiZDriver";

    pub fn new() -> Self {
        Self::with_root(DEFAULT_SYSFS_ROOT)
    }

    /// Driver using a sysfs controller mounted at `root`
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            shared: Arc::new(GpioShared {
                name: Self::NAME.to_string(),
                root: root.as_ref().to_path_buf(),
                state: Mutex::new(GpioState::default()),
            }),
        }
    }
}

impl Default for GpioDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for GpioDriver {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn init(&self) -> Result<(), DomainError> {
        let mut state = self.shared.lock();
        if state.initialized {
            error!(driver = %self.shared.name, "init(): GPIO already initialized!");
            return Err(DomainError::AlreadyInitialized(self.shared.name.clone()));
        }

        let export = self.shared.root.join("export");
        if !export.exists() {
            error!(driver = %self.shared.name, path = %export.display(), "Failed to initialize GPIO!");
            return Err(DomainError::DriverInit(format!(
                "GPIO controller not found at {}",
                self.shared.root.display()
            )));
        }

        state.base = discover_base(&self.shared.root).map_err(|e| {
            error!(driver = %self.shared.name, error = %e, "Failed to read GPIO chip base");
            DomainError::DriverInit(format!("unreadable GPIO chip: {e}"))
        })?;

        state.initialized = true;
        info!(driver = %self.shared.name, base = state.base, "GPIO initialized!");
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.shared.lock();
        if !state.initialized {
            error!(driver = %self.shared.name, "shutdown(): GPIO not initialized!");
            return;
        }

        let unexport = self.shared.root.join("unexport");
        for pin in std::mem::take(&mut state.exported) {
            let line = state.base + pin;
            if let Err(e) = fs::write(&unexport, line.to_string()) {
                warn!(driver = %self.shared.name, pin, line, error = %e, "Failed to unexport pin");
            }
        }

        state.initialized = false;
        info!(driver = %self.shared.name, "GPIO stopped");
    }

    fn is_initialized(&self) -> bool {
        self.shared.lock().initialized
    }

    fn get_interface(&self, model: Model) -> Result<Box<dyn HardwareInterface>, DomainError> {
        if !self.is_initialized() {
            return Err(DomainError::DriverNotInitialized(self.shared.name.clone()));
        }

        match model {
            Model::PlugV1 => Ok(Box::new(GpioPlugV1Interface {
                pin: 0,
                driver: Arc::clone(&self.shared),
            })),
        }
    }
}

/// Single-relay plug on one GPIO line
pub struct GpioPlugV1Interface {
    pin: u32,
    driver: Arc<GpioShared>,
}

impl HardwareInterface for GpioPlugV1Interface {
    fn set_pin(&mut self, pin: u32) {
        self.pin = pin;
        self.driver.bind(pin);
    }

    fn on(&mut self) {
        self.driver.set_and_write(self.pin, true);
    }

    fn off(&mut self) {
        self.driver.set_and_write(self.pin, false);
    }
}
