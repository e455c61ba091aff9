mod driver_kind;
mod hardware;
mod model;

pub use driver_kind::DriverKind;
pub use hardware::{Driver, HardwareInterface};
pub use model::Model;
