mod command;
mod config;
mod power_state;
mod state;

pub use command::Command;
pub use config::PlugConfig;
pub use power_state::{PowerState, Rejection};
pub use state::{PlugState, StateSnapshot};
