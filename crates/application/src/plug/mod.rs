mod debounce;
mod manager;
mod plug_actor;

pub use debounce::PlugSignal;
pub use manager::PlugManager;
pub use plug_actor::Plug;
