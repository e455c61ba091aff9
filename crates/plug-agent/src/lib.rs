//! Process wiring for the plug agent

pub mod logging;
