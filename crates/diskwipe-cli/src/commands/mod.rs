//! CLI command implementations

pub mod erase;
pub mod list;
pub mod modes;
pub mod settings;
