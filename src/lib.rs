//! Chat-command bot with a plugin registry, an event dispatcher and
//! time-zone aware reminders.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
