//! Plugin system for slackbot
//!
//! Plugins are registered by name, activated from their configuration
//! section, and receive every command whose verb they claim.

pub mod loader;
pub mod oncall;
pub mod pinger;
pub mod registry;
pub mod trait_def;

pub use loader::{load_plugins, LoadedPlugins};
pub use oncall::OncallPlugin;
pub use pinger::PingerPlugin;
pub use registry::PluginRegistry;
pub use trait_def::{Activation, HandlerContext, Plugin};
