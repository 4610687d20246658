//! Application layer errors

use std::path::PathBuf;
use thiserror::Error;

/// Transport-level errors raised by the messaging backend
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by plugins, either while loading their configuration or
/// while handling a command
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to load location {0:?}")]
    InvalidTimeZone(String),

    #[error("Invalid time of day {0:?}")]
    InvalidTime(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Reminders enabled but no reminder is set")]
    EmptyReminders,

    #[error("Plugin {0} is not loaded")]
    NotLoaded(String),

    #[error("Plugin {0} is already loaded")]
    AlreadyLoaded(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(#[from] BotError),
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Unknown plugin {0} (did you register it first?)")]
    UnknownPlugin(String),

    #[error("Plugin {name}: {source}")]
    Plugin {
        name: String,
        #[source]
        source: PluginError,
    },
}

/// Plugin registry errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Plugin {0} already registered")]
    DuplicateName(String),
}
