//! Message handling - Command parsing and event dispatch

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use parser::{CommandParser, DEFAULT_CMD_PREFIX};
