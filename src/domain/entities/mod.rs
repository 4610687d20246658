//! Domain entities - Core business objects

pub mod command;
pub mod event;
pub mod reminder;

pub use command::Command;
pub use event::{ApiEvent, InboundEvent, MessageEvent};
pub use reminder::{parse_tz, MessageTemplate, Reminder, TimeOfDay};
