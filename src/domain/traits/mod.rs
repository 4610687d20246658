//! Domain traits - Abstractions for the messaging transport

pub mod chat;
pub mod source;

pub use chat::Chat;
pub use source::EventSource;
