//! Application services

pub mod bot_service;
pub mod message_service;

pub use bot_service::BotService;
pub use message_service::MessageService;
