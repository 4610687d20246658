//! Domain layer - Core types with no I/O
//!
//! This layer contains:
//! - Entities: inbound events, commands, reminder entries
//! - Traits: abstractions over the messaging transport (EventSource, Chat)

pub mod entities;
pub mod traits;
