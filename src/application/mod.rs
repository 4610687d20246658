//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: error taxonomy shared by every layer
//! - Messaging: command parsing and event dispatch
//! - Scheduler: reminder loops
//! - Services: outbound message helper

pub mod errors;
pub mod messaging;
pub mod scheduler;
pub mod services;
