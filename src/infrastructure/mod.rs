//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Credentials: set-once API key holder
//! - Adapters: console and Slack transport adapters
//! - PagerDuty: on-call provider client

pub mod adapters;
pub mod config;
pub mod credentials;
pub mod pagerduty;
