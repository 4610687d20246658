//! Transport adapters

pub mod console;
pub mod slack;

use std::sync::Arc;

use crate::domain::traits::Chat;

pub use console::{ConsoleAdapter, ConsoleChat};
pub use slack::SlackWebClient;

/// Where the bot's two kinds of outbound messages go
#[derive(Clone)]
pub struct Outbound {
    /// Replies to commands read from the console
    pub replies: Arc<dyn Chat>,
    /// Scheduled reminders, addressed to real channel ids
    pub reminders: Arc<dyn Chat>,
}

impl Outbound {
    /// Console replies are printed. Reminders are posted to Slack when a
    /// client is given, and printed otherwise.
    pub fn console(slack: Option<SlackWebClient>) -> Self {
        match slack {
            Some(slack) => {
                let slack: Arc<dyn Chat> = Arc::new(slack);
                Self {
                    replies: Arc::new(ConsoleChat::new().with_user_lookup(slack.clone())),
                    reminders: slack,
                }
            }
            None => {
                let console: Arc<dyn Chat> = Arc::new(ConsoleChat::new());
                Self {
                    replies: console.clone(),
                    reminders: console,
                }
            }
        }
    }
}
