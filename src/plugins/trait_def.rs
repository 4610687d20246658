//! Plugin trait definitions

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::PluginError;
use crate::application::scheduler::ReminderPlan;
use crate::application::services::MessageService;
use crate::domain::entities::{Command, MessageEvent};
use crate::domain::traits::Chat;

/// Core plugin trait that all plugins must implement
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier, used as the registry key
    fn name(&self) -> &str;

    /// Whether this plugin reacts to `verb`. Must be pure.
    fn handles(&self, verb: &str) -> bool;

    /// Parse and validate the plugin's configuration section.
    ///
    /// Called once at startup. Background work the plugin wants (reminders)
    /// is described by the returned [`Activation`] and started by the caller.
    fn load(&self, config: &[u8]) -> Result<Activation, PluginError>;

    /// Execute a command. Errors are logged by the dispatcher.
    async fn handle(&self, ctx: &HandlerContext, argument: &str) -> Result<(), PluginError>;
}

/// What a plugin hands back from a successful `load`
#[derive(Debug, Default)]
pub struct Activation {
    reminders: Option<ReminderPlan>,
}

impl Activation {
    /// Plain activation with no background work
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_reminders(plan: ReminderPlan) -> Self {
        Self { reminders: Some(plan) }
    }

    pub fn reminders(&self) -> Option<&ReminderPlan> {
        self.reminders.as_ref()
    }

    pub fn into_reminders(self) -> Option<ReminderPlan> {
        self.reminders
    }
}

/// Everything a handler needs to answer one command
pub struct HandlerContext {
    pub event: MessageEvent,
    pub command: Command,
    messages: MessageService,
}

impl HandlerContext {
    pub fn new(event: MessageEvent, command: Command, messages: MessageService) -> Self {
        Self {
            event,
            command,
            messages,
        }
    }

    pub fn chat(&self) -> &Arc<dyn Chat> {
        self.messages.chat()
    }

    /// Reply in the channel (and thread) the command came from
    pub async fn reply(&self, text: &str) -> bool {
        self.messages
            .say(&self.event.channel, self.event.reply_thread(), text)
            .await
    }
}
