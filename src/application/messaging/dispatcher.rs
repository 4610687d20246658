//! Event dispatcher - Routes inbound events to plugins

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::application::services::MessageService;
use crate::domain::entities::{ApiEvent, InboundEvent, MessageEvent};
use crate::domain::traits::{Chat, EventSource};
use crate::plugins::trait_def::{HandlerContext, Plugin};
use super::parser::CommandParser;

/// Reply posted when someone mentions the bot
pub const MENTION_REPLY: &str = "Yes, hello.";

/// Outcome of routing one message
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Plugins whose `handle` was invoked
    pub invoked: Vec<String>,
    /// Subset of `invoked` that returned an error
    pub failed: Vec<String>,
}

/// Consumes an event stream and fans each command out to every plugin that
/// claims its verb.
///
/// Events are handled strictly one after another, and plugins for one event
/// are invoked sequentially.
pub struct Dispatcher {
    parser: CommandParser,
    plugins: Vec<Arc<dyn Plugin>>,
    messages: MessageService,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>, plugins: Vec<Arc<dyn Plugin>>, chat: Arc<dyn Chat>) -> Self {
        Self {
            parser: CommandParser::new(prefix),
            plugins,
            messages: MessageService::new(chat),
        }
    }

    pub fn prefix(&self) -> &str {
        self.parser.prefix()
    }

    /// Process events until the source closes
    pub async fn run<S: EventSource + ?Sized>(&self, source: &mut S) {
        info!("Dispatching commands with prefix {:?} to {} plugins", self.prefix(), self.plugins.len());
        while let Some(event) = source.next_event().await {
            self.handle_event(&*source, event).await;
        }
        info!("Event stream closed");
    }

    /// Classify one event and route it
    pub async fn handle_event<S: EventSource + ?Sized>(&self, source: &S, event: InboundEvent) {
        debug!("Received {} event", event);
        match event {
            InboundEvent::Connecting => info!("Connecting..."),
            InboundEvent::Connected => info!("Connected."),
            InboundEvent::ConnectionError(e) => warn!("Connection failed, retrying later: {}", e),
            InboundEvent::Api { request_id, event } => {
                if let Err(e) = source.ack(&request_id).await {
                    warn!("Failed to acknowledge event {}: {}", request_id, e);
                }
                self.handle_api_event(event).await;
            }
            InboundEvent::Other(kind) => debug!("Ignored event: {}", kind),
        }
    }

    async fn handle_api_event(&self, event: ApiEvent) {
        match event {
            ApiEvent::Message(message) => {
                self.dispatch(&message).await;
            }
            ApiEvent::Mention { channel, .. } => {
                if self.messages.say(&channel, None, MENTION_REPLY).await {
                    debug!("Posted reply to {}", channel);
                }
            }
            ApiEvent::UserJoined { user, channel } => {
                info!("User {:?} joined channel {:?}", user, channel);
            }
            ApiEvent::Other(kind) => debug!("Unhandled inner event: {}", kind),
        }
    }

    /// Route one message to every plugin that handles its verb.
    ///
    /// Returns `None` when the message is not a command.
    pub async fn dispatch(&self, message: &MessageEvent) -> Option<DispatchReport> {
        let command = self.parser.parse(&message.text)?;
        info!("Received command {:?} with arg {:?}", command.verb, command.argument);

        let ctx = HandlerContext::new(message.clone(), command, self.messages.clone());
        let mut report = DispatchReport::default();

        for plugin in self.plugins.iter().filter(|p| p.handles(&ctx.command.verb)) {
            debug!(
                "Plugin {:?} handling command {:?} with arg {:?}",
                plugin.name(),
                ctx.command.verb,
                ctx.command.argument
            );
            report.invoked.push(plugin.name().to_string());

            if let Err(e) = plugin.handle(&ctx, &ctx.command.argument).await {
                error!("Error: plugin {} command {:?}: {}", plugin.name(), ctx.command.verb, e);
                report.failed.push(plugin.name().to_string());
            }
        }

        if report.invoked.is_empty() {
            debug!("No plugin handles {:?}", ctx.command.verb);
        }
        Some(report)
    }
}
