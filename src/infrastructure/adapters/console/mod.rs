//! Console adapter for development/testing
//!
//! Every stdin line becomes a message event; outbound messages are printed.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use crate::application::errors::BotError;
use crate::domain::entities::{InboundEvent, MessageEvent};
use crate::domain::traits::{Chat, EventSource};

pub const CONSOLE_CHANNEL: &str = "console";

/// Event source reading one message per line
pub struct ConsoleAdapter<R = BufReader<Stdin>> {
    lines: Lines<R>,
    channel: String,
    user: String,
    connected: bool,
}

impl ConsoleAdapter {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::stdin()
    }
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleAdapter<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            channel: CONSOLE_CHANNEL.to_string(),
            user: std::env::var("USER").unwrap_or_else(|_| "console".to_string()),
            connected: false,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + Sync> EventSource for ConsoleAdapter<R> {
    async fn next_event(&mut self) -> Option<InboundEvent> {
        if !self.connected {
            self.connected = true;
            return Some(InboundEvent::Connected);
        }

        match self.lines.next_line().await {
            Ok(Some(line)) => {
                let message = MessageEvent::new(&self.channel, line).with_user(&self.user);
                Some(InboundEvent::message(uuid::Uuid::new_v4().to_string(), message))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to read from console: {}", e);
                None
            }
        }
    }

    async fn ack(&self, request_id: &str) -> Result<(), BotError> {
        tracing::debug!("Ack {}", request_id);
        Ok(())
    }
}

/// Prints outbound messages to stdout.
///
/// User lookups go to `users` when one is attached, so mentions still
/// resolve against the real workspace.
#[derive(Default, Clone)]
pub struct ConsoleChat {
    users: Option<Arc<dyn Chat>>,
}

impl ConsoleChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_lookup(mut self, users: Arc<dyn Chat>) -> Self {
        self.users = Some(users);
        self
    }
}

#[async_trait]
impl Chat for ConsoleChat {
    async fn send_message(&self, channel: &str, thread: Option<&str>, text: &str) -> Result<(), BotError> {
        match thread {
            Some(ts) => println!("[#{}/{}] {}", channel, ts, text),
            None => println!("[#{}] {}", channel, text),
        }
        Ok(())
    }

    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<String>, BotError> {
        match &self.users {
            Some(users) => users.lookup_user_by_email(email).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ApiEvent;

    #[tokio::test]
    async fn test_lines_become_message_events() {
        let mut console = ConsoleAdapter::from_reader(&b"!oncall east\nhello\n"[..]).with_channel("dev");

        assert_eq!(console.next_event().await, Some(InboundEvent::Connected));

        let mut texts = Vec::new();
        while let Some(event) = console.next_event().await {
            match event {
                InboundEvent::Api { request_id, event: ApiEvent::Message(m) } => {
                    assert!(!request_id.is_empty());
                    assert_eq!(m.channel, "dev");
                    texts.push(m.text);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(texts, vec!["!oncall east", "hello"]);
    }

    #[tokio::test]
    async fn test_console_chat_send() {
        assert!(ConsoleChat::new().send_message("dev", None, "hi").await.is_ok());
    }
}
