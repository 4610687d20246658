use std::sync::Arc;
use crate::domain::traits::Chat;

/// Service for posting outbound messages.
///
/// Send failures are logged and dropped; nothing is retried or queued.
#[derive(Clone)]
pub struct MessageService {
    chat: Arc<dyn Chat>,
}

impl MessageService {
    pub fn new(chat: Arc<dyn Chat>) -> Self {
        Self { chat }
    }

    pub fn chat(&self) -> &Arc<dyn Chat> {
        &self.chat
    }

    /// Post `text` to `channel`, threaded when `thread` is set
    pub async fn say(&self, channel: &str, thread: Option<&str>, text: &str) -> bool {
        match self.chat.send_message(channel, thread, text).await {
            Ok(()) => {
                tracing::debug!("Posted message to {}", channel);
                true
            }
            Err(e) => {
                tracing::error!("Failed to post message to {}: {}", channel, e);
                false
            }
        }
    }
}
