use async_trait::async_trait;
use crate::application::errors::BotError;
use crate::domain::entities::InboundEvent;

/// EventSource trait - inbound side of a messaging backend
#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next event. `None` means the stream is closed.
    async fn next_event(&mut self) -> Option<InboundEvent>;

    /// Acknowledge an API callback envelope
    async fn ack(&self, request_id: &str) -> Result<(), BotError>;
}
