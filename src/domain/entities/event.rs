//! Inbound events delivered by the messaging transport

use std::fmt;

/// A message posted in a channel the bot is a member of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel: String,
    pub user: Option<String>,
    pub text: String,
    pub thread_ts: Option<String>,
}

impl MessageEvent {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: None,
            text: text.into(),
            thread_ts: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    /// Thread to reply into, if the message was posted inside one
    pub fn reply_thread(&self) -> Option<&str> {
        self.thread_ts.as_deref().filter(|ts| !ts.is_empty())
    }
}

/// Events carried inside an API callback envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiEvent {
    Message(MessageEvent),
    UserJoined {
        user: String,
        channel: String,
    },
    Mention {
        channel: String,
        user: Option<String>,
        text: String,
    },
    Other(String),
}

/// Everything the transport can hand to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Connecting,
    Connected,
    ConnectionError(String),
    /// API callback envelope. `request_id` must be acknowledged.
    Api { request_id: String, event: ApiEvent },
    Other(String),
}

impl InboundEvent {
    pub fn message(request_id: impl Into<String>, message: MessageEvent) -> Self {
        Self::Api {
            request_id: request_id.into(),
            event: ApiEvent::Message(message),
        }
    }
}

impl fmt::Display for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundEvent::Connecting => write!(f, "connecting"),
            InboundEvent::Connected => write!(f, "connected"),
            InboundEvent::ConnectionError(e) => write!(f, "connection error: {}", e),
            InboundEvent::Api { event, .. } => match event {
                ApiEvent::Message(_) => write!(f, "message"),
                ApiEvent::UserJoined { .. } => write!(f, "member joined channel"),
                ApiEvent::Mention { .. } => write!(f, "app mention"),
                ApiEvent::Other(kind) => write!(f, "api event {}", kind),
            },
            InboundEvent::Other(kind) => write!(f, "{}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let message = InboundEvent::message("r1", MessageEvent::new("C1", "!oncall"));
        assert_eq!(message.to_string(), "message");
        assert_eq!(InboundEvent::Connected.to_string(), "connected");
        let joined = InboundEvent::Api {
            request_id: "r2".to_string(),
            event: ApiEvent::UserJoined {
                user: "U1".to_string(),
                channel: "C1".to_string(),
            },
        };
        assert_eq!(joined.to_string(), "member joined channel");
    }

    #[test]
    fn test_reply_thread_ignores_empty_timestamp() {
        assert_eq!(MessageEvent::new("C1", "hi").with_thread("").reply_thread(), None);
        assert_eq!(MessageEvent::new("C1", "hi").with_thread("17.1").reply_thread(), Some("17.1"));
    }
}
