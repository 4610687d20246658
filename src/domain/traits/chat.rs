use async_trait::async_trait;
use crate::application::errors::BotError;

/// Chat trait - outbound side of a messaging backend.
///
/// Implementations must tolerate concurrent senders: the dispatcher and every
/// reminder scheduler share one instance.
#[async_trait]
pub trait Chat: Send + Sync {
    /// Post `text` to `channel`, inside `thread` when one is given
    async fn send_message(&self, channel: &str, thread: Option<&str>, text: &str) -> Result<(), BotError>;

    /// Resolve a chat user id from an e-mail address
    async fn lookup_user_by_email(&self, _email: &str) -> Result<Option<String>, BotError> {
        Ok(None)
    }
}

#[cfg(test)]
pub mod recording {
    //! In-memory chat used by unit tests

    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Sent {
        pub channel: String,
        pub thread: Option<String>,
        pub text: String,
    }

    #[derive(Default)]
    pub struct RecordingChat {
        pub sent: Mutex<Vec<Sent>>,
        pub users: Vec<(String, String)>,
        pub fail_sends: bool,
    }

    impl RecordingChat {
        pub fn texts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|s| s.text.clone()).collect()
        }
    }

    #[async_trait]
    impl Chat for RecordingChat {
        async fn send_message(&self, channel: &str, thread: Option<&str>, text: &str) -> Result<(), BotError> {
            if self.fail_sends {
                return Err(BotError::Network("connection reset".to_string()));
            }
            self.sent.lock().unwrap().push(Sent {
                channel: channel.to_string(),
                thread: thread.map(str::to_string),
                text: text.to_string(),
            });
            Ok(())
        }

        async fn lookup_user_by_email(&self, email: &str) -> Result<Option<String>, BotError> {
            Ok(self.users.iter().find(|(e, _)| e == email).map(|(_, id)| id.clone()))
        }
    }
}
