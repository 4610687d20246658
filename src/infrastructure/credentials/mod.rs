//! Third-party API credentials
//!
//! The holder is populated once, when the configuration is validated, and
//! read by plugins whenever they talk to a provider.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// API keys and tokens from the `credentials` config section
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Credentials {
    pub pagerduty_api_key: String,
    pub slack_bot_token: String,
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("pagerduty_api_key", &redact(&self.pagerduty_api_key))
            .field("slack_bot_token", &redact(&self.slack_bot_token))
            .finish()
    }
}

/// Set-once credential store shared between the loader and the plugins
#[derive(Debug, Default)]
pub struct CredentialHolder {
    inner: OnceCell<Credentials>,
}

pub type SharedCredentials = Arc<CredentialHolder>;

impl CredentialHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCredentials {
        Arc::new(Self::new())
    }

    /// Store the credentials. Returns false if they were already set, in
    /// which case the first value is kept.
    pub fn set(&self, credentials: Credentials) -> bool {
        let stored = self.inner.set(credentials).is_ok();
        if !stored {
            tracing::warn!("Credentials already populated, ignoring second set");
        }
        stored
    }

    pub fn pagerduty_api_key(&self) -> String {
        self.inner
            .get()
            .map(|c| c.pagerduty_api_key.clone())
            .unwrap_or_default()
    }
}
