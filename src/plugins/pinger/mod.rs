//! Pinger plugin - Mentions the current on-call in the channel, matching the
//! PagerDuty user to a chat user by e-mail

use async_trait::async_trait;
use chrono::{Duration, Utc};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{info, warn};

use crate::application::errors::PluginError;
use crate::infrastructure::credentials::SharedCredentials;
use crate::infrastructure::pagerduty::{group_by_schedule, OnCall, PagerDutyClient};
use crate::plugins::trait_def::{Activation, HandlerContext, Plugin};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PingerConfig {
    schedule_id: String,
    /// Chat user ids to mention when the on-call has no chat account
    fallback_users: Vec<String>,
}

pub struct PingerPlugin {
    credentials: SharedCredentials,
    api_base: Option<String>,
    config: OnceCell<PingerConfig>,
}

impl PingerPlugin {
    pub fn new(credentials: SharedCredentials) -> Self {
        Self {
            credentials,
            api_base: None,
            config: OnceCell::new(),
        }
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = Some(url.into());
        self
    }

    fn client(&self) -> PagerDutyClient {
        let client = PagerDutyClient::new(self.credentials.pagerduty_api_key());
        match &self.api_base {
            Some(url) => client.with_base_url(url.as_str()),
            None => client,
        }
    }

    async fn mention(&self, ctx: &HandlerContext, config: &PingerConfig, oncall: &OnCall) -> String {
        let email = oncall.user.email.as_deref().unwrap_or_default();
        let found = if email.is_empty() {
            Ok(None)
        } else {
            ctx.chat().lookup_user_by_email(email).await
        };
        match found {
            Ok(Some(id)) => format!("<@{}>", id),
            Ok(None) => {
                warn!("No chat user found for e-mail {:?}", email);
                fallback_mentions(&config.fallback_users)
            }
            Err(e) => {
                warn!("No chat user found for e-mail {:?}: {}", email, e);
                fallback_mentions(&config.fallback_users)
            }
        }
    }
}

fn fallback_mentions(users: &[String]) -> String {
    users.iter().map(|u| format!("<@{}> ", u)).collect()
}

#[async_trait]
impl Plugin for PingerPlugin {
    fn name(&self) -> &str {
        "pinger"
    }

    fn handles(&self, verb: &str) -> bool {
        verb == "ping"
    }

    fn load(&self, config: &[u8]) -> Result<Activation, PluginError> {
        let conf: PingerConfig = serde_yaml::from_slice(config)
            .map_err(|e| PluginError::Config(e.to_string()))?;
        self.config
            .set(conf)
            .map_err(|_| PluginError::AlreadyLoaded(self.name().to_string()))?;
        Ok(Activation::idle())
    }

    // the argument is ignored, everything comes from the configuration
    async fn handle(&self, ctx: &HandlerContext, _argument: &str) -> Result<(), PluginError> {
        let config = self
            .config
            .get()
            .ok_or_else(|| PluginError::NotLoaded(self.name().to_string()))?;
        if config.schedule_id.is_empty() {
            return Err(PluginError::Config("`schedule_id` is empty or not set".to_string()));
        }

        info!("Getting oncalls for schedule ID {}", config.schedule_id);
        let oncalls = self
            .client()
            .list_oncalls(&config.schedule_id, Utc::now() + Duration::hours(24))
            .await?;
        if oncalls.is_empty() {
            return Err(PluginError::NotFound(format!(
                "oncall not found for schedule ID {}",
                config.schedule_id
            )));
        }

        for rotation in group_by_schedule(&oncalls) {
            let Some(current) = rotation.oncalls.first() else {
                continue;
            };
            let mention = self.mention(ctx, config, current).await;
            let msg = format!("Ping oncall for {}: {}", rotation.header(), mention);
            ctx.reply(&msg).await;
        }
        Ok(())
    }
}
