//! Slack Web API adapter (outbound only)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::domain::traits::Chat;
use crate::infrastructure::credentials::Credentials;

/// Slack Web API base URL
const API_BASE: &str = "https://slack.com/api";

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

/// Every Web API response carries `ok` and, on failure, `error`
#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<SlackUser>,
}

#[derive(Deserialize)]
struct SlackUser {
    id: String,
}

/// Posts messages with a bot token
pub struct SlackWebClient {
    token: String,
    client: Client,
    base_url: String,
}

impl SlackWebClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Client for the configured bot token, if there is one
    pub fn from_credentials(credentials: &Credentials) -> Option<Self> {
        let token = credentials.slack_bot_token.trim();
        if token.is_empty() {
            return None;
        }
        Some(Self::new(token))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn decode(response: reqwest::Response) -> Result<ApiResponse, BotError> {
        if !response.status().is_success() {
            return Err(BotError::Network(format!("Slack API error: {}", response.status())));
        }
        response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Chat for SlackWebClient {
    async fn send_message(&self, channel: &str, thread: Option<&str>, text: &str) -> Result<(), BotError> {
        let request = PostMessageRequest {
            channel,
            text,
            thread_ts: thread.filter(|ts| !ts.is_empty()),
        };

        let response = self.client
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let data = Self::decode(response).await?;
        if !data.ok {
            return Err(BotError::Api(data.error.unwrap_or_else(|| "unknown error".to_string())));
        }
        Ok(())
    }

    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<String>, BotError> {
        let response = self.client
            .get(self.api_url("users.lookupByEmail"))
            .bearer_auth(&self.token)
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let data = Self::decode(response).await?;
        match (data.ok, data.error.as_deref()) {
            (true, _) => Ok(data.user.map(|u| u.id)),
            (false, Some("users_not_found")) => Ok(None),
            (false, error) => Err(BotError::Api(error.unwrap_or("unknown error").to_string())),
        }
    }
}
