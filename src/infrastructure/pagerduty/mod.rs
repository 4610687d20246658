//! PagerDuty REST API client - on-call and schedule lookups

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::application::errors::PluginError;

/// PagerDuty API endpoint
const API_BASE: &str = "https://api.pagerduty.com";

/// Reference to a PagerDuty object (user, schedule, ...)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub html_url: String,
    /// Only present on users, when `include[]=users` is requested
    #[serde(default)]
    pub email: Option<String>,
}

/// One on-call entry
#[derive(Debug, Clone, Deserialize)]
pub struct OnCall {
    pub user: Reference,
    /// Absent for escalation levels that are not backed by a schedule
    #[serde(default)]
    pub schedule: Option<Reference>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Schedule {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl OnCall {
    pub fn end_time(&self) -> Result<DateTime<Utc>, PluginError> {
        let end = self.end.as_deref().unwrap_or_default();
        DateTime::parse_from_rfc3339(end)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| PluginError::Provider(format!("failed to parse time {:?}: {}", end, e)))
    }
}

/// On-calls sharing one schedule, in the order the API returned them
#[derive(Debug)]
pub struct Rotation<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub oncalls: Vec<&'a OnCall>,
}

impl Rotation<'_> {
    /// Bold schedule name, linked when the URL is known
    pub fn header(&self) -> String {
        if self.url.is_empty() {
            format!("*{}*", self.name)
        } else {
            format!("*<{}|{}>*", self.url, self.name)
        }
    }
}

/// Group on-calls by schedule summary, keeping first-seen order
pub fn group_by_schedule(oncalls: &[OnCall]) -> Vec<Rotation<'_>> {
    let mut rotations: Vec<Rotation<'_>> = Vec::new();
    for oncall in oncalls {
        let (name, url) = oncall
            .schedule
            .as_ref()
            .map(|s| (s.summary.as_str(), s.html_url.as_str()))
            .unwrap_or(("", ""));
        match rotations.iter_mut().find(|r| r.name == name) {
            Some(rotation) => rotation.oncalls.push(oncall),
            None => rotations.push(Rotation {
                name,
                url,
                oncalls: vec![oncall],
            }),
        }
    }
    rotations
}

#[derive(Deserialize)]
struct OnCallsResponse {
    oncalls: Vec<OnCall>,
}

#[derive(Deserialize)]
struct SchedulesResponse {
    schedules: Vec<Schedule>,
}

/// PagerDuty client
pub struct PagerDutyClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl PagerDutyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Point the client at another host, e.g. a test server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, PluginError> {
        let response = self.client
            .get(self.url(path))
            .header("Authorization", format!("Token token={}", self.api_key))
            .header("Accept", "application/vnd.pagerduty+json;version=2")
            .query(query)
            .send()
            .await
            .map_err(|e| PluginError::Provider(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PluginError::Provider(format!("status: {}, body: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| PluginError::Provider(format!("failed to decode response: {}", e)))
    }

    /// On-calls of `schedule_id` from now until `until`, users included
    pub async fn list_oncalls(&self, schedule_id: &str, until: DateTime<Utc>) -> Result<Vec<OnCall>, PluginError> {
        let query = [
            ("schedule_ids[]", schedule_id.to_string()),
            ("include[]", "users".to_string()),
            ("until", until.to_rfc3339()),
        ];
        let response: OnCallsResponse = self.get("oncalls", &query).await.map_err(|e| {
            PluginError::Provider(format!("failed to get oncalls for schedule ID {:?}: {}", schedule_id, e))
        })?;
        Ok(response.oncalls)
    }

    /// Schedules whose name matches `query`
    pub async fn search_schedules(&self, query: &str) -> Result<Vec<Schedule>, PluginError> {
        let response: SchedulesResponse = self
            .get("schedules", &[("query", query.to_string())])
            .await
            .map_err(|e| PluginError::Provider(format!("schedule search failed: {}", e)))?;
        Ok(response.schedules)
    }
}
