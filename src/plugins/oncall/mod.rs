//! Oncall plugin - Shows who is on call using PagerDuty, and optionally posts
//! handoff reminders at fixed times of day

use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{debug, info};

use crate::application::errors::PluginError;
use crate::application::scheduler::ReminderPlan;
use crate::domain::entities::{parse_tz, MessageTemplate, Reminder};
use crate::infrastructure::config::expand_home;
use crate::infrastructure::credentials::SharedCredentials;
use crate::infrastructure::pagerduty::{group_by_schedule, PagerDutyClient, Rotation};
use crate::plugins::trait_def::{Activation, HandlerContext, Plugin};

const END_TIME_FORMAT: &str = "%b %d %H:%M %Z";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OncallConfig {
    default_schedule_id: String,
    locations: Vec<String>,
    handoff_reminders: HandoffConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HandoffConfig {
    enabled: bool,
    template_path: Option<String>,
    /// Inline alternative to `template_path`
    template: Option<String>,
    channel_id: String,
    when: Vec<WhenConfig>,
}

#[derive(Debug, Deserialize)]
struct WhenConfig {
    time: String,
    location: String,
}

#[derive(Debug)]
struct OncallState {
    default_schedule_id: String,
    locations: Vec<Tz>,
}

pub struct OncallPlugin {
    credentials: SharedCredentials,
    api_base: Option<String>,
    state: OnceCell<OncallState>,
}

impl OncallPlugin {
    pub fn new(credentials: SharedCredentials) -> Self {
        Self {
            credentials,
            api_base: None,
            state: OnceCell::new(),
        }
    }

    /// Use another PagerDuty endpoint
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

    async fn schedule_ids(&self, state: &OncallState, query: &str) -> Result<Vec<String>, PluginError> {
        let ids = if query.is_empty() {
            vec![state.default_schedule_id.clone()]
        } else {
            let schedules = self.client().search_schedules(query).await?;
            let names: Vec<&str> = schedules.iter().map(|s| s.name.as_str()).collect();
            debug!("Schedules matching {:?}: {:?}", query, names);
            schedules.into_iter().map(|s| s.id).collect()
        };
        let ids: Vec<String> = ids.into_iter().filter(|id| !id.is_empty()).collect();
        if ids.is_empty() {
            return Err(PluginError::NotFound("invalid empty schedule ID".to_string()));
        }
        Ok(ids)
    }
}

fn load_template(handoff: &HandoffConfig) -> Result<MessageTemplate, PluginError> {
    if let Some(raw) = handoff.template_path.as_deref().filter(|p| !p.is_empty()) {
        let path = expand_home(raw)
            .ok_or_else(|| PluginError::Config(format!("failed to expand template_path {:?}", raw)))?;
        let source = std::fs::read_to_string(&path).map_err(|e| {
            PluginError::Template(format!("failed to read {}: {}", path.display(), e))
        })?;
        let name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| raw.to_string());
        return MessageTemplate::parse(name, source);
    }
    match handoff.template.as_deref() {
        Some(inline) => MessageTemplate::parse("handoff", inline),
        None => Err(PluginError::Config(
            "handoff_reminders needs template_path or template".to_string(),
        )),
    }
}

fn load_reminders(handoff: &HandoffConfig) -> Result<ReminderPlan, PluginError> {
    if handoff.channel_id.is_empty() {
        return Err(PluginError::Config("handoff_reminders.channel_id is not set".to_string()));
    }
    let template = load_template(handoff)?;
    let reminders = handoff
        .when
        .iter()
        .map(|w| Reminder::parse(&w.time, &w.location, template.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    ReminderPlan::new(reminders, handoff.channel_id.as_str())
}

/// One message per rotation: the current on-call, the next one, then the rest
fn format_rotation(rotation: &Rotation<'_>, locations: &[Tz]) -> Result<String, PluginError> {
    let mut msg = rotation.header();
    for (idx, oncall) in rotation.oncalls.iter().enumerate() {
        let end = oncall.end_time()?;
        let until = locations
            .iter()
            .map(|tz| end.with_timezone(tz).format(END_TIME_FORMAT).to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        let user = format!("<{}|{}>", oncall.user.html_url, oncall.user.summary);
        match idx {
            0 => msg.push_str(&format!(": Current oncall: {} (until {}).\n", user, until)),
            1 => msg.push_str(&format!(" Next: {} (until {})\n", user, until)),
            _ => msg.push_str(&format!("       {} (until {})\n", user, until)),
        }
    }
    Ok(msg)
}

#[async_trait]
impl Plugin for OncallPlugin {
    fn name(&self) -> &str {
        "oncall"
    }

    fn handles(&self, verb: &str) -> bool {
        verb == "oncall"
    }

    fn load(&self, config: &[u8]) -> Result<Activation, PluginError> {
        let conf: OncallConfig = serde_yaml::from_slice(config)
            .map_err(|e| PluginError::Config(e.to_string()))?;

        let mut locations = conf
            .locations
            .iter()
            .map(|name| parse_tz(name))
            .collect::<Result<Vec<_>, _>>()?;
        if locations.is_empty() {
            locations.push(Tz::UTC);
        }

        let activation = if conf.handoff_reminders.enabled {
            info!("Oncall reminders enabled");
            Activation::with_reminders(load_reminders(&conf.handoff_reminders)?)
        } else {
            info!("Oncall reminders not enabled");
            Activation::idle()
        };

        self.state
            .set(OncallState {
                default_schedule_id: conf.default_schedule_id,
                locations,
            })
            .map_err(|_| PluginError::AlreadyLoaded(self.name().to_string()))?;
        Ok(activation)
    }

    async fn handle(&self, ctx: &HandlerContext, argument: &str) -> Result<(), PluginError> {
        let state = self
            .state
            .get()
            .ok_or_else(|| PluginError::NotLoaded(self.name().to_string()))?;

        let schedule_ids = self.schedule_ids(state, argument).await?;
        info!("Getting oncalls for schedule IDs {:?}", schedule_ids);

        let client = self.client();
        for schedule_id in &schedule_ids {
            let oncalls = client
                .list_oncalls(schedule_id, Utc::now() + Duration::hours(24))
                .await?;
            for rotation in group_by_schedule(&oncalls) {
                let msg = format_rotation(&rotation, &state.locations)?;
                ctx.reply(&msg).await;
            }
        }
        Ok(())
    }
}
