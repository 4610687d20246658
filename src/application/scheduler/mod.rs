//! Reminder scheduler - Posts each reminder of a set at its next occurrence
//!
//! A scheduler loops between two states: compute the soonest upcoming
//! occurrence across the whole set, then sleep until it and post the entry's
//! message. Each plugin with reminders gets its own independent task.

pub mod clock;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::errors::PluginError;
use crate::application::services::MessageService;
use crate::domain::entities::Reminder;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::TokioClock;

/// A non-empty reminder set and the channel its messages go to
#[derive(Debug, Clone)]
pub struct ReminderPlan {
    reminders: Vec<Reminder>,
    channel: String,
}

impl ReminderPlan {
    pub fn new(reminders: Vec<Reminder>, channel: impl Into<String>) -> Result<Self, PluginError> {
        if reminders.is_empty() {
            return Err(PluginError::EmptyReminders);
        }
        Ok(Self {
            reminders,
            channel: channel.into(),
        })
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Index and instant of the reminder that fires first after `now`.
///
/// Ties go to the entry listed first.
pub fn next_due(reminders: &[Reminder], now: DateTime<Utc>) -> Option<(usize, DateTime<Utc>)> {
    let mut best: Option<(usize, DateTime<Utc>)> = None;
    for (idx, reminder) in reminders.iter().enumerate() {
        let at = reminder.next_occurrence(now);
        if best.map_or(true, |(_, earliest)| at < earliest) {
            best = Some((idx, at));
        }
    }
    best
}

/// Background loop for one plugin's reminder set
pub struct ReminderScheduler {
    plugin: String,
    plan: ReminderPlan,
    messages: MessageService,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(plugin: impl Into<String>, plan: ReminderPlan, messages: MessageService) -> Self {
        Self {
            plugin: plugin.into(),
            plan,
            messages,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Run until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        info!("Running {} {} reminders", self.plan.reminders.len(), self.plugin);
        for reminder in &self.plan.reminders {
            info!("- {}", reminder);
        }

        // a clock that lags behind the timer must not re-arm a fired entry
        let mut fired_at: Option<DateTime<Utc>> = None;
        loop {
            let now = match fired_at {
                Some(at) => self.clock.now().max(at),
                None => self.clock.now(),
            };
            let Some((idx, when)) = next_due(&self.plan.reminders, now) else {
                return;
            };
            info!("{}: next tick: {}", self.plugin, when);

            let wait = (when - now).to_std().unwrap_or_default();
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("{}: reminders stopped", self.plugin);
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            self.fire(&self.plan.reminders[idx]).await;
            fired_at = Some(when);
        }
    }

    async fn fire(&self, reminder: &Reminder) {
        let text = match reminder.template.render() {
            Ok(text) => text,
            Err(e) => {
                error!(
                    "{}: failed to execute reminder template {}: {}",
                    self.plugin,
                    reminder.template.name(),
                    e
                );
                return;
            }
        };
        // reminders always go to the top level of the channel
        self.messages.say(&self.plan.channel, None, &text).await;
    }
}

/// Owns every running scheduler and the token that stops them
pub struct SchedulerGroup {
    cancel: CancellationToken,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl SchedulerGroup {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Start `scheduler` on the current tokio runtime
    pub fn spawn(&mut self, scheduler: ReminderScheduler) {
        let name = scheduler.plugin().to_string();
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(scheduler.run(cancel));
        self.handles.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop all schedulers and wait for them to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                warn!("{}: reminder task ended abnormally: {}", name, e);
            }
        }
    }
}

impl Default for SchedulerGroup {
    fn default() -> Self {
        Self::new()
    }
}
