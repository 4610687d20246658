//! Plugin loader - Activates the plugins named in the configuration

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::errors::ConfigError;
use crate::application::scheduler::{Clock, ReminderPlan, ReminderScheduler, SchedulerGroup};
use crate::application::services::MessageService;
use crate::domain::traits::Chat;
use crate::infrastructure::config::{plugin_section_bytes, Config};
use crate::infrastructure::credentials::CredentialHolder;
use super::registry::PluginRegistry;
use super::trait_def::Plugin;

/// Plugins that loaded successfully, in configuration order, plus the
/// reminder sets they asked for
pub struct LoadedPlugins {
    plugins: Vec<Arc<dyn Plugin>>,
    plans: Vec<(String, ReminderPlan)>,
}

impl LoadedPlugins {
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn reminder_plans(&self) -> &[(String, ReminderPlan)] {
        &self.plans
    }

    /// Spawn one scheduler per reminder set. Must run inside a tokio runtime.
    pub fn start_schedulers(&mut self, chat: Arc<dyn Chat>, clock: Arc<dyn Clock>) -> SchedulerGroup {
        let messages = MessageService::new(chat);
        let mut group = SchedulerGroup::new();
        for (name, plan) in self.plans.drain(..) {
            group.spawn(ReminderScheduler::new(name, plan, messages.clone()).with_clock(clock.clone()));
        }
        group
    }

    pub fn into_plugins(self) -> Vec<Arc<dyn Plugin>> {
        self.plugins
    }
}

/// Populate credentials, then load every configured plugin.
///
/// All names are resolved before any plugin is loaded, so an unknown name
/// leaves every plugin untouched.
pub fn load_plugins(
    registry: &PluginRegistry,
    config: &Config,
    credentials: &CredentialHolder,
) -> Result<LoadedPlugins, ConfigError> {
    credentials.set(config.credentials.clone());

    let mut resolved = Vec::with_capacity(config.plugins.len());
    for (name, section) in &config.plugins {
        let Some(plugin) = registry.get(name) else {
            warn!("Plugin {} is not registered, known plugins: {:?}", name, registry.names());
            return Err(ConfigError::UnknownPlugin(name.clone()));
        };
        resolved.push((name, section, plugin));
    }

    let mut loaded = LoadedPlugins {
        plugins: Vec::with_capacity(resolved.len()),
        plans: Vec::new(),
    };
    for (name, section, plugin) in resolved {
        let bytes = plugin_section_bytes(name, section)?;
        let activation = plugin.load(&bytes).map_err(|source| ConfigError::Plugin {
            name: name.clone(),
            source,
        })?;
        info!("Loaded plugin {}", name);

        if let Some(plan) = activation.into_reminders() {
            info!("{}: {} reminders enabled", name, plan.reminders().len());
            loaded.plans.push((name.clone(), plan));
        }
        loaded.plugins.push(plugin);
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::PluginError;
    use crate::domain::entities::{MessageTemplate, Reminder};
    use crate::plugins::trait_def::{Activation, HandlerContext};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakePlugin {
        name: &'static str,
        loads: AtomicUsize,
        with_reminders: bool,
        fail: bool,
    }

    impl FakePlugin {
        fn named(name: &'static str) -> Self {
            Self { name, ..Default::default() }
        }
    }

    #[async_trait]
    impl Plugin for FakePlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn handles(&self, verb: &str) -> bool {
            verb == self.name
        }

        fn load(&self, config: &[u8]) -> Result<Activation, PluginError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let _: serde_yaml::Mapping = serde_yaml::from_slice(config)
                .map_err(|e| PluginError::Config(e.to_string()))?;
            if self.fail {
                return Err(PluginError::Config("bad section".to_string()));
            }
            if !self.with_reminders {
                return Ok(Activation::idle());
            }
            let template = MessageTemplate::parse("inline", "handoff time")?;
            let plan = ReminderPlan::new(vec![Reminder::parse("9:00", "UTC", template)?], "C1")?;
            Ok(Activation::with_reminders(plan))
        }

        async fn handle(&self, _ctx: &HandlerContext, _argument: &str) -> Result<(), PluginError> {
            Ok(())
        }
    }

    fn config(yaml: &str) -> Config {
        Config::parse(yaml).unwrap()
    }

    #[test]
    fn test_loads_configured_plugins_and_collects_reminders() {
        let registry = PluginRegistry::new();
        registry.register_plugin(FakePlugin::named("pinger")).unwrap();
        registry
            .register_plugin(FakePlugin { with_reminders: true, ..FakePlugin::named("oncall") })
            .unwrap();
        registry.register_plugin(FakePlugin::named("unused")).unwrap();

        let credentials = CredentialHolder::new();
        let loaded = load_plugins(
            &registry,
            &config("credentials:\n  pagerduty_api_key: k\nplugins:\n  oncall: {}\n  pinger:\n"),
            &credentials,
        )
        .unwrap();

        assert_eq!(loaded.names(), vec!["oncall", "pinger"]);
        assert_eq!(loaded.reminder_plans().len(), 1);
        assert_eq!(loaded.reminder_plans()[0].0, "oncall");
        assert_eq!(credentials.pagerduty_api_key(), "k");
    }

    #[test]
    fn test_unknown_plugin_fails_before_any_load() {
        let registry = PluginRegistry::new();
        let known = Arc::new(FakePlugin::named("a"));
        registry.register("a", known.clone()).unwrap();

        let err = load_plugins(&registry, &config("plugins:\n  a: {}\n  weather: {}\n"), &CredentialHolder::new())
            .err()
            .unwrap();

        assert!(matches!(&err, ConfigError::UnknownPlugin(name) if name == "weather"));
        assert!(err.to_string().contains("did you register it first?"));
        assert_eq!(known.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_plugin_load_error_is_fatal() {
        let registry = PluginRegistry::new();
        registry.register_plugin(FakePlugin { fail: true, ..FakePlugin::named("oncall") }).unwrap();

        let err = load_plugins(&registry, &config("plugins:\n  oncall: {}\n"), &CredentialHolder::new())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Plugin { ref name, source: PluginError::Config(_) } if name == "oncall"));
    }

    #[test]
    fn test_no_plugins_configured() {
        let registry = PluginRegistry::new();
        registry.register_plugin(FakePlugin::named("oncall")).unwrap();
        let loaded = load_plugins(&registry, &config("bot_name: quiet\n"), &CredentialHolder::new()).unwrap();
        assert!(loaded.plugins().is_empty());
        assert!(loaded.reminder_plans().is_empty());
    }

    #[tokio::test]
    async fn test_start_schedulers_spawns_one_task_per_plan() {
        let registry = PluginRegistry::new();
        registry
            .register_plugin(FakePlugin { with_reminders: true, ..FakePlugin::named("oncall") })
            .unwrap();
        let mut loaded = load_plugins(&registry, &config("plugins:\n  oncall: {}\n"), &CredentialHolder::new()).unwrap();

        let chat = Arc::new(crate::domain::traits::chat::recording::RecordingChat::default());
        let group = loaded.start_schedulers(chat, Arc::new(crate::application::scheduler::SystemClock));
        assert_eq!(group.len(), 1);
        assert!(loaded.reminder_plans().is_empty());
        group.shutdown().await;
    }
}
