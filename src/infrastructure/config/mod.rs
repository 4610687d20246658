//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::application::errors::ConfigError;
use crate::application::messaging::DEFAULT_CMD_PREFIX;
use crate::infrastructure::credentials::Credentials;

pub const DEFAULT_BOT_NAME: &str = "slackbot";

/// Written by `init-config`
pub const SAMPLE_CONFIG: &str = r#"bot_name: slackbot
debug: false
cmdprefix: "!"
credentials:
  pagerduty_api_key: ""
  slack_bot_token: ""
plugins:
  oncall:
    default_schedule_id: PXXXXXX
    locations:
      - America/Los_Angeles
      - Europe/Dublin
    handoff_reminders:
      enabled: false
      template_path: ~/.config/slackbot/handoff.tmpl
      channel_id: C0000000000
      when:
        - time: "9:00"
          location: America/New_York
        - time: "14:00"
          location: UTC
  pinger:
    schedule_id: PXXXXXX
    fallback_users: []
"#;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Append logs to this file instead of stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logfile: Option<PathBuf>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub cmdprefix: String,

    /// Plugin name -> that plugin's own configuration section
    #[serde(default)]
    pub plugins: BTreeMap<String, serde_yaml::Value>,
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            logfile: None,
            debug: false,
            credentials: Credentials::default(),
            cmdprefix: DEFAULT_CMD_PREFIX.to_string(),
            plugins: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        // if no command prefix is specified, use the default
        if config.cmdprefix.is_empty() {
            config.cmdprefix = DEFAULT_CMD_PREFIX.to_string();
        }
        Ok(config)
    }

    /// Apply `BOT_PREFIX` from the environment
    pub fn apply_env(&mut self) {
        self.override_prefix(std::env::var("BOT_PREFIX").ok());
    }

    /// Replace the command prefix unless `prefix` is absent or empty
    pub fn override_prefix(&mut self, prefix: Option<String>) {
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            self.cmdprefix = prefix;
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Serialize one plugin section back to YAML bytes for the plugin's `load`
pub fn plugin_section_bytes(name: &str, section: &serde_yaml::Value) -> Result<Vec<u8>, ConfigError> {
    let section = if section.is_null() {
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
    } else {
        section.clone()
    };
    serde_yaml::to_string(&section)
        .map(String::into_bytes)
        .map_err(|e| ConfigError::Parse(format!("error marshalling config for plugin {}: {}", name, e)))
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> Option<PathBuf> {
    if path == "~" {
        return dirs::home_dir();
    }
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config = Config::parse(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.bot_name, "slackbot");
        assert_eq!(config.cmdprefix, "!");
        assert!(config.plugins.contains_key("oncall"));
        assert!(config.plugins.contains_key("pinger"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("plugins: {}\n").unwrap();
        assert_eq!(config.bot_name, DEFAULT_BOT_NAME);
        assert_eq!(config.cmdprefix, DEFAULT_CMD_PREFIX);
        assert!(!config.debug);
        assert!(config.logfile.is_none());
        assert!(config.credentials.pagerduty_api_key.is_empty());
    }

    #[test]
    fn test_empty_prefix_uses_default() {
        let config = Config::parse("cmdprefix: \"\"\n").unwrap();
        assert_eq!(config.cmdprefix, "!");
    }

    #[test]
    fn test_prefix_override() {
        let mut config = Config::parse("cmdprefix: \".\"\n").unwrap();
        config.override_prefix(None);
        assert_eq!(config.cmdprefix, ".");
        config.override_prefix(Some(String::new()));
        assert_eq!(config.cmdprefix, ".");
        config.override_prefix(Some("?".to_string()));
        assert_eq!(config.cmdprefix, "?");
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(Config::parse("plugins: [1, 2"), Err(ConfigError::Parse(_))));
        assert!(matches!(Config::parse("debug: maybe\n"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/slackbot.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_and_save_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::parse(SAMPLE_CONFIG).unwrap();
        config.cmdprefix = "%".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.cmdprefix, "%");
        assert_eq!(loaded.plugins.len(), 2);
    }

    #[test]
    fn test_null_plugin_section_becomes_empty_mapping() {
        let bytes = plugin_section_bytes("pinger", &serde_yaml::Value::Null).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_slice(&bytes).unwrap();
        assert!(value.is_mapping());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/handoff.tmpl"), Some(PathBuf::from("/etc/handoff.tmpl")));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/handoff.tmpl"), Some(home.join("handoff.tmpl")));
        }
    }
}
