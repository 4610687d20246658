//! Plugin registry - Maps plugin names to plugin instances

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::application::errors::RegistryError;
use super::trait_def::Plugin;

/// Append-only registry of plugins.
///
/// The lock is held only for the map operation itself, never across a
/// plugin's `load` or `handle`.
pub struct PluginRegistry {
    plugins: Mutex<HashMap<String, Arc<dyn Plugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Plugin>>> {
        // map operations cannot leave the map half-updated
        self.plugins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a plugin under `name`. Fails without touching the registry
    /// if the name is taken.
    pub fn register(&self, name: impl Into<String>, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        let name = name.into();
        let mut plugins = self.lock();

        if plugins.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        plugins.insert(name.clone(), plugin);
        drop(plugins);
        tracing::info!("Registered plugin {}", name);
        Ok(())
    }

    /// Register a plugin under its own name
    pub fn register_plugin<P: Plugin + 'static>(&self, plugin: P) -> Result<(), RegistryError> {
        let name = plugin.name().to_string();
        self.register(name, Arc::new(plugin))
    }

    /// Get a plugin by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.lock().get(name).cloned()
    }

    /// Registered plugin names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::PluginError;
    use crate::plugins::trait_def::{Activation, HandlerContext};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn handles(&self, verb: &str) -> bool {
            verb == self.0
        }

        fn load(&self, _config: &[u8]) -> Result<Activation, PluginError> {
            Ok(Activation::idle())
        }

        async fn handle(&self, _ctx: &HandlerContext, _argument: &str) -> Result<(), PluginError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = PluginRegistry::new();
        registry.register_plugin(Named("oncall")).unwrap();
        registry.register_plugin(Named("pinger")).unwrap();

        assert_eq!(registry.get("oncall").unwrap().name(), "oncall");
        assert_eq!(registry.get("pinger").unwrap().name(), "pinger");
        assert!(registry.get("weather").is_none());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["oncall", "pinger"]);
    }

    #[test]
    fn test_duplicate_name_rejected_and_original_kept() {
        let registry = PluginRegistry::new();
        registry.register("oncall", Arc::new(Named("first"))).unwrap();

        let err = registry.register("oncall", Arc::new(Named("second"))).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("oncall".to_string()));
        assert_eq!(registry.get("oncall").unwrap().name(), "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_registration() {
        const NAMES: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let registry = Arc::new(PluginRegistry::new());

        // every name is raced by two threads, exactly one must win
        let handles: Vec<_> = NAMES
            .iter()
            .chain(NAMES.iter())
            .copied()
            .map(|name| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.register_plugin(Named(name)).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(wins, NAMES.len());
        assert_eq!(registry.len(), NAMES.len());
        for name in NAMES {
            assert!(registry.get(name).is_some());
        }
    }
}
