//! In-process plugin registry
//!
//! Plugin names that do not start with `.` refer to installed modules. Rust
//! has no runtime module loader, so embedders register those modules here
//! under the name the config uses.

use super::module::PluginModule;
use indexmap::IndexMap;

/// Installed plugin modules keyed by name
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    modules: IndexMap<String, PluginModule>,
}

impl PluginRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under `name`, replacing any previous module
    pub fn register(&mut self, name: impl Into<String>, module: PluginModule) -> &mut Self {
        let name = name.into();
        if self.modules.insert(name.clone(), module).is_some() {
            tracing::debug!(plugin = %name, "Replaced registered plugin");
        }
        self
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, module: PluginModule) -> Self {
        self.register(name, module);
        self
    }

    /// Look up a module
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginModule> {
        self.modules.get(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Number of registered modules
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::hook_fn;

    #[test]
    fn test_register_and_get() {
        let registry = PluginRegistry::new()
            .with(
                "stagecraft-plugin-a",
                PluginModule::mapping([("build", hook_fn(|_| Ok(None)))]),
            )
            .with(
                "stagecraft-plugin-b",
                PluginModule::Other("number".to_string()),
            );

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["stagecraft-plugin-a", "stagecraft-plugin-b"]
        );
        assert_eq!(
            registry.get("stagecraft-plugin-b").map(PluginModule::kind),
            Some("number")
        );
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = PluginRegistry::new();
        registry.register("p", PluginModule::Other("string".to_string()));
        registry.register(
            "p",
            PluginModule::mapping([("init", hook_fn(|_| Ok(None)))]),
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("p").map(PluginModule::kind), Some("mapping"));
    }
}
