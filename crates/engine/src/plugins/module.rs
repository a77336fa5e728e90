//! Plugin modules
//!
//! A loaded plugin is either a direct mapping from lifecycle name to hook, or
//! a factory that builds such a mapping from the plugin's settings. Anything
//! else found where a plugin was expected is kept as [`PluginModule::Other`]
//! so the collector can reject it before any hook runs.

use crate::hooks::HookFn;
use indexmap::IndexMap;
use stagecraft_core::{Error, Result, Settings};
use std::fmt;
use std::sync::Arc;

/// Hooks of one plugin keyed by lifecycle name, in declaration order
///
/// A `None` entry names a lifecycle event the plugin declares without a
/// callable; it becomes a record that is skipped at run time.
pub type HookMap = IndexMap<String, Option<HookFn>>;

/// Builds a plugin's hooks from its settings
pub type FactoryFn = Arc<dyn Fn(&Settings) -> Result<HookMap> + Send + Sync>;

/// Loaded plugin code
#[derive(Clone)]
pub enum PluginModule {
    /// Invoked once with the plugin settings
    Factory(FactoryFn),
    /// Used as-is
    Mapping(HookMap),
    /// Neither; the string describes what was found
    Other(String),
}

impl PluginModule {
    /// Wrap a factory closure
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&Settings) -> Result<HookMap> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(f))
    }

    /// Build a mapping module from `(lifecycle name, hook)` pairs
    pub fn mapping<I, K>(hooks: I) -> Self
    where
        I: IntoIterator<Item = (K, HookFn)>,
        K: Into<String>,
    {
        Self::Mapping(
            hooks
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v)))
                .collect(),
        )
    }

    /// Kind label for diagnostics
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Factory(_) => "factory",
            Self::Mapping(_) => "mapping",
            Self::Other(found) => found,
        }
    }

    /// Produce the plugin's hooks
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPlugin`] for [`PluginModule::Other`], and
    /// whatever the factory returns on failure.
    pub fn instantiate(&self, name: &str, settings: &Settings) -> Result<HookMap> {
        match self {
            Self::Factory(factory) => factory(settings),
            Self::Mapping(hooks) => Ok(hooks.clone()),
            Self::Other(found) => Err(Error::MalformedPlugin {
                name: name.to_string(),
                found: found.clone(),
            }),
        }
    }
}

impl fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("PluginModule::Factory"),
            Self::Mapping(hooks) => f
                .debug_tuple("PluginModule::Mapping")
                .field(&hooks.keys().collect::<Vec<_>>())
                .finish(),
            Self::Other(found) => f.debug_tuple("PluginModule::Other").field(found).finish(),
        }
    }
}
