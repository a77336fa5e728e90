//! Hook records
//!
//! A [`HookRecord`] binds a callable to an expanded lifecycle name together
//! with the settings of the plugin (or config) that contributed it.

use indexmap::IndexMap;
use stagecraft_core::{Manifest, Result, Settings};
use std::fmt;
use std::sync::Arc;

/// Callable hook: receives its owner's settings, may return values to merge
/// into the manifest
pub type HookFn = Arc<dyn Fn(&Settings) -> Result<Option<Manifest>> + Send + Sync>;

/// Wrap a closure as a [`HookFn`]
pub fn hook_fn<F>(f: F) -> HookFn
where
    F: Fn(&Settings) -> Result<Option<Manifest>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Where a hook record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSource {
    /// Synthesized from `build.lifecycle`
    Config,
    /// Contributed by a plugin
    Plugin,
}

impl HookSource {
    /// Label used in listings
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for HookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name used for records synthesized from `build.lifecycle`
pub const CONFIG_SOURCE_NAME: &str = "config";

/// One executable step of the lifecycle
///
/// Identity is `(name, hook)`; several records may share the same `hook`.
#[derive(Clone)]
pub struct HookRecord {
    /// Plugin name, or [`CONFIG_SOURCE_NAME`]
    pub name: String,
    /// Expanded lifecycle name (e.g. `prebuild`)
    pub hook: String,
    /// Settings handed to `method`
    pub settings: Settings,
    /// Callable; records without one are skipped at run time
    pub method: Option<HookFn>,
    /// Config or plugin
    pub source: HookSource,
}

impl HookRecord {
    /// Record contributed by plugin `name`
    pub fn plugin(
        name: impl Into<String>,
        hook: impl Into<String>,
        settings: Settings,
        method: impl Into<Option<HookFn>>,
    ) -> Self {
        Self {
            name: name.into(),
            hook: hook.into(),
            settings,
            method: method.into(),
            source: HookSource::Plugin,
        }
    }

    /// Record synthesized from a `build.lifecycle` entry
    pub fn config(hook: impl Into<String>, method: HookFn) -> Self {
        Self {
            name: CONFIG_SOURCE_NAME.to_string(),
            hook: hook.into(),
            settings: Settings::new(),
            method: Some(method),
            source: HookSource::Config,
        }
    }

    /// Whether this record runs `build.lifecycle` commands
    #[must_use]
    pub fn is_config(&self) -> bool {
        self.source == HookSource::Config
    }

    /// Call the hook with its own settings
    ///
    /// Returns `None` when the record has no method.
    pub fn invoke(&self) -> Option<Result<Option<Manifest>>> {
        self.method.as_ref().map(|method| method(&self.settings))
    }
}

impl fmt::Debug for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRecord")
            .field("name", &self.name)
            .field("hook", &self.hook)
            .field("settings", &self.settings)
            .field("method", &self.method.is_some())
            .field("source", &self.source)
            .finish()
    }
}

/// Plugin hook records grouped by lifecycle name, in plugin declaration order
pub type LifecycleHookTable = IndexMap<String, Vec<HookRecord>>;
