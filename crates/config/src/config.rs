//! Resolved configuration
//!
//! [`ConfigLoader`] reads the config document, applies `--set` overrides and
//! resolves every variable, producing an immutable [`ResolvedConfig`]. The
//! lifecycle engine only sees the two typed slices it needs: the
//! `build.lifecycle` command map and the `plugins` list.

use crate::document::{self, describe};
use crate::dotpath;
use crate::resolver::VariableResolver;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use stagecraft_core::{Error, Result, Settings};
use std::path::{Path, PathBuf};

/// Shell command(s) configured for one lifecycle name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LifecycleCommand {
    /// Newline-separated commands
    Script(String),
    /// One command per entry
    List(Vec<String>),
}

impl LifecycleCommand {
    /// Individual commands to run, skipping blank lines and entries
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        match self {
            Self::Script(script) => script
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Self::List(list) => list
                .iter()
                .filter(|cmd| !cmd.trim().is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Command text as written in the config (for error reports)
    #[must_use]
    pub fn original(&self) -> String {
        match self {
            Self::Script(script) => script.clone(),
            Self::List(list) => list.join("\n"),
        }
    }
}

/// `build.lifecycle` entries keyed by lifecycle name
pub type LifecycleCommands = IndexMap<String, LifecycleCommand>;

/// One entry of the `plugins` list
#[derive(Debug, Clone, PartialEq)]
pub struct PluginEntry {
    /// Module reference: an installed name, or a path starting with `.`
    pub name: String,
    /// Settings passed to the plugin's hooks
    pub settings: Settings,
}

impl PluginEntry {
    /// Create an entry
    pub fn new(name: impl Into<String>, settings: Settings) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    /// A plugin is active unless `enabled` is `false` or `"false"`
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(
            self.settings.get("enabled"),
            Some(JsonValue::Bool(false))
        ) && !matches!(self.settings.get("enabled"), Some(JsonValue::String(s)) if s == "false")
    }
}

/// Fully resolved configuration
///
/// Built once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    document: JsonValue,
    lifecycle: LifecycleCommands,
    plugins: Vec<PluginEntry>,
}

impl ResolvedConfig {
    /// Configuration with no lifecycle commands and no plugins
    #[must_use]
    pub fn empty() -> Self {
        Self {
            document: JsonValue::Object(serde_json::Map::new()),
            ..Self::default()
        }
    }

    /// Build from an already-resolved document
    ///
    /// Entries with an unexpected shape are skipped with a warning rather
    /// than failing the whole config.
    #[must_use]
    pub fn from_document(document: JsonValue) -> Self {
        let lifecycle = parse_lifecycle(&document);
        let plugins = parse_plugins(&document);
        Self {
            document,
            lifecycle,
            plugins,
        }
    }

    /// `build.lifecycle` commands
    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleCommands {
        &self.lifecycle
    }

    /// `plugins` entries in declaration order
    #[must_use]
    pub fn plugins(&self) -> &[PluginEntry] {
        &self.plugins
    }

    /// The whole resolved document
    #[must_use]
    pub fn document(&self) -> &JsonValue {
        &self.document
    }

    /// Value at a dot-separated path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        dotpath::get(&self.document, path)
    }
}

fn parse_lifecycle(document: &JsonValue) -> LifecycleCommands {
    let mut lifecycle = LifecycleCommands::new();

    let Some(entries) = dotpath::get(document, "build.lifecycle") else {
        return lifecycle;
    };
    let Some(entries) = entries.as_object() else {
        tracing::warn!(
            "build.lifecycle must be a mapping, found {}; ignoring it",
            describe(entries)
        );
        return lifecycle;
    };

    for (name, value) in entries {
        if value.is_null() {
            continue;
        }
        match serde_json::from_value::<LifecycleCommand>(value.clone()) {
            Ok(command) if command.commands().is_empty() => {
                tracing::debug!(
                    hook = %name,
                    "build.lifecycle.{} has no commands; ignoring it",
                    name
                );
            }
            Ok(command) => {
                lifecycle.insert(name.clone(), command);
            }
            Err(_) => tracing::warn!(
                hook = %name,
                "build.lifecycle.{} must be a string or a list of strings, found {}; ignoring it",
                name,
                describe(value)
            ),
        }
    }

    lifecycle
}

fn parse_plugins(document: &JsonValue) -> Vec<PluginEntry> {
    let Some(entries) = dotpath::get(document, "plugins") else {
        return Vec::new();
    };
    let Some(entries) = entries.as_array() else {
        tracing::warn!(
            "plugins must be a list, found {}; ignoring it",
            describe(entries)
        );
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            JsonValue::String(name) => Some(PluginEntry::new(name.clone(), Settings::new())),
            JsonValue::Object(map) if map.len() == 1 => {
                let (name, settings) = map.iter().next()?;
                let settings = match settings {
                    JsonValue::Object(settings) => settings.clone(),
                    JsonValue::Null => Settings::new(),
                    other => {
                        tracing::warn!(
                            plugin = %name,
                            "Plugin settings must be a mapping, found {}; using none",
                            describe(other)
                        );
                        Settings::new()
                    }
                };
                Some(PluginEntry::new(name.clone(), settings))
            }
            other => {
                tracing::warn!(
                    "Plugin entries must be a single-key mapping, found {}; skipping it",
                    describe(other)
                );
                None
            }
        })
        .collect()
}

/// Loads and resolves the config document
#[derive(Debug)]
pub struct ConfigLoader {
    path: PathBuf,
    overrides: Vec<(String, JsonValue)>,
    resolver: VariableResolver,
}

impl ConfigLoader {
    /// Create a loader for `path` using `resolver` for variables
    pub fn new(path: impl Into<PathBuf>, resolver: VariableResolver) -> Self {
        Self {
            path: path.into(),
            overrides: Vec::new(),
            resolver,
        }
    }

    /// Add a `path=value` override; later overrides win over earlier ones
    #[must_use]
    pub fn with_override(mut self, path: impl Into<String>, value: JsonValue) -> Self {
        self.overrides.push((path.into(), value));
        self
    }

    /// Add several overrides
    #[must_use]
    pub fn with_overrides(
        mut self,
        overrides: impl IntoIterator<Item = (String, JsonValue)>,
    ) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Path of the config document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load, override and resolve the document
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigLoad`] if the document cannot be read or parsed,
    /// and [`Error::ResolutionCycle`] or [`Error::Secret`] from resolution.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<ResolvedConfig> {
        let mut raw = document::load(&self.path)?;
        self.resolve(&mut raw)
    }

    /// Like [`load`](Self::load), but a document that cannot be loaded is
    /// reported and replaced by an empty one (overrides still apply)
    pub fn load_or_default(&self) -> Result<ResolvedConfig> {
        match document::load(&self.path) {
            Ok(mut raw) => self.resolve(&mut raw),
            Err(e @ Error::ConfigLoad { .. }) => {
                tracing::warn!("{}; continuing with an empty config", e);
                let mut raw = JsonValue::Object(serde_json::Map::new());
                self.resolve(&mut raw)
            }
            Err(e) => Err(e),
        }
    }

    fn resolve(&self, raw: &mut JsonValue) -> Result<ResolvedConfig> {
        document::apply_overrides(raw, &self.overrides);
        let resolved = self.resolver.resolve_document(raw)?;
        tracing::debug!(
            lifecycle = dotpath::get(&resolved, "build.lifecycle").is_some(),
            "Config resolved"
        );
        Ok(ResolvedConfig::from_document(resolved))
    }
}

/// Resolve an in-memory document (no file, no overrides)
pub fn resolve_document(raw: &JsonValue, resolver: &VariableResolver) -> Result<ResolvedConfig> {
    let resolved = resolver.resolve_document(raw)?;
    if !resolved.is_object() {
        return Err(Error::Message(format!(
            "Config root must be a mapping, found {}",
            describe(&resolved)
        )));
    }
    Ok(ResolvedConfig::from_document(resolved))
}
