//! Plugin resolution
//!
//! Maps a plugin name from the config to loaded code: names starting with
//! `.` are manifest plugins relative to the project root, everything else is
//! looked up in the [`PluginRegistry`].

use super::manifest;
use super::module::PluginModule;
use super::registry::PluginRegistry;
use crate::command::CommandRunner;
use stagecraft_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves plugin names to modules
pub struct PluginLoader {
    root: PathBuf,
    registry: PluginRegistry,
    runner: Arc<dyn CommandRunner>,
}

impl PluginLoader {
    /// Create a loader for the project at `root`
    ///
    /// `runner` executes the commands of manifest plugins.
    pub fn new(
        root: impl Into<PathBuf>,
        registry: PluginRegistry,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            root: root.into(),
            registry,
            runner,
        }
    }

    /// Project root local plugin paths are relative to
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Installed modules
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Whether `name` refers to a plugin inside the project
    #[must_use]
    pub fn is_local(name: &str) -> bool {
        name.starts_with('.')
    }

    /// Resolve `name` to its module
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginLoad`] when the plugin cannot be found or read.
    #[tracing::instrument(skip(self))]
    pub fn resolve(&self, name: &str) -> Result<PluginModule> {
        if Self::is_local(name) {
            let path = self.root.join(name);
            return manifest::load(name, &path, &self.runner);
        }

        self.registry.get(name).cloned().ok_or_else(|| Error::PluginLoad {
            name: name.to_string(),
            message: "not installed (no module registered under this name)".to_string(),
        })
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
