//! Runtime context shared across CLI commands

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use stagecraft_config::config::resolve_document;
use stagecraft_config::{
    ConfigLoader, ResolveOptions, ResolvedConfig, VariableResolver, discover, document, sources,
};
use stagecraft_engine::{CommandRunner, PluginRegistry, ShellCommandRunner};
use stagecraft_vault::{CachedSecretProvider, EnvProvider, SecretProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::SecretsBackend;

/// Inputs for building a [`RuntimeContext`], taken from the command line
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Project root (defaults to the current directory)
    pub root: Option<PathBuf>,
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Active context for `${context:...}`
    pub context: Option<String>,
    /// `--opt key=value` flags
    pub opts: Vec<String>,
    /// `--set path=value` flags
    pub overrides: Vec<String>,
    /// Secret provider
    pub secrets: SecretsBackend,
    /// Value exported as `SITE`
    pub site_url: String,
}

/// Everything a command needs to run
pub struct RuntimeContext {
    root: PathBuf,
    config_path: Option<PathBuf>,
    /// Resolved configuration
    pub config: ResolvedConfig,
    /// Installed plugin modules
    pub registry: PluginRegistry,
    runner: Arc<dyn CommandRunner>,
}

impl RuntimeContext {
    /// Resolve the config and set up the command runner
    ///
    /// # Errors
    ///
    /// Returns an error for malformed `--opt`/`--set` flags, an unusable
    /// project root, or a fatal resolution error. A config file that cannot
    /// be loaded is reported and replaced by an empty config.
    pub fn new(options: &ContextOptions, registry: PluginRegistry) -> Result<Self> {
        let root = match &options.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let root = root
            .canonicalize()
            .with_context(|| format!("Project root {} does not exist", root.display()))?;

        let resolver = build_resolver(options)?;
        let overrides = options
            .overrides
            .iter()
            .map(|flag| document::parse_override(flag))
            .collect::<stagecraft_config::Result<Vec<_>>>()?;

        let config_path = options
            .config
            .as_ref()
            .map(|path| root.join(path))
            .or_else(|| discover(&root));

        let config = match &config_path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using config file");
                ConfigLoader::new(path, resolver)
                    .with_overrides(overrides)
                    .load_or_default()?
            }
            None => {
                tracing::info!(
                    "No config file found in {}, using an empty config",
                    root.display()
                );
                let mut raw = JsonValue::Object(serde_json::Map::new());
                document::apply_overrides(&mut raw, &overrides);
                resolve_document(&raw, &resolver)?
            }
        };

        let runner: Arc<dyn CommandRunner> = Arc::new(
            ShellCommandRunner::new(&root)
                .env("SITE", options.site_url.as_str())
                .env("STAGECRAFT_ROOT", root.to_string_lossy()),
        );

        Ok(Self {
            root,
            config_path,
            config,
            registry,
            runner,
        })
    }

    /// Assemble a context from parts (for embedding and tests)
    pub fn from_parts(
        root: impl Into<PathBuf>,
        config: ResolvedConfig,
        registry: PluginRegistry,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            root: root.into(),
            config_path: None,
            config,
            registry,
            runner,
        }
    }

    /// Project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Config file in use, if any
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Runner for lifecycle and plugin commands
    #[must_use]
    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        Arc::clone(&self.runner)
    }
}

fn build_resolver(options: &ContextOptions) -> Result<VariableResolver> {
    let mut resolve_options = ResolveOptions::new();
    if let Some(context) = &options.context {
        resolve_options = resolve_options.with_context(context.as_str());
    }
    for flag in &options.opts {
        let (key, value) = document::parse_override(flag)
            .with_context(|| format!("Invalid --opt '{flag}'"))?;
        resolve_options.set(key, value);
    }

    let provider: Arc<dyn SecretProvider> = match options.secrets {
        SecretsBackend::Env => Arc::new(EnvProvider::new()),
        SecretsBackend::Bws => Arc::new(CachedSecretProvider::new(
            stagecraft_vault::bws::BwsCli::new(),
        )),
    };
    if !provider.is_available() {
        tracing::warn!(
            "Secret provider '{}' is not available\n{}",
            provider.name(),
            provider.help()
        );
    }

    let rules = sources::defaults(provider);
    Ok(VariableResolver::new(resolve_options).rules(rules))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn options(root: &Path) -> ContextOptions {
        ContextOptions {
            root: Some(root.to_path_buf()),
            site_url: "https://site.com".to_string(),
            ..ContextOptions::default()
        }
    }

    #[test]
    fn test_discovers_config_and_applies_flags() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("stagecraft.yml"),
            "build:\n  lifecycle:\n    build: \"make ${opt:target}\"\n",
        )
        .unwrap();

        let mut opts = options(temp.path());
        opts.opts = vec!["target=release".to_string()];
        opts.overrides = vec!["build.lifecycle.prebuild=echo pre".to_string()];

        let context = RuntimeContext::new(&opts, PluginRegistry::new()).unwrap();
        assert_eq!(
            context.config.get("build.lifecycle.build"),
            Some(&json!("make release"))
        );
        assert_eq!(
            context.config.get("build.lifecycle.prebuild"),
            Some(&json!("echo pre"))
        );
        assert!(context.config_path().is_some());
    }

    #[test]
    fn test_without_config_file() {
        let temp = TempDir::new().unwrap();
        let context = RuntimeContext::new(&options(temp.path()), PluginRegistry::new()).unwrap();

        assert!(context.config_path().is_none());
        assert!(context.config.lifecycle().is_empty());
    }

    #[test]
    fn test_broken_config_falls_back_to_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("stagecraft.json"), "{ nope").unwrap();

        let context = RuntimeContext::new(&options(temp.path()), PluginRegistry::new()).unwrap();
        assert!(context.config.plugins().is_empty());
    }

    #[test]
    fn test_invalid_opt_flag() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(temp.path());
        opts.opts = vec!["missing-equals".to_string()];

        assert!(RuntimeContext::new(&opts, PluginRegistry::new()).is_err());
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp.path().join("absent"));
        assert!(RuntimeContext::new(&opts, PluginRegistry::new()).is_err());
    }
}
