//! Local manifest plugins
//!
//! A plugin name starting with `.` points at a file (or a directory holding
//! `plugin.toml`, `plugin.yml`, `plugin.yaml` or `plugin.json`) relative to
//! the project root. A mapping document is a direct plugin whose values are
//! shell command(s):
//!
//! ```yaml
//! onPostBuild: ./scripts/compress.sh
//! onSuccess:
//!   - echo "deployed"
//!   - ./scripts/notify.sh
//! ```
//!
//! Each hook exports the plugin settings as JSON in
//! `STAGECRAFT_PLUGIN_SETTINGS`. If a command prints a JSON object, the last
//! such object becomes the hook's return value. Entries that are not commands
//! are kept without a callable and skipped when the lifecycle runs.

use super::module::{HookMap, PluginModule};
use crate::command::CommandRunner;
use crate::hooks::hook_fn;
use serde_json::Value as JsonValue;
use stagecraft_config::LifecycleCommand;
use stagecraft_config::document::{self, Format, describe};
use stagecraft_core::{Error, Manifest, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Manifest file names probed inside a plugin directory, in order
pub const MANIFEST_FILE_NAMES: [&str; 4] =
    ["plugin.toml", "plugin.yml", "plugin.yaml", "plugin.json"];

/// Environment variable carrying the plugin settings
pub const SETTINGS_ENV: &str = "STAGECRAFT_PLUGIN_SETTINGS";

/// Find the manifest file for `path`
#[must_use]
pub fn locate(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    if path.is_dir() {
        return MANIFEST_FILE_NAMES
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.is_file());
    }
    None
}

/// Load the manifest plugin `name` found at `path`
///
/// # Errors
///
/// Returns [`Error::PluginLoad`] when the manifest cannot be found, read or
/// parsed.
pub fn load(name: &str, path: &Path, runner: &Arc<dyn CommandRunner>) -> Result<PluginModule> {
    let load_error = |message: String| Error::PluginLoad {
        name: name.to_string(),
        message,
    };

    let manifest_path = locate(path)
        .ok_or_else(|| load_error(format!("no plugin found at {}", path.display())))?;
    let format = Format::from_path(&manifest_path).ok_or_else(|| {
        load_error(format!(
            "unsupported plugin file {} (expected .toml, .yml, .yaml or .json)",
            manifest_path.display()
        ))
    })?;
    let content = fs::read_to_string(&manifest_path)
        .map_err(|e| load_error(format!("{}: {e}", manifest_path.display())))?;
    let value = document::parse_value(&content, format).map_err(load_error)?;

    tracing::debug!(plugin = %name, path = %manifest_path.display(), "Loaded plugin manifest");

    let entries = match value {
        JsonValue::Object(entries) => entries,
        other => return Ok(PluginModule::Other(describe(&other).to_string())),
    };

    let mut hooks = HookMap::new();
    for (hook, entry) in entries {
        let method = match serde_json::from_value::<LifecycleCommand>(entry.clone()) {
            Ok(command) => Some(command_hook(name, &hook, &command, runner)),
            Err(_) => {
                tracing::warn!(
                    plugin = %name,
                    hook = %hook,
                    "Plugin entry is a {}, not a command; it will be skipped",
                    describe(&entry)
                );
                None
            }
        };
        hooks.insert(hook, method);
    }

    Ok(PluginModule::Mapping(hooks))
}

fn command_hook(
    plugin: &str,
    hook: &str,
    command: &LifecycleCommand,
    runner: &Arc<dyn CommandRunner>,
) -> crate::hooks::HookFn {
    let plugin = plugin.to_string();
    let hook = hook.to_string();
    let commands = command.commands();
    let runner = Arc::clone(runner);

    hook_fn(move |settings| {
        let settings_json = serde_json::to_string(settings)
            .map_err(|e| Error::Message(format!("Failed to encode plugin settings: {e}")))?;
        let env = [(SETTINGS_ENV, settings_json.as_str())];

        let mut result: Option<Manifest> = None;
        for command in &commands {
            tracing::debug!(
                plugin = %plugin,
                hook = %hook,
                command = %command,
                "Running plugin command"
            );
            let output = runner
                .run(command, &env)
                .map_err(|e| Error::Message(format!("{e}\n{}", e.output().trim_end())))?;
            if let Some(values) = parse_output(&output) {
                result = Some(values);
            }
        }
        Ok(result)
    })
}

/// Interpret command output as hook return values
///
/// The whole output is tried first, then its last non-empty line, so a
/// command may log freely as long as it ends with the JSON object.
fn parse_output(output: &str) -> Option<Manifest> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(JsonValue::Object(values)) = serde_json::from_str(trimmed) {
        return Some(values);
    }
    let last = trimmed.lines().rev().find(|line| !line.trim().is_empty())?;
    match serde_json::from_str(last.trim()) {
        Ok(JsonValue::Object(values)) => Some(values),
        _ => None,
    }
}
