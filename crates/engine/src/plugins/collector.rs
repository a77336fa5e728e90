//! Plugin hook collection
//!
//! Turns the `plugins` list of the resolved config into a
//! [`LifecycleHookTable`]: disabled plugins are dropped, unresolvable ones are
//! reported and skipped, and every hook of the remaining plugins becomes a
//! [`HookRecord`] in plugin order, then key order within a plugin.

use super::loader::PluginLoader;
use crate::hooks::{HookRecord, LifecycleHookTable};
use stagecraft_config::PluginEntry;
use stagecraft_core::Result;

/// Collect hook records for `plugins`
///
/// # Errors
///
/// Returns [`stagecraft_core::Error::MalformedPlugin`] when a plugin is
/// neither a mapping nor a factory, and any error raised by a factory. Load
/// failures of individual plugins are logged and skipped.
#[tracing::instrument(skip_all, fields(plugins = plugins.len()))]
pub fn collect(loader: &PluginLoader, plugins: &[PluginEntry]) -> Result<LifecycleHookTable> {
    let mut table = LifecycleHookTable::new();

    for entry in plugins {
        if !entry.is_enabled() {
            tracing::debug!(plugin = %entry.name, "Plugin disabled, skipping");
            continue;
        }

        let module = match loader.resolve(&entry.name) {
            Ok(module) => module,
            Err(e) if !e.is_fatal() => {
                tracing::warn!("{}", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let hooks = module.instantiate(&entry.name, &entry.settings)?;
        tracing::debug!(
            plugin = %entry.name,
            kind = module.kind(),
            hooks = hooks.len(),
            "Plugin loaded"
        );

        for (hook, method) in hooks {
            table.entry(hook.clone()).or_default().push(HookRecord::plugin(
                entry.name.clone(),
                hook,
                entry.settings.clone(),
                method,
            ));
        }
    }

    Ok(table)
}
