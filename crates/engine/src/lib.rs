//! # Stagecraft Lifecycle Engine
//!
//! Turns a resolved configuration into an ordered list of hooks and runs it.
//!
//! - **Commands**: shell execution collaborator with output capture
//! - **Plugins**: module registry, local manifest plugins, hook collection
//! - **Hooks**: hook records, lifecycle assembly and the execution engine

pub mod command;
pub mod hooks;
pub mod plugins;

use stagecraft_config::ResolvedConfig;
use std::sync::Arc;

// Re-export error types from core
pub use stagecraft_core::{Error, Manifest, Result, Settings};

// Re-export commonly used types
pub use command::{CommandError, CommandRunner, ShellCommandRunner};
pub use hooks::{Engine, EngineState, HookRecord, InstructionList, LifecycleAssembler};
pub use plugins::{PluginLoader, PluginModule, PluginRegistry};

/// Collect plugin hooks for `config` and assemble the instruction list
///
/// # Errors
///
/// Returns [`Error::MalformedPlugin`] (or a factory error) before anything
/// runs.
pub fn plan(
    config: &ResolvedConfig,
    loader: &PluginLoader,
    runner: Arc<dyn CommandRunner>,
) -> Result<InstructionList> {
    let table = plugins::collect(loader, config.plugins())?;
    let assembler = LifecycleAssembler::new(config.lifecycle(), &table, runner);
    Ok(assembler.assemble())
}
