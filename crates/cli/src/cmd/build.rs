//! `stagecraft build`: run (or list) the lifecycle

use anyhow::Result;
use clap::Args;
use stagecraft_engine::{Engine, Manifest, PluginLoader, plan};

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::output;

/// Run the build lifecycle
#[derive(Debug, Clone, Default, Args)]
pub struct BuildCommand {
    /// List the hooks that would run, without running them
    #[arg(long)]
    pub dry_run: bool,
}

impl Command for BuildCommand {
    /// Final manifest (empty for a dry run)
    type Output = Manifest;

    fn execute(&self, context: &RuntimeContext) -> Result<Manifest> {
        let names: Vec<&str> = context
            .config
            .plugins()
            .iter()
            .filter(|entry| entry.is_enabled())
            .map(|entry| entry.name.as_str())
            .collect();
        output::print_loading_plugins(&names);

        let loader = PluginLoader::new(context.root(), context.registry.clone(), context.runner());
        let instructions = plan(&context.config, &loader, context.runner())?;

        if self.dry_run {
            output::print_plan(&instructions);
            return Ok(Manifest::new());
        }

        let mut engine = Engine::new(instructions).reporter(output::print_hook_started);
        let manifest = engine.run()?;

        output::print_build_complete(&manifest);
        Ok(manifest)
    }
}
