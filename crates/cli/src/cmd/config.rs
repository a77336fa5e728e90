//! `stagecraft config`: print the resolved configuration

use anyhow::{Context, Result};
use clap::Args;

use crate::command::Command;
use crate::common::RuntimeContext;

/// Print the resolved configuration as JSON
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigCommand {
    /// Print a single value by dot-separated path
    #[arg(value_name = "PATH")]
    pub path: Option<String>,
}

impl Command for ConfigCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let value = match &self.path {
            Some(path) => context
                .config
                .get(path)
                .with_context(|| format!("No config value at '{path}'"))?,
            None => context.config.document(),
        };

        let json = serde_json::to_string_pretty(value).context("Failed to render config")?;
        println!("{json}");
        Ok(())
    }
}
