//! Stagecraft CLI library
//!
//! This library contains all the CLI logic for stagecraft, making it reusable
//! for testing and for embedding with additional installed plugins.

pub mod cmd;
pub mod command;
pub mod common;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use stagecraft_engine::PluginRegistry;
use std::path::PathBuf;

use command::Command;
use common::{ContextOptions, RuntimeContext};

/// Stagecraft - a build lifecycle orchestrator
#[derive(Parser)]
#[command(name = "stagecraft")]
#[command(about = "Run a project's build lifecycle")]
#[command(version)]
#[command(long_about = "Run a project's build lifecycle

Expands the fixed stages (init, configParse, getCache, install, build,
package, deploy, saveCache, manifest, finally) into pre/stage/post hooks,
runs the shell commands from build.lifecycle and the hooks contributed by
plugins, and prints the resulting build manifest.")]
pub struct Cli {
    /// Project root
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Path to the config file (relative to the project root)
    #[arg(long, env = "STAGECRAFT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Active context for ${context:...} variables
    #[arg(long, env = "STAGECRAFT_CONTEXT", value_name = "NAME")]
    pub context: Option<String>,

    /// Resolver option readable as ${opt:KEY} (repeatable)
    #[arg(long = "opt", value_name = "KEY=VALUE")]
    pub opts: Vec<String>,

    /// Override a config value before resolution (repeatable)
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub overrides: Vec<String>,

    /// Secret provider for ${secrets:...} variables
    #[arg(long, value_enum, default_value_t = SecretsBackend::Env)]
    pub secrets: SecretsBackend,

    /// Site URL exported to commands as SITE
    #[arg(long, env = "SITE", value_name = "URL", default_value = "https://site.com")]
    pub site_url: String,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to a file (useful for debugging)
    #[arg(long, env = "STAGECRAFT_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the stagecraft CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Run the build lifecycle
    Build(cmd::build::BuildCommand),

    /// Print the resolved configuration
    Config(cmd::config::ConfigCommand),
}

/// Where `${secrets:...}` values come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SecretsBackend {
    /// `STAGECRAFT_SECRET_<KEY>` environment variables
    #[default]
    Env,
    /// Bitwarden Secrets Manager CLI
    Bws,
}

impl Cli {
    fn context_options(&self) -> ContextOptions {
        ContextOptions {
            root: self.root.clone(),
            config: self.config.clone(),
            context: self.context.clone(),
            opts: self.opts.clone(),
            overrides: self.overrides.clone(),
            secrets: self.secrets,
            site_url: self.site_url.clone(),
        }
    }
}

/// Main entry point for the CLI logic
///
/// # Errors
///
/// Returns an error if logging cannot be initialized, the context cannot be
/// built, or the command fails.
pub fn run(cli: Cli) -> Result<()> {
    run_with_registry(cli, PluginRegistry::new())
}

/// Like [`run`], with installed plugin modules available by name
///
/// # Errors
///
/// See [`run`].
pub fn run_with_registry(cli: Cli, registry: PluginRegistry) -> Result<()> {
    stagecraft_config::logging::init(cli.verbose, cli.log_file.as_deref())?;

    let context = RuntimeContext::new(&cli.context_options(), registry)?;

    match &cli.command {
        Commands::Build(build_cmd) => {
            build_cmd.execute(&context)?;
        }
        Commands::Config(config_cmd) => {
            config_cmd.execute(&context)?;
        }
    }

    Ok(())
}
