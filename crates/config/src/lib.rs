//! Configuration for stagecraft
//!
//! This crate handles:
//! - Config document discovery and parsing (YAML, TOML, JSON)
//! - `--set` overrides
//! - Variable resolution (`${self:...}`, `${env:...}`, `${secrets:...}`, ...)
//! - Typed access to lifecycle commands and plugin entries
//! - Logging initialization

pub mod config;
pub mod document;
pub mod dotpath;
pub mod logging;
pub mod resolver;
pub mod sources;

// Re-export error types from core
pub use stagecraft_core::{Error, Result};

// Re-export main types
pub use config::{ConfigLoader, LifecycleCommand, LifecycleCommands, PluginEntry, ResolvedConfig};
pub use document::{discover, parse_override};
pub use resolver::{Resolution, Resolve, ResolveOptions, ResolverRule, VariableResolver};
