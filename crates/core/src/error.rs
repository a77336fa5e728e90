//! Base error types for stagecraft
//!
//! This module provides the error taxonomy shared by every crate in the
//! workspace. Recoverable variants (`ConfigLoad`, `PluginLoad`) are handled by
//! the caller; the others abort the run.

use std::path::PathBuf;
use thiserror::Error;

/// Base error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration document could not be read or parsed
    #[error("Failed to load config {}: {message}", path.display())]
    ConfigLoad {
        /// Path of the configuration document
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Plugin code could not be resolved or imported
    #[error("Failed to load plugin '{name}': {message}")]
    PluginLoad {
        /// Plugin name as declared in the config
        name: String,
        /// What went wrong
        message: String,
    },

    /// Plugin resolved to something that is neither a hook mapping nor a factory
    #[error("Plugin {name} is malformed. Must be object or function (found {found})")]
    MalformedPlugin {
        /// Plugin name as declared in the config
        name: String,
        /// Description of what was found instead
        found: String,
    },

    /// Variable indirection did not reach a fixed point
    #[error("Variable resolution did not terminate after {passes} passes: {template}")]
    ResolutionCycle {
        /// Template that was being resolved
        template: String,
        /// Number of passes attempted
        passes: usize,
    },

    /// Secret lookup failed
    #[error("Secret lookup failed: {0}")]
    Secret(String),

    /// A `build.lifecycle` shell command failed
    #[error("Error from config build.lifecycle.{stage} hook from command: \"{command}\"")]
    CommandExecution {
        /// Expanded lifecycle name (e.g. `predeploy`)
        stage: String,
        /// Original command text from the config
        command: String,
        /// Captured output of the failing command
        output: String,
    },

    /// A hook method failed
    #[error("Hook '{hook}' from '{name}' failed: {message}")]
    HookExecution {
        /// Name of the plugin (or `config`) owning the hook
        name: String,
        /// Lifecycle name the hook is bound to
        hook: String,
        /// Error reported by the hook
        message: String,
    },

    /// Generic error message
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Whether the error aborts the whole run
    ///
    /// Loading errors for the config document and for individual plugins
    /// degrade to "contributes nothing"; everything else is fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ConfigLoad { .. } | Self::PluginLoad { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
