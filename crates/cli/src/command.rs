//! Command trait for the stagecraft CLI
//!
//! Every subcommand implements [`Command`] and receives the shared
//! [`RuntimeContext`] (project root, resolved config, command runner).

use crate::common::RuntimeContext;
use anyhow::Result;

/// Trait for all stagecraft commands
pub trait Command {
    /// The type returned by this command
    type Output;

    /// Execute the command with the given runtime context
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails. Lifecycle failures keep their
    /// [`stagecraft_core::Error`] so `main` can report them.
    fn execute(&self, context: &RuntimeContext) -> Result<Self::Output>;
}
