//! Lifecycle hooks
//!
//! Hooks come from two places: `build.lifecycle` shell commands in the
//! config, and plugins. Both end up as [`HookRecord`]s in one ordered
//! [`InstructionList`] that the [`Engine`] runs strictly in sequence.
//!
//! ## Module Organization
//!
//! - `record`: hook records and the lifecycle hook table
//! - `assembler`: pre/post expansion and instruction list assembly
//! - `executor`: sequential execution with result accumulation

pub mod assembler;
pub mod executor;
pub mod record;

// Re-export main types for convenience
pub use assembler::{InstructionList, LifecycleAssembler, config_command};
pub use executor::{Engine, EngineState, NoOpReporter, ProgressReporter};
pub use record::{CONFIG_SOURCE_NAME, HookFn, HookRecord, HookSource, LifecycleHookTable, hook_fn};
