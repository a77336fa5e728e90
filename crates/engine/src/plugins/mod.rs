//! Plugin system
//!
//! ## Module Organization
//!
//! - `module`: loaded plugin code (factory, mapping, or something malformed)
//! - `registry`: installed modules available by name
//! - `manifest`: local plugins described by a command manifest
//! - `loader`: name to module resolution
//! - `collector`: builds the lifecycle hook table from the config's plugin list

pub mod collector;
pub mod loader;
pub mod manifest;
pub mod module;
pub mod registry;

pub use collector::collect;
pub use loader::PluginLoader;
pub use module::{FactoryFn, HookMap, PluginModule};
pub use registry::PluginRegistry;
