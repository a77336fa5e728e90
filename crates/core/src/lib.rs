//! Core types for stagecraft
//!
//! This is the foundation crate that all other stagecraft crates depend on.
//! It provides:
//! - Base error types
//! - The fixed build lifecycle and its pre/post expansion
//! - Common type definitions for hook settings and the build manifest
//!
//! This crate has no dependencies on other stagecraft crates.

pub mod error;
pub mod lifecycle;

pub use error::{Error, Result};

/// Per-plugin settings passed to every hook of that plugin
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Accumulated result of a build, also returned by individual hooks
pub type Manifest = serde_json::Map<String, serde_json::Value>;
