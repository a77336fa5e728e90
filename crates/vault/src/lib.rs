//! Secret providers for config variables
//!
//! This crate provides a unified interface for looking up secrets referenced
//! from the build config as `${secrets:<key>}`. The concrete store is
//! pluggable: environment variables, Bitwarden Secrets Manager, or anything
//! implementing [`SecretProvider`].

use indexmap::IndexMap;
use std::sync::Mutex;
use thiserror::Error;

/// Result type for vault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for secret providers
#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub mod env;

// Bitwarden Secrets Manager (organization secrets)
// Provides BwsCli
#[cfg(feature = "bws")]
pub mod bws;

pub use env::EnvProvider;

/// Trait for secret providers
///
/// All secret store integrations should implement this trait.
pub trait SecretProvider: Send + Sync {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Look up a single secret by key
    ///
    /// Returns [`Error::SecretNotFound`] when the store has no such key.
    fn get(&self, key: &str) -> Result<String>;

    /// Check if the provider is available (CLI installed, etc.)
    fn is_available(&self) -> bool;

    /// Get help text for this provider
    fn help(&self) -> &str;
}

/// Secret provider that caches results
///
/// A config usually references the same secret from several places; each key
/// is fetched from the underlying store once per process.
pub struct CachedSecretProvider<P: SecretProvider> {
    provider: P,
    cache: Mutex<IndexMap<String, String>>,
}

impl<P: SecretProvider> CachedSecretProvider<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: Mutex::new(IndexMap::new()),
        }
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl<P: SecretProvider> SecretProvider for CachedSecretProvider<P> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn get(&self, key: &str) -> Result<String> {
        if let Ok(cache) = self.cache.lock()
            && let Some(cached) = cache.get(key)
        {
            tracing::trace!(provider = %self.provider.name(), key = %key, "Secret cache hit");
            return Ok(cached.clone());
        }

        tracing::debug!(provider = %self.provider.name(), key = %key, "Fetching secret");
        let value = self.provider.get(key)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key.to_string(), value.clone());
        }

        Ok(value)
    }

    fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    fn help(&self) -> &str {
        self.provider.help()
    }
}
