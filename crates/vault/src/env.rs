//! Environment variable secret provider
//!
//! Reads `${secrets:api.token}` from `STAGECRAFT_SECRET_API_TOKEN`: the key is
//! upper-cased and every character outside `[A-Z0-9]` becomes `_`.

use crate::{Error, Result, SecretProvider};

/// Default prefix for secret environment variables
pub const DEFAULT_PREFIX: &str = "STAGECRAFT_SECRET_";

/// Secret provider backed by process environment variables
#[derive(Debug, Clone)]
pub struct EnvProvider {
    prefix: String,
}

impl EnvProvider {
    /// Create a provider using [`DEFAULT_PREFIX`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Create a provider reading variables with a custom prefix
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable name for a secret key
    #[must_use]
    pub fn var_name(&self, key: &str) -> String {
        let suffix: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{suffix}", self.prefix)
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretProvider for EnvProvider {
    fn name(&self) -> &'static str {
        "env"
    }

    fn get(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::InvalidArguments("Secret key is empty".to_string()));
        }

        let var = self.var_name(key);
        tracing::trace!(var = %var, "Reading secret from environment");
        std::env::var(&var).map_err(|_| Error::SecretNotFound(var))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn help(&self) -> &'static str {
        "Environment secret provider\n\
         \n\
         Usage in config:\n\
         ${secrets:cdn.token}  reads  STAGECRAFT_SECRET_CDN_TOKEN"
    }
}
