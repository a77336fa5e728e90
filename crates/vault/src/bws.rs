//! Bitwarden Secrets Manager integration
//!
//! Provides access to Bitwarden Secrets Manager for organization secrets.
//! A `${secrets:<uuid>}` variable resolves to the `value` field of the
//! secret with that id.

use crate::{Error, Result, SecretProvider};
use serde_json::Value as JsonValue;
use std::process::Command;

/// Bitwarden Secrets Manager CLI provider (`bws`)
pub struct BwsCli;

impl BwsCli {
    /// Create a new Bitwarden Secrets Manager CLI provider
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn check_access_token() -> Result<()> {
        if std::env::var("BWS_ACCESS_TOKEN").is_err() {
            return Err(Error::AuthenticationRequired(
                "BWS_ACCESS_TOKEN environment variable not set.\n\
                 Get your access token from Bitwarden Secrets Manager:\n\
                 1. Go to your organization's Secrets Manager\n\
                 2. Create a Machine Account\n\
                 3. Generate an access token\n\
                 4. Set it: export BWS_ACCESS_TOKEN='your-token'"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn execute(args: &[&str]) -> Result<JsonValue> {
        Self::check_access_token()?;

        let mut cmd_args: Vec<&str> = args.to_vec();
        cmd_args.push("--output");
        cmd_args.push("json");

        tracing::debug!(command = %args.first().copied().unwrap_or_default(), "Running bws");
        let output = Command::new("bws")
            .args(&cmd_args)
            .output()
            .map_err(Error::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(status = ?output.status.code(), "bws exited unsuccessfully");
            if stderr.contains("404") || stderr.to_lowercase().contains("not found") {
                return Err(Error::SecretNotFound(args.join(" ")));
            }
            return Err(Error::ExecutionFailed(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(Error::ParseError("Empty output".to_string()));
        }

        serde_json::from_str(&stdout).map_err(|e| Error::ParseError(e.to_string()))
    }
}

impl Default for BwsCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the secret value from a `bws secret get` response
fn secret_value(response: &JsonValue, key: &str) -> Result<String> {
    response
        .get("value")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::ParseError(format!("Secret '{key}' has no string 'value' field")))
}

impl SecretProvider for BwsCli {
    fn name(&self) -> &'static str {
        "bws"
    }

    fn get(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::InvalidArguments(
                "Secret id is required".to_string(),
            ));
        }

        let response = Self::execute(&["secret", "get", key])?;
        secret_value(&response, key)
    }

    fn is_available(&self) -> bool {
        Command::new("bws")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn help(&self) -> &'static str {
        "Bitwarden Secrets Manager CLI (bws)\n\
         \n\
         Requirements:\n\
         - Install: cargo install bws\n\
         - Set BWS_ACCESS_TOKEN environment variable\n\
         \n\
         Usage in config:\n\
         ${secrets:secret-uuid}"
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secret_value() {
        let response = json!({"id": "abc", "key": "DEPLOY_TOKEN", "value": "t0k3n"});
        assert_eq!(secret_value(&response, "abc").unwrap(), "t0k3n");
    }

    #[test]
    fn test_secret_value_missing_field() {
        let response = json!({"id": "abc"});
        assert!(matches!(
            secret_value(&response, "abc"),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_get_requires_access_token() {
        temp_env::with_var_unset("BWS_ACCESS_TOKEN", || {
            let provider = BwsCli::new();
            assert!(matches!(
                provider.get("abc"),
                Err(Error::AuthenticationRequired(_))
            ));
        });
    }

    #[test]
    fn test_get_empty_key() {
        assert!(matches!(
            BwsCli::new().get(""),
            Err(Error::InvalidArguments(_))
        ));
    }
}
