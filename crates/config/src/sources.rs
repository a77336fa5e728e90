//! Built-in variable sources
//!
//! | token | value |
//! |---|---|
//! | `secrets:<key>` | secret from the configured [`SecretProvider`] |
//! | `context:<path>` | `${self:<value of context.<active>.<path>>}` |
//! | `env:<NAME>` | process environment variable |
//! | `opt:<name>` | resolver option (CLI `--opt`) |

use crate::dotpath;
use crate::resolver::{Resolution, Resolve, ResolveOptions, ResolverRule, to_template_string};
use regex::Regex;
use serde_json::Value as JsonValue;
use stagecraft_core::{Error, Result};
use stagecraft_vault::SecretProvider;
use std::sync::Arc;

fn prefix_pattern(prefix: &str) -> Regex {
    Regex::new(&format!("^{}:", regex::escape(prefix)))
        .expect("escaped prefix pattern should always compile")
}

/// Resolves `${secrets:<key>}` through a secret provider
pub struct SecretsSource {
    provider: Arc<dyn SecretProvider>,
}

impl SecretsSource {
    /// Create a source backed by `provider`
    pub fn new(provider: Arc<dyn SecretProvider>) -> Self {
        Self { provider }
    }
}

impl Resolve for SecretsSource {
    fn resolve(
        &self,
        token: &str,
        _options: &ResolveOptions,
        _root: &JsonValue,
    ) -> Result<Option<Resolution>> {
        let key = token.trim_start_matches("secrets:").trim();

        match self.provider.get(key) {
            Ok(value) => Ok(Some(Resolution::Literal(value))),
            Err(stagecraft_vault::Error::SecretNotFound(what)) => {
                tracing::warn!(
                    provider = %self.provider.name(),
                    key = %key,
                    "Secret not found ({}), using default",
                    what
                );
                Ok(None)
            }
            Err(e) => Err(Error::Secret(format!(
                "{} provider failed for '{}': {}",
                self.provider.name(),
                key,
                e
            ))),
        }
    }
}

/// `${secrets:...}` rule
pub fn secrets(provider: Arc<dyn SecretProvider>) -> ResolverRule {
    ResolverRule::new(
        "secrets",
        prefix_pattern("secrets"),
        SecretsSource::new(provider),
    )
}

/// Look up `context.<active>.<path>` and point a self-reference at it
///
/// The context entry holds another config path; the returned template makes
/// the resolver follow it on the next pass.
fn resolve_context(
    token: &str,
    options: &ResolveOptions,
    root: &JsonValue,
) -> Result<Option<Resolution>> {
    let path = token.trim_start_matches("context:").trim();
    let context_path = format!("context.{}.{}", options.context(), path);

    let target = match dotpath::get(root, &context_path) {
        Some(value) => to_template_string(value),
        None => {
            tracing::debug!(path = %context_path, "No contextual override");
            context_path
        }
    };

    Ok(Some(Resolution::Template(format!("${{self:{target}}}"))))
}

/// `${context:...}` rule
#[must_use]
pub fn context() -> ResolverRule {
    ResolverRule::new("context", prefix_pattern("context"), resolve_context)
}

fn resolve_env(
    token: &str,
    _options: &ResolveOptions,
    _root: &JsonValue,
) -> Result<Option<Resolution>> {
    let name = token.trim_start_matches("env:").trim();
    Ok(std::env::var(name).ok().map(Resolution::Literal))
}

/// `${env:...}` rule
#[must_use]
pub fn env() -> ResolverRule {
    ResolverRule::new("env", prefix_pattern("env"), resolve_env)
}

fn resolve_opt(
    token: &str,
    options: &ResolveOptions,
    _root: &JsonValue,
) -> Result<Option<Resolution>> {
    let name = token.trim_start_matches("opt:").trim();
    Ok(options
        .get(name)
        .filter(|value| !value.is_null())
        .map(|value| Resolution::Literal(to_template_string(value))))
}

/// `${opt:...}` rule
#[must_use]
pub fn opt() -> ResolverRule {
    ResolverRule::new("opt", prefix_pattern("opt"), resolve_opt)
}

/// All built-in rules in dispatch order
pub fn defaults(provider: Arc<dyn SecretProvider>) -> Vec<ResolverRule> {
    vec![secrets(provider), context(), env(), opt()]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::resolver::VariableResolver;
    use serde_json::json;
    use serial_test::serial;

    struct StaticProvider;

    impl SecretProvider for StaticProvider {
        fn name(&self) -> &'static str {
            "static"
        }

        fn get(&self, key: &str) -> stagecraft_vault::Result<String> {
            match key {
                "token" => Ok("remote enterprise secret".to_string()),
                "password" => Ok("pa${ss}word".to_string()),
                "offline" => Err(stagecraft_vault::Error::ProviderNotAvailable(
                    "store offline".to_string(),
                )),
                other => Err(stagecraft_vault::Error::SecretNotFound(other.to_string())),
            }
        }

        fn is_available(&self) -> bool {
            true
        }

        fn help(&self) -> &'static str {
            ""
        }
    }

    fn resolver(options: ResolveOptions) -> VariableResolver {
        VariableResolver::new(options).rules(defaults(Arc::new(StaticProvider)))
    }

    #[test]
    fn test_secrets_literal() {
        let resolved = resolver(ResolveOptions::new())
            .resolve_str("${secrets:token}", &json!({}))
            .unwrap();
        assert_eq!(resolved, json!("remote enterprise secret"));
    }

    #[test]
    fn test_secrets_value_is_literal() {
        let root = json!({"ss": "XX"});
        let resolver = resolver(ResolveOptions::new());

        assert_eq!(
            resolver.resolve_str("${secrets:password}", &root).unwrap(),
            json!("pa${ss}word")
        );
        assert_eq!(
            resolver.resolve_str("db:${secrets:password}", &root).unwrap(),
            json!("db:pa${ss}word")
        );
    }

    #[test]
    #[serial]
    fn test_env_value_is_literal() {
        temp_env::with_var("STAGECRAFT_TEST_RAW", Some("${ss}"), || {
            let resolved = resolver(ResolveOptions::new())
                .resolve_str("${env:STAGECRAFT_TEST_RAW}", &json!({"ss": "XX"}))
                .unwrap();
            assert_eq!(resolved, json!("${ss}"));
        });
    }

    #[test]
    fn test_secrets_missing_uses_fallback() {
        let resolved = resolver(ResolveOptions::new())
            .resolve_str("${secrets:unknown, 'none'}", &json!({}))
            .unwrap();
        assert_eq!(resolved, json!("none"));
    }

    #[test]
    fn test_secrets_provider_failure_is_an_error() {
        let err = resolver(ResolveOptions::new())
            .resolve_str("${secrets:offline}", &json!({}))
            .unwrap_err();
        assert!(matches!(err, Error::Secret(_)));
    }

    #[test]
    fn test_context_produces_self_reference() {
        let root = json!({
            "context": {"staging": {"foo": {"bar": "settings.stagingUrl"}}},
            "settings": {"stagingUrl": "https://staging.example.com"}
        });
        let options = ResolveOptions::new().with_context("staging");

        let first_pass = resolve_context("context:foo.bar", &options, &root).unwrap();
        assert_eq!(
            first_pass,
            Some(Resolution::Template("${self:settings.stagingUrl}".to_string()))
        );

        let resolved = resolver(options)
            .resolve_str("${context:foo.bar}", &root)
            .unwrap();
        assert_eq!(resolved, json!("https://staging.example.com"));
    }

    #[test]
    fn test_context_defaults_to_production() {
        let root = json!({
            "context": {
                "production": {"url": "urls.prod"},
                "staging": {"url": "urls.staging"}
            },
            "urls": {"prod": "https://example.com", "staging": "https://staging.example.com"}
        });

        let resolved = resolver(ResolveOptions::new())
            .resolve_str("${context:url}", &root)
            .unwrap();
        assert_eq!(resolved, json!("https://example.com"));
    }

    #[test]
    fn test_context_missing_resolves_to_default() {
        let resolved = resolver(ResolveOptions::new())
            .resolve_str("${context:nothing.here}", &json!({}))
            .unwrap();
        assert_eq!(resolved, JsonValue::Null);
    }

    #[test]
    #[serial]
    fn test_env_source() {
        temp_env::with_var("STAGECRAFT_TEST_BRANCH", Some("main"), || {
            let resolved = resolver(ResolveOptions::new())
                .resolve_str("branch-${env:STAGECRAFT_TEST_BRANCH}", &json!({}))
                .unwrap();
            assert_eq!(resolved, json!("branch-main"));
        });

        temp_env::with_var_unset("STAGECRAFT_TEST_BRANCH", || {
            let resolved = resolver(ResolveOptions::new())
                .resolve_str("${env:STAGECRAFT_TEST_BRANCH, 'dev'}", &json!({}))
                .unwrap();
            assert_eq!(resolved, json!("dev"));
        });
    }

    #[test]
    fn test_opt_source() {
        let mut options = ResolveOptions::new();
        options.set("stage", json!("beta"));

        let resolved = resolver(options)
            .resolve_str("deploy-${opt:stage}", &json!({}))
            .unwrap();
        assert_eq!(resolved, json!("deploy-beta"));
    }

    #[test]
    fn test_opt_inside_self_reference() {
        let mut options = ResolveOptions::new();
        options.set("target", json!("eu"));
        let root = json!({"regions": {"eu": "eu-west-1"}});

        let resolved = resolver(options)
            .resolve_str("${self:regions.${opt:target}}", &root)
            .unwrap();
        assert_eq!(resolved, json!("eu-west-1"));
    }

    #[test]
    fn test_prefix_pattern_is_anchored() {
        let rule = env();
        assert!(rule.matches("env:HOME"));
        assert!(!rule.matches("myenv:HOME"));
        assert!(!rule.matches("environment.name"));
    }
}
