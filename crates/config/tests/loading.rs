//! Loading and resolving config files from disk

#![allow(clippy::unwrap_used, clippy::panic)]

use serde_json::json;
use stagecraft_config::{
    ConfigLoader, Error, LifecycleCommand, ResolveOptions, VariableResolver, discover, sources,
};
use stagecraft_vault::EnvProvider;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn resolver(options: ResolveOptions) -> VariableResolver {
    VariableResolver::new(options).rules(sources::defaults(Arc::new(EnvProvider::new())))
}

#[test]
fn test_load_yaml_with_variables() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagecraft.yml");
    fs::write(
        &path,
        r#"
out: public
build:
  lifecycle:
    build: "hugo -d ${self:out}"
    install:
      - npm ci
plugins:
  - ./plugins/notify:
      channel: "${opt:channel, '#general'}"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path, resolver(ResolveOptions::new()))
        .load()
        .unwrap();

    assert_eq!(
        config.lifecycle()["build"],
        LifecycleCommand::Script("hugo -d public".to_string())
    );
    assert_eq!(
        config.lifecycle()["install"].commands(),
        vec!["npm ci".to_string()]
    );
    assert_eq!(config.plugins()[0].settings["channel"], json!("#general"));
}

#[test]
fn test_load_toml_with_context() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagecraft.toml");
    fs::write(
        &path,
        r#"
[urls]
prod = "https://example.com"
preview = "https://preview.example.com"

[context.production]
url = "urls.prod"

[context.deploy-preview]
url = "urls.preview"

[build.lifecycle]
postbuild = "curl ${context:url}"
"#,
    )
    .unwrap();

    let options = ResolveOptions::new().with_context("deploy-preview");
    let config = ConfigLoader::new(&path, resolver(options)).load().unwrap();

    assert_eq!(
        config.lifecycle()["postbuild"],
        LifecycleCommand::Script("curl https://preview.example.com".to_string())
    );
}

#[test]
fn test_overrides_are_resolved_too() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagecraft.json");
    fs::write(
        &path,
        r#"{"dir": "dist", "build": {"lifecycle": {"build": "make"}}}"#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path, resolver(ResolveOptions::new()))
        .with_override("build.lifecycle.build", json!("make OUT=${self:dir}"))
        .load()
        .unwrap();

    assert_eq!(
        config.lifecycle()["build"],
        LifecycleCommand::Script("make OUT=dist".to_string())
    );
}

#[test]
fn test_load_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let err = ConfigLoader::new(
        temp.path().join("stagecraft.yml"),
        resolver(ResolveOptions::new()),
    )
    .load()
    .unwrap_err();

    assert!(matches!(err, Error::ConfigLoad { .. }));
}

#[test]
fn test_load_or_default_recovers() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagecraft.yml");
    fs::write(&path, "build: [unclosed").unwrap();

    let config = ConfigLoader::new(&path, resolver(ResolveOptions::new()))
        .with_override("build.lifecycle.build", json!("echo fallback"))
        .load_or_default()
        .unwrap();

    assert!(config.plugins().is_empty());
    assert_eq!(config.lifecycle().len(), 1);
}

#[test]
fn test_cycle_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stagecraft.yml");
    fs::write(&path, "a: \"${self:b}\"\nb: \"${self:a}\"\n").unwrap();

    let err = ConfigLoader::new(&path, resolver(ResolveOptions::new()))
        .load()
        .unwrap_err();

    assert!(matches!(err, Error::ResolutionCycle { .. }));
}

#[test]
fn test_discover_then_load() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("stagecraft.yaml"), "build: {}\n").unwrap();

    let path = discover(temp.path()).unwrap();
    let config = ConfigLoader::new(path, resolver(ResolveOptions::new()))
        .load()
        .unwrap();
    assert!(config.lifecycle().is_empty());
}
