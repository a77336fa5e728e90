//! Raw config document loading
//!
//! Config files are YAML, TOML or JSON (chosen by extension) and are all
//! normalised into a `serde_json::Value` tree before variable resolution.

use crate::dotpath;
use serde_json::Value as JsonValue;
use stagecraft_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File names probed in the project root, in order
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "stagecraft.yml",
    "stagecraft.yaml",
    "stagecraft.toml",
    "stagecraft.json",
];

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yml` / `.yaml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl Format {
    /// Detect the format from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match ext.as_str() {
            "yml" | "yaml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Find the config file in `root`
#[must_use]
pub fn discover(root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Read and parse a config document
///
/// Any failure is reported as [`Error::ConfigLoad`]. An empty document
/// loads as an empty mapping.
pub fn load(path: &Path) -> Result<JsonValue> {
    let format = Format::from_path(path).ok_or_else(|| Error::ConfigLoad {
        path: path.to_path_buf(),
        message: "unsupported file extension (expected .yml, .yaml, .toml or .json)".to_string(),
    })?;

    let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    parse(&content, format).map_err(|message| Error::ConfigLoad {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse document text in the given format
///
/// The root must be a mapping; an empty document parses as an empty mapping.
pub fn parse(content: &str, format: Format) -> std::result::Result<JsonValue, String> {
    match parse_value(content, format)? {
        JsonValue::Null => Ok(JsonValue::Object(serde_json::Map::new())),
        value @ JsonValue::Object(_) => Ok(value),
        other => Err(format!(
            "Config root must be a mapping, found {}",
            describe(&other)
        )),
    }
}

/// Parse document text without constraining the root value
pub fn parse_value(content: &str, format: Format) -> std::result::Result<JsonValue, String> {
    let value = match format {
        Format::Yaml => serde_yaml::from_str::<JsonValue>(content)
            .map_err(|e| format!("Invalid YAML: {e}"))?,
        Format::Toml => {
            let value: toml::Value =
                toml::from_str(content).map_err(|e| format!("Invalid TOML: {e}"))?;
            serde_json::to_value(value)
                .map_err(|e| format!("Failed to convert TOML to JSON: {e}"))?
        }
        Format::Json => {
            serde_json::from_str::<JsonValue>(content).map_err(|e| format!("Invalid JSON: {e}"))?
        }
    };

    Ok(value)
}

/// Parse a `path=value` override flag
///
/// The value is read as JSON when it parses (`true`, `3`, `["a"]`), and as a
/// plain string otherwise.
pub fn parse_override(flag: &str) -> Result<(String, JsonValue)> {
    let (path, raw) = flag.split_once('=').ok_or_else(|| {
        Error::Message(format!("Invalid override '{flag}': expected PATH=VALUE"))
    })?;

    let path = path.trim();
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(Error::Message(format!(
            "Invalid override '{flag}': empty path segment"
        )));
    }

    let value = serde_json::from_str::<JsonValue>(raw)
        .unwrap_or_else(|_| JsonValue::String(raw.to_string()));
    Ok((path.to_string(), value))
}

/// Write overrides into the document; overrides win over existing values
pub fn apply_overrides(document: &mut JsonValue, overrides: &[(String, JsonValue)]) {
    for (path, value) in overrides {
        tracing::debug!(path = %path, "Applying config override");
        dotpath::set(document, path, value.clone());
    }
}

/// Short human description of a value's kind
#[must_use]
pub fn describe(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.YAML")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.toml")), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("a.ini")), None);
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_yaml() {
        let doc = parse(
            "build:\n  lifecycle:\n    build: echo hi\nplugins:\n  - ./plugin: {}\n",
            Format::Yaml,
        )
        .unwrap();

        assert_eq!(doc["build"]["lifecycle"]["build"], json!("echo hi"));
        assert_eq!(doc["plugins"][0], json!({"./plugin": {}}));
    }

    #[test]
    fn test_parse_toml() {
        let doc = parse("[build.lifecycle]\ninstall = [\"npm ci\"]\n", Format::Toml).unwrap();
        assert_eq!(doc["build"]["lifecycle"]["install"], json!(["npm ci"]));
    }

    #[test]
    fn test_parse_empty_yaml() {
        assert_eq!(parse("", Format::Yaml).unwrap(), json!({}));
    }

    #[test]
    fn test_parse_rejects_scalar_root() {
        let err = parse("\"just a string\"", Format::Json).unwrap_err();
        assert!(err.contains("must be a mapping"));
    }

    #[test]
    fn test_parse_value_keeps_scalar_root() {
        assert_eq!(
            parse_value("just a string", Format::Yaml).unwrap(),
            json!("just a string")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load(&temp.path().join("stagecraft.yml")).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad { .. }));
    }

    #[test]
    fn test_load_invalid_syntax() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stagecraft.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad { .. }));
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn test_discover_order() {
        let temp = TempDir::new().unwrap();
        assert_eq!(discover(temp.path()), None);

        fs::write(temp.path().join("stagecraft.toml"), "").unwrap();
        fs::write(temp.path().join("stagecraft.yml"), "").unwrap();
        assert_eq!(
            discover(temp.path()),
            Some(temp.path().join("stagecraft.yml"))
        );
    }

    #[test]
    fn test_parse_override_values() {
        assert_eq!(
            parse_override("build.publish=dist").unwrap(),
            ("build.publish".to_string(), json!("dist"))
        );
        assert_eq!(
            parse_override("plugins.0.foo.enabled=false").unwrap().1,
            json!(false)
        );
        assert_eq!(parse_override("retries=3").unwrap().1, json!(3));
        assert_eq!(
            parse_override("cmd=echo a=b").unwrap(),
            ("cmd".to_string(), json!("echo a=b"))
        );
    }

    #[test]
    fn test_parse_override_invalid() {
        assert!(parse_override("no-equals").is_err());
        assert!(parse_override("=value").is_err());
        assert!(parse_override("a..b=value").is_err());
    }

    #[test]
    fn test_apply_overrides_wins() {
        let mut doc = json!({"build": {"lifecycle": {"build": "npm run build"}}});
        apply_overrides(
            &mut doc,
            &[("build.lifecycle.build".to_string(), json!("make"))],
        );
        assert_eq!(doc["build"]["lifecycle"]["build"], json!("make"));
    }
}
