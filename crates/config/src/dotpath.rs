//! Dot-separated path lookup into config documents
//!
//! `a.b.c` walks one segment at a time. Array elements are addressed by
//! numeric segments (`plugins.0`).

use serde_json::Value as JsonValue;

/// Look up `path` inside `value`
///
/// Returns `None` when any segment is missing before the path is exhausted,
/// when the walk hits a scalar with segments left, or when the final value is
/// `null`. An empty path addresses nothing.
#[must_use]
pub fn get<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    if path.is_empty() {
        return None;
    }

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            JsonValue::Object(map) => map.get(segment)?,
            JsonValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    if current.is_null() { None } else { Some(current) }
}

/// Look up `path`, returning `default` when it does not resolve
#[must_use]
pub fn get_or(value: &JsonValue, path: &str, default: JsonValue) -> JsonValue {
    get(value, path).cloned().unwrap_or(default)
}

/// Set `path` inside `value`, creating intermediate mappings
///
/// Existing list elements are addressed by index. Other non-mapping values
/// found along the way are replaced by mappings.
pub fn set(value: &mut JsonValue, path: &str, new_value: JsonValue) {
    let mut current = value;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let index = match &*current {
            JsonValue::Array(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
            _ => None,
        };
        if let Some(index) = index {
            let JsonValue::Array(items) = current else {
                return;
            };
            if segments.peek().is_none() {
                items[index] = new_value;
                return;
            }
            current = &mut items[index];
            continue;
        }

        if !current.is_object() {
            *current = JsonValue::Object(serde_json::Map::new());
        }
        let JsonValue::Object(map) = current else {
            return;
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), new_value);
            return;
        }

        current = map
            .entry(segment.to_string())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_nested() {
        let doc = json!({"a": {"b": {"c": "deep"}}});
        assert_eq!(get(&doc, "a.b.c"), Some(&json!("deep")));
        assert_eq!(get(&doc, "a.b"), Some(&json!({"c": "deep"})));
    }

    #[test]
    fn test_get_path_exhausts_into_scalar() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(get(&doc, "a.b.c"), None);
        assert_eq!(get_or(&doc, "a.b.c", json!("fallback")), json!("fallback"));
    }

    #[test]
    fn test_get_missing_intermediate() {
        let doc = json!({"a": {}});
        assert_eq!(get(&doc, "a.x.y"), None);
    }

    #[test]
    fn test_get_null_is_missing() {
        let doc = json!({"a": null});
        assert_eq!(get(&doc, "a"), None);
    }

    #[test]
    fn test_get_array_index() {
        let doc = json!({"plugins": [{"one": {}}, {"two": {"x": 2}}]});
        assert_eq!(get(&doc, "plugins.1.two.x"), Some(&json!(2)));
        assert_eq!(get(&doc, "plugins.7"), None);
        assert_eq!(get(&doc, "plugins.first"), None);
    }

    #[test]
    fn test_get_empty_path() {
        let doc = json!({"": "weird"});
        assert_eq!(get(&doc, ""), None);
    }

    #[test]
    fn test_set_creates_intermediate_maps() {
        let mut doc = json!({});
        set(&mut doc, "build.lifecycle.build", json!("make"));
        assert_eq!(doc, json!({"build": {"lifecycle": {"build": "make"}}}));
    }

    #[test]
    fn test_set_overwrites_scalars() {
        let mut doc = json!({"build": "oops"});
        set(&mut doc, "build.command", json!("make"));
        assert_eq!(doc, json!({"build": {"command": "make"}}));
    }

    #[test]
    fn test_set_into_list_element() {
        let mut doc = json!({"plugins": [{"cache": {"enabled": true}}]});
        set(&mut doc, "plugins.0.cache.enabled", json!(false));
        assert_eq!(doc, json!({"plugins": [{"cache": {"enabled": false}}]}));
    }

    #[test]
    fn test_set_keeps_siblings() {
        let mut doc = json!({"build": {"publish": "dist", "command": "old"}});
        set(&mut doc, "build.command", json!("new"));
        assert_eq!(doc, json!({"build": {"publish": "dist", "command": "new"}}));
    }
}
