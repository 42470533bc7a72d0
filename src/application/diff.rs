//! Structural comparison of two JSON documents.

use serde::Serialize;
use serde_json::{Map, Value};

/// Server-managed fields that always differ between two designs.
const VOLATILE_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Change {
    Added { path: String, value: Value },
    Removed { path: String, value: Value },
    Changed { path: String, from: Value, to: Value },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. } | Self::Removed { path, .. } | Self::Changed { path, .. } => {
                path
            }
        }
    }
}

/// Paths use `.key` for objects and `[i]` for arrays, rooted at `$`.
pub fn diff_values(left: &Value, right: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    walk("$", left, right, &mut changes);
    changes
}

pub fn diff_designs(left: &Value, right: &Value) -> Vec<Change> {
    diff_values(&strip_volatile(left), &strip_volatile(right))
}

fn strip_volatile(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !VOLATILE_FIELDS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn walk(path: &str, left: &Value, right: &Value, out: &mut Vec<Change>) {
    match (left, right) {
        (Value::Object(a), Value::Object(b)) => walk_objects(path, a, b, out),
        (Value::Array(a), Value::Array(b)) => {
            for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
                walk(&format!("{path}[{i}]"), x, y, out);
            }
            for (i, extra) in b.iter().enumerate().skip(a.len()) {
                out.push(Change::Added {
                    path: format!("{path}[{i}]"),
                    value: extra.clone(),
                });
            }
            for (i, missing) in a.iter().enumerate().skip(b.len()) {
                out.push(Change::Removed {
                    path: format!("{path}[{i}]"),
                    value: missing.clone(),
                });
            }
        }
        (a, b) if a == b => {}
        (a, b) => out.push(Change::Changed {
            path: path.to_string(),
            from: a.clone(),
            to: b.clone(),
        }),
    }
}

fn walk_objects(path: &str, a: &Map<String, Value>, b: &Map<String, Value>, out: &mut Vec<Change>) {
    for (key, left) in a {
        let child = format!("{path}.{key}");
        match b.get(key) {
            Some(right) => walk(&child, left, right, out),
            None => out.push(Change::Removed {
                path: child,
                value: left.clone(),
            }),
        }
    }
    for (key, right) in b {
        if !a.contains_key(key) {
            out.push(Change::Added {
                path: format!("{path}.{key}"),
                value: right.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn identical_documents_have_no_changes() {
        let doc = json!({ "name": "a", "pages": [{ "w": 1 }] });
        assert!(diff_values(&doc, &doc).is_empty());
    }

    #[test]
    fn nested_changes_are_reported_with_paths() {
        let left = json!({ "name": "Card", "size": { "w": 100, "h": 50 }, "tags": ["a", "b"] });
        let right = json!({ "name": "Card v2", "size": { "w": 100 }, "tags": ["a", "b", "c"], "theme": "dark" });

        let changes = diff_values(&left, &right);
        let paths: Vec<_> = changes.iter().map(Change::path).collect();
        assert_eq!(paths, vec!["$.name", "$.size.h", "$.tags[2]", "$.theme"]);
        assert_eq!(
            changes[0],
            Change::Changed {
                path: "$.name".into(),
                from: json!("Card"),
                to: json!("Card v2"),
            }
        );
        assert!(matches!(changes[1], Change::Removed { .. }));
    }

    #[test]
    fn design_diff_ignores_identity_and_timestamps() {
        let left = json!({ "id": "d1", "createdAt": "2024-01-01T00:00:00Z", "name": "x" });
        let right = json!({ "id": "d2", "updatedAt": "2024-02-01T00:00:00Z", "name": "x" });
        assert!(diff_designs(&left, &right).is_empty());
    }

    #[test]
    fn type_change_is_a_single_change() {
        let changes = diff_values(&json!({ "a": [1] }), &json!({ "a": { "0": 1 } }));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), "$.a");
    }
}
