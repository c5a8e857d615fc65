//! Dotted path lookup against a single data record.

use serde::{Deserialize, Serialize};

use crate::error::PathError;
use crate::value::{DataRecord, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvalOptions {
    /// Missing or null intermediate values yield `default_value` instead of an error.
    pub safe_navigation: bool,
    pub default_value: Option<Value>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            safe_navigation: true,
            default_value: None,
        }
    }
}

impl EvalOptions {
    pub fn strict() -> Self {
        Self {
            safe_navigation: false,
            default_value: None,
        }
    }
}

/// Resolve `path` (e.g. `user.profile.name`, `users.0.name`) against `record`.
///
/// `Ok(None)` means the value is undefined. With safe navigation on, a missing
/// or non-traversable step resolves to `opts.default_value`; with it off the
/// offending segment is reported as a [`PathError`].
pub fn evaluate_path(
    path: &str,
    record: &DataRecord,
    opts: &EvalOptions,
) -> Result<Option<Value>, PathError> {
    let segments = split_path(path)?;
    let mut current = record;

    for segment in segments {
        let next = match current {
            Value::Object(map) => match map.get(segment) {
                Some(value) => value,
                None if opts.safe_navigation => return Ok(opts.default_value.clone()),
                None => {
                    return Err(PathError::MissingKey {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    });
                }
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(value) => value,
                None if opts.safe_navigation => return Ok(opts.default_value.clone()),
                None => {
                    return Err(PathError::IndexOutOfRange {
                        path: path.to_string(),
                        segment: segment.to_string(),
                        len: items.len(),
                    });
                }
            },
            _ if opts.safe_navigation => return Ok(opts.default_value.clone()),
            Value::Null => {
                return Err(PathError::NullSegment {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
            other => {
                return Err(PathError::NotTraversable {
                    path: path.to_string(),
                    segment: segment.to_string(),
                    found: other.type_name(),
                });
            }
        };
        current = next;
    }

    Ok(Some(current.clone()))
}

fn split_path(path: &str) -> Result<Vec<&str>, PathError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::EmptyPath);
    }
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(PathError::EmptySegment {
            path: path.to_string(),
        });
    }
    Ok(segments)
}

/// Check a path's syntax without evaluating it.
pub fn validate_path(path: &str) -> Result<(), PathError> {
    split_path(path).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Value {
        serde_json::from_str(
            r#"{
                "user": {"profile": {"name": "Ada", "age": 36}, "active": true, "manager": null},
                "users": [{"name": "Grace"}, {"name": "Linus"}],
                "count": 3
            }"#,
        )
        .expect("valid json")
    }

    #[test]
    fn reads_nested_fields() {
        let opts = EvalOptions::default();
        assert_eq!(
            evaluate_path("user.profile.name", &record(), &opts),
            Ok(Some(Value::from("Ada")))
        );
        assert_eq!(
            evaluate_path("user.profile.age", &record(), &opts),
            Ok(Some(Value::Number(36.0)))
        );
        assert_eq!(evaluate_path("count", &record(), &opts), Ok(Some(Value::Number(3.0))));
    }

    #[test]
    fn reads_array_indices() {
        let opts = EvalOptions::default();
        assert_eq!(
            evaluate_path("users.1.name", &record(), &opts),
            Ok(Some(Value::from("Linus")))
        );
    }

    #[test]
    fn returns_terminal_values_uncoerced() {
        let opts = EvalOptions::default();
        let users = evaluate_path("users", &record(), &opts).expect("path resolves");
        assert!(matches!(users, Some(Value::Array(ref items)) if items.len() == 2));
        assert_eq!(evaluate_path("user.manager", &record(), &opts), Ok(Some(Value::Null)));
    }

    #[test]
    fn empty_path_is_an_error() {
        let opts = EvalOptions::default();
        assert_eq!(evaluate_path("", &record(), &opts), Err(PathError::EmptyPath));
        assert_eq!(evaluate_path("   ", &record(), &opts), Err(PathError::EmptyPath));
        assert!(matches!(
            evaluate_path("user..name", &record(), &opts),
            Err(PathError::EmptySegment { .. })
        ));
    }

    #[test]
    fn safe_navigation_yields_default() {
        let opts = EvalOptions::default();
        assert_eq!(evaluate_path("user.address.city", &record(), &opts), Ok(None));
        assert_eq!(evaluate_path("user.manager.name", &record(), &opts), Ok(None));
        assert_eq!(evaluate_path("count.value", &record(), &opts), Ok(None));
        assert_eq!(evaluate_path("users.7.name", &record(), &opts), Ok(None));

        let with_default = EvalOptions {
            default_value: Some(Value::from("n/a")),
            ..EvalOptions::default()
        };
        assert_eq!(
            evaluate_path("user.address.city", &record(), &with_default),
            Ok(Some(Value::from("n/a")))
        );
    }

    #[test]
    fn strict_mode_reports_offending_segment() {
        let opts = EvalOptions::strict();

        let err = evaluate_path("user.address.city", &record(), &opts).unwrap_err();
        assert!(matches!(err, PathError::MissingKey { .. }));
        assert_eq!(err.segment(), Some("address"));

        let err = evaluate_path("user.manager.name", &record(), &opts).unwrap_err();
        assert!(matches!(err, PathError::NullSegment { .. }));
        assert_eq!(err.segment(), Some("name"));

        let err = evaluate_path("count.value", &record(), &opts).unwrap_err();
        assert!(matches!(err, PathError::NotTraversable { found: "number", .. }));

        let err = evaluate_path("users.7", &record(), &opts).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfRange { len: 2, .. }));
    }

    #[test]
    fn lookup_matches_plain_nested_access() {
        let record = record();
        let opts = EvalOptions::strict();
        let direct = record
            .get("user")
            .and_then(|u| u.get("profile"))
            .and_then(|p| p.get("name"))
            .cloned();
        assert_eq!(evaluate_path("user.profile.name", &record, &opts), Ok(direct));
    }
}
