//! `${path}` substitution in blueprint text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PathError;
use crate::eval::{EvalOptions, evaluate_path};
use crate::value::{DataRecord, Value};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").unwrap());
static WHOLE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\{([^}]*)\}$").unwrap());

/// Substitute every `${path}` in `template`. Failed lookups become empty text.
pub fn expand_expression(template: &str, record: &DataRecord, opts: &EvalOptions) -> String {
    substitute(template, |path| Ok(evaluate_path(path, record, opts).ok().flatten().and_then(text_of)))
        .unwrap_or_default()
}

/// Like [`expand_expression`], but the first failed lookup is returned as an error.
pub fn try_expand_expression(
    template: &str,
    record: &DataRecord,
    opts: &EvalOptions,
) -> Result<String, PathError> {
    substitute(template, |path| {
        evaluate_path(path, record, opts).map(|value| value.and_then(text_of))
    })
}

// Null substitutes as empty text, like a missing value.
fn text_of(value: Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_string())
}

/// Expand `template` keeping the raw value when it is a single `${path}` token.
///
/// `"${weight}"` over `{weight: 2}` gives `Number(2)`; `"w=${weight}"` gives
/// `String("w=2")`. Failed lookups give `None` for a single token.
pub fn expand_expression_value(
    template: &str,
    record: &DataRecord,
    opts: &EvalOptions,
) -> Option<Value> {
    match whole_token(template) {
        Some(path) => evaluate_path(path, record, opts).ok().flatten(),
        None => Some(Value::String(expand_expression(template, record, opts))),
    }
}

pub fn try_expand_expression_value(
    template: &str,
    record: &DataRecord,
    opts: &EvalOptions,
) -> Result<Option<Value>, PathError> {
    match whole_token(template) {
        Some(path) => evaluate_path(path, record, opts),
        None => try_expand_expression(template, record, opts).map(|s| Some(Value::String(s))),
    }
}

/// The trimmed path when `template` is exactly one `${path}` token.
pub fn whole_token(template: &str) -> Option<&str> {
    WHOLE_TOKEN_RE
        .captures(template)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Paths referenced by `template`, in order of appearance.
pub fn template_paths(template: &str) -> Vec<&str> {
    TOKEN_RE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .collect()
}

fn substitute<F>(template: &str, mut lookup: F) -> Result<String, PathError>
where
    F: FnMut(&str) -> Result<Option<String>, PathError>,
{
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in TOKEN_RE.captures_iter(template) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        if let Some(text) = lookup(path.as_str().trim())? {
            out.push_str(&text);
        }
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Value {
        serde_json::from_str(
            r#"{"name": "Ada", "weight": 2, "active": true, "meta": {"team": "core"}, "tags": ["a", "b"]}"#,
        )
        .expect("valid json")
    }

    #[test]
    fn substitutes_tokens_and_keeps_literal_text() {
        let opts = EvalOptions::default();
        assert_eq!(
            expand_expression("${name} (${ meta.team })", &record(), &opts),
            "Ada (core)"
        );
        assert_eq!(expand_expression("plain text", &record(), &opts), "plain text");
        assert_eq!(expand_expression("w=${weight}", &record(), &opts), "w=2");
    }

    #[test]
    fn missing_lookups_become_empty_text() {
        let opts = EvalOptions::default();
        assert_eq!(expand_expression("[${missing.deep}]", &record(), &opts), "[]");
        assert_eq!(expand_expression("a${}b", &record(), &opts), "ab");
        let with_null: Value = serde_json::from_str(r#"{"boss": null}"#).expect("valid json");
        assert_eq!(expand_expression("<${boss}>", &with_null, &opts), "<>");
        assert_eq!(expand_expression("x ${nope} y", &record(), &EvalOptions::strict()), "x  y");
    }

    #[test]
    fn strict_expansion_reports_failures() {
        let err = try_expand_expression("x ${nope} y", &record(), &EvalOptions::strict());
        assert!(matches!(err, Err(PathError::MissingKey { .. })));
        assert_eq!(
            try_expand_expression("${name}", &record(), &EvalOptions::strict()),
            Ok("Ada".to_string())
        );
    }

    #[test]
    fn single_token_keeps_raw_value() {
        let opts = EvalOptions::default();
        assert_eq!(
            expand_expression_value("${weight}", &record(), &opts),
            Some(Value::Number(2.0))
        );
        assert_eq!(
            expand_expression_value("${ active }", &record(), &opts),
            Some(Value::Bool(true))
        );
        assert!(matches!(
            expand_expression_value("${meta}", &record(), &opts),
            Some(Value::Object(_))
        ));
        assert_eq!(
            expand_expression_value("${weight}px", &record(), &opts),
            Some(Value::from("2px"))
        );
        assert_eq!(expand_expression_value("${missing}", &record(), &opts), None);
    }

    #[test]
    fn lists_referenced_paths() {
        assert_eq!(template_paths("${a.b} and ${ c }"), vec!["a.b", "c"]);
        assert!(template_paths("none").is_empty());
        assert_eq!(whole_token(" ${a}"), None);
        assert_eq!(whole_token("${ a }"), Some("a"));
    }

    #[test]
    fn stringifies_arrays_as_json() {
        let opts = EvalOptions::default();
        assert_eq!(expand_expression("${tags}", &record(), &opts), r#"["a","b"]"#);
    }
}
