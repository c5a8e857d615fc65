use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    String,
    Number,
    Boolean,
}

/// Convert `value` to `target`. Null and undefined pass through untouched.
pub fn coerce(value: Option<&Value>, target: TargetType) -> Option<Value> {
    let value = value?;
    if value.is_null() {
        return Some(Value::Null);
    }
    Some(match target {
        TargetType::String => Value::String(to_text(value)),
        TargetType::Number => Value::Number(to_number(value)),
        TargetType::Boolean => Value::Bool(to_bool(value)),
    })
}

pub fn to_text(value: &Value) -> String {
    value.to_string()
}

/// Numeric view of a value; anything unparseable is `0`.
pub fn to_number(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => *n,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    };
    if number.is_nan() { 0.0 } else { number }
}

pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => match s.trim() {
            "true" | "yes" | "1" => true,
            "false" | "no" | "0" => false,
            _ => !s.is_empty(),
        },
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Truthiness of a possibly undefined value.
pub fn is_truthy(value: Option<&Value>) -> bool {
    value.is_some_and(to_bool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_undefined_pass_through() {
        for target in [TargetType::String, TargetType::Number, TargetType::Boolean] {
            assert_eq!(coerce(None, target), None);
            assert_eq!(coerce(Some(&Value::Null), target), Some(Value::Null));
        }
    }

    #[test]
    fn coerces_to_number() {
        let num = |v: Value| coerce(Some(&v), TargetType::Number);
        assert_eq!(num(Value::Number(4.5)), Some(Value::Number(4.5)));
        assert_eq!(num(Value::from("42")), Some(Value::Number(42.0)));
        assert_eq!(num(Value::from(" 3.25 ")), Some(Value::Number(3.25)));
        assert_eq!(num(Value::from("abc")), Some(Value::Number(0.0)));
        assert_eq!(num(Value::from("NaN")), Some(Value::Number(0.0)));
        assert_eq!(num(Value::from("inf")), Some(Value::Number(0.0)));
        assert_eq!(num(Value::from("-Infinity")), Some(Value::Number(0.0)));
        assert_eq!(num(Value::Bool(true)), Some(Value::Number(1.0)));
        assert_eq!(num(Value::Bool(false)), Some(Value::Number(0.0)));
    }

    #[test]
    fn coerces_to_boolean() {
        let boolean = |v: Value| coerce(Some(&v), TargetType::Boolean);
        for truthy in ["true", "yes", "1", "anything"] {
            assert_eq!(boolean(Value::from(truthy)), Some(Value::Bool(true)), "{truthy}");
        }
        for falsy in ["false", "no", "0", ""] {
            assert_eq!(boolean(Value::from(falsy)), Some(Value::Bool(false)), "{falsy:?}");
        }
        assert_eq!(boolean(Value::Number(0.0)), Some(Value::Bool(false)));
        assert_eq!(boolean(Value::Number(-2.0)), Some(Value::Bool(true)));
        assert_eq!(boolean(Value::Bool(false)), Some(Value::Bool(false)));
    }

    #[test]
    fn coerces_to_string() {
        let text = |v: Value| coerce(Some(&v), TargetType::String);
        assert_eq!(text(Value::Number(7.0)), Some(Value::from("7")));
        assert_eq!(text(Value::Number(0.5)), Some(Value::from("0.5")));
        assert_eq!(text(Value::Bool(true)), Some(Value::from("true")));
        assert_eq!(text(Value::from("as-is")), Some(Value::from("as-is")));
    }

    #[test]
    fn truthiness_of_missing_values() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&Value::Null)));
        assert!(is_truthy(Some(&Value::Array(Vec::new()))));
    }
}
