//! Built-in leaf rules.
//!
//! Every rule except [`required`] accepts falsy values (`null`, `""`) so that
//! optional fields only have to satisfy their format when filled in.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::schema::Rule;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// `null` and the empty string. Absent values are passed to rules as `null`.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Numeric view of a value: numbers, or strings holding a number.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Length of a string (in chars) or an array.
fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Fails on absent/`null` values, whitespace-only strings and empty arrays.
/// `0` and `false` are considered filled in.
pub fn required() -> Rule {
    Rule::new("Field must not be empty", |value| match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    })
}

pub fn number() -> Rule {
    Rule::new("Value must be a number", |value| {
        is_falsy(value) || as_number(value).is_some()
    })
}

pub fn integer() -> Rule {
    Rule::new("Value must be an integer", |value| {
        if is_falsy(value) {
            return true;
        }
        match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Value::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        }
    })
}

pub fn email() -> Rule {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"));
    Rule::new("Value must be a valid email", move |value| {
        is_falsy(value) || value.as_str().is_some_and(|s| re.is_match(s))
    })
}

pub fn url() -> Rule {
    Rule::new("Value must be a valid URL", |value| {
        is_falsy(value)
            || value
                .as_str()
                .and_then(|s| Url::parse(s).ok())
                .is_some_and(|u| u.has_host())
    })
}

/// ISO calendar date (`YYYY-MM-DD`).
pub fn date() -> Rule {
    Rule::new("Value must be a valid date", |value| {
        is_falsy(value)
            || value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok())
    })
}

/// String values must match `pattern`.
pub fn pattern(pattern: &str) -> Result<Rule, regex::Error> {
    let re = Regex::new(pattern)?;
    let message = format!("Value must match the pattern {pattern}");
    Ok(Rule::new(message, move |value| {
        is_falsy(value) || value.as_str().is_some_and(|s| re.is_match(s))
    }))
}

pub fn length_less_than(n: usize) -> Rule {
    Rule::new(format!("Length must be less than {n}"), move |value| {
        is_falsy(value) || length_of(value).is_some_and(|len| len < n)
    })
}

pub fn length_greater_than(n: usize) -> Rule {
    Rule::new(format!("Length must be greater than {n}"), move |value| {
        is_falsy(value) || length_of(value).is_some_and(|len| len > n)
    })
}

pub fn length_equal_to(n: usize) -> Rule {
    Rule::new(format!("Length must be exactly {n}"), move |value| {
        is_falsy(value) || length_of(value).is_some_and(|len| len == n)
    })
}

pub fn less_than(n: f64) -> Rule {
    Rule::new(format!("Value must be less than {n}"), move |value| {
        is_falsy(value) || as_number(value).is_some_and(|v| v < n)
    })
}

pub fn greater_than(n: f64) -> Rule {
    Rule::new(format!("Value must be greater than {n}"), move |value| {
        is_falsy(value) || as_number(value).is_some_and(|v| v > n)
    })
}

pub fn less_than_or_equal_to(n: f64) -> Rule {
    Rule::new(
        format!("Value must be less than or equal to {n}"),
        move |value| is_falsy(value) || as_number(value).is_some_and(|v| v <= n),
    )
}

pub fn greater_than_or_equal_to(n: f64) -> Rule {
    Rule::new(
        format!("Value must be greater than or equal to {n}"),
        move |value| is_falsy(value) || as_number(value).is_some_and(|v| v >= n),
    )
}
