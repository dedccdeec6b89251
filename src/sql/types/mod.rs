use std::{cmp::Ordering, fmt::Display, sync::LazyLock};

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Runtime value of a single cell.
///
/// Table files carry no schema, so a cell is either missing/empty (`Null`),
/// a number, or raw text. Values loaded from a table source are always
/// `String`; numbers appear through normalization and aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Number(f64),
    String(String),
}

/// Leading numeric prefix, the way `parseFloat` reads text
static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("numeric prefix regex")
});

impl Value {
    /// Builds a value from literal source text: quotes are stripped and
    /// numeric text becomes a `Number`.
    pub fn parse(text: &str) -> Self {
        let text = strip_quotes(text);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return Value::Number(n);
                }
            }
        }
        Value::String(text.to_string())
    }

    /// Normalizes a cell for comparison. Null passes through unchanged.
    pub fn normalize(&self) -> Self {
        match self {
            Value::Null => Value::Null,
            Value::Number(n) => Value::Number(*n),
            Value::String(s) => Value::parse(s),
        }
    }

    /// Reads the value as a float the lenient way: the longest numeric
    /// prefix of the text counts, anything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(*n),
            Value::String(s) => NUMERIC_PREFIX
                .find(s.trim_start())
                .and_then(|m| m.as_str().parse::<f64>().ok()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, empty text and zero are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }

    /// Orders like-typed, non-null values; anything else is incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (_, _) => None,
        }
    }

    /// Total order used for sorting: Null < Number < String.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Number(_), Value::String(_)) => Ordering::Less,
            (Value::String(_), Value::Number(_)) => Ordering::Greater,
            (Value::String(a), Value::String(b)) => a.cmp(b),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

/// Removes one pair of matching surrounding quotes, single or double.
pub fn strip_quotes(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// A row maps column names to values, keeping insertion order
pub type Row = IndexMap<String, Value>;

static NULL: Value = Value::Null;

/// Looks up a column, treating a missing key as `Null`.
pub fn get_value<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&NULL)
}
