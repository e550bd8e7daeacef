//! Property values: the typed scalars a node can hold.
//!
//! [`PropertyValue`] is the closed set of value shapes the schema understands.
//! The numeric variants (`Integer`, `Number`) form one coercion family: a
//! property declared as any numeric kind accepts either variant, and comparing
//! values for the "setting an equal value is a no-op" rule treats `Integer(3)`
//! and `Number(3.0)` as the same value.

use serde::{Deserialize, Serialize};

/// A typed property value.
///
/// Serialized untagged, so JSON round-trips as plain scalars
/// (`"Save"`, `3`, `1.5`, `true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A boolean flag.
    Bool(bool),
    /// A whole number.
    Integer(i64),
    /// A floating-point number.
    Number(f64),
    /// A text value.
    String(String),
}

impl PropertyValue {
    /// The numeric value, if this is `Integer` or `Number`.
    ///
    /// Does **not** parse strings; see [`PropertyValue::parse_numeric`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The numeric value, additionally accepting a string whose contents
    /// parse as a number.
    pub fn parse_numeric(&self) -> Option<f64> {
        match self {
            Self::String(s) => s.trim().parse::<f64>().ok(),
            other => other.as_number(),
        }
    }

    /// The string contents, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Value equality with the numeric family collapsed: `Integer(3)` and
    /// `Number(3.0)` compare equal. Non-numeric variants compare structurally.
    pub fn same_value(&self, other: &Self) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_number_integer_and_float() {
        assert_eq!(PropertyValue::Integer(3).as_number(), Some(3.0));
        assert_eq!(PropertyValue::Number(1.5).as_number(), Some(1.5));
        assert_eq!(PropertyValue::from("3").as_number(), None);
        assert_eq!(PropertyValue::Bool(true).as_number(), None);
    }

    #[test]
    fn parse_numeric_accepts_numeric_strings() {
        assert_eq!(PropertyValue::from("42").parse_numeric(), Some(42.0));
        assert_eq!(PropertyValue::from(" 1.5 ").parse_numeric(), Some(1.5));
        assert_eq!(PropertyValue::from("abc").parse_numeric(), None);
        assert_eq!(PropertyValue::Integer(7).parse_numeric(), Some(7.0));
    }

    #[test]
    fn same_value_collapses_numeric_family() {
        assert!(PropertyValue::Integer(3).same_value(&PropertyValue::Number(3.0)));
        assert!(!PropertyValue::Integer(3).same_value(&PropertyValue::Number(3.5)));
        // Strings are not numerically compared.
        assert!(!PropertyValue::from("3").same_value(&PropertyValue::Integer(3)));
    }

    #[test]
    fn same_value_structural_for_strings_and_bools() {
        assert!(PropertyValue::from("a").same_value(&PropertyValue::from("a")));
        assert!(!PropertyValue::from("a").same_value(&PropertyValue::from("b")));
        assert!(PropertyValue::Bool(true).same_value(&PropertyValue::Bool(true)));
        assert!(!PropertyValue::Bool(true).same_value(&PropertyValue::Bool(false)));
    }

    #[test]
    fn from_conversions() {
        assert_eq!(PropertyValue::from("x"), PropertyValue::String("x".into()));
        assert_eq!(PropertyValue::from(5i64), PropertyValue::Integer(5));
        assert_eq!(PropertyValue::from(0.5f64), PropertyValue::Number(0.5));
        assert_eq!(PropertyValue::from(false), PropertyValue::Bool(false));
    }

    #[test]
    fn serde_untagged_round_trip() {
        let values = vec![
            PropertyValue::from("Save"),
            PropertyValue::Integer(3),
            PropertyValue::Number(1.5),
            PropertyValue::Bool(true),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"["Save",3,1.5,true]"#);
        let back: Vec<PropertyValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn display() {
        assert_eq!(PropertyValue::from("hi").to_string(), "hi");
        assert_eq!(PropertyValue::Integer(4).to_string(), "4");
        assert_eq!(PropertyValue::Bool(true).to_string(), "true");
    }
}
