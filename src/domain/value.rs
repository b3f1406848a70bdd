use std::fmt;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

/// The largest integer a numeric field may hold.
///
/// Values above this bound cannot be represented exactly by the clients that
/// consume requisitions, so they are rejected during validation.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// A single field value on a line item.
///
/// A field that has never been set is represented by `None` at the call site
/// (`Option<Value>`). An explicit zero is `Some(Value::Integer(0))`; the two
/// are never conflated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Whole quantities (stock, consumption, packs, days).
    Integer(i64),
    /// Free text.
    Text(String),
    /// Flags.
    Bool(bool),
    /// Fractional amounts, typically currency.
    Decimal(Decimal),
}

impl Value {
    /// Returns the value as an integer, if it holds a whole number.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Decimal(value) if value.fract().is_zero() => value.to_i64(),
            _ => None,
        }
    }

    /// Returns the value as a decimal, if it is numeric.
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(value) => Some(Decimal::from(*value)),
            Self::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the value counts as "entered" by a user.
    ///
    /// Empty text is treated as no input. Zero and `false` are real values.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    /// Whether the numeric value exceeds [`MAX_SAFE_INTEGER`].
    #[must_use]
    pub fn exceeds_safe_integer(&self) -> bool {
        match self {
            Self::Integer(value) => *value > MAX_SAFE_INTEGER,
            Self::Decimal(value) => *value > Decimal::from(MAX_SAFE_INTEGER),
            Self::Text(_) | Self::Bool(_) => false,
        }
    }

    /// Whether the numeric value is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Integer(value) => *value < 0,
            Self::Decimal(value) => value.is_sign_negative() && !value.is_zero(),
            Self::Text(_) | Self::Bool(_) => false,
        }
    }
}

/// Whether an optional field holds something a user entered.
#[must_use]
pub fn is_empty(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_blank)
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}
