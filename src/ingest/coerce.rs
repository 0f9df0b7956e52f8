//! Text-to-primitive conversion for extracted field values.
//!
//! Enterprise feeds routinely carry malformed values, so conversion never
//! aborts ingestion: a value that is missing, blank, or unparseable resolves to
//! a caller-chosen default. Callers that need to tell "missing" apart from
//! "present but invalid" use [`classify`] instead of [`coerce`].

use crate::constants::TRUTHY_VALUES;
use crate::models::{FieldValue, Record};
use tracing::warn;

/// Result of converting one raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    Valid(T),
    /// Non-empty text that could not be converted
    Invalid { raw: String, reason: String },
    /// Absent, empty, or whitespace-only text
    Missing,
}

impl<T> Coerced<T> {
    /// Collapses the tri-state to a value, falling back to `default`.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Coerced::Valid(value) => value,
            Coerced::Invalid { .. } | Coerced::Missing => default,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Coerced::Valid(_))
    }
}

/// A primitive a field can be converted into.
pub trait FieldType: Sized {
    /// Short name used in log messages.
    const KIND: &'static str;

    /// Converts non-blank text. The input is never empty.
    fn parse_field(raw: &str) -> Result<Self, String>;
}

impl FieldType for bool {
    const KIND: &'static str = "boolean";

    fn parse_field(raw: &str) -> Result<Self, String> {
        let lower = raw.trim().to_lowercase();
        Ok(TRUTHY_VALUES.contains(&lower.as_str()))
    }
}

impl FieldType for i64 {
    const KIND: &'static str = "integer";

    fn parse_field(raw: &str) -> Result<Self, String> {
        raw.trim().parse::<i64>().map_err(|e| e.to_string())
    }
}

impl FieldType for f64 {
    const KIND: &'static str = "decimal";

    fn parse_field(raw: &str) -> Result<Self, String> {
        raw.trim().parse::<f64>().map_err(|e| e.to_string())
    }
}

impl FieldType for String {
    const KIND: &'static str = "string";

    fn parse_field(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

/// Converts `value` without collapsing failures into a default.
pub fn classify<T: FieldType>(value: Option<&str>) -> Coerced<T> {
    match value {
        None => Coerced::Missing,
        Some(raw) if raw.trim().is_empty() => Coerced::Missing,
        Some(raw) => match T::parse_field(raw) {
            Ok(parsed) => Coerced::Valid(parsed),
            Err(reason) => Coerced::Invalid {
                raw: raw.to_string(),
                reason,
            },
        },
    }
}

/// Converts `value` to `T`, returning `default` when it is missing, blank, or
/// unparseable. Parse failures are logged at `warn`.
///
/// ```
/// use xml_ingest::ingest::coerce;
///
/// assert!(coerce(Some("TRUE"), false));
/// assert_eq!(coerce(Some(""), 0i64), 0);
/// assert_eq!(coerce(Some("abc"), 1.5f64), 1.5);
/// assert_eq!(coerce::<i64>(None, 7), 7);
/// ```
pub fn coerce<T: FieldType>(value: Option<&str>, default: T) -> T {
    match classify::<T>(value) {
        Coerced::Valid(parsed) => parsed,
        Coerced::Missing => default,
        Coerced::Invalid { raw, reason } => {
            warn!(
                kind = T::KIND,
                value = %raw,
                error = %reason,
                "Type conversion failed, returning default"
            );
            default
        }
    }
}

impl Record {
    /// Converts the scalar text field `name`; lists and typed values count as
    /// missing.
    pub fn coerce<T: FieldType>(&self, name: &str, default: T) -> T {
        coerce(self.text(name), default)
    }

    /// Like [`Record::coerce`] but keeps the tri-state.
    pub fn classify<T: FieldType>(&self, name: &str) -> Coerced<T> {
        classify(self.get(name).and_then(FieldValue::as_text))
    }
}
