//! Field-level value conversion.
//!
//! Conversion sits between the format adapter's raw values and the
//! materialized record. The read path interprets raw values as their
//! declared types; the write path renders values back to the raw
//! representation a sink expects. Both directions resolve in the same
//! order:
//!
//! 1. an absent or null source with a declared default uses the default;
//! 2. the field's custom converter, when one is attached;
//! 3. built-in coercion for the declared [`FieldType`];
//! 4. on failure, a declared fallback value;
//! 5. otherwise a [`ConversionError`] carrying field, raw value, and target.
//!
//! The policy consequences of a failure (halt, skip, substitute) belong to
//! the codec, so conversion reports [`Converted`] rather than a bare
//! `Result`.

use crate::error::ConversionError;
use crate::schema::{FieldDescriptor, FieldType};
use crate::value::{RawValue, is_absent, type_label};

/// Outcome of converting one field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    /// Conversion succeeded.
    Value(RawValue),
    /// The source value was absent; the declared default was used.
    Defaulted(RawValue),
    /// Conversion failed; the declared fallback was used. The original
    /// failure is retained for reporting.
    Fallback {
        /// The substituted fallback value.
        value: RawValue,
        /// The conversion failure the fallback papered over.
        error: ConversionError,
    },
    /// Conversion failed and no fallback was declared.
    Failed(ConversionError),
}

impl Converted {
    /// The produced value, unless conversion failed outright.
    #[must_use]
    pub fn value(&self) -> Option<&RawValue> {
        match self {
            Converted::Value(v) | Converted::Defaulted(v) => Some(v),
            Converted::Fallback { value, .. } => Some(value),
            Converted::Failed(_) => None,
        }
    }
}

/// Converts a raw adapter value to the field's declared type (read path).
///
/// An absent source value with no declared default converts to null; absence
/// is a validation concern, not a conversion failure.
#[must_use]
pub fn to_target(raw: Option<&RawValue>, field: &FieldDescriptor) -> Converted {
    convert(raw, field, Direction::ToTarget)
}

/// Converts a native value back to the raw representation expected by the
/// sink (write path). Uses the converter's inverse when one is declared.
#[must_use]
pub fn to_raw(value: Option<&RawValue>, field: &FieldDescriptor) -> Converted {
    convert(value, field, Direction::ToRaw)
}

#[derive(Clone, Copy)]
enum Direction {
    ToTarget,
    ToRaw,
}

fn convert(source: Option<&RawValue>, field: &FieldDescriptor, direction: Direction) -> Converted {
    if is_absent(source) {
        return match field.default_value() {
            Some(default) => Converted::Defaulted(default.clone()),
            None => Converted::Value(RawValue::Null),
        };
    }
    let source = source.unwrap_or(&RawValue::Null);

    let outcome = match (direction, field.converter()) {
        (Direction::ToTarget, Some(converter)) => converter.to_target(source),
        (Direction::ToRaw, Some(converter)) => match converter.to_raw(source) {
            Some(result) => result,
            None => coerce(source, field.field_type()),
        },
        (_, None) => coerce(source, field.field_type()),
    };

    match outcome {
        Ok(value) => Converted::Value(value),
        Err(message) => {
            let error = ConversionError::new(
                field.name(),
                source.clone(),
                field.field_type(),
                message,
            );
            match field.fallback_value() {
                Some(fallback) => Converted::Fallback {
                    value: fallback.clone(),
                    error,
                },
                None => Converted::Failed(error),
            }
        }
    }
}

/// Built-in coercion to a declared type.
fn coerce(raw: &RawValue, target: FieldType) -> Result<RawValue, String> {
    match target {
        FieldType::Any => Ok(raw.clone()),
        FieldType::Bool => coerce_bool(raw),
        FieldType::Int => coerce_int(raw),
        FieldType::Float => coerce_float(raw),
        FieldType::Text => coerce_text(raw),
        FieldType::Sequence => match raw {
            RawValue::Array(_) => Ok(raw.clone()),
            other => Err(mismatch(other, "a sequence")),
        },
        FieldType::Nested => match raw {
            RawValue::Object(_) => Ok(raw.clone()),
            other => Err(mismatch(other, "a nested value")),
        },
        FieldType::Custom => Err("custom type has no built-in coercion".into()),
    }
}

fn coerce_bool(raw: &RawValue) -> Result<RawValue, String> {
    match raw {
        RawValue::Bool(_) => Ok(raw.clone()),
        RawValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(RawValue::Bool(true)),
            "false" => Ok(RawValue::Bool(false)),
            _ => Err(format!("'{s}' is not a boolean")),
        },
        other => Err(mismatch(other, "a boolean")),
    }
}

fn coerce_int(raw: &RawValue) -> Result<RawValue, String> {
    match raw {
        RawValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(RawValue::from(i));
            }
            if let Some(f) = n.as_f64()
                && f.fract() == 0.0
                && f >= i64::MIN as f64
                && f <= i64::MAX as f64
            {
                return Ok(RawValue::from(f as i64));
            }
            Err(format!("{n} is not an integer"))
        }
        RawValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(RawValue::from)
            .map_err(|e| format!("'{s}' is not an integer: {e}")),
        other => Err(mismatch(other, "an integer")),
    }
}

fn coerce_float(raw: &RawValue) -> Result<RawValue, String> {
    let parsed = match raw {
        RawValue::Number(n) => n.as_f64(),
        RawValue::String(s) => s.trim().parse::<f64>().ok(),
        other => return Err(mismatch(other, "a number")),
    };
    match parsed.and_then(serde_json::Number::from_f64) {
        Some(n) => Ok(RawValue::Number(n)),
        None => Err(format!("{raw} is not a finite number")),
    }
}

fn coerce_text(raw: &RawValue) -> Result<RawValue, String> {
    match raw {
        RawValue::String(_) => Ok(raw.clone()),
        RawValue::Number(n) => Ok(RawValue::String(n.to_string())),
        RawValue::Bool(b) => Ok(RawValue::String(b.to_string())),
        other => Err(mismatch(other, "text")),
    }
}

fn mismatch(raw: &RawValue, expected: &str) -> String {
    format!("expected {expected}, got {}", type_label(raw))
}
