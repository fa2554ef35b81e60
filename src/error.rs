//! Error taxonomy and failure policies for record streams.
//!
//! Three classes of failure move through the engine, with different
//! severities:
//!
//! - [`SchemaError`] - structural problems detected while resolving a schema
//!   (duplicate field names, a declared custom type with no converter).
//!   Always fatal, surfaced at resolution time.
//! - [`ConversionError`] - a single field of a single record could not be
//!   converted to or from its declared type. Severity is governed by the
//!   stream's [`ErrorPolicy`].
//! - [`ValidationError`](crate::validate::ValidationError) - a materialized
//!   record violated one of its schema rules. Severity is likewise
//!   policy-governed.
//!
//! I/O failures from the underlying source or sink are always fatal and
//! propagate immediately as `anyhow` errors with path/position context
//! attached. All typed errors here implement [`std::error::Error`], so a
//! halted stream's `anyhow::Error` can be downcast to recover the concrete
//! failure class.

use crate::schema::FieldType;
use crate::validate::ValidationError;
use crate::value::RawValue;
use serde::Serialize;
use std::fmt;

/// How a stream reacts to conversion and validation failures.
///
/// The policy is part of the schema configuration and applies uniformly to
/// the read and write halves of a codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Propagate the first failure and stop the stream. The codec transitions
    /// to a terminal error state; no further records are yielded or written.
    #[default]
    Halt,
    /// Skip the offending record (reader) or the offending write (writer),
    /// emit one diagnostic event, and continue with the next record.
    ReportAndContinue,
    /// Substitute the declared fallback/default value for the offending
    /// field(s) and continue without skipping the record. Substitution is
    /// silent; a record whose failure has no declared substitute is skipped
    /// with a diagnostic instead.
    ReplaceAndContinue,
}

/// Structural schema failure. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SchemaError {
    /// Two fields resolved to the same name.
    DuplicateField(String),
    /// A field declared [`FieldType::Custom`] has no value converter to
    /// interpret it.
    ConverterRequired(String),
    /// Resolution produced no fields at all.
    Empty,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::DuplicateField(name) => {
                write!(f, "duplicate field name '{name}' in schema")
            }
            SchemaError::ConverterRequired(name) => {
                write!(f, "field '{name}' declares a custom type but no value converter")
            }
            SchemaError::Empty => write!(f, "schema resolution produced no fields"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// A single field of a single record failed conversion.
///
/// Carries the field name, the raw value that failed, and the declared
/// target type, so a halted stream reports full context at the point of
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionError {
    /// Name of the field that failed.
    pub field: String,
    /// The raw value as it arrived from (or was headed to) the adapter.
    pub raw: RawValue,
    /// The declared target type of the field.
    pub target: FieldType,
    /// Why the conversion failed.
    pub message: String,
}

impl ConversionError {
    pub(crate) fn new(
        field: impl Into<String>,
        raw: RawValue,
        target: FieldType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            raw,
            target,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': cannot convert {} to {}: {}",
            self.field, self.raw, self.target, self.message
        )
    }
}

impl std::error::Error for ConversionError {}

/// All rule violations for one record, raised when a `Halt` stream rejects
/// a record on validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    /// Zero-based position of the record in the stream.
    pub record_index: u64,
    /// Every violation collected for the record.
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record #{} failed validation: ", self.record_index)?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversion_error_reports_field_value_and_target() {
        let err = ConversionError::new("age", json!("abc"), FieldType::Int, "invalid digit");
        let text = err.to_string();
        assert!(text.contains("age"));
        assert!(text.contains("abc"));
        assert!(text.contains("int"));
    }

    #[test]
    fn schema_error_display() {
        assert_eq!(
            SchemaError::DuplicateField("id".into()).to_string(),
            "duplicate field name 'id' in schema"
        );
    }
}
