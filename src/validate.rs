//! Rule-based record validation.
//!
//! Validation runs after field conversion, on the materialized record, and
//! never mutates it. Two granularities are supported, selected per schema
//! via [`ValidationMode`]:
//!
//! - **Member-level** checks each field against its own declared rules
//!   independently and collects every violation.
//! - **Object-level** additionally runs the schema's record rules, which see
//!   the whole record and can express cross-field invariants.
//!
//! The engine only reports; the codec decides what a violation means under
//! the stream's [`ErrorPolicy`](crate::ErrorPolicy).

use crate::record::Record;
use crate::schema::RecordSchema;
use crate::value::{RawValue, is_absent};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Validation granularity for a schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// No validation at all. Rules on the schema are ignored.
    #[default]
    None,
    /// Each field is checked against its own rules.
    MemberLevel,
    /// Field rules plus whole-record rules.
    ObjectLevel,
}

/// Signature of a whole-record check used under
/// [`ValidationMode::ObjectLevel`].
pub type RecordCheck = dyn Fn(&Record) -> Result<(), String> + Send + Sync;

/// Signature of a custom single-value check.
pub type ValueCheck = dyn Fn(&RawValue) -> Result<(), String> + Send + Sync;

/// A member-level constraint attached to a field descriptor.
///
/// Every rule except [`Required`](ValidationRule::Required) passes vacuously
/// when the field is absent or null; absence is `Required`'s concern alone.
#[derive(Clone)]
pub enum ValidationRule {
    /// The field must be present and non-null.
    Required,
    /// Text, sequences, and nested values must be non-empty.
    NonEmpty,
    /// Text must have at least this many characters; sequences at least
    /// this many elements.
    MinLength(usize),
    /// Text must have at most this many characters; sequences at most this
    /// many elements.
    MaxLength(usize),
    /// Numeric value must fall inside the inclusive range.
    Range {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Text must match the pattern.
    Matches(Regex),
    /// Caller-supplied check. `name` identifies the rule in diagnostics.
    Custom {
        /// Rule name used in error reports.
        name: String,
        /// The check itself.
        check: Arc<ValueCheck>,
    },
}

impl ValidationRule {
    /// Builds a custom rule from a name and a check closure.
    pub fn custom(
        name: impl Into<String>,
        check: impl Fn(&RawValue) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        ValidationRule::Custom {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// The rule's name as reported in [`ValidationError::rule`].
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ValidationRule::Required => "required",
            ValidationRule::NonEmpty => "non_empty",
            ValidationRule::MinLength(_) => "min_length",
            ValidationRule::MaxLength(_) => "max_length",
            ValidationRule::Range { .. } => "range",
            ValidationRule::Matches(_) => "matches",
            ValidationRule::Custom { name, .. } => name,
        }
    }

    fn check(&self, value: Option<&RawValue>) -> Result<(), String> {
        if let ValidationRule::Required = self {
            return if is_absent(value) {
                Err("value is required but missing or null".into())
            } else {
                Ok(())
            };
        }
        let Some(value) = value else { return Ok(()) };
        if value.is_null() {
            return Ok(());
        }
        match self {
            ValidationRule::Required => Ok(()),
            ValidationRule::NonEmpty => match value {
                RawValue::String(s) if s.is_empty() => Err("text is empty".into()),
                RawValue::Array(items) if items.is_empty() => Err("sequence is empty".into()),
                RawValue::Object(map) if map.is_empty() => Err("nested value is empty".into()),
                _ => Ok(()),
            },
            ValidationRule::MinLength(min) => match measured_length(value) {
                Some(len) if len < *min => {
                    Err(format!("length {len} is below the minimum of {min}"))
                }
                _ => Ok(()),
            },
            ValidationRule::MaxLength(max) => match measured_length(value) {
                Some(len) if len > *max => {
                    Err(format!("length {len} exceeds the maximum of {max}"))
                }
                _ => Ok(()),
            },
            ValidationRule::Range { min, max } => match value.as_f64() {
                Some(n) if n < *min || n > *max => {
                    Err(format!("{n} is outside the range {min}..={max}"))
                }
                Some(_) => Ok(()),
                None => Err(format!("range rule applies to numbers, got {value}")),
            },
            ValidationRule::Matches(pattern) => match value {
                RawValue::String(s) if pattern.is_match(s) => Ok(()),
                RawValue::String(s) => Err(format!("'{s}' does not match /{pattern}/")),
                other => Err(format!("pattern rule applies to text, got {other}")),
            },
            ValidationRule::Custom { check, .. } => check(value),
        }
    }
}

fn measured_length(value: &RawValue) -> Option<usize> {
    match value {
        RawValue::String(s) => Some(s.chars().count()),
        RawValue::Array(items) => Some(items.len()),
        _ => None,
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationRule::Required => f.write_str("Required"),
            ValidationRule::NonEmpty => f.write_str("NonEmpty"),
            ValidationRule::MinLength(n) => write!(f, "MinLength({n})"),
            ValidationRule::MaxLength(n) => write!(f, "MaxLength({n})"),
            ValidationRule::Range { min, max } => write!(f, "Range {{ {min}..={max} }}"),
            ValidationRule::Matches(p) => write!(f, "Matches(/{p}/)"),
            ValidationRule::Custom { name, .. } => write!(f, "Custom({name})"),
        }
    }
}

/// One rule violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The violating field; `None` for whole-record rules.
    pub field: Option<String>,
    /// Name of the violated rule.
    pub rule: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn member(field: &str, rule: &ValidationRule, message: String) -> Self {
        Self {
            field: Some(field.to_string()),
            rule: rule.name().to_string(),
            message,
        }
    }

    pub(crate) fn object(rule: &str, message: String) -> Self {
        Self {
            field: None,
            rule: rule.to_string(),
            message,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "field '{}' violates {}: {}", field, self.rule, self.message),
            None => write!(f, "record violates {}: {}", self.rule, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// `Ok(())` when the record passed, or every collected violation.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validates a record against a schema at the given granularity.
///
/// All violations are collected rather than short-circuiting on the first,
/// so one pass reports everything wrong with a record. The record is never
/// mutated.
pub fn validate(record: &Record, schema: &RecordSchema, mode: ValidationMode) -> ValidationResult {
    if mode == ValidationMode::None {
        return Ok(());
    }
    let mut errors = Vec::new();
    for field in schema.active_fields() {
        let value = record.get(field.name());
        for rule in field.rules() {
            if let Err(message) = rule.check(value) {
                errors.push(ValidationError::member(field.name(), rule, message));
            }
        }
    }
    if mode == ValidationMode::ObjectLevel {
        for (name, check) in schema.record_rules() {
            if let Err(message) = check(record) {
                errors.push(ValidationError::object(name, message));
            }
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, SchemaBuilder};
    use serde_json::json;

    fn person_schema(mode: ValidationMode) -> RecordSchema {
        SchemaBuilder::new()
            .field(FieldDescriptor::new("id").required())
            .field(
                FieldDescriptor::new("name")
                    .with_rule(ValidationRule::NonEmpty)
                    .with_rule(ValidationRule::MaxLength(8)),
            )
            .validation_mode(mode)
            .build()
            .unwrap()
    }

    #[test]
    fn mode_none_ignores_rules() {
        let schema = person_schema(ValidationMode::None);
        let rec = Record::from_pairs([("name".to_string(), json!(""))]);
        assert!(validate(&rec, &schema, schema.validation_mode()).is_ok());
    }

    #[test]
    fn member_level_collects_all_violations() {
        let schema = person_schema(ValidationMode::MemberLevel);
        let rec = Record::from_pairs([("name".to_string(), json!("Bartholomew"))]);
        let errors = validate(&rec, &schema, schema.validation_mode()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].rule, "required");
        assert_eq!(errors[0].field.as_deref(), Some("id"));
        assert_eq!(errors[1].rule, "max_length");
    }

    #[test]
    fn non_required_rules_pass_on_absent_values() {
        let schema = SchemaBuilder::new()
            .field(FieldDescriptor::new("name").with_rule(ValidationRule::MinLength(3)))
            .validation_mode(ValidationMode::MemberLevel)
            .build()
            .unwrap();
        let rec = Record::new();
        assert!(validate(&rec, &schema, schema.validation_mode()).is_ok());
    }

    #[test]
    fn object_level_runs_record_rules() {
        let schema = SchemaBuilder::new()
            .field(FieldDescriptor::new("min"))
            .field(FieldDescriptor::new("max"))
            .validation_mode(ValidationMode::ObjectLevel)
            .record_rule("min_below_max", |rec: &Record| {
                let lo = rec.get("min").and_then(RawValue::as_f64).unwrap_or(0.0);
                let hi = rec.get("max").and_then(RawValue::as_f64).unwrap_or(0.0);
                if lo <= hi {
                    Ok(())
                } else {
                    Err(format!("min {lo} exceeds max {hi}"))
                }
            })
            .build()
            .unwrap();
        let bad = Record::from_pairs([
            ("min".to_string(), json!(9)),
            ("max".to_string(), json!(4)),
        ]);
        let errors = validate(&bad, &schema, schema.validation_mode()).unwrap_err();
        assert_eq!(errors[0].rule, "min_below_max");
        assert!(errors[0].field.is_none());
    }

    #[test]
    fn range_and_pattern_rules() {
        let schema = SchemaBuilder::new()
            .field(FieldDescriptor::new("age").with_rule(ValidationRule::Range {
                min: 0.0,
                max: 150.0,
            }))
            .field(FieldDescriptor::new("zip").with_rule(ValidationRule::Matches(
                Regex::new(r"^\d{5}$").unwrap(),
            )))
            .validation_mode(ValidationMode::MemberLevel)
            .build()
            .unwrap();
        let bad = Record::from_pairs([
            ("age".to_string(), json!(200)),
            ("zip".to_string(), json!("ABCDE")),
        ]);
        let errors = validate(&bad, &schema, schema.validation_mode()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
