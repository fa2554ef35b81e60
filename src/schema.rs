//! Schema resolution and field configuration.
//!
//! A [`RecordSchema`] is built once per stream, either explicitly through a
//! [`SchemaBuilder`] or inferred from the first record, and is immutable
//! afterwards. Field order in the schema defines output field order,
//! independent of how later records happen to arrange their fields.
//!
//! # Overview
//!
//! Each [`FieldDescriptor`] carries everything the engine needs to know
//! about one field: its declared type, an optional custom converter pair,
//! default and fallback values, validation rules, and whether the field is
//! ignored entirely. Descriptors are configured fluently:
//!
//! ```
//! use rowbeam::{FieldDescriptor, FieldType, SchemaBuilder, ValidationRule};
//! use serde_json::json;
//!
//! let schema = SchemaBuilder::new()
//!     .field(FieldDescriptor::new("id").with_type(FieldType::Int).required())
//!     .field(FieldDescriptor::new("name").with_rule(ValidationRule::MaxLength(64)))
//!     .field(FieldDescriptor::new("note").with_default(json!("n/a")))
//!     .build()?;
//! assert_eq!(schema.fields().len(), 3);
//! # Ok::<(), rowbeam::SchemaError>(())
//! ```

use crate::error::{ErrorPolicy, SchemaError};
use crate::record::Record;
use crate::validate::{RecordCheck, ValidationMode, ValidationRule};
use crate::value::RawValue;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Declared logical type of a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Accept the raw value as-is.
    #[default]
    Any,
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating-point number.
    Float,
    /// Text.
    Text,
    /// Ordered sequence of values.
    Sequence,
    /// Nested name/value structure.
    Nested,
    /// Opaque type understood only by the field's custom converter.
    /// Declaring it without a converter is a [`SchemaError`].
    Custom,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldType::Any => "any",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Text => "text",
            FieldType::Sequence => "sequence",
            FieldType::Nested => "nested",
            FieldType::Custom => "custom",
        };
        f.write_str(label)
    }
}

/// Signature of one direction of a custom value conversion.
pub type ConvertFn = dyn Fn(&RawValue) -> Result<RawValue, String> + Send + Sync;

/// A custom conversion override for one field.
///
/// `to_target` interprets a raw adapter value on read; the optional inverse
/// renders the value back to its raw form on write. A converter without an
/// inverse falls back to the engine's built-in coercion when writing.
#[derive(Clone)]
pub struct ValueConverter {
    to_target: Arc<ConvertFn>,
    to_raw: Option<Arc<ConvertFn>>,
}

impl ValueConverter {
    /// One-directional converter used on the read path only.
    pub fn new(
        to_target: impl Fn(&RawValue) -> Result<RawValue, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            to_target: Arc::new(to_target),
            to_raw: None,
        }
    }

    /// Bidirectional converter.
    pub fn with_inverse(
        to_target: impl Fn(&RawValue) -> Result<RawValue, String> + Send + Sync + 'static,
        to_raw: impl Fn(&RawValue) -> Result<RawValue, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            to_target: Arc::new(to_target),
            to_raw: Some(Arc::new(to_raw)),
        }
    }

    pub(crate) fn to_target(&self, raw: &RawValue) -> Result<RawValue, String> {
        (self.to_target)(raw)
    }

    pub(crate) fn to_raw(&self, value: &RawValue) -> Option<Result<RawValue, String>> {
        self.to_raw.as_ref().map(|f| f(value))
    }
}

impl fmt::Debug for ValueConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueConverter")
            .field("to_raw", &self.to_raw.is_some())
            .finish()
    }
}

/// Configuration for a single field of a schema.
///
/// Descriptors are owned by the schema that built them; positions are
/// assigned at build time from insertion order.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: String,
    position: usize,
    field_type: FieldType,
    converter: Option<ValueConverter>,
    default_value: Option<RawValue>,
    fallback_value: Option<RawValue>,
    ignore: bool,
    rules: Vec<ValidationRule>,
}

impl FieldDescriptor {
    /// New descriptor with type [`FieldType::Any`] and no constraints.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: 0,
            field_type: FieldType::Any,
            converter: None,
            default_value: None,
            fallback_value: None,
            ignore: false,
            rules: Vec::new(),
        }
    }

    /// Declares the field's logical type.
    #[must_use]
    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    /// Attaches a custom conversion override.
    #[must_use]
    pub fn with_converter(mut self, converter: ValueConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Value used when the source value is absent or null.
    #[must_use]
    pub fn with_default(mut self, value: RawValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Value used when conversion of the source value fails.
    #[must_use]
    pub fn with_fallback(mut self, value: RawValue) -> Self {
        self.fallback_value = Some(value);
        self
    }

    /// Excludes the field from both reading and writing.
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Requires the field to be present and non-null. Shorthand for
    /// attaching [`ValidationRule::Required`].
    #[must_use]
    pub fn required(mut self) -> Self {
        if !self.is_required() {
            self.rules.insert(0, ValidationRule::Required);
        }
        self
    }

    /// Attaches a member-level validation rule.
    #[must_use]
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-based position within the schema.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Declared logical type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Custom converter, if any.
    #[must_use]
    pub fn converter(&self) -> Option<&ValueConverter> {
        self.converter.as_ref()
    }

    /// Default for absent source values, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&RawValue> {
        self.default_value.as_ref()
    }

    /// Fallback for failed conversions, if any.
    #[must_use]
    pub fn fallback_value(&self) -> Option<&RawValue> {
        self.fallback_value.as_ref()
    }

    /// Whether the field is excluded from reading and writing.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    /// Whether a [`ValidationRule::Required`] rule is attached.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.rules
            .iter()
            .any(|r| matches!(r, ValidationRule::Required))
    }

    /// Member-level rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }
}

// Structural equality up to closure identity: converters compare by
// presence, rules by name.
impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.position == other.position
            && self.field_type == other.field_type
            && self.converter.is_some() == other.converter.is_some()
            && self.default_value == other.default_value
            && self.fallback_value == other.fallback_value
            && self.ignore == other.ignore
            && self.rules.len() == other.rules.len()
            && self
                .rules
                .iter()
                .zip(other.rules.iter())
                .all(|(a, b)| a.name() == b.name())
    }
}

/// An immutable, ordered description of a record stream.
///
/// Built once per stream, from explicit configuration or a sample record,
/// then shared by reference for the stream's lifetime.
#[derive(Clone)]
pub struct RecordSchema {
    fields: Vec<FieldDescriptor>,
    validation_mode: ValidationMode,
    error_policy: ErrorPolicy,
    reuse_emitter: bool,
    record_rules: Vec<(String, Arc<RecordCheck>)>,
}

impl RecordSchema {
    /// Infers a schema from a sample record.
    ///
    /// Fields follow the sample's order; types are inferred from the sample
    /// values (`null` infers [`FieldType::Any`]). Inference is idempotent:
    /// equivalent samples yield equal schemas.
    #[must_use]
    pub fn infer(sample: &Record) -> Self {
        let fields = sample
            .iter()
            .enumerate()
            .map(|(position, (name, value))| FieldDescriptor {
                name: name.to_string(),
                position,
                field_type: infer_type(value),
                converter: None,
                default_value: None,
                fallback_value: None,
                ignore: false,
                rules: Vec::new(),
            })
            .collect();
        Self {
            fields,
            validation_mode: ValidationMode::default(),
            error_policy: ErrorPolicy::default(),
            reuse_emitter: false,
            record_rules: Vec::new(),
        }
    }

    /// All fields in schema order, including ignored ones.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that participate in reading and writing, in schema order.
    pub fn active_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.ignore)
    }

    /// Validation granularity for streams using this schema.
    #[must_use]
    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode
    }

    /// Failure policy for streams using this schema.
    #[must_use]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// Whether sinks may reuse a single emitter buffer across records.
    #[must_use]
    pub fn reuse_emitter(&self) -> bool {
        self.reuse_emitter
    }

    /// Whole-record rules for [`ValidationMode::ObjectLevel`], as
    /// name/check pairs.
    #[must_use]
    pub fn record_rules(&self) -> &[(String, Arc<RecordCheck>)] {
        &self.record_rules
    }
}

impl fmt::Debug for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSchema")
            .field("fields", &self.fields)
            .field("validation_mode", &self.validation_mode)
            .field("error_policy", &self.error_policy)
            .field("reuse_emitter", &self.reuse_emitter)
            .field(
                "record_rules",
                &self.record_rules.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.validation_mode == other.validation_mode
            && self.error_policy == other.error_policy
            && self.reuse_emitter == other.reuse_emitter
            && self.record_rules.len() == other.record_rules.len()
            && self
                .record_rules
                .iter()
                .zip(other.record_rules.iter())
                .all(|((a, _), (b, _))| a == b)
    }
}

fn infer_type(value: &RawValue) -> FieldType {
    match value {
        RawValue::Null => FieldType::Any,
        RawValue::Bool(_) => FieldType::Bool,
        RawValue::Number(n) if n.is_i64() || n.is_u64() => FieldType::Int,
        RawValue::Number(_) => FieldType::Float,
        RawValue::String(_) => FieldType::Text,
        RawValue::Array(_) => FieldType::Sequence,
        RawValue::Object(_) => FieldType::Nested,
    }
}

/// Fluent builder for explicit schemas.
#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDescriptor>,
    validation_mode: ValidationMode,
    error_policy: ErrorPolicy,
    reuse_emitter: bool,
    record_rules: Vec<(String, Arc<RecordCheck>)>,
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("fields", &self.fields)
            .field("validation_mode", &self.validation_mode)
            .field("error_policy", &self.error_policy)
            .field("reuse_emitter", &self.reuse_emitter)
            .field(
                "record_rules",
                &self.record_rules.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SchemaBuilder {
    /// New builder with no fields, validation off, and the `Halt` policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. Position is assigned from insertion order.
    #[must_use]
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Sets the validation granularity.
    #[must_use]
    pub fn validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = mode;
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Allows sinks to reuse one emitter buffer across records.
    #[must_use]
    pub fn reuse_emitter(mut self, reuse: bool) -> Self {
        self.reuse_emitter = reuse;
        self
    }

    /// Adds a whole-record rule, checked under
    /// [`ValidationMode::ObjectLevel`].
    #[must_use]
    pub fn record_rule(
        mut self,
        name: impl Into<String>,
        check: impl Fn(&Record) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.record_rules.push((name.into(), Arc::new(check)));
        self
    }

    /// Finalizes the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Empty`] when no fields were added,
    /// [`SchemaError::DuplicateField`] when two fields share a name, and
    /// [`SchemaError::ConverterRequired`] when a field declares
    /// [`FieldType::Custom`] without a converter.
    pub fn build(mut self) -> Result<RecordSchema, SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (position, field) in self.fields.iter_mut().enumerate() {
            field.position = position;
        }
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if field.field_type == FieldType::Custom && field.converter.is_none() {
                return Err(SchemaError::ConverterRequired(field.name.clone()));
            }
        }
        Ok(RecordSchema {
            fields: self.fields,
            validation_mode: self.validation_mode,
            error_policy: self.error_policy,
            reuse_emitter: self.reuse_emitter,
            record_rules: self.record_rules,
        })
    }
}
