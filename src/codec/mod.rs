//! Record codec: policy-driven reading and writing of record streams.
//!
//! [`RecordReader`] and [`RecordWriter`] share one marshalling pass,
//! implemented here: convert every active field, validate the materialized
//! record, and translate failures into actions according to the schema's
//! [`ErrorPolicy`]. The two halves differ only in conversion direction and
//! in which side of the adapter they talk to.

mod reader;
mod writer;

pub use reader::RecordReader;
pub use writer::RecordWriter;

use crate::convert::{self, Converted};
use crate::diag::{Diagnostic, DiagnosticCollector, DiagnosticKind};
use crate::error::{ConversionError, ErrorPolicy, ValidationFailure};
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::validate::{ValidationError, validate};
use crate::value::RawValue;
use std::sync::{Arc, Mutex};

/// Shared handle to a diagnostic collector.
pub type SharedDiagnostics = Arc<Mutex<DiagnosticCollector>>;

/// Which half of the codec is marshalling.
#[derive(Clone, Copy)]
pub(crate) enum Direction {
    /// Raw adapter values become typed field values.
    Read,
    /// Field values become the raw representation the sink expects.
    Write,
}

/// What the codec should do with one processed record.
pub(crate) enum Processed {
    /// Hand the record on.
    Emit(Record),
    /// Drop the record and continue.
    Skip,
    /// Stop the stream.
    Fatal(anyhow::Error),
}

/// Converts and validates one record under the schema's policy.
pub(crate) fn marshal(
    source: &Record,
    schema: &RecordSchema,
    index: u64,
    diagnostics: Option<&SharedDiagnostics>,
    direction: Direction,
) -> Processed {
    let policy = schema.error_policy();
    let mut out = Record::with_capacity(schema.fields().len());

    for field in schema.active_fields() {
        let raw = source.get(field.name());
        let converted = match direction {
            Direction::Read => convert::to_target(raw, field),
            Direction::Write => convert::to_raw(raw, field),
        };
        match converted {
            Converted::Value(value) | Converted::Defaulted(value) => {
                out.set(field.name(), value);
            }
            Converted::Fallback { value, error } => {
                if policy == ErrorPolicy::ReportAndContinue {
                    report_conversion(diagnostics, index, &error);
                }
                out.set(field.name(), value);
            }
            Converted::Failed(error) => match policy {
                ErrorPolicy::Halt => {
                    return Processed::Fatal(
                        anyhow::Error::new(error).context(format!("record #{index}")),
                    );
                }
                ErrorPolicy::ReportAndContinue => {
                    report_conversion(diagnostics, index, &error);
                    return Processed::Skip;
                }
                ErrorPolicy::ReplaceAndContinue => {
                    // A declared fallback would have produced the Fallback
                    // variant, so only the default can save the field here.
                    match field.default_value() {
                        Some(default) => out.set(field.name(), default.clone()),
                        None => {
                            report_conversion(diagnostics, index, &error);
                            return Processed::Skip;
                        }
                    }
                }
            },
        }
    }

    if let Err(errors) = validate(&out, schema, schema.validation_mode()) {
        match policy {
            ErrorPolicy::Halt => {
                return Processed::Fatal(anyhow::Error::new(ValidationFailure {
                    record_index: index,
                    errors,
                }));
            }
            ErrorPolicy::ReportAndContinue => {
                report_validation(diagnostics, index, &errors);
                return Processed::Skip;
            }
            ErrorPolicy::ReplaceAndContinue => {
                let mut unfixed = Vec::new();
                for error in errors {
                    match substitute_for(schema, error.field.as_deref()) {
                        Some((name, value)) => out.set(name, value),
                        None => unfixed.push(error),
                    }
                }
                if !unfixed.is_empty() {
                    report_validation(diagnostics, index, &unfixed);
                    return Processed::Skip;
                }
            }
        }
    }

    Processed::Emit(out)
}

/// The replacement value for a violating field: its fallback, else its
/// default. Whole-record violations have no field and no substitute.
fn substitute_for(schema: &RecordSchema, field: Option<&str>) -> Option<(String, RawValue)> {
    let field = schema.field(field?)?;
    let value = field.fallback_value().or(field.default_value())?;
    Some((field.name().to_string(), value.clone()))
}

fn report_conversion(diagnostics: Option<&SharedDiagnostics>, index: u64, error: &ConversionError) {
    push(
        diagnostics,
        Diagnostic {
            record_index: index,
            kind: DiagnosticKind::Conversion,
            field: Some(error.field.clone()),
            raw: Some(error.raw.clone()),
            message: error.message.clone(),
        },
    );
}

fn report_validation(
    diagnostics: Option<&SharedDiagnostics>,
    index: u64,
    errors: &[ValidationError],
) {
    let message = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    let field = match errors {
        [only] => only.field.clone(),
        _ => None,
    };
    push(
        diagnostics,
        Diagnostic {
            record_index: index,
            kind: DiagnosticKind::Validation,
            field,
            raw: None,
            message,
        },
    );
}

fn push(diagnostics: Option<&SharedDiagnostics>, event: Diagnostic) {
    if let Some(collector) = diagnostics
        && let Ok(mut collector) = collector.lock()
    {
        collector.push(event);
    }
}
