//! # Rowbeam
//!
//! A **schema-driven record engine** for Rust: streaming record I/O over
//! pluggable wire formats, field-level conversion and validation with
//! configurable failure policies, and external sorting with bounded memory.
//!
//! ## Key Features
//!
//! - **Lazy record streams** - readers and writers process one record at a
//!   time, never buffering the whole stream
//! - **Schema resolution** - explicit fluent configuration or inference from
//!   the first record, immutable afterwards
//! - **Field conversion** - built-in type coercion plus custom converter
//!   pairs, with per-field defaults and fallbacks
//! - **Validation** - member-level and object-level rules (required, length
//!   bounds, ranges, patterns, custom checks)
//! - **Failure policies** - halt on first error, skip with diagnostics, or
//!   substitute fallback values and keep going
//! - **External sort** - comparator-driven merge sort that spills sorted
//!   runs to disk when a memory budget is exceeded
//! - **Format adapters** - JSON Lines built in, CSV behind a feature flag,
//!   transparent gzip for file-backed streams
//!
//! ## Quick Start
//!
//! Read delimited text, sort it by a field with bounded memory, and write
//! it back out:
//!
//! ```
//! use rowbeam::codec::{RecordReader, RecordWriter};
//! use rowbeam::format::csv::{CsvSink, CsvSource};
//! use rowbeam::sort::{ExternalSorter, by_field};
//!
//! # fn main() -> anyhow::Result<()> {
//! let csv = "Id,Name,City\n1,Tom,NY\n2,Mark,NJ\n3,Lou,FL\n";
//!
//! let reader = RecordReader::new(CsvSource::new(csv.as_bytes(), true));
//! let sorted = ExternalSorter::with_comparator(by_field("Name")).sort(reader)?;
//!
//! let mut out = Vec::new();
//! let mut writer = RecordWriter::new(CsvSink::new(&mut out, true));
//! writer.write_all(sorted)?;
//! writer.close()?;
//!
//! assert_eq!(
//!     String::from_utf8(out)?,
//!     "Id,Name,City\n3,Lou,FL\n2,Mark,NJ\n1,Tom,NY\n",
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Records and shapes
//!
//! A [`Record`] is an ordered mapping from field name to a raw value; field
//! order is significant and survives serialization. Format adapters produce
//! records from one of four [`Shape`]s: a lone scalar, explicit name/value
//! pairs, a tabular row under a header, or a bare positional tuple.
//!
//! ### Schemas
//!
//! A [`RecordSchema`] describes a stream: field descriptors in output
//! order, a validation mode, a failure policy. Build one explicitly with
//! [`SchemaBuilder`], or let the codec infer it from the first record:
//!
//! ```
//! use rowbeam::{ErrorPolicy, FieldDescriptor, FieldType, SchemaBuilder, ValidationMode};
//! use serde_json::json;
//!
//! let schema = SchemaBuilder::new()
//!     .field(FieldDescriptor::new("id").with_type(FieldType::Int).required())
//!     .field(FieldDescriptor::new("name").with_type(FieldType::Text))
//!     .field(FieldDescriptor::new("city").with_default(json!("unknown")))
//!     .validation_mode(ValidationMode::MemberLevel)
//!     .error_policy(ErrorPolicy::ReportAndContinue)
//!     .build()?;
//! # Ok::<(), rowbeam::SchemaError>(())
//! ```
//!
//! ### Failure policies
//!
//! Conversion and validation failures are governed by the schema's
//! [`ErrorPolicy`]: `Halt` stops the stream at the first failure,
//! `ReportAndContinue` skips the record and emits a [`Diagnostic`],
//! `ReplaceAndContinue` substitutes declared fallback or default values.
//! I/O failures are always fatal.
//!
//! ### External sort
//!
//! [`sort::ExternalSorter`] consumes any record sequence and yields it in
//! comparator order. Input beyond the [`sort::MemoryBudget`] is partitioned
//! into sorted spill segments (stored as JSON Lines) and merged lazily;
//! spill storage is removed once the output is drained or dropped.
//!
//! ## Feature Flags
//!
//! - `fmt-csv` *(default)* - delimited-text adapter via the `csv` crate
//! - `compression-gzip` *(default)* - transparent `.gz` handling for
//!   file-backed adapters via `flate2`
//! - `parallel-sort` *(default)* - sort run buffers on the Rayon pool
//!
//! ## Module Overview
//!
//! - [`record`] - ordered records and input shapes
//! - [`schema`] - field descriptors, schema builder, inference
//! - [`convert`] - type coercion and custom converters
//! - [`validate`] - validation rules and the validation engine
//! - [`codec`] - policy-aware [`RecordReader`](codec::RecordReader) and
//!   [`RecordWriter`](codec::RecordWriter)
//! - [`format`] - token source/sink traits and the built-in adapters
//! - [`sort`] - bounded-memory external merge sort
//! - [`diag`] - diagnostic events for non-halting policies
//! - [`error`] - error taxonomy and failure policies
//! - [`testing`] - in-memory mocks for adapter-free tests

pub mod codec;
pub mod convert;
pub mod diag;
pub mod error;
pub mod format;
pub mod record;
pub mod schema;
pub mod sort;
pub mod testing;
pub mod validate;
pub mod value;

// General re-exports
pub use codec::{RecordReader, RecordWriter, SharedDiagnostics};
pub use convert::Converted;
pub use diag::{Diagnostic, DiagnosticCollector, DiagnosticKind};
pub use error::{ConversionError, ErrorPolicy, SchemaError, ValidationFailure};
pub use format::jsonl::{JsonLinesSink, JsonLinesSource};
pub use format::{TokenGroup, TokenSink, TokenSource};
pub use record::{Record, Shape};
pub use schema::{FieldDescriptor, FieldType, RecordSchema, SchemaBuilder, ValueConverter};
pub use sort::{ExternalSorter, MemoryBudget, SortConfig, SortStats, SortedRecords};
pub use validate::{ValidationError, ValidationMode, ValidationResult, ValidationRule};
pub use value::RawValue;

// Gated re-exports
#[cfg(feature = "fmt-csv")]
pub use format::csv::{CsvSink, CsvSource};
