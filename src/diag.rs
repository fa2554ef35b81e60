//! Diagnostic events for report-and-continue streams.
//!
//! Under [`ErrorPolicy::ReportAndContinue`](crate::ErrorPolicy) the codec
//! skips failing records instead of halting. Each skip produces one
//! [`Diagnostic`] describing which record failed, which field, and why. A
//! [`DiagnosticCollector`] accumulates those events behind a mutex so a
//! reader on one thread and an inspector on another can share it.
//!
//! # Example
//!
//! ```
//! use rowbeam::{Diagnostic, DiagnosticCollector};
//! use std::sync::{Arc, Mutex};
//!
//! let collector = Arc::new(Mutex::new(DiagnosticCollector::new()));
//! // ... hand clones of `collector` to readers and writers ...
//! let report = collector.lock().unwrap().to_json().unwrap();
//! assert_eq!(report, "[]");
//! ```

use crate::value::RawValue;
use serde::Serialize;
use std::fmt;

/// Which stage produced the diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A field value could not be converted to or from its declared type.
    Conversion,
    /// A materialized record violated one or more schema rules.
    Validation,
}

/// One skipped or patched record, with the reason.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Zero-based position of the record in its stream.
    pub record_index: u64,
    /// The stage that rejected the record.
    pub kind: DiagnosticKind,
    /// The offending field, when the failure is attributable to one.
    pub field: Option<String>,
    /// The raw value that failed, when a conversion produced the event.
    pub raw: Option<RawValue>,
    /// Human-readable description of the failure.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "record #{} field '{}': {}",
                self.record_index, field, self.message
            ),
            None => write!(f, "record #{}: {}", self.record_index, self.message),
        }
    }
}

/// Accumulates diagnostics from one or more streams.
///
/// Shared as `Arc<Mutex<DiagnosticCollector>>`; the codec locks it only long
/// enough to push an event.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    events: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Appends one event.
    pub fn push(&mut self, event: Diagnostic) {
        self.events.push(event);
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All collected events, in arrival order.
    #[must_use]
    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    /// Drops all collected events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Serializes the collected events as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self.events)?)
    }

    /// Serializes the collected events as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_in_arrival_order() {
        let mut collector = DiagnosticCollector::new();
        collector.push(Diagnostic {
            record_index: 3,
            kind: DiagnosticKind::Conversion,
            field: Some("age".into()),
            raw: Some(json!("abc")),
            message: "invalid digit".into(),
        });
        collector.push(Diagnostic {
            record_index: 7,
            kind: DiagnosticKind::Validation,
            field: None,
            raw: None,
            message: "record rule failed".into(),
        });
        assert_eq!(collector.len(), 2);
        assert_eq!(collector.events()[0].record_index, 3);
        assert_eq!(collector.events()[1].kind, DiagnosticKind::Validation);
    }

    #[test]
    fn json_report_includes_field_and_raw_value() {
        let mut collector = DiagnosticCollector::new();
        collector.push(Diagnostic {
            record_index: 0,
            kind: DiagnosticKind::Conversion,
            field: Some("id".into()),
            raw: Some(json!("x")),
            message: "not a number".into(),
        });
        let report = collector.to_json().unwrap();
        assert!(report.contains(r#""field":"id""#));
        assert!(report.contains(r#""raw":"x""#));
    }
}
