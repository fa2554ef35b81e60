//! The write half of the codec.

use crate::codec::{Direction, Processed, SharedDiagnostics, marshal};
use crate::format::TokenSink;
use crate::record::{Record, Shape};
use crate::schema::RecordSchema;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::sync::Arc;

/// Policy-aware record writer over a token sink.
///
/// Mirrors [`RecordReader`](crate::codec::RecordReader): the schema is
/// resolved from the first written record when not supplied, each record is
/// converted and validated under the schema's policy, and the resulting
/// token group is emitted immediately rather than batched.
///
/// [`write`](RecordWriter::write) returns `Ok(false)` when a non-halting
/// policy skipped the record. After a fatal error the writer refuses
/// further writes.
///
/// # Example
///
/// ```
/// use rowbeam::Record;
/// use rowbeam::codec::RecordWriter;
/// use rowbeam::format::jsonl::JsonLinesSink;
/// use serde_json::json;
///
/// let mut out = Vec::new();
/// let mut writer = RecordWriter::new(JsonLinesSink::new(&mut out));
/// writer.write(&Record::from_pairs([("id".to_string(), json!(1))]))?;
/// writer.close()?;
/// assert_eq!(String::from_utf8(out)?, "{\"id\":1}\n");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct RecordWriter<K: TokenSink> {
    sink: K,
    schema: Option<Arc<RecordSchema>>,
    diagnostics: Option<SharedDiagnostics>,
    failed: bool,
    index: u64,
    records_written: u64,
    records_skipped: u64,
}

impl<K: TokenSink> RecordWriter<K> {
    /// Writer with schema inferred from the first written record.
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            schema: None,
            diagnostics: None,
            failed: false,
            index: 0,
            records_written: 0,
            records_skipped: 0,
        }
    }

    /// Uses an explicit schema instead of inferring one. The schema's
    /// emitter-reuse hint is passed to the sink.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<RecordSchema>) -> Self {
        self.sink.set_reuse_hint(schema.reuse_emitter());
        self.schema = Some(schema);
        self
    }

    /// Collects skip events into `diagnostics` under non-halting policies.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: SharedDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// The schema in effect, once resolved.
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<RecordSchema>> {
        self.schema.as_ref()
    }

    /// The underlying sink.
    #[must_use]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Records emitted so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Records dropped by a non-halting policy so far.
    #[must_use]
    pub fn records_skipped(&self) -> u64 {
        self.records_skipped
    }

    /// Converts, validates, and emits one record.
    ///
    /// # Returns
    ///
    /// `Ok(true)` when the record was emitted, `Ok(false)` when a
    /// non-halting policy skipped it.
    ///
    /// # Errors
    ///
    /// Returns an error on conversion or validation failure under the
    /// `Halt` policy, or when the sink fails. Both are fatal; subsequent
    /// writes are rejected.
    pub fn write(&mut self, record: &Record) -> Result<bool> {
        if self.failed {
            bail!("writer is stopped after a fatal error");
        }
        let schema = match &self.schema {
            Some(schema) => Arc::clone(schema),
            None => {
                let schema = Arc::new(RecordSchema::infer(record));
                self.sink.set_reuse_hint(schema.reuse_emitter());
                self.schema = Some(Arc::clone(&schema));
                schema
            }
        };
        let index = self.index;
        self.index += 1;

        match marshal(
            record,
            &schema,
            index,
            self.diagnostics.as_ref(),
            Direction::Write,
        ) {
            Processed::Emit(group) => {
                if let Err(e) = self.sink.emit_token_group(&group) {
                    self.failed = true;
                    return Err(e).with_context(|| format!("write record #{index}"));
                }
                self.records_written += 1;
                Ok(true)
            }
            Processed::Skip => {
                self.records_skipped += 1;
                Ok(false)
            }
            Processed::Fatal(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    /// Materializes a shape and writes it.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`write`](RecordWriter::write).
    pub fn write_shape(&mut self, shape: Shape) -> Result<bool> {
        self.write(&shape.into_record())
    }

    /// Serializes any Serde value into a record and writes it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails, plus the failure modes of
    /// [`write`](RecordWriter::write).
    pub fn write_serialize<T: Serialize>(&mut self, value: &T) -> Result<bool> {
        let record = Record::from_serialize(value)?;
        self.write(&record)
    }

    /// Drains an iterator of records into the sink.
    ///
    /// Accepts `Result` items so a [`RecordReader`](crate::codec::RecordReader)
    /// or a sorted sequence can be piped in directly; an `Err` item aborts
    /// the drain.
    ///
    /// # Returns
    ///
    /// The number of records emitted, excluding policy skips.
    ///
    /// # Errors
    ///
    /// Returns an error when the input yields one or a write fails.
    pub fn write_all<I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let mut written = 0;
        for record in records {
            let record = record.context("pull record for write")?;
            if self.write(&record)? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Flushes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the sink fails to flush.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }

    /// Flushes and consumes the writer.
    ///
    /// # Errors
    ///
    /// Returns an error when the final flush fails.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}

impl<K: TokenSink> Drop for RecordWriter<K> {
    fn drop(&mut self) {
        if !self.failed {
            let _ = self.sink.flush();
        }
    }
}
