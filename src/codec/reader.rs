//! The read half of the codec.

use crate::codec::{Direction, Processed, SharedDiagnostics, marshal};
use crate::format::TokenSource;
use crate::record::Record;
use crate::schema::RecordSchema;
use anyhow::{Context, Result};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Reading,
    Done,
    Failed,
}

/// Lazy, policy-aware record reader over a token source.
///
/// The reader is an [`Iterator`] of `Result<Record>`. Records are pulled
/// one at a time; nothing is buffered beyond the group in flight. When no
/// schema was supplied, one is inferred from the first token group and that
/// same group is then processed normally, exactly once.
///
/// The sequence is finite and not restartable. After the source is
/// exhausted, or after a fatal error under the `Halt` policy, the iterator
/// yields `None` forever; re-reading requires a fresh reader.
///
/// # Example
///
/// ```
/// use rowbeam::codec::RecordReader;
/// use rowbeam::format::jsonl::JsonLinesSource;
///
/// let data = "{\"id\":1,\"name\":\"Tom\"}\n{\"id\":2,\"name\":\"Mark\"}\n";
/// let reader = RecordReader::new(JsonLinesSource::new(data.as_bytes()));
/// let records = reader.collect::<anyhow::Result<Vec<_>>>()?;
/// assert_eq!(records.len(), 2);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct RecordReader<S: TokenSource> {
    source: S,
    schema: Option<Arc<RecordSchema>>,
    diagnostics: Option<SharedDiagnostics>,
    state: State,
    index: u64,
    records_read: u64,
    records_skipped: u64,
}

impl<S: TokenSource> RecordReader<S> {
    /// Reader with schema inferred from the first token group.
    pub fn new(source: S) -> Self {
        Self {
            source,
            schema: None,
            diagnostics: None,
            state: State::Idle,
            index: 0,
            records_read: 0,
            records_skipped: 0,
        }
    }

    /// Uses an explicit schema instead of inferring one.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<RecordSchema>) -> Self {
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

    /// Records yielded so far.
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Records dropped by a non-halting policy so far.
    #[must_use]
    pub fn records_skipped(&self) -> u64 {
        self.records_skipped
    }

    fn pull(&mut self) -> Result<Option<Record>> {
        loop {
            let group = match self.source.next_token_group() {
                Ok(Some(group)) => group,
                Ok(None) => {
                    self.state = State::Done;
                    return Ok(None);
                }
                Err(e) => {
                    self.state = State::Failed;
                    return Err(e).with_context(|| format!("read record #{}", self.index));
                }
            };
            let index = self.index;
            self.index += 1;

            let schema = match &self.schema {
                Some(schema) => Arc::clone(schema),
                None => {
                    // Infer from the first group, then process that same
                    // group through the normal path.
                    let schema = Arc::new(RecordSchema::infer(&group));
                    self.schema = Some(Arc::clone(&schema));
                    schema
                }
            };

            match marshal(
                &group,
                &schema,
                index,
                self.diagnostics.as_ref(),
                Direction::Read,
            ) {
                Processed::Emit(record) => {
                    self.records_read += 1;
                    return Ok(Some(record));
                }
                Processed::Skip => {
                    self.records_skipped += 1;
                }
                Processed::Fatal(e) => {
                    self.state = State::Failed;
                    return Err(e);
                }
            }
        }
    }
}

impl<S: TokenSource> Iterator for RecordReader<S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Done | State::Failed => return None,
            State::Idle => self.state = State::Reading,
            State::Reading => {}
        }
        self.pull().transpose()
    }
}
