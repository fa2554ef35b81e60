//! Testing utilities: in-memory token sources and sinks.
//!
//! These mocks let codec behavior be tested without files or format
//! parsing. [`VecSource`] feeds a prepared list of token groups;
//! [`CollectSink`] records everything a writer emits, along with flush
//! counts and the reuse hint it received.
//!
//! # Example
//!
//! ```
//! use rowbeam::codec::RecordReader;
//! use rowbeam::testing::{VecSource, record};
//! use serde_json::json;
//!
//! let source = VecSource::new(vec![
//!     record(&[("id", json!(1))]),
//!     record(&[("id", json!(2))]),
//! ]);
//! let count = RecordReader::new(source).count();
//! assert_eq!(count, 2);
//! ```

use crate::format::{TokenGroup, TokenSink, TokenSource};
use crate::record::Record;
use crate::value::RawValue;
use anyhow::Result;

/// Builds a record from name/value slices, for concise test data.
#[must_use]
pub fn record(pairs: &[(&str, RawValue)]) -> Record {
    Record::from_pairs(pairs.iter().map(|(n, v)| ((*n).to_string(), v.clone())))
}

/// Token source backed by a prepared list of groups.
pub struct VecSource {
    groups: std::vec::IntoIter<TokenGroup>,
    fail_after: Option<usize>,
    served: usize,
}

impl VecSource {
    /// Source over the given groups, in order.
    #[must_use]
    pub fn new(groups: Vec<TokenGroup>) -> Self {
        Self {
            groups: groups.into_iter(),
            fail_after: None,
            served: 0,
        }
    }

    /// Makes the source fail with an I/O-style error after serving `n`
    /// groups, to exercise fatal stream handling.
    #[must_use]
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl TokenSource for VecSource {
    fn next_token_group(&mut self) -> Result<Option<TokenGroup>> {
        if let Some(limit) = self.fail_after
            && self.served >= limit
        {
            anyhow::bail!("mock source failure after {limit} groups");
        }
        self.served += 1;
        Ok(self.groups.next())
    }
}

/// Token sink that records everything it receives.
#[derive(Default)]
pub struct CollectSink {
    emitted: Vec<TokenGroup>,
    flushes: usize,
    reuse_hint: Option<bool>,
    fail_writes: bool,
}

impl CollectSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every emit fail, to exercise fatal sink handling.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Groups emitted so far, in order.
    #[must_use]
    pub fn emitted(&self) -> &[TokenGroup] {
        &self.emitted
    }

    /// Consumes the sink into its emitted groups.
    #[must_use]
    pub fn into_emitted(self) -> Vec<TokenGroup> {
        self.emitted
    }

    /// Number of flushes received.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// The last reuse hint received, if any.
    #[must_use]
    pub fn reuse_hint(&self) -> Option<bool> {
        self.reuse_hint
    }
}

impl TokenSink for CollectSink {
    fn emit_token_group(&mut self, group: &TokenGroup) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("mock sink failure");
        }
        self.emitted.push(group.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn set_reuse_hint(&mut self, reuse: bool) {
        self.reuse_hint = Some(reuse);
    }
}
