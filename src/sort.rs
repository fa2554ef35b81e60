//! External merge sort over record sequences.
//!
//! [`ExternalSorter`] sorts a lazy sequence of records with bounded memory.
//! Records accumulate in a buffer until the configured [`MemoryBudget`] is
//! reached; the buffer is sorted (in parallel under the `parallel-sort`
//! feature) and persisted as a spill segment in JSON Lines form, the same
//! record I/O used for the main stream. Once the input is exhausted the
//! segments are merged lazily through a min-heap, so the sorted sequence
//! materializes one record at a time.
//!
//! Inputs that fit inside the budget never touch disk. Spill segments live
//! in a private temporary directory that is removed when the sorted
//! sequence is drained or dropped, on every path.
//!
//! The sort is stable: records that compare equal keep their input order,
//! both inside one segment and across segments.
//!
//! # Example
//!
//! ```
//! use rowbeam::Record;
//! use rowbeam::sort::{ExternalSorter, by_field};
//! use serde_json::json;
//!
//! let input = [("Tom", 1), ("Mark", 2), ("Lou", 3)].map(|(name, id)| {
//!     Ok(Record::from_pairs([
//!         ("Id".to_string(), json!(id)),
//!         ("Name".to_string(), json!(name)),
//!     ]))
//! });
//! let sorter = ExternalSorter::with_comparator(by_field("Name"));
//! let sorted = sorter.sort(input)?.collect::<anyhow::Result<Vec<_>>>()?;
//! assert_eq!(sorted[0].get("Name"), Some(&json!("Lou")));
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::format::jsonl::{JsonLinesSink, JsonLinesSource};
use crate::format::{TokenSink, TokenSource};
use crate::record::Record;
use crate::value::{RawValue, compare_values};
use anyhow::{Context, Result};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Comparator over two records.
pub type RecordComparator = Arc<dyn Fn(&Record, &Record) -> Ordering + Send + Sync>;

/// Comparator on one field, ascending, using the total value order.
pub fn by_field(name: impl Into<String>) -> RecordComparator {
    let name = name.into();
    Arc::new(move |a, b| {
        compare_values(
            a.get(&name).unwrap_or(&RawValue::Null),
            b.get(&name).unwrap_or(&RawValue::Null),
        )
    })
}

/// Comparator on several fields, ascending, most significant first.
pub fn by_fields(names: &[&str]) -> RecordComparator {
    let names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();
    Arc::new(move |a, b| {
        for name in &names {
            let ord = compare_values(
                a.get(name).unwrap_or(&RawValue::Null),
                b.get(name).unwrap_or(&RawValue::Null),
            );
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    })
}

/// Reverses a comparator.
pub fn descending(by: RecordComparator) -> RecordComparator {
    Arc::new(move |a, b| (*by)(a, b).reverse())
}

/// When the in-memory run buffer is considered full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryBudget {
    /// Spill after this many buffered records.
    Records(usize),
    /// Spill after the buffered records' estimated footprint reaches this
    /// many bytes.
    Bytes(usize),
}

impl Default for MemoryBudget {
    fn default() -> Self {
        MemoryBudget::Records(100_000)
    }
}

/// Sorter configuration.
#[derive(Clone, Debug, Default)]
pub struct SortConfig {
    /// Run buffer capacity.
    pub budget: MemoryBudget,
    /// Parent directory for spill storage. Defaults to the system temp
    /// directory. A private subdirectory is created either way.
    pub spill_dir: Option<PathBuf>,
}

/// Counters describing one completed partition phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Records pulled from the input.
    pub records_in: u64,
    /// Spill segments written. Zero when the input fit in memory.
    pub segments: usize,
    /// Records persisted to spill storage.
    pub spilled_records: u64,
}

/// Bounded-memory sorter for record sequences.
pub struct ExternalSorter {
    comparator: RecordComparator,
    config: SortConfig,
}

impl ExternalSorter {
    /// Sorter with the given comparison closure and default configuration.
    pub fn new(
        comparator: impl Fn(&Record, &Record) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        Self::with_comparator(Arc::new(comparator))
    }

    /// Sorter from a shared comparator, such as [`by_field`].
    #[must_use]
    pub fn with_comparator(comparator: RecordComparator) -> Self {
        Self {
            comparator,
            config: SortConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SortConfig) -> Self {
        self.config = config;
        self
    }

    /// Sorts a record sequence.
    ///
    /// Consumes the whole input during the partition phase; the returned
    /// sequence then yields records lazily in comparator order.
    ///
    /// # Errors
    ///
    /// Returns an error when the input yields one or spill storage fails.
    /// Either way all spill files written so far are removed.
    pub fn sort<I>(&self, input: I) -> Result<SortedRecords>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let mut buffer: Vec<Record> = Vec::new();
        let mut buffered_bytes = 0usize;
        let mut stats = SortStats::default();
        let mut spill: Option<SpillStore> = None;

        for record in input {
            let record = record.context("pull record for sort")?;
            stats.records_in += 1;
            buffered_bytes += record.estimated_size();
            buffer.push(record);

            if self.budget_reached(buffer.len(), buffered_bytes) {
                if spill.is_none() {
                    spill = Some(SpillStore::create(self.config.spill_dir.as_deref())?);
                }
                if let Some(store) = spill.as_mut() {
                    self.sort_buffer(&mut buffer);
                    store.write_segment(&buffer)?;
                    buffer.clear();
                    buffered_bytes = 0;
                }
            }
        }

        let inner = match spill {
            None => {
                self.sort_buffer(&mut buffer);
                Inner::Memory(buffer.into_iter())
            }
            Some(mut store) => {
                if !buffer.is_empty() {
                    self.sort_buffer(&mut buffer);
                    store.write_segment(&buffer)?;
                    buffer.clear();
                }
                stats.segments = store.paths.len();
                stats.spilled_records = store.spilled;
                Inner::Merge(Merge::open(store, Arc::clone(&self.comparator))?)
            }
        };
        Ok(SortedRecords { inner, stats })
    }

    fn budget_reached(&self, records: usize, bytes: usize) -> bool {
        match self.config.budget {
            MemoryBudget::Records(limit) => records >= limit.max(1),
            MemoryBudget::Bytes(limit) => bytes >= limit.max(1),
        }
    }

    #[cfg(feature = "parallel-sort")]
    fn sort_buffer(&self, buffer: &mut [Record]) {
        use rayon::prelude::*;
        let by = Arc::clone(&self.comparator);
        buffer.par_sort_by(move |a, b| (*by)(a, b));
    }

    #[cfg(not(feature = "parallel-sort"))]
    fn sort_buffer(&self, buffer: &mut [Record]) {
        buffer.sort_by(|a, b| (*self.comparator)(a, b));
    }
}

/// The sorted sequence produced by [`ExternalSorter::sort`].
///
/// Dropping it before exhaustion removes spill storage; draining it removes
/// spill storage eagerly, before the final `None`.
pub struct SortedRecords {
    inner: Inner,
    stats: SortStats,
}

impl SortedRecords {
    /// Partition-phase counters.
    #[must_use]
    pub fn stats(&self) -> &SortStats {
        &self.stats
    }
}

impl fmt::Debug for SortedRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedRecords")
            .field("stats", &self.stats)
            .finish()
    }
}

enum Inner {
    Memory(std::vec::IntoIter<Record>),
    Merge(Merge),
}

impl Iterator for SortedRecords {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Memory(records) => records.next().map(Ok),
            Inner::Merge(merge) => merge.next_merged().transpose(),
        }
    }
}

/// Private temp directory holding sorted runs.
struct SpillStore {
    dir: TempDir,
    paths: Vec<PathBuf>,
    spilled: u64,
}

impl SpillStore {
    fn create(parent: Option<&Path>) -> Result<Self> {
        let builder_result = match parent {
            Some(parent) => tempfile::Builder::new()
                .prefix("rowbeam-sort-")
                .tempdir_in(parent),
            None => tempfile::Builder::new().prefix("rowbeam-sort-").tempdir(),
        };
        let dir = builder_result.context("create spill directory")?;
        Ok(Self {
            dir,
            paths: Vec::new(),
            spilled: 0,
        })
    }

    fn write_segment(&mut self, records: &[Record]) -> Result<()> {
        let path = self
            .dir
            .path()
            .join(format!("segment-{:05}.jsonl", self.paths.len()));
        let file =
            File::create(&path).with_context(|| format!("create spill {}", path.display()))?;
        let mut sink = JsonLinesSink::new(file);
        sink.set_reuse_hint(true);
        for record in records {
            sink.emit_token_group(record)
                .with_context(|| format!("spill to {}", path.display()))?;
        }
        sink.flush()?;
        self.paths.push(path);
        self.spilled += records.len() as u64;
        Ok(())
    }
}

/// Heap element: the head record of one open segment. Ordered by the
/// comparator, then by segment index so ties keep spill order.
struct HeapEntry {
    record: Record,
    segment: usize,
    by: RecordComparator,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self.by)(&self.record, &other.record)
            .then_with(|| self.segment.cmp(&other.segment))
    }
}

/// K-way merge over open spill segments.
struct Merge {
    heap: BinaryHeap<Reverse<HeapEntry>>,
    cursors: Vec<JsonLinesSource<File>>,
    store: Option<SpillStore>,
    by: RecordComparator,
    failed: bool,
}

impl Merge {
    fn open(store: SpillStore, by: RecordComparator) -> Result<Self> {
        let mut heap = BinaryHeap::with_capacity(store.paths.len());
        let mut cursors = Vec::with_capacity(store.paths.len());
        for (segment, path) in store.paths.iter().enumerate() {
            let file =
                File::open(path).with_context(|| format!("open spill {}", path.display()))?;
            let mut cursor = JsonLinesSource::new(file);
            if let Some(record) = cursor
                .next_token_group()
                .with_context(|| format!("read spill {}", path.display()))?
            {
                heap.push(Reverse(HeapEntry {
                    record,
                    segment,
                    by: Arc::clone(&by),
                }));
            }
            cursors.push(cursor);
        }
        Ok(Self {
            heap,
            cursors,
            store: Some(store),
            by,
            failed: false,
        })
    }

    fn next_merged(&mut self) -> Result<Option<Record>> {
        if self.failed {
            return Ok(None);
        }
        let Some(Reverse(entry)) = self.heap.pop() else {
            self.release();
            return Ok(None);
        };
        match self.cursors[entry.segment].next_token_group() {
            Ok(Some(record)) => self.heap.push(Reverse(HeapEntry {
                record,
                segment: entry.segment,
                by: Arc::clone(&self.by),
            })),
            Ok(None) => {}
            Err(e) => {
                self.failed = true;
                self.release();
                return Err(e).context("advance spill segment");
            }
        }
        Ok(Some(entry.record))
    }

    /// Closes segment handles and removes the spill directory.
    fn release(&mut self) {
        self.cursors.clear();
        if let Some(store) = self.store.take() {
            let _ = store.dir.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(id: i64, name: &str) -> Record {
        Record::from_pairs([
            ("Id".to_string(), json!(id)),
            ("Name".to_string(), json!(name)),
        ])
    }

    fn names(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get("Name").and_then(RawValue::as_str).unwrap().to_string())
            .collect()
    }

    #[test]
    fn in_memory_sort_orders_by_comparator() {
        let input = vec![Ok(rec(1, "Tom")), Ok(rec(2, "Mark")), Ok(rec(3, "Lou"))];
        let sorter = ExternalSorter::with_comparator(by_field("Name"));
        let sorted = sorter.sort(input).unwrap();
        assert_eq!(sorted.stats().segments, 0);
        let out = sorted.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(names(&out), vec!["Lou", "Mark", "Tom"]);
        assert_eq!(out[0].get("Id"), Some(&json!(3)));
    }

    #[test]
    fn descending_reverses_the_field_order() {
        let input = vec![Ok(rec(1, "Tom")), Ok(rec(3, "Lou")), Ok(rec(2, "Mark"))];
        let sorter = ExternalSorter::with_comparator(descending(by_field("Name")));
        let out = sorter.sort(input).unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(names(&out), vec!["Tom", "Mark", "Lou"]);
    }

    #[test]
    fn multi_field_comparator_breaks_ties_on_later_fields() {
        let input = vec![
            Ok(rec(2, "Tom")),
            Ok(rec(1, "Tom")),
            Ok(rec(1, "Lou")),
        ];
        let sorter = ExternalSorter::with_comparator(by_fields(&["Name", "Id"]));
        let out = sorter.sort(input).unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(
            out.iter().map(|r| r.get("Id").cloned().unwrap()).collect::<Vec<_>>(),
            vec![json!(1), json!(1), json!(2)]
        );
        assert_eq!(names(&out), vec!["Lou", "Tom", "Tom"]);
    }

    #[test]
    fn input_error_aborts_the_sort() {
        let input = vec![
            Ok(rec(1, "Tom")),
            Err(anyhow::anyhow!("source broke")),
            Ok(rec(2, "Mark")),
        ];
        let sorter = ExternalSorter::with_comparator(by_field("Name"));
        assert!(sorter.sort(input).is_err());
    }
}
