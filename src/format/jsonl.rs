//! Newline-delimited JSON adapter.
//!
//! One token group per line. Empty and whitespace-only lines are skipped on
//! read. Lines that hold a JSON object become keyed groups with the object's
//! own field order; a JSON array becomes a positional group; any other JSON
//! value becomes a single-field scalar group.
//!
//! This adapter is always compiled: besides being the default wire format,
//! it stores the external sorter's spill segments.

use crate::format::{TokenGroup, TokenSink, TokenSource, compression};
use crate::record::Shape;
use crate::value::RawValue;
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Lines, Read, Write};
use std::path::Path;

/// Streaming reader of newline-delimited JSON.
pub struct JsonLinesSource<R: Read> {
    lines: Lines<BufReader<R>>,
    line_no: usize,
}

impl<R: Read> JsonLinesSource<R> {
    /// Wraps any byte reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line_no: 0,
        }
    }
}

impl JsonLinesSource<Box<dyn Read>> {
    /// Opens a file, decompressing transparently for `.gz` paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(compression::open_reader(path)?))
    }
}

impl<R: Read> TokenSource for JsonLinesSource<R> {
    fn next_token_group(&mut self) -> Result<Option<TokenGroup>> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            self.line_no += 1;
            let line = line.with_context(|| format!("read line {}", self.line_no))?;
            let text = line.trim_start();
            if text.is_empty() {
                continue;
            }
            let group = parse_line(text)
                .with_context(|| format!("parse JSONL line {}: {}", self.line_no, line))?;
            return Ok(Some(group));
        }
    }
}

fn parse_line(text: &str) -> serde_json::Result<TokenGroup> {
    if text.starts_with('{') {
        return serde_json::from_str::<TokenGroup>(text);
    }
    if text.starts_with('[') {
        let items: Vec<RawValue> = serde_json::from_str(text)?;
        return Ok(Shape::Positional(items).into_record());
    }
    let value: RawValue = serde_json::from_str(text)?;
    Ok(Shape::Scalar(value).into_record())
}

/// Streaming writer of newline-delimited JSON, one group per line.
pub struct JsonLinesSink<W: Write> {
    out: BufWriter<W>,
    scratch: Vec<u8>,
    reuse: bool,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wraps any byte writer.
    pub fn new(writer: W) -> Self {
        Self {
            out: BufWriter::new(writer),
            scratch: Vec::new(),
            reuse: false,
        }
    }
}

impl JsonLinesSink<Box<dyn Write>> {
    /// Creates a file, compressing transparently for `.gz` paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(compression::open_writer(path)?))
    }
}

impl<W: Write> TokenSink for JsonLinesSink<W> {
    fn emit_token_group(&mut self, group: &TokenGroup) -> Result<()> {
        if self.reuse {
            self.scratch.clear();
            serde_json::to_writer(&mut self.scratch, group).context("serialize record")?;
            self.scratch.push(b'\n');
            self.out.write_all(&self.scratch).context("write record")?;
        } else {
            let mut buf = serde_json::to_vec(group).context("serialize record")?;
            buf.push(b'\n');
            self.out.write_all(&buf).context("write record")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().context("flush sink")
    }

    fn set_reuse_hint(&mut self, reuse: bool) {
        self.reuse = reuse;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use serde_json::json;

    fn read_all(text: &str) -> Vec<TokenGroup> {
        let mut source = JsonLinesSource::new(text.as_bytes());
        let mut out = Vec::new();
        while let Some(group) = source.next_token_group().unwrap() {
            out.push(group);
        }
        out
    }

    #[test]
    fn object_lines_keep_field_order() {
        let groups = read_all("{\"z\":1,\"a\":2}\n\n{\"a\":3}\n");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].names().collect::<Vec<_>>(), vec!["z", "a"]);
    }

    #[test]
    fn arrays_and_scalars_become_shaped_groups() {
        let groups = read_all("[10, 20]\n\"lone\"\n42\n");
        assert_eq!(groups[0].get("column_2"), Some(&json!(20)));
        assert_eq!(groups[1].get("value"), Some(&json!("lone")));
        assert_eq!(groups[2].get("value"), Some(&json!(42)));
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let mut source = JsonLinesSource::new("{\"ok\":1}\n{broken\n".as_bytes());
        source.next_token_group().unwrap();
        let err = source.next_token_group().unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn reuse_hint_does_not_change_output_bytes() {
        let records: Vec<Record> = (0..3)
            .map(|i| {
                Record::from_pairs([
                    ("id".to_string(), json!(i)),
                    ("name".to_string(), json!(format!("r{i}"))),
                ])
            })
            .collect();

        let mut plain = Vec::new();
        let mut reused = Vec::new();
        {
            let mut sink = JsonLinesSink::new(&mut plain);
            for rec in &records {
                sink.emit_token_group(rec).unwrap();
            }
            sink.flush().unwrap();
        }
        {
            let mut sink = JsonLinesSink::new(&mut reused);
            sink.set_reuse_hint(true);
            for rec in &records {
                sink.emit_token_group(rec).unwrap();
            }
            sink.flush().unwrap();
        }
        assert_eq!(plain, reused);
        assert!(!plain.is_empty());
    }
}
