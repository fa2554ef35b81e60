//! Delimited-text adapter (feature `fmt-csv`).
//!
//! Reading yields tabular groups: column names come from the header row when
//! one is present, otherwise positional names are synthesized from the first
//! row's width. Cell values arrive as text (empty cells as null); typed
//! interpretation is the schema's job, not the adapter's.
//!
//! Writing renders scalar fields only. The header row is taken from the
//! first group's field order when headers are enabled.

use crate::format::{TokenGroup, TokenSink, TokenSource, compression};
use crate::record::{Record, positional_name};
use crate::value::RawValue;
use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{Read, Write};
use std::path::Path;

/// Streaming reader of delimited text.
pub struct CsvSource<R: Read> {
    reader: csv::Reader<R>,
    columns: Option<Vec<String>>,
    has_headers: bool,
    row: StringRecord,
    row_no: u64,
}

impl<R: Read> CsvSource<R> {
    /// Wraps any byte reader. When `has_headers` is `true` the first row
    /// names the columns; otherwise columns are `column_1`, `column_2`, ...
    pub fn new(reader: R, has_headers: bool) -> Self {
        Self::with_delimiter(reader, has_headers, b',')
    }

    /// Like [`CsvSource::new`] with an explicit field delimiter.
    pub fn with_delimiter(reader: R, has_headers: bool, delimiter: u8) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(has_headers)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(delimiter)
            .from_reader(reader);
        Self {
            reader,
            columns: None,
            has_headers,
            row: StringRecord::new(),
            row_no: 0,
        }
    }
}

impl CsvSource<Box<dyn Read>> {
    /// Opens a file, decompressing transparently for `.gz` paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn from_path(path: impl AsRef<Path>, has_headers: bool) -> Result<Self> {
        Ok(Self::new(compression::open_reader(path)?, has_headers))
    }
}

impl<R: Read> TokenSource for CsvSource<R> {
    fn next_token_group(&mut self) -> Result<Option<TokenGroup>> {
        if self.columns.is_none() && self.has_headers {
            let headers = self.reader.headers().context("read CSV header")?;
            self.columns = Some(headers.iter().map(str::to_string).collect());
        }
        let more = self
            .reader
            .read_record(&mut self.row)
            .with_context(|| format!("read CSV row {}", self.row_no + 1))?;
        if !more {
            return Ok(None);
        }
        self.row_no += 1;

        let columns = self
            .columns
            .get_or_insert_with(|| (0..self.row.len()).map(positional_name).collect());
        let mut group = Record::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            group.set(name.clone(), cell_value(self.row.get(i)));
        }
        Ok(Some(group))
    }
}

fn cell_value(cell: Option<&str>) -> RawValue {
    match cell {
        None | Some("") => RawValue::Null,
        Some(text) => RawValue::String(text.to_string()),
    }
}

/// Streaming writer of delimited text.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    columns: Option<Vec<String>>,
    has_headers: bool,
}

impl<W: Write> CsvSink<W> {
    /// Wraps any byte writer. When `has_headers` is `true` the first emitted
    /// group's field order becomes the header row.
    pub fn new(writer: W, has_headers: bool) -> Self {
        Self::with_delimiter(writer, has_headers, b',')
    }

    /// Like [`CsvSink::new`] with an explicit field delimiter.
    pub fn with_delimiter(writer: W, has_headers: bool, delimiter: u8) -> Self {
        Self {
            writer: WriterBuilder::new().delimiter(delimiter).from_writer(writer),
            columns: None,
            has_headers,
        }
    }
}

impl CsvSink<Box<dyn Write>> {
    /// Creates a file, compressing transparently for `.gz` paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn from_path(path: impl AsRef<Path>, has_headers: bool) -> Result<Self> {
        Ok(Self::new(compression::open_writer(path)?, has_headers))
    }
}

impl<W: Write> TokenSink for CsvSink<W> {
    fn emit_token_group(&mut self, group: &TokenGroup) -> Result<()> {
        if self.columns.is_none() {
            let columns: Vec<String> = group.names().map(str::to_string).collect();
            if self.has_headers {
                self.writer
                    .write_record(&columns)
                    .context("write CSV header")?;
            }
            self.columns = Some(columns);
        }
        let columns = self.columns.as_deref().unwrap_or_default();
        let mut row = Vec::with_capacity(columns.len());
        for name in columns {
            row.push(render_cell(name, group.get(name))?);
        }
        self.writer.write_record(&row).context("write CSV row")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("flush CSV sink")
    }
}

fn render_cell(name: &str, value: Option<&RawValue>) -> Result<String> {
    match value {
        None | Some(RawValue::Null) => Ok(String::new()),
        Some(RawValue::String(s)) => Ok(s.clone()),
        Some(RawValue::Number(n)) => Ok(n.to_string()),
        Some(RawValue::Bool(b)) => Ok(b.to_string()),
        Some(other) => bail!("field '{name}': CSV cannot represent {other}"),
    }
}
