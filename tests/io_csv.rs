//! CSV file I/O: headers, positional naming, delimiters, empty cells.

#![cfg(feature = "fmt-csv")]

use anyhow::Result;
use rowbeam::codec::{RecordReader, RecordWriter};
use rowbeam::format::csv::{CsvSink, CsvSource};
use rowbeam::testing::record;
use rowbeam::{FieldDescriptor, FieldType, SchemaBuilder};
use serde_json::json;
use std::fs;
use std::sync::Arc;

#[test]
fn headers_name_the_fields_and_whitespace_is_trimmed() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("people.csv");
    fs::write(&path, "Id, Name, City\n1, Tom, NY\n")?;

    let records = RecordReader::new(CsvSource::from_path(&path, true)?)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(
        records[0].names().collect::<Vec<_>>(),
        vec!["Id", "Name", "City"]
    );
    assert_eq!(records[0].get("Name"), Some(&json!("Tom")));
    Ok(())
}

#[test]
fn headerless_files_use_positional_names() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("bare.csv");
    fs::write(&path, "1,Tom\n2,Mark\n")?;

    let records = RecordReader::new(CsvSource::from_path(&path, false)?)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("column_1"), Some(&json!("1")));
    assert_eq!(records[1].get("column_2"), Some(&json!("Mark")));
    Ok(())
}

#[test]
fn typed_schema_coerces_text_cells() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("typed.csv");
    fs::write(&path, "Id,Score,Active\n1,2.5,true\n2,0.5,false\n")?;

    let schema = Arc::new(
        SchemaBuilder::new()
            .field(FieldDescriptor::new("Id").with_type(FieldType::Int))
            .field(FieldDescriptor::new("Score").with_type(FieldType::Float))
            .field(FieldDescriptor::new("Active").with_type(FieldType::Bool))
            .build()
            .unwrap(),
    );
    let records = RecordReader::new(CsvSource::from_path(&path, true)?)
        .with_schema(schema)
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(records[0].get("Id"), Some(&json!(1)));
    assert_eq!(records[0].get("Score"), Some(&json!(2.5)));
    assert_eq!(records[1].get("Active"), Some(&json!(false)));
    Ok(())
}

#[test]
fn alternate_delimiters_parse_and_render() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("in.csv");
    let output = tmp.path().join("out.csv");
    fs::write(&input, "Id;Name\n1;Tom\n")?;

    let source = CsvSource::with_delimiter(fs::File::open(&input)?, true, b';');
    let records = RecordReader::new(source).collect::<Result<Vec<_>>>()?;
    assert_eq!(records[0].get("Name"), Some(&json!("Tom")));

    let sink = CsvSink::with_delimiter(fs::File::create(&output)?, true, b';');
    let mut writer = RecordWriter::new(sink);
    for rec in &records {
        writer.write(rec)?;
    }
    writer.close()?;

    assert_eq!(fs::read_to_string(&output)?, "Id;Name\n1;Tom\n");
    Ok(())
}

#[test]
fn empty_cells_read_as_null_and_write_back_empty() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("gaps.csv");
    let output = tmp.path().join("gaps-out.csv");
    fs::write(&input, "a,b\n1,\n,2\n")?;

    let records = RecordReader::new(CsvSource::from_path(&input, true)?)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(records[0].get("b"), Some(&json!(null)));
    assert_eq!(records[1].get("a"), Some(&json!(null)));

    let mut writer = RecordWriter::new(CsvSink::from_path(&output, true)?);
    for rec in &records {
        writer.write(rec)?;
    }
    writer.close()?;
    assert_eq!(fs::read_to_string(&output)?, "a,b\n1,\n,2\n");
    Ok(())
}

#[test]
fn nested_values_are_rejected_by_the_sink() {
    let mut writer = RecordWriter::new(CsvSink::new(Vec::new(), true));
    let err = writer
        .write(&record(&[("blob", json!({"deep": 1}))]))
        .unwrap_err();
    assert!(format!("{err:#}").contains("blob"));
}

#[cfg(feature = "compression-gzip")]
#[test]
fn csv_gz_round_trips_by_extension() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("people.csv.gz");

    let mut writer = RecordWriter::new(CsvSink::from_path(&path, true)?);
    writer.write(&record(&[("Id", json!("1")), ("Name", json!("Tom"))]))?;
    writer.close()?;

    let bytes = fs::read(&path)?;
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

    let records = RecordReader::new(CsvSource::from_path(&path, true)?)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(records[0].get("Name"), Some(&json!("Tom")));
    Ok(())
}
