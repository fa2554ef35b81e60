//! End-to-end read/write round trips over real files.

use anyhow::Result;
use rowbeam::codec::{RecordReader, RecordWriter};
use rowbeam::format::jsonl::{JsonLinesSink, JsonLinesSource};
use rowbeam::testing::record;
use rowbeam::{FieldDescriptor, FieldType, Record, SchemaBuilder, ValueConverter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::sync::Arc;

fn sample_records() -> Vec<Record> {
    vec![
        record(&[
            ("id", json!(1)),
            ("name", json!("Tom")),
            ("score", json!(-3.25)),
            ("tags", json!(["a", "b"])),
        ]),
        record(&[
            ("id", json!(2)),
            ("name", json!("Łukasz")),
            ("score", json!(null)),
            ("tags", json!([])),
        ]),
        record(&[
            ("id", json!(9000000000i64)),
            ("name", json!("Lou")),
            ("score", json!(2.5)),
            ("tags", json!([{"deep": true}])),
        ]),
    ]
}

#[test]
fn jsonl_file_round_trip_preserves_records() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("records.jsonl");

    let mut writer = RecordWriter::new(JsonLinesSink::from_path(&path)?);
    for rec in sample_records() {
        writer.write(&rec)?;
    }
    writer.close()?;

    let reader = RecordReader::new(JsonLinesSource::from_path(&path)?);
    let back = reader.collect::<Result<Vec<_>>>()?;

    assert_eq!(back, sample_records());
    Ok(())
}

#[test]
fn custom_converter_round_trips_exactly() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("tagged.jsonl");
    let schema = || {
        Arc::new(
            SchemaBuilder::new()
                .field(
                    FieldDescriptor::new("n")
                        .with_type(FieldType::Custom)
                        .with_converter(ValueConverter::with_inverse(
                            |raw| {
                                raw.as_str()
                                    .and_then(|s| s.strip_prefix('#'))
                                    .and_then(|s| s.parse::<i64>().ok())
                                    .map(Into::into)
                                    .ok_or_else(|| "expected #<number>".to_string())
                            },
                            |value| {
                                value
                                    .as_i64()
                                    .map(|n| json!(format!("#{n}")))
                                    .ok_or_else(|| "expected an integer".to_string())
                            },
                        )),
                )
                .build()
                .unwrap(),
        )
    };

    let mut writer = RecordWriter::new(JsonLinesSink::from_path(&path)?).with_schema(schema());
    writer.write(&record(&[("n", json!(5))]))?;
    writer.close()?;

    // The raw side carries the converter's encoding.
    assert!(fs::read_to_string(&path)?.contains("\"#5\""));

    let reader = RecordReader::new(JsonLinesSource::from_path(&path)?).with_schema(schema());
    let back = reader.collect::<Result<Vec<_>>>()?;
    assert_eq!(back, vec![record(&[("n", json!(5))])]);
    Ok(())
}

#[test]
fn typed_bridge_round_trips_structs() -> Result<()> {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        id: i64,
        city: Option<String>,
    }
    let people = vec![
        Person { name: "Tom".into(), id: 1, city: Some("NY".into()) },
        Person { name: "Mark".into(), id: 2, city: None },
    ];

    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("people.jsonl");

    let mut writer = RecordWriter::new(JsonLinesSink::from_path(&path)?);
    for person in &people {
        writer.write_serialize(person)?;
    }
    writer.close()?;

    let reader = RecordReader::new(JsonLinesSource::from_path(&path)?);
    let back = reader
        .map(|rec| rec?.deserialize_into::<Person>())
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(back, people);
    Ok(())
}

#[cfg(feature = "fmt-csv")]
#[test]
fn csv_file_round_trip_with_typed_schema() -> Result<()> {
    use rowbeam::format::csv::{CsvSink, CsvSource};

    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("in.csv");
    let output = tmp.path().join("out.csv");
    fs::write(&input, "Id,Name,City\n1,Tom,NY\n2,Mark,NJ\n3,Lou,FL\n")?;

    let schema = Arc::new(
        SchemaBuilder::new()
            .field(FieldDescriptor::new("Id").with_type(FieldType::Int))
            .field(FieldDescriptor::new("Name"))
            .field(FieldDescriptor::new("City"))
            .build()
            .unwrap(),
    );
    let reader = RecordReader::new(CsvSource::from_path(&input, true)?).with_schema(schema);
    let records = reader.collect::<Result<Vec<_>>>()?;
    assert_eq!(records[0].get("Id"), Some(&json!(1)));

    let mut writer = RecordWriter::new(CsvSink::from_path(&output, true)?);
    for rec in &records {
        writer.write(rec)?;
    }
    writer.close()?;

    assert_eq!(
        fs::read_to_string(&output)?,
        "Id,Name,City\n1,Tom,NY\n2,Mark,NJ\n3,Lou,FL\n"
    );
    Ok(())
}
