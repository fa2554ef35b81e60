//! Schema inference over live streams and diagnostic reporting.

use anyhow::Result;
use rowbeam::codec::RecordReader;
use rowbeam::format::jsonl::JsonLinesSource;
use rowbeam::testing::{VecSource, record};
use rowbeam::{DiagnosticCollector, ErrorPolicy, FieldDescriptor, FieldType, SchemaBuilder};
use serde_json::json;
use std::fs;
use std::sync::{Arc, Mutex};

#[test]
fn the_first_record_fixes_the_field_set() -> Result<()> {
    let source = VecSource::new(vec![
        record(&[("id", json!(1)), ("name", json!("Tom"))]),
        // Later records may carry extra fields; the resolved schema wins.
        record(&[("id", json!(2)), ("name", json!("Mark")), ("extra", json!(true))]),
    ]);
    let records = RecordReader::new(source).collect::<Result<Vec<_>>>()?;

    assert_eq!(records[1].get("extra"), None);
    assert_eq!(
        records[1].names().collect::<Vec<_>>(),
        vec!["id", "name"]
    );
    Ok(())
}

#[test]
fn inference_assigns_types_from_values() -> Result<()> {
    let source = VecSource::new(vec![record(&[
        ("count", json!(3)),
        ("ratio", json!(0.75)),
        ("label", json!("x")),
        ("flags", json!([true])),
        ("meta", json!({"k": 1})),
        ("gone", json!(null)),
    ])]);
    let mut reader = RecordReader::new(source);
    reader.next().unwrap()?;

    let schema = reader.schema().unwrap();
    assert_eq!(schema.field("count").unwrap().field_type(), FieldType::Int);
    assert_eq!(schema.field("ratio").unwrap().field_type(), FieldType::Float);
    assert_eq!(schema.field("label").unwrap().field_type(), FieldType::Text);
    assert_eq!(schema.field("flags").unwrap().field_type(), FieldType::Sequence);
    assert_eq!(schema.field("meta").unwrap().field_type(), FieldType::Nested);
    assert_eq!(schema.field("gone").unwrap().field_type(), FieldType::Any);
    Ok(())
}

#[test]
fn scalar_and_positional_lines_get_synthesized_names() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("shapes.jsonl");
    fs::write(&path, "42\n43\n")?;

    let records = RecordReader::new(JsonLinesSource::from_path(&path)?)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(records[0].get("value"), Some(&json!(42)));
    assert_eq!(records[1].get("value"), Some(&json!(43)));

    let path = tmp.path().join("rows.jsonl");
    fs::write(&path, "[1, \"Tom\"]\n[2, \"Mark\"]\n")?;
    let records = RecordReader::new(JsonLinesSource::from_path(&path)?)
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(records[1].get("column_1"), Some(&json!(2)));
    assert_eq!(records[1].get("column_2"), Some(&json!("Mark")));
    Ok(())
}

#[test]
fn diagnostics_serialize_for_reporting() -> Result<()> {
    let diags = Arc::new(Mutex::new(DiagnosticCollector::new()));
    let schema = Arc::new(
        SchemaBuilder::new()
            .field(FieldDescriptor::new("id").with_type(FieldType::Int))
            .error_policy(ErrorPolicy::ReportAndContinue)
            .build()
            .unwrap(),
    );
    let source = VecSource::new(vec![
        record(&[("id", json!("bad"))]),
        record(&[("id", json!(2))]),
    ]);
    let _ = RecordReader::new(source)
        .with_schema(schema)
        .with_diagnostics(Arc::clone(&diags))
        .collect::<Result<Vec<_>>>()?;

    let report = diags.lock().unwrap().to_json_pretty()?;
    assert!(report.contains("\"record_index\": 0"));
    assert!(report.contains("\"conversion\""));
    assert!(report.contains("\"id\""));
    Ok(())
}
