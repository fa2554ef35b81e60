//! Materialized records and the shapes adapters produce them from.
//!
//! A [`Record`] is an ordered list of named fields. Field order is part of
//! the record's identity: it drives positional formats, schema inference,
//! and byte-identical round trips, so the type never re-sorts its fields.
//! The hand-written serde implementations below exist for the same reason;
//! a map-based representation would silently alphabetize on the wire.
//!
//! [`Shape`] names the four structural forms a format adapter can hand the
//! engine before field names are resolved: a lone scalar, named key/value
//! pairs, a row under a separate header, or a bare positional tuple.

use crate::value::RawValue;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Name given to the single field of a scalar record.
pub const SCALAR_FIELD: &str = "value";

/// An ordered collection of named field values.
///
/// Duplicate names are not representable: [`Record::set`] replaces in place,
/// preserving the field's original position.
///
/// # Example
///
/// ```
/// use rowbeam::Record;
/// use serde_json::json;
///
/// let mut rec = Record::new();
/// rec.set("id", json!(1));
/// rec.set("name", json!("Tom"));
/// rec.set("id", json!(2));
/// assert_eq!(rec.get("id"), Some(&json!(2)));
/// assert_eq!(rec.names().collect::<Vec<_>>(), vec!["id", "name"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, RawValue)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Creates an empty record with room for `capacity` fields.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builds a record from name/value pairs, keeping the given order.
    /// A repeated name overwrites the earlier value in place.
    pub fn from_pairs<I, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, RawValue)>,
        N: Into<String>,
    {
        let mut rec = Record::new();
        for (name, value) in pairs {
            rec.set(name, value);
        }
        rec
    }

    /// Sets a field, replacing an existing value in place or appending a new
    /// field at the end.
    pub fn set(&mut self, name: impl Into<String>, value: RawValue) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Returns the value of the named field, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Removes the named field, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<RawValue> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterates field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Consumes the record into its ordered pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, RawValue)> {
        self.fields
    }

    /// Rough in-memory footprint in bytes, for byte-capped buffering.
    /// See [`estimated_size`](crate::value::estimated_size).
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        24 + self
            .fields
            .iter()
            .map(|(n, v)| 24 + n.len() + crate::value::estimated_size(v))
            .sum::<usize>()
    }

    /// Builds a record from any serializable value.
    ///
    /// A struct or map becomes a keyed record, a sequence becomes a
    /// positional record, and anything else becomes a single-field scalar
    /// record named `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` fails to serialize.
    pub fn from_serialize<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        // Text round trip: `to_value` would sort keys, losing field order.
        let text = serde_json::to_vec(value)?;
        Ok(match text.first() {
            Some(b'{') => serde_json::from_slice::<Record>(&text)?,
            Some(b'[') => Shape::Positional(serde_json::from_slice(&text)?).into_record(),
            _ => Shape::Scalar(serde_json::from_slice(&text)?).into_record(),
        })
    }

    /// Converts the record into any deserializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the record's fields do not match the target type.
    pub fn deserialize_into<T: serde::de::DeserializeOwned>(&self) -> anyhow::Result<T> {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.clone());
        }
        Ok(serde_json::from_value(RawValue::Object(map))?)
    }
}

impl IntoIterator for Record {
    type Item = (String, RawValue);
    type IntoIter = std::vec::IntoIter<(String, RawValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, RawValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Record::from_pairs(iter)
    }
}

// Serialized as a map so records interoperate with every serde format, but
// with insertion order intact. serde_json's own map type would re-sort keys.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut rec = Record::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, RawValue>()? {
            rec.set(name, value);
        }
        Ok(rec)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Record, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// The structural form of one unit of adapter input.
///
/// Schema resolution and record materialization treat each form
/// differently; see [`Shape::into_record`].
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// A single unnamed value. Materializes as one field named `value`.
    Scalar(RawValue),
    /// Explicit name/value pairs, already in order.
    Keyed(Vec<(String, RawValue)>),
    /// A row of values under a separately-carried header.
    Tabular {
        /// Column names from the header, in column order.
        columns: Vec<String>,
        /// Cell values for this row, in column order.
        row: Vec<RawValue>,
    },
    /// A bare tuple of values with no names. Fields are synthesized as
    /// `column_1`, `column_2`, and so on.
    Positional(Vec<RawValue>),
}

impl Shape {
    /// Materializes the shape as a record.
    ///
    /// A tabular row shorter than its header is padded with nulls; extra
    /// cells beyond the header are dropped.
    #[must_use]
    pub fn into_record(self) -> Record {
        match self {
            Shape::Scalar(value) => {
                let mut rec = Record::with_capacity(1);
                rec.set(SCALAR_FIELD, value);
                rec
            }
            Shape::Keyed(pairs) => Record::from_pairs(pairs),
            Shape::Tabular { columns, row } => {
                let mut cells = row.into_iter();
                let mut rec = Record::with_capacity(columns.len());
                for name in columns {
                    rec.set(name, cells.next().unwrap_or(RawValue::Null));
                }
                rec
            }
            Shape::Positional(values) => {
                let mut rec = Record::with_capacity(values.len());
                for (i, value) in values.into_iter().enumerate() {
                    rec.set(positional_name(i), value);
                }
                rec
            }
        }
    }
}

/// Synthesized name for the zero-based `index`th positional field.
#[must_use]
pub fn positional_name(index: usize) -> String {
    format!("column_{}", index + 1)
}
