//! Records and pages as returned by the Service Layer
//!
//! Field sets differ per collection and per customer customization, so a
//! [`Record`] is an ordered map of field name to a JSON value rather than a
//! fixed struct. Export routines pull fields out by name and render them as
//! CSV cells with [`cell`].

use crate::error::Result;
use serde_json::{Map, Value};

/// One entity instance, field name to value, in server order
pub type Record = Map<String, Value>;

/// Keys under which a continuation reference may appear, in lookup order
pub const NEXT_LINK_KEYS: [&str; 3] = ["@odata.nextLink", "odata.nextLink", "nextLink"];

/// A decoded collection response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Records of this page, in server order
    pub records: Vec<Record>,
    /// Opaque continuation reference, when the server supplied one
    pub next_link: Option<String>,
}

impl Page {
    /// Decode a response body
    ///
    /// A body without a `value` array is an empty page. Non-object entries in
    /// `value` are skipped. An empty continuation string counts as absent.
    pub fn from_body(body: &str) -> Result<Self> {
        let json: Value = serde_json::from_str(body)?;
        Ok(Self::from_value(json))
    }

    /// Decode an already-parsed response
    pub fn from_value(json: Value) -> Self {
        let Value::Object(mut root) = json else {
            return Self::default();
        };

        let next_link = NEXT_LINK_KEYS.iter().find_map(|key| {
            root.get(*key)
                .and_then(Value::as_str)
                .filter(|link| !link.is_empty())
                .map(str::to_string)
        });

        let records = match root.remove("value") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Self { records, next_link }
    }

    /// Number of records in this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the page carries no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Render a field as a CSV cell; absent and null fields render empty
pub fn cell(record: &Record, field: &str) -> String {
    record.get(field).map(value_to_cell).unwrap_or_default()
}

/// Render the first present, non-null field among `fields`
pub fn cell_any(record: &Record, fields: &[&str]) -> String {
    fields
        .iter()
        .find_map(|field| record.get(*field).filter(|v| !v.is_null()))
        .map(value_to_cell)
        .unwrap_or_default()
}

/// Render a JSON value as a CSV cell
pub fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// Trimmed string value of a field, or empty
pub fn str_field<'a>(record: &'a Record, field: &str) -> &'a str {
    record.get(field).and_then(Value::as_str).map(str::trim).unwrap_or("")
}

/// Lenient numeric read: numbers, numeric strings, anything else is `default`
pub fn f64_field(record: &Record, field: &str, default: f64) -> f64 {
    match record.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Lenient integer read: integers, integral floats and numeric strings
pub fn i64_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A field that may hold a single object or a list of objects, as a list
pub fn object_list<'a>(record: &'a Record, field: &str) -> Vec<&'a Record> {
    match record.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(single)) => vec![single],
        _ => Vec::new(),
    }
}
