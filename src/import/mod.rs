// src/import/mod.rs
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::campaign::Layout;

pub mod nested;

pub use nested::{decode, Dialect, NestedList};

const UTF8_BOM: char = '\u{feff}';

/// A cell value. Text straight from the CSV, or a list that has already
/// been decoded, so a second decode is never attempted on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Nested(NestedList),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Nested(_) => None,
        }
    }

    /// Text → decoded list; already-decoded values are left alone.
    pub fn decode_in_place(&mut self, dialect: Dialect) {
        if let FieldValue::Text(s) = self {
            *self = FieldValue::Nested(decode(s, dialect));
        }
    }

    /// The list to put on the wire. Text that slipped through undecoded is
    /// read as a JSON literal, else `[[]]`.
    pub fn to_nested(&self) -> NestedList {
        match self {
            FieldValue::Nested(list) => list.clone(),
            FieldValue::Text(s) => decode(s, Dialect::JsonLiteral),
        }
    }

    /// Empty text counts as a missing cell. A decoded list never does.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Nested(_) => true,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Nested(list) => write!(f, "{}", list),
        }
    }
}

/// One data row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text of `name`, `""` when absent or not text.
    pub fn text(&self, name: &str) -> &str {
        self.get(name).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name)
    }

    /// True when no field is missing or empty.
    pub fn is_complete(&self) -> bool {
        self.fields.values().all(FieldValue::is_present)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::default();
        for (k, v) in iter {
            record.insert(k, FieldValue::Text(v.into()));
        }
        record
    }
}

/// Result of importing one CSV.
#[derive(Debug, Clone, Default)]
pub struct ImportedSheet {
    pub headers: Vec<String>,
    pub layout: Layout,
    pub records: Vec<Record>,
}

/// Tokenize `text` and key every data row by the trimmed header row.
///
/// Short rows pad with `""`, extra cells are dropped. Fewer than two rows
/// (header only, or nothing) gives no records. Rows the tokenizer rejects
/// are skipped.
pub fn normalize(text: &str) -> Vec<Record> {
    let (_, records) = tokenize(text);
    records
}

fn tokenize(text: &str) -> (Vec<String>, Vec<Record>) {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        match result {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => warn!(row = idx, error = %e, "skipping unreadable CSV row"),
        }
    }

    if rows.len() < 2 {
        debug!(rows = rows.len(), "no data rows");
        return (Vec::new(), Vec::new());
    }

    let mut rows = rows.into_iter();
    let headers: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let records = rows
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.as_str(), row.get(i).map(|c| c.trim()).unwrap_or("")))
                .collect::<Record>()
        })
        .collect();

    (headers, records)
}

/// Normalize, pick the layout from the header set, and decode the
/// layout's list fields in place.
pub fn import_text(text: &str) -> ImportedSheet {
    let (headers, mut records) = tokenize(text);
    let layout = Layout::detect(&headers);

    for record in &mut records {
        for &(field, dialect) in layout.nested_fields() {
            if let Some(value) = record.get_mut(field) {
                debug!(field, raw = %value, "decoding list field");
                value.decode_in_place(dialect);
            }
        }
    }

    ImportedSheet {
        headers,
        layout,
        records,
    }
}

/// Read a CSV export from disk. Invalid UTF-8 is replaced rather than
/// rejected, and a leading byte-order mark is dropped.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub async fn read_csv_file(path: impl AsRef<Path>) -> Result<ImportedSheet> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(&*text);

    let sheet = import_text(text);
    info!(
        records = sheet.records.len(),
        layout = ?sheet.layout,
        "imported CSV"
    );
    Ok(sheet)
}
