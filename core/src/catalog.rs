//! Catalog ingestion boundary.
//!
//! Product records arrive loosely typed (prices as "₹1,299" strings, ids as
//! numbers, missing fields). They are coerced once into [`Document`] here and
//! nothing downstream sees the raw shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::CatalogLoadError;

/// A validated product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub sub_category: String,
    /// `None` when the source price was missing or unparseable.
    pub price: Option<f64>,
    pub rating: Option<f32>,
    pub url: Option<String>,
}

impl Document {
    /// Body fields indexed at the body weight.
    pub fn body_fields(&self) -> [&str; 4] {
        [&self.description, &self.brand, &self.category, &self.sub_category]
    }

    /// Coerce one raw JSON record. Returns `None` when the record has no id.
    pub fn from_value(value: &Value) -> Option<Document> {
        let obj = value.as_object()?;
        let id = text_field(obj, &["id", "pid"]).filter(|s| !s.trim().is_empty())?;
        Some(Document {
            id: id.trim().to_string(),
            title: text_field(obj, &["title"]).unwrap_or_default(),
            description: text_field(obj, &["description"]).unwrap_or_default(),
            brand: text_field(obj, &["brand"]).unwrap_or_default(),
            category: text_field(obj, &["category"]).unwrap_or_default(),
            sub_category: text_field(obj, &["sub_category"]).unwrap_or_default(),
            price: first_number(obj, &["price", "selling_price", "actual_price"]),
            rating: first_number(obj, &["rating", "average_rating"]).map(|r| r as f32),
            url: text_field(obj, &["url"]).filter(|s| !s.is_empty()),
        })
    }
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn first_number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(coerce_number))
}

/// Numbers pass through. Strings drop any currency prefix ("₹", "Rs.", "$")
/// and thousands separators; a second decimal point or a leading minus makes
/// the value unknown rather than a guess. Negative and non-finite values are rejected.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_numeric_text(s)?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

fn parse_numeric_text(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    if s[..start].trim_end().ends_with('-') {
        return None;
    }
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
        .filter(|c| *c != ',')
        .collect();
    if digits.matches('.').count() > 1 {
        return None;
    }
    digits.parse::<f64>().ok()
}

/// Validate a sequence of raw records. Records without an id are skipped and
/// duplicate ids keep their first occurrence.
pub fn documents_from_values<I>(values: I) -> Vec<Document>
where
    I: IntoIterator<Item = Value>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut docs = Vec::new();
    let (mut missing_id, mut duplicates) = (0usize, 0usize);
    for v in values {
        match Document::from_value(&v) {
            Some(doc) if seen.insert(doc.id.clone()) => docs.push(doc),
            Some(_) => duplicates += 1,
            None => missing_id += 1,
        }
    }
    if missing_id > 0 || duplicates > 0 {
        tracing::warn!(missing_id, duplicates, "skipped catalog records");
    }
    docs
}

/// Read a catalog file. `.jsonl` is read line by line, `.csv` row by row with
/// the header as field names; anything else must be a JSON array of records or
/// a single record object.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<Document>, CatalogLoadError> {
    let path = path.as_ref();
    let io_err = |source| CatalogLoadError::Io { path: path.to_path_buf(), source };
    let parse_err = |source| CatalogLoadError::Parse { path: path.to_path_buf(), source };

    let f = File::open(path).map_err(io_err)?;
    let reader = BufReader::new(f);
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
    let docs = if ext.as_deref() == Some("csv") {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut values = Vec::new();
        for row in rdr.deserialize::<HashMap<String, String>>() {
            let row = row.map_err(|source| CatalogLoadError::Csv { path: path.to_path_buf(), source })?;
            values.push(Value::Object(row.into_iter().map(|(k, v)| (k, Value::String(v))).collect()));
        }
        documents_from_values(values)
    } else if ext.as_deref() == Some("jsonl") {
        let mut values = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() { continue; }
            values.push(serde_json::from_str::<Value>(&line).map_err(parse_err)?);
        }
        documents_from_values(values)
    } else {
        parse_json_catalog(reader).map_err(|e| match e {
            JsonCatalogError::Json(source) => parse_err(source),
            JsonCatalogError::Shape => CatalogLoadError::UnsupportedFormat { path: path.to_path_buf() },
        })?
    };

    if docs.is_empty() {
        return Err(CatalogLoadError::Empty { path: path.to_path_buf() });
    }
    tracing::info!(path = %path.display(), num_docs = docs.len(), "catalog loaded");
    Ok(docs)
}

enum JsonCatalogError {
    Json(serde_json::Error),
    Shape,
}

fn parse_json_catalog<R: Read>(reader: R) -> Result<Vec<Document>, JsonCatalogError> {
    let json: Value = serde_json::from_reader(reader).map_err(JsonCatalogError::Json)?;
    match json {
        Value::Array(arr) => Ok(documents_from_values(arr)),
        obj @ Value::Object(_) => Ok(documents_from_values(std::iter::once(obj))),
        _ => Err(JsonCatalogError::Shape),
    }
}

/// The companion file tried when no fallback is configured: a JSON catalog
/// falls back to `<stem>_clean.csv`, anything else to `<stem>.json`.
pub fn default_fallback_path(primary: &Path) -> PathBuf {
    let stem = primary.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let is_json = primary
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let name = if is_json { format!("{stem}_clean.csv") } else { format!("{stem}.json") };
    primary.with_file_name(name)
}

/// Try `primary`, and on any load failure try `fallback` when one is given.
/// The primary error is logged; the fallback error (if any) is returned.
pub fn load_with_fallback(primary: &Path, fallback: Option<&Path>) -> Result<Vec<Document>, CatalogLoadError> {
    match load_catalog(primary) {
        Ok(docs) => Ok(docs),
        Err(err) => match fallback {
            Some(fb) => {
                tracing::warn!(error = %err, fallback = %fb.display(), "primary catalog failed, trying fallback");
                load_catalog(fb)
            }
            None => Err(err),
        },
    }
}
