//! Loading warehouse query results into raw records.
//!
//! The SQL itself runs elsewhere; reports consume its exported result set.
//! Supported formats:
//!
//! - **CSV**: header row names the fields; empty cells become null, cells
//!   that parse as numbers become numbers, everything else stays a string.
//! - **JSON**: an array of objects.
//! - **JSONL**: one object per line (blank lines ignored).
//!
//! Format is chosen by file extension in [`load_records`]; the per-format
//! readers are public for callers holding data in memory.

use crate::error::{Error, Result};
use crate::types::RawRecord;
use serde_json::{Map, Number, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Load raw records from a file, dispatching on extension
/// (`.csv`, `.json`, `.jsonl`).
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    tracing::debug!(path = %path.display(), format = %extension, "loading warehouse export");

    match extension.as_str() {
        "csv" => records_from_csv(File::open(path)?),
        "json" => records_from_json(File::open(path)?),
        "jsonl" => records_from_jsonl(File::open(path)?),
        other => Err(Error::MalformedInput {
            field: "path".to_string(),
            message: format!(
                "unsupported export format '{}' for {} (expected csv, json, or jsonl)",
                other,
                path.display()
            ),
        }),
    }
}

/// Parse CSV with a header row into raw records.
pub fn records_from_csv<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let mut record = Map::with_capacity(headers.len());
        for (field, cell) in headers.iter().zip(row.iter()) {
            record.insert(field.to_string(), cell_value(cell));
        }
        records.push(record);
    }
    Ok(records)
}

/// Parse a JSON array of objects into raw records.
pub fn records_from_json<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_reader(reader)?;
    let Value::Array(items) = value else {
        return Err(Error::MalformedInput {
            field: "document".to_string(),
            message: "expected a JSON array of objects".to_string(),
        });
    };
    items.into_iter().map(into_record).collect()
}

/// Parse JSON-lines (one object per line) into raw records.
pub fn records_from_jsonl<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)?;
        records.push(into_record(value)?);
    }
    Ok(records)
}

fn into_record(value: Value) -> Result<RawRecord> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::MalformedInput {
            field: "record".to_string(),
            message: format!("expected a JSON object, got {other}"),
        }),
    }
}

/// Type a CSV cell: empty becomes null, numeric becomes a number, anything
/// else stays a string.
fn cell_value(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(Number::from(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(trimmed.to_string())
}
