//! Output formatting and persistence for query results.
//!
//! Supports pretty-printing, JSON logging, and CSV append.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::dataset::Record;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends records as rows to a CSV file.
///
/// Creates the file with a header taken from the first record's keys if it
/// does not already exist. Nulls become empty cells.
pub fn append_records(path: &str, records: &[Record]) -> Result<()> {
    let Some(first) = records.first() else {
        debug!(path, "No records to append");
        return Ok(());
    };

    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    if !file_exists {
        writer.write_record(first.keys())?;
    }
    for record in records {
        writer.write_record(record.values().map(cell))?;
    }
    writer.flush()?;

    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
