//! CSV loading and column type inference.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use super::TIMESTAMP;
use super::table::{Column, ColumnData, Table};
use super::time::parse_instant;

/// Anything that can produce the raw observation table.
pub trait DatasetSource {
    /// Human-readable origin, used in log lines.
    fn describe(&self) -> String;

    fn load(&self) -> Result<Table>;
}

/// Reads the table from a CSV file on disk.
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Table> {
        let file = File::open(&self.path)
            .with_context(|| format!("opening '{}'", self.path.display()))?;
        parse_csv(file)
    }
}

/// Cell values read as missing, the same set pandas uses by default.
const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: &str) -> bool {
    cell.is_empty()
        || MISSING_MARKERS.contains(&cell)
        || cell.trim_start_matches(['+', '-']).eq_ignore_ascii_case("nan")
}

/// Parses CSV with a header row into a typed [`Table`].
///
/// The `timestamp` column must parse as ISO-8601 in every row. Other columns
/// become integer, float or text, whichever fits all present cells. Short
/// rows are padded with missing cells.
pub fn parse_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, cells) in raw.iter_mut().enumerate() {
            let cell = record.get(col_idx).map(str::trim).unwrap_or("");
            cells.push((!is_missing(cell)).then(|| cell.to_string()));
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| {
            let data = if name == TIMESTAMP {
                timestamp_column(&cells)?
            } else {
                infer_column(cells)
            };
            debug!(column = %name, kind = kind_name(&data), "Column inferred");
            Ok(Column::new(name, data))
        })
        .collect::<Result<Vec<_>>>()?;

    Table::try_new(columns)
}

fn timestamp_column(cells: &[Option<String>]) -> Result<ColumnData> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let raw = cell
                .as_deref()
                .ok_or_else(|| anyhow!("row {row}: missing timestamp"))?;
            parse_instant(raw).ok_or_else(|| anyhow!("row {row}: invalid timestamp '{raw}'"))
        })
        .collect::<Result<Vec<_>>>()
        .map(ColumnData::Timestamp)
}

fn infer_column(cells: Vec<Option<String>>) -> ColumnData {
    if let Some(ints) = parse_all(&cells, |s| s.parse::<i64>().ok()) {
        if cells.iter().any(Option::is_some) {
            return ColumnData::Integer(ints);
        }
    }
    if let Some(floats) = parse_all(&cells, |s| s.parse::<f64>().ok()) {
        return ColumnData::Float(floats);
    }
    ColumnData::Text(cells)
}

/// Applies `parse` to every present cell, failing if any cell does not parse.
fn parse_all<T>(cells: &[Option<String>], parse: impl Fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    cells
        .iter()
        .map(|cell| match cell {
            Some(s) => parse(s).map(Some),
            None => Some(None),
        })
        .collect()
}

fn kind_name(data: &ColumnData) -> &'static str {
    match data {
        ColumnData::Timestamp(_) => "timestamp",
        ColumnData::Integer(_) => "integer",
        ColumnData::Float(_) => "float",
        ColumnData::Text(_) => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_csv_infers_types() {
        let csv = "timestamp,location_name,pedestrians_count,temperature\n\
                   2024-01-01T00:00:00Z,A,10,1.5\n\
                   2024-01-01T01:00:00+01:00,B,,2\n";
        let table = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.column("timestamp").unwrap().data,
            ColumnData::Timestamp(vec![
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ])
        );
        assert_eq!(
            table.column("pedestrians_count").unwrap().data,
            ColumnData::Integer(vec![Some(10), None])
        );
        assert_eq!(
            table.column("temperature").unwrap().data,
            ColumnData::Float(vec![Some(1.5), Some(2.0)])
        );
        assert_eq!(
            table.column("location_name").unwrap().data,
            ColumnData::Text(vec![Some("A".into()), Some("B".into())])
        );
    }

    #[test]
    fn test_all_empty_column_is_float() {
        let csv = "timestamp,unverified\n2024-01-01,\n";
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            table.column("unverified").unwrap().data,
            ColumnData::Float(vec![None])
        );
    }

    #[test]
    fn test_invalid_timestamp_fails() {
        let csv = "timestamp,x\nnot-a-date,1\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn test_missing_timestamp_fails() {
        let csv = "timestamp,x\n,1\n";
        assert!(parse_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_markers_become_null() {
        let csv = "timestamp,child_pedestrians_count,adult_pedestrians_count,temperature,location_name\n\
                   2024-01-01T00:00:00Z,10,NaN,1.5,A\n\
                   2024-01-01T01:00:00Z,NA,20,nan,N/A\n\
                   2024-01-01T02:00:00Z,#N/A,null,-NaN,None\n";
        let table = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(
            table.column("child_pedestrians_count").unwrap().data,
            ColumnData::Integer(vec![Some(10), None, None])
        );
        assert_eq!(
            table.column("adult_pedestrians_count").unwrap().data,
            ColumnData::Integer(vec![None, Some(20), None])
        );
        assert_eq!(
            table.column("temperature").unwrap().data,
            ColumnData::Float(vec![Some(1.5), None, None])
        );
        assert_eq!(
            table.column("location_name").unwrap().data,
            ColumnData::Text(vec![Some("A".into()), None, None])
        );
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "timestamp,location_name,pedestrians_count,child_pedestrians_count,adult_pedestrians_count\n\
                   2024-01-01T00:00:00Z,A,10,4,6\n\
                   2024-01-01T01:00:00Z,B,12,5\n";
        let table = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.column("child_pedestrians_count").unwrap().data,
            ColumnData::Integer(vec![Some(4), Some(5)])
        );
        assert_eq!(
            table.column("adult_pedestrians_count").unwrap().data,
            ColumnData::Integer(vec![Some(6), None])
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = CsvFileSource::new("/definitely/not/here.csv");
        assert!(source.load().is_err());
        assert_eq!(source.describe(), "/definitely/not/here.csv");
    }
}
