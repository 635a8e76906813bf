//! Dataset store: one-time load of the observation table.
//!
//! ```text
//!   CSV file ──▶ DatasetSource::load ──▶ Table ──▶ Dataset (immutable, Arc)
//!                        │ error
//!                        ▼
//!                 Dataset::empty()  (degraded mode)
//! ```

mod loader;
mod table;
pub mod time;

#[cfg(test)]
pub(crate) mod fixtures;

pub use loader::{CsvFileSource, DatasetSource, parse_csv};
pub use table::{Column, ColumnData, Record, Table};

use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tracing::{error, info};

pub const TIMESTAMP: &str = "timestamp";
pub const LOCATION_NAME: &str = "location_name";
pub const WEATHER_CONDITION: &str = "weather_condition";
pub const CHILD_COUNT: &str = "child_pedestrians_count";
pub const ADULT_COUNT: &str = "adult_pedestrians_count";

/// The observation table, with a guaranteed UTC `timestamp` column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    table: Table,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps a loaded table, checking the timestamp invariant.
    pub fn from_table(table: Table) -> Result<Self> {
        match table.column(TIMESTAMP).map(|c| &c.data) {
            Some(ColumnData::Timestamp(_)) => Ok(Self { table }),
            Some(_) => bail!("column '{TIMESTAMP}' is not a timestamp column"),
            None if table.is_empty() && table.columns().is_empty() => Ok(Self { table }),
            None => bail!("missing '{TIMESTAMP}' column"),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        match self.table.column(TIMESTAMP).map(|c| &c.data) {
            Some(ColumnData::Timestamp(v)) => v,
            _ => &[],
        }
    }

    pub fn locations(&self) -> Option<&[Option<String>]> {
        self.text_column(LOCATION_NAME)
    }

    pub fn weather_conditions(&self) -> Option<&[Option<String>]> {
        self.text_column(WEATHER_CONDITION)
    }

    /// Cells of a text column, or `None` if absent or not text.
    pub fn text_column(&self, name: &str) -> Option<&[Option<String>]> {
        match self.table.column(name).map(|c| &c.data) {
            Some(ColumnData::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Cell of a numeric column as `f64`; `None` for nulls, text or missing columns.
    pub fn numeric(&self, name: &str, row: usize) -> Option<f64> {
        match self.table.column(name).map(|c| &c.data) {
            Some(ColumnData::Integer(v)) => v[row].map(|n| n as f64),
            Some(ColumnData::Float(v)) => v[row],
            _ => None,
        }
    }
}

/// Holds the dataset loaded at startup for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dataset: Arc<Dataset>,
}

impl DatasetStore {
    /// Loads from `source`. Any failure is logged and yields an empty dataset.
    pub fn load<S: DatasetSource + ?Sized>(source: &S) -> Self {
        let origin = source.describe();
        let dataset = match source.load().and_then(Dataset::from_table) {
            Ok(dataset) => {
                info!(source = %origin, rows = dataset.len(), "Dataset loaded");
                dataset
            }
            Err(e) => {
                error!(source = %origin, error = %e, "Dataset could not be loaded, continuing with an empty dataset");
                Dataset::empty()
            }
        };
        Self::from_dataset(dataset)
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Shared handle for the query engine.
    pub fn handle(&self) -> Arc<Dataset> {
        Arc::clone(&self.dataset)
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    impl DatasetSource for FailingSource {
        fn describe(&self) -> String {
            "failing".into()
        }

        fn load(&self) -> Result<Table> {
            bail!("boom")
        }
    }

    #[test]
    fn test_store_degrades_to_empty_on_failure() {
        let store = DatasetStore::load(&FailingSource);
        assert!(store.is_empty());
        assert_eq!(store.dataset().len(), 0);
        assert!(store.dataset().timestamps().is_empty());
    }

    #[test]
    fn test_store_degrades_on_missing_file() {
        let store = DatasetStore::load(&CsvFileSource::new("no/such/file.csv"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_loads_fixture() {
        let store = DatasetStore::from_dataset(fixtures::sample_dataset());
        assert!(!store.is_empty());
        assert_eq!(store.dataset().len(), fixtures::SAMPLE_ROWS);
        assert_eq!(store.handle().len(), fixtures::SAMPLE_ROWS);
    }

    #[test]
    fn test_from_table_requires_timestamp_column() {
        let table = Table::try_new(vec![Column::new(
            "x",
            ColumnData::Integer(vec![Some(1)]),
        )])
        .unwrap();
        assert!(Dataset::from_table(table).is_err());

        let table = Table::try_new(vec![Column::new(
            TIMESTAMP,
            ColumnData::Text(vec![Some("2024".into())]),
        )])
        .unwrap();
        assert!(Dataset::from_table(table).is_err());
    }

    #[test]
    fn test_accessors_on_fixture() {
        let dataset = fixtures::sample_dataset();
        assert_eq!(dataset.timestamps().len(), dataset.len());
        assert_eq!(
            dataset.locations().unwrap()[0].as_deref(),
            Some("Bahnhofstrasse (Nord)")
        );
        assert_eq!(dataset.numeric(CHILD_COUNT, 0), Some(10.0));
        assert_eq!(dataset.numeric(ADULT_COUNT, 5), None);
        assert_eq!(dataset.numeric(LOCATION_NAME, 0), None);
    }
}
