//! Summaries over the whole dataset.

use std::collections::HashSet;

use chrono::SecondsFormat;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::{QueryError, QueryResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub status: &'static str,
    pub total_rows: usize,
    pub columns: Vec<String>,
    /// Approximate in-memory size, e.g. `"1.25 MB"`.
    pub memory_usage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub min_timestamp: String,
    pub max_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locations {
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherConditions {
    pub weather_condition: Vec<String>,
}

fn require_data(dataset: &Dataset, what: &str) -> QueryResult<()> {
    if dataset.is_empty() {
        Err(QueryError::unavailable(what))
    } else {
        Ok(())
    }
}

pub fn stats(dataset: &Dataset) -> QueryResult<DatasetStats> {
    require_data(dataset, "statistics")?;

    let table = dataset.table();
    let megabytes = table.approx_memory_bytes() as f64 / (1024.0 * 1024.0);

    Ok(DatasetStats {
        status: "loaded",
        total_rows: table.num_rows(),
        columns: table.column_names(),
        memory_usage: format!("{megabytes:.2} MB"),
    })
}

pub fn time_range(dataset: &Dataset) -> QueryResult<TimeRange> {
    require_data(dataset, "time information")?;

    let timestamps = dataset.timestamps();
    let (Some(min), Some(max)) = (timestamps.iter().min(), timestamps.iter().max()) else {
        return Err(QueryError::unavailable("time information"));
    };

    Ok(TimeRange {
        min_timestamp: min.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        max_timestamp: max.to_rfc3339_opts(SecondsFormat::AutoSi, false),
    })
}

pub fn locations(dataset: &Dataset) -> QueryResult<Locations> {
    require_data(dataset, "location information")?;
    Ok(Locations {
        locations: distinct(dataset.locations()),
    })
}

pub fn weather_conditions(dataset: &Dataset) -> QueryResult<WeatherConditions> {
    require_data(dataset, "weather conditions")?;
    Ok(WeatherConditions {
        weather_condition: distinct(dataset.weather_conditions()),
    })
}

/// Non-null values in order of first appearance.
fn distinct(cells: Option<&[Option<String>]>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for value in cells.unwrap_or(&[]).iter().flatten() {
        if seen.insert(value.as_str()) {
            values.push(value.clone());
        }
    }
    values
}
