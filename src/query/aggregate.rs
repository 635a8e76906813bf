//! Calendar resampling of the count columns.
//!
//! Buckets are contiguous from the first to the last observed period, with
//! empty periods summed as zero.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::dataset::{ColumnData, Dataset, Record, TIMESTAMP, Table};
use crate::error::{QueryError, QueryResult};
use crate::query::filter::effective_location;

/// Time bucket size for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Quarter,
        Granularity::Year,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }

    /// Consecutive integer index of the calendar period containing `date`.
    ///
    /// Weeks run Monday to Sunday.
    fn period(self, date: NaiveDate) -> i64 {
        let year = i64::from(date.year());
        let month0 = i64::from(date.month0());
        match self {
            Granularity::Day => i64::from(date.num_days_from_ce()),
            Granularity::Week => {
                let monday = i64::from(date.num_days_from_ce())
                    - i64::from(date.weekday().num_days_from_monday());
                // CE day 1 (0001-01-01) is a Monday
                (monday - 1).div_euclid(7)
            }
            Granularity::Month => year * 12 + month0,
            Granularity::Quarter => year * 4 + month0 / 3,
            Granularity::Year => year,
        }
    }

    /// Bucket label: the first day for `Day`, the last day of the period
    /// for every coarser granularity.
    fn label(self, period: i64) -> Option<NaiveDate> {
        match self {
            Granularity::Day => NaiveDate::from_num_days_from_ce_opt(i32::try_from(period).ok()?),
            Granularity::Week => {
                NaiveDate::from_num_days_from_ce_opt(i32::try_from(period * 7 + 7).ok()?)
            }
            Granularity::Month => month_end(period.div_euclid(12), period.rem_euclid(12) + 1),
            Granularity::Quarter => month_end(period.div_euclid(4), period.rem_euclid(4) * 3 + 3),
            Granularity::Year => month_end(period, 12),
        }
    }
}

fn month_end(year: i64, month: i64) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(
        i32::try_from(next_year).ok()?,
        u32::try_from(next_month).ok()?,
        1,
    )?
    .pred_opt()
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| {
                QueryError::BadRequest(
                    "Invalid granularity. Choose 'day', 'week', 'month', 'quarter' or 'year'."
                        .to_string(),
                )
            })
    }
}

/// Whether a column holds a count metric to be summed.
///
/// Names containing `count` qualify unless they also contain `id`.
pub fn is_count_column(name: &str) -> bool {
    name.contains("count") && !name.contains("id")
}

/// Numeric count columns of `table`, in column order.
pub fn count_columns(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| c.data.is_numeric() && is_count_column(&c.name))
        .map(|c| c.name.clone())
        .collect()
}

/// A per-bucket sum, integer when the source column is integer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sum {
    Integer(i64),
    Float(f64),
}

impl Sum {
    pub fn as_f64(self) -> f64 {
        match self {
            Sum::Integer(n) => n as f64,
            Sum::Float(x) => x,
        }
    }

    fn to_json(self) -> Value {
        match self {
            Sum::Integer(n) => Value::from(n),
            Sum::Float(x) => serde_json::Number::from_f64(x).map_or(Value::Null, Value::Number),
        }
    }
}

/// One time bucket of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub timestamp: DateTime<Utc>,
    /// One entry per [`AggregateSeries::columns`].
    pub sums: Vec<Sum>,
}

/// Evenly spaced, chronological bucket sums.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSeries {
    pub granularity: Granularity,
    pub columns: Vec<String>,
    pub buckets: Vec<Bucket>,
}

impl AggregateSeries {
    /// Sum of one column across all buckets.
    pub fn total(&self, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(self.buckets.iter().map(|b| b.sums[idx].as_f64()).sum())
    }

    /// `{timestamp, <column>: <sum>...}` records; timestamps in epoch millis.
    pub fn to_records(&self) -> Vec<Record> {
        self.buckets
            .iter()
            .map(|bucket| {
                let mut record = Record::new();
                record.insert(
                    TIMESTAMP.to_string(),
                    Value::from(bucket.timestamp.timestamp_millis()),
                );
                for (name, sum) in self.columns.iter().zip(&bucket.sums) {
                    record.insert(name.clone(), sum.to_json());
                }
                record
            })
            .collect()
    }
}

/// Sums every count column per calendar bucket.
///
/// `location` uses the filter semantics (the "all" sentinel means no
/// filter) but must name a location present in the data.
#[tracing::instrument(skip(dataset), fields(rows = dataset.len()))]
pub fn aggregate(
    dataset: &Dataset,
    granularity: Granularity,
    location: Option<&str>,
) -> QueryResult<AggregateSeries> {
    let rows: Vec<usize> = match effective_location(location) {
        Some(wanted) => {
            let locations = dataset.locations().unwrap_or(&[]);
            let rows: Vec<usize> = locations
                .iter()
                .enumerate()
                .filter(|(_, l)| l.as_deref() == Some(wanted))
                .map(|(i, _)| i)
                .collect();
            if rows.is_empty() {
                return Err(QueryError::NotFound(format!("Location '{wanted}' not found.")));
            }
            rows
        }
        None => (0..dataset.len()).collect(),
    };

    let table = dataset.table();
    let columns = count_columns(table);
    let timestamps = dataset.timestamps();

    let periods: Vec<i64> = rows
        .iter()
        .map(|&row| granularity.period(timestamps[row].date_naive()))
        .collect();

    let (Some(&first), Some(&last)) = (periods.iter().min(), periods.iter().max()) else {
        return Ok(AggregateSeries {
            granularity,
            columns,
            buckets: Vec::new(),
        });
    };

    let mut sums: BTreeMap<i64, Vec<Sum>> = BTreeMap::new();
    let zero: Vec<Sum> = columns
        .iter()
        .map(|name| match table.column(name).map(|c| &c.data) {
            Some(ColumnData::Integer(_)) => Sum::Integer(0),
            _ => Sum::Float(0.0),
        })
        .collect();
    for period in first..=last {
        sums.insert(period, zero.clone());
    }

    for (&row, period) in rows.iter().zip(&periods) {
        let Some(bucket) = sums.get_mut(period) else {
            continue;
        };
        for (slot, name) in bucket.iter_mut().zip(&columns) {
            let Some(column) = table.column(name) else {
                continue;
            };
            match (&column.data, slot) {
                (ColumnData::Integer(v), Sum::Integer(acc)) => {
                    *acc = acc.checked_add(v[row].unwrap_or(0)).ok_or_else(|| {
                        QueryError::Internal(format!("sum of '{name}' overflows"))
                    })?;
                }
                (ColumnData::Float(v), Sum::Float(acc)) => *acc += v[row].unwrap_or(0.0),
                _ => {}
            }
        }
    }

    let buckets = sums
        .into_iter()
        .map(|(period, sums)| {
            let label = granularity
                .label(period)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| {
                    QueryError::Internal(format!("{granularity} bucket {period} out of range"))
                })?;
            Ok(Bucket {
                timestamp: label.and_utc(),
                sums,
            })
        })
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(AggregateSeries {
        granularity,
        columns,
        buckets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::sample_dataset;
    use crate::dataset::parse_csv;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn labels(series: &AggregateSeries) -> Vec<DateTime<Utc>> {
        series.buckets.iter().map(|b| b.timestamp).collect()
    }

    #[test]
    fn test_is_count_column() {
        assert!(is_count_column("pedestrians_count"));
        assert!(is_count_column("child_pedestrians_count"));
        assert!(is_count_column("adult_ltr_pedestrians_count"));
        assert!(!is_count_column("location_id"));
        assert!(!is_count_column("count_id"));
        assert!(!is_count_column("zone_id_count"));
        assert!(!is_count_column("temperature"));
        assert!(!is_count_column("Count"));
    }

    #[test]
    fn test_count_columns_in_table_order() {
        let dataset = sample_dataset();
        assert_eq!(
            count_columns(dataset.table()),
            vec![
                "pedestrians_count",
                "child_pedestrians_count",
                "adult_pedestrians_count"
            ]
        );
    }

    #[test]
    fn test_granularity_parse_is_case_insensitive() {
        assert_eq!("Month".parse::<Granularity>(), Ok(Granularity::Month));
        assert_eq!("YEAR".parse::<Granularity>(), Ok(Granularity::Year));
        assert_eq!(" week ".parse::<Granularity>(), Ok(Granularity::Week));
    }

    #[test]
    fn test_invalid_granularity_names_options() {
        let err = "fortnight".parse::<Granularity>().unwrap_err();
        let QueryError::BadRequest(msg) = err else {
            panic!("expected BadRequest");
        };
        for g in Granularity::ALL {
            assert!(msg.contains(g.as_str()), "{msg} should mention {g}");
        }
    }

    #[test]
    fn test_week_label_is_sunday() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2024, 1, 22).unwrap();
        let period = Granularity::Week.period(monday);
        assert_eq!(Granularity::Week.period(sunday), period);
        assert_eq!(Granularity::Week.period(next_monday), period + 1);
        assert_eq!(Granularity::Week.label(period), Some(sunday));
    }

    #[test]
    fn test_period_end_labels() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let label = |g: Granularity| g.label(g.period(date)).unwrap();
        assert_eq!(label(Granularity::Day), date);
        assert_eq!(label(Granularity::Month), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(label(Granularity::Quarter), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(label(Granularity::Year), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let december = NaiveDate::from_ymd_opt(2023, 12, 5).unwrap();
        assert_eq!(
            Granularity::Month.label(Granularity::Month.period(december)),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
    }

    #[test]
    fn test_monthly_aggregate_fills_and_sums() {
        let dataset = sample_dataset();
        let series = aggregate(&dataset, Granularity::Month, None).unwrap();

        assert_eq!(
            labels(&series),
            vec![
                day(2023, 12, 31),
                day(2024, 1, 31),
                day(2024, 2, 29),
                day(2024, 3, 31),
                day(2024, 4, 30),
            ]
        );
        let peds: Vec<Sum> = series.buckets.iter().map(|b| b.sums[0]).collect();
        assert_eq!(
            peds,
            vec![
                Sum::Integer(100),
                Sum::Integer(250),
                Sum::Integer(20),
                Sum::Integer(21),
                Sum::Integer(10)
            ]
        );
        // null adult count in March is skipped
        assert_eq!(series.buckets[3].sums[2], Sum::Integer(16));
    }

    #[test]
    fn test_sums_are_conserved() {
        let dataset = sample_dataset();
        for g in Granularity::ALL {
            let series = aggregate(&dataset, g, None).unwrap();
            assert_eq!(series.total("pedestrians_count"), Some(401.0), "{g}");
            assert_eq!(series.total("child_pedestrians_count"), Some(105.0), "{g}");
        }
    }

    #[test]
    fn test_weekly_buckets_are_contiguous() {
        let dataset = sample_dataset();
        let series = aggregate(&dataset, Granularity::Week, Some("Bahnhofstrasse (Nord)")).unwrap();

        assert_eq!(series.buckets.len(), 16);
        // 2023-12-31 is a Sunday and stays in its own week
        assert_eq!(series.buckets[0].timestamp, day(2023, 12, 31));
        assert_eq!(series.buckets[0].sums[0], Sum::Integer(100));
        assert_eq!(series.buckets[15].timestamp, day(2024, 4, 14));
        let empty = series.buckets.iter().filter(|b| b.sums[0] == Sum::Integer(0)).count();
        assert_eq!(empty, 12);
    }

    #[test]
    fn test_daily_bucket_is_labeled_at_start() {
        let dataset = sample_dataset();
        let series = aggregate(&dataset, Granularity::Day, Some("Lintheschergasse")).unwrap();
        assert_eq!(labels(&series), vec![day(2024, 2, 3)]);
        assert_eq!(series.buckets[0].sums, vec![Sum::Integer(20), Sum::Integer(2), Sum::Integer(18)]);
    }

    #[test]
    fn test_unknown_location_is_not_found() {
        let dataset = sample_dataset();
        let err = aggregate(&dataset, Granularity::Day, Some("Paradeplatz")).unwrap_err();
        assert_eq!(err, QueryError::NotFound("Location 'Paradeplatz' not found.".into()));
    }

    #[test]
    fn test_sentinel_location_aggregates_everything() {
        let dataset = sample_dataset();
        let series = aggregate(&dataset, Granularity::Year, Some("Alle")).unwrap();
        assert_eq!(labels(&series), vec![day(2023, 12, 31), day(2024, 12, 31)]);
    }

    #[test]
    fn test_missing_markers_do_not_drop_count_columns() {
        let csv = "timestamp,location_name,child_pedestrians_count,adult_pedestrians_count\n\
                   2024-01-01T08:00:00Z,A,10,NaN\n\
                   2024-01-01T09:00:00Z,A,NA,140\n";
        let dataset = Dataset::from_table(parse_csv(csv.as_bytes()).unwrap()).unwrap();
        let series = aggregate(&dataset, Granularity::Day, None).unwrap();

        assert_eq!(
            series.columns,
            vec!["child_pedestrians_count", "adult_pedestrians_count"]
        );
        assert_eq!(series.buckets[0].sums, vec![Sum::Integer(10), Sum::Integer(140)]);
        assert_eq!(series.to_records()[0]["child_pedestrians_count"], 10);
    }

    #[test]
    fn test_integer_overflow_is_internal_error() {
        let csv = format!(
            "timestamp,pedestrians_count\n2024-01-01T08:00:00Z,{max}\n2024-01-01T09:00:00Z,{max}\n",
            max = i64::MAX
        );
        let dataset = Dataset::from_table(parse_csv(csv.as_bytes()).unwrap()).unwrap();
        let err = aggregate(&dataset, Granularity::Day, None).unwrap_err();
        assert!(matches!(err, QueryError::Internal(_)));
    }

    #[test]
    fn test_empty_dataset_yields_empty_series() {
        let series = aggregate(&Dataset::empty(), Granularity::Month, None).unwrap();
        assert!(series.buckets.is_empty());
        assert!(series.to_records().is_empty());
    }

    #[test]
    fn test_records_shape() {
        let dataset = sample_dataset();
        let series = aggregate(&dataset, Granularity::Quarter, Some("Lintheschergasse")).unwrap();
        let records = series.to_records();
        assert_eq!(records.len(), 1);
        assert_eq!(
            serde_json::to_value(&records[0]).unwrap(),
            serde_json::json!({
                "timestamp": day(2024, 3, 31).timestamp_millis(),
                "pedestrians_count": 20,
                "child_pedestrians_count": 2,
                "adult_pedestrians_count": 18,
            })
        );
    }
}
