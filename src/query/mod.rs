//! Query engine over the loaded dataset.
//!
//! Filtering selects rows and projects age-group columns, aggregation sums
//! count columns per calendar bucket, and the reports summarize the whole
//! dataset. All operations are synchronous reads of the shared [`Dataset`].

pub mod aggregate;
pub mod filter;
pub mod focus;
pub mod metadata;

use std::sync::Arc;

use tracing::debug;

use crate::dataset::{Dataset, Table};
use crate::error::QueryResult;

use aggregate::{AggregateSeries, Granularity};
use filter::{FilterCriteria, FilterParams, GroupPolicy};
use focus::{FocusQuery, FocusShare};
use metadata::{DatasetStats, Locations, TimeRange, WeatherConditions};

/// Entry point for every read operation. Cheap to clone.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    dataset: Arc<Dataset>,
    group_policy: GroupPolicy,
}

impl QueryEngine {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            group_policy: GroupPolicy::default(),
        }
    }

    pub fn with_group_policy(mut self, policy: GroupPolicy) -> Self {
        self.group_policy = policy;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn stats(&self) -> QueryResult<DatasetStats> {
        metadata::stats(&self.dataset)
    }

    pub fn time_range(&self) -> QueryResult<TimeRange> {
        metadata::time_range(&self.dataset)
    }

    pub fn locations(&self) -> QueryResult<Locations> {
        metadata::locations(&self.dataset)
    }

    pub fn weather_conditions(&self) -> QueryResult<WeatherConditions> {
        metadata::weather_conditions(&self.dataset)
    }

    pub fn focus_report(&self) -> Vec<FocusShare> {
        FocusQuery::default().run(&self.dataset)
    }

    /// Parses `granularity` and aggregates, optionally for one location.
    pub fn aggregate(&self, granularity: &str, location: Option<&str>) -> QueryResult<AggregateSeries> {
        let granularity: Granularity = granularity.parse()?;
        let series = aggregate::aggregate(&self.dataset, granularity, location)?;
        debug!(%granularity, buckets = series.buckets.len(), "Aggregation complete");
        Ok(series)
    }

    /// Validates raw parameters and returns the filtered table.
    pub fn filter(&self, params: &FilterParams) -> QueryResult<Table> {
        let criteria = FilterCriteria::from_params(params, self.group_policy)?;
        let table = filter::filter(&self.dataset, &criteria);
        debug!(rows = table.num_rows(), "Filter complete");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::sample_dataset;
    use crate::error::QueryError;

    fn engine() -> QueryEngine {
        QueryEngine::new(Arc::new(sample_dataset()))
    }

    #[test]
    fn test_engine_delegates_reports() {
        let engine = engine();
        assert_eq!(engine.stats().unwrap().total_rows, 8);
        assert_eq!(engine.locations().unwrap().locations.len(), 3);
        assert_eq!(engine.focus_report().len(), 24);
    }

    #[test]
    fn test_engine_aggregate_parses_granularity() {
        let engine = engine();
        assert!(engine.aggregate("Quarter", None).is_ok());
        assert!(matches!(
            engine.aggregate("fortnight", None),
            Err(QueryError::BadRequest(_))
        ));
    }

    #[test]
    fn test_engine_group_policy() {
        let params = FilterParams {
            group: Some("toddlers".into()),
            ..Default::default()
        };
        assert_eq!(engine().filter(&params).unwrap().num_rows(), 8);
        assert!(matches!(
            engine()
                .with_group_policy(GroupPolicy::Strict)
                .filter(&params),
            Err(QueryError::BadRequest(_))
        ));
    }

    #[test]
    fn test_engine_on_empty_dataset() {
        let engine = QueryEngine::new(Arc::new(Dataset::empty()));
        assert!(matches!(engine.stats(), Err(QueryError::ServiceUnavailable(_))));
        assert_eq!(engine.focus_report().len(), 24);
        assert!(engine.filter(&FilterParams::default()).unwrap().is_empty());
        assert!(engine.aggregate("day", None).unwrap().buckets.is_empty());
    }
}
