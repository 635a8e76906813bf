//! Row selection by location, time window, hour and weather, plus age-group
//! column projection.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};
use crate::dataset::time::parse_bound;
use crate::dataset::{ADULT_COUNT, CHILD_COUNT, Dataset, Table};
use crate::error::{QueryError, QueryResult};

/// Location value meaning "every location".
pub const ALL_LOCATIONS: &str = "Alle";

/// Returns the location to filter on, or `None` for the "all" sentinel.
pub fn effective_location(location: Option<&str>) -> Option<&str> {
    location.filter(|l| {
        !l.is_empty() && *l != ALL_LOCATIONS && !l.eq_ignore_ascii_case("all")
    })
}

/// Which pedestrian age groups to keep in the output columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgeGroup {
    Children,
    Adults,
    #[default]
    Both,
}

impl AgeGroup {
    /// Column removed from the output for this group, if any.
    pub fn dropped_column(self) -> Option<&'static str> {
        match self {
            AgeGroup::Children => Some(ADULT_COUNT),
            AgeGroup::Adults => Some(CHILD_COUNT),
            AgeGroup::Both => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgeGroup::Children => "children",
            AgeGroup::Adults => "adults",
            AgeGroup::Both => "both",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeGroup {
    type Err = QueryError;

    /// Accepts the English labels and the German `kinder`/`erwachsene`/`beide`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "children" | "kinder" => Ok(AgeGroup::Children),
            "adults" | "erwachsene" => Ok(AgeGroup::Adults),
            "both" | "beide" => Ok(AgeGroup::Both),
            other => Err(QueryError::BadRequest(format!(
                "Invalid group '{other}'. Choose 'children', 'adults' or 'both'."
            ))),
        }
    }
}

/// How unknown `group` values are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupPolicy {
    /// Unknown values fall back to [`AgeGroup::Both`].
    #[default]
    Lenient,
    /// Unknown values are rejected with [`QueryError::BadRequest`].
    Strict,
}

impl GroupPolicy {
    pub fn resolve(self, raw: Option<&str>) -> QueryResult<AgeGroup> {
        let Some(raw) = raw else {
            return Ok(AgeGroup::Both);
        };
        match (raw.parse::<AgeGroup>(), self) {
            (Ok(group), _) => Ok(group),
            (Err(_), GroupPolicy::Lenient) => Ok(AgeGroup::Both),
            (Err(e), GroupPolicy::Strict) => Err(e),
        }
    }
}

/// Raw, unvalidated filter parameters as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    pub location: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub hour: Option<String>,
    pub group: Option<String>,
    pub weather: Vec<String>,
}

impl FilterParams {
    /// Collects parameters from query-string pairs. Weather may repeat.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = FilterParams::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "location_name" | "location" => params.location = Some(value),
                "start_time" | "startTime" => params.start_time = Some(value),
                "end_time" | "endTime" => params.end_time = Some(value),
                "hour" => params.hour = Some(value),
                "group" => params.group = Some(value),
                "weather" | "weather[]" | "weatherConditions" | "weatherConditions[]"
                | "weather_conditions" => params.weather.push(value),
                _ => {}
            }
        }
        params
    }
}

/// Validated filter criteria. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive; a bare date has already been widened to 23:59:59.
    pub end_time: Option<DateTime<Utc>>,
    pub hour: Option<u32>,
    /// Empty means no weather filter.
    pub weather_conditions: Vec<String>,
    pub group: AgeGroup,
}

impl FilterCriteria {
    pub fn from_params(params: &FilterParams, policy: GroupPolicy) -> QueryResult<Self> {
        let start_time = params
            .start_time
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                parse_bound(s)
                    .map(|b| b.start())
                    .ok_or_else(|| bad_time("start_time", s))
            })
            .transpose()?;

        let end_time = params
            .end_time
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                parse_bound(s)
                    .map(|b| b.end())
                    .ok_or_else(|| bad_time("end_time", s))
            })
            .transpose()?;

        let hour = params
            .hour
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| match s.trim().parse::<u32>() {
                Ok(h) if h < 24 => Ok(h),
                _ => Err(QueryError::BadRequest(format!(
                    "Invalid hour '{s}'. Expected an integer from 0 to 23."
                ))),
            })
            .transpose()?;

        Ok(FilterCriteria {
            location: effective_location(params.location.as_deref()).map(str::to_string),
            start_time,
            end_time,
            hour,
            weather_conditions: params.weather.clone(),
            group: policy.resolve(params.group.as_deref())?,
        })
    }
}

fn bad_time(name: &str, raw: &str) -> QueryError {
    QueryError::BadRequest(format!(
        "Invalid {name} '{raw}'. Expected an ISO-8601 date such as 2024-03-05."
    ))
}

/// Indices of rows matching `criteria`, in dataset order.
pub fn matching_rows(dataset: &Dataset, criteria: &FilterCriteria) -> Vec<usize> {
    let timestamps = dataset.timestamps();
    let locations = dataset.locations();
    let weather = dataset.weather_conditions();
    let wanted_weather: HashSet<&str> = criteria
        .weather_conditions
        .iter()
        .map(String::as_str)
        .collect();

    (0..dataset.len())
        .filter(|&row| {
            let ts = timestamps[row];

            if let Some(location) = &criteria.location {
                let here = locations.and_then(|l| l[row].as_deref());
                if here != Some(location.as_str()) {
                    return false;
                }
            }
            if criteria.start_time.is_some_and(|start| ts < start) {
                return false;
            }
            if criteria.end_time.is_some_and(|end| ts > end) {
                return false;
            }
            if criteria.hour.is_some_and(|hour| ts.hour() != hour) {
                return false;
            }
            if !wanted_weather.is_empty() {
                let here = weather.and_then(|w| w[row].as_deref());
                if !here.is_some_and(|w| wanted_weather.contains(w)) {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Matching rows as a new table, with the age-group projection applied.
#[tracing::instrument(skip(dataset), fields(rows = dataset.len()))]
pub fn filter(dataset: &Dataset, criteria: &FilterCriteria) -> Table {
    let rows = matching_rows(dataset, criteria);
    let table = dataset.table().take(&rows);

    match criteria.group.dropped_column() {
        Some(column) => table.without_column(column),
        None => table,
    }
}
