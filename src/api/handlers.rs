use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::dataset::Record;
use crate::error::{QueryError, QueryResult};
use crate::query::QueryEngine;
use crate::query::filter::FilterParams;
use crate::query::focus::FocusShare;
use crate::query::metadata::{DatasetStats, Locations, TimeRange, WeatherConditions};

pub(super) async fn stats(State(engine): State<QueryEngine>) -> QueryResult<Json<DatasetStats>> {
    engine.stats().map(Json)
}

pub(super) async fn time_range(State(engine): State<QueryEngine>) -> QueryResult<Json<TimeRange>> {
    engine.time_range().map(Json)
}

pub(super) async fn locations(State(engine): State<QueryEngine>) -> QueryResult<Json<Locations>> {
    engine.locations().map(Json)
}

pub(super) async fn weather(
    State(engine): State<QueryEngine>,
) -> QueryResult<Json<WeatherConditions>> {
    engine.weather_conditions().map(Json)
}

pub(super) async fn focus(State(engine): State<QueryEngine>) -> Json<Vec<FocusShare>> {
    Json(engine.focus_report())
}

#[derive(Debug, Deserialize)]
pub(super) struct AggregateQuery {
    granularity: Option<String>,
    #[serde(alias = "location")]
    location_name: Option<String>,
}

pub(super) async fn aggregate(
    State(engine): State<QueryEngine>,
    Query(query): Query<AggregateQuery>,
) -> QueryResult<Json<Vec<Record>>> {
    let granularity = query.granularity.ok_or_else(|| {
        QueryError::BadRequest("Missing required parameter 'granularity'.".to_string())
    })?;
    let series = engine.aggregate(&granularity, query.location_name.as_deref())?;
    Ok(Json(series.to_records()))
}

/// Pairs rather than a struct so `weather` may repeat.
pub(super) async fn data(
    State(engine): State<QueryEngine>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> QueryResult<Json<Vec<Record>>> {
    let params = FilterParams::from_pairs(pairs);
    let table = engine.filter(&params)?;
    Ok(Json(table.to_records()))
}
