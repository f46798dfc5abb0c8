//! API route handlers

use super::AppState;
use crate::error::IndexError;
use crate::render::GaugeSpec;
use crate::types::{parse_date, AggregateSeries, Asset, DateRange, MetricKind, DATE_FORMAT};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Plain-text error reply
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Upstream(String),
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(format!("Error: {}", err))
        } else {
            tracing::error!("upstream failure: {}", err);
            ApiError::Upstream(format!("Error: {}", err))
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) | ApiError::Upstream(msg) => f.write_str(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SentimentQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub metrics: Option<String>,
    pub weights: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GaugeQuery {
    pub date: Option<String>,
    pub metrics: Option<String>,
    pub weights: Option<String>,
}

/// Accepts both `BTC` and `coin=BTC`
pub fn parse_coin(segment: &str) -> Result<Asset, ApiError> {
    let ticker = segment.strip_prefix("coin=").unwrap_or(segment).trim();
    if ticker.is_empty() {
        return Err(ApiError::BadRequest(
            "Error: No coin provided. Please specify a coin.".to_string(),
        ));
    }
    Ok(Asset::new(ticker))
}

/// Comma-separated metric names with optional positional weights (default 1.0)
pub fn parse_metrics(metrics: &str, weights: Option<&str>) -> Result<Vec<(MetricKind, f64)>, ApiError> {
    let kinds = split_list(metrics)
        .map(|name| name.parse::<MetricKind>())
        .collect::<Result<Vec<_>, _>>()?;

    if kinds.is_empty() {
        return Err(ApiError::BadRequest(
            "Error: No metrics field provided. Please specify metrics.".to_string(),
        ));
    }

    let weights = match weights {
        None => vec![1.0; kinds.len()],
        Some(raw) => split_list(raw)
            .map(|w| {
                w.parse::<f64>()
                    .map_err(|_| ApiError::BadRequest(format!("Error: Invalid weight '{}'.", w)))
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    if weights.len() != kinds.len() {
        return Err(ApiError::BadRequest(format!(
            "Error: Expected {} weights, one per metric, got {}.",
            kinds.len(),
            weights.len()
        )));
    }

    Ok(kinds.into_iter().zip(weights).collect())
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

fn date_range(start: &Option<String>, end: &Option<String>) -> Result<DateRange, ApiError> {
    let start = required(start, "Error: No start date field provided. Please specify a start date.")?;
    let end = required(end, "Error: No end date field provided. Please specify an end date.")?;
    Ok(DateRange::parse(start, end)?)
}

pub async fn sentiment(
    State(state): State<AppState>,
    Path(coin): Path<String>,
    Query(query): Query<SentimentQuery>,
) -> Result<Json<AggregateSeries>, ApiError> {
    let range = date_range(&query.start_date, &query.end_date)?;
    let metrics = required(&query.metrics, "Error: No metrics field provided. Please specify metrics.")?;
    let metrics = parse_metrics(metrics, query.weights.as_deref())?;
    let asset = parse_coin(&coin)?;

    let series = state.manager.sentiment(&asset, &metrics, &range).await?;
    Ok(Json(series))
}

pub async fn price(
    State(state): State<AppState>,
    Path(coin): Path<String>,
    Query(query): Query<SentimentQuery>,
) -> Result<Json<BTreeMap<String, f64>>, ApiError> {
    let range = date_range(&query.start_date, &query.end_date)?;
    let asset = parse_coin(&coin)?;

    let prices = state.manager.prices(&asset, &range).await?;
    Ok(Json(
        prices
            .into_iter()
            .map(|(date, price)| (date.format(DATE_FORMAT).to_string(), price))
            .collect(),
    ))
}

pub async fn gauge(
    State(state): State<AppState>,
    Path(coin): Path<String>,
    Query(query): Query<GaugeQuery>,
) -> Result<Json<GaugeSpec>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => Utc::now().date_naive(),
    };
    let metrics = match query.metrics.as_deref() {
        Some(raw) => parse_metrics(raw, query.weights.as_deref())?,
        None => state.defaults.weighted_metrics(),
    };
    let asset = parse_coin(&coin)?;

    let gauge = state.manager.gauge(&asset, date, &metrics).await?;
    Ok(Json(gauge))
}
