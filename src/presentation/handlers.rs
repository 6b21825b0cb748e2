// HTTP request handlers
use crate::application::chart_service::{ChartError, ChartView};
use crate::application::filter_resolver::{RawFilterParams, TIME_FORMAT};
use crate::domain::chart::DisplayUnit;
use crate::domain::filter::GranularityUnit;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Header carrying the caller's session identity for filter memory.
pub const SESSION_HEADER: &str = "x-session-id";

const LEGEND: &str = "Water depth";

/// Resolved filter, formatted to pre-populate a filter form.
#[derive(Debug, Serialize)]
pub struct FilterForm {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub granularity_quantity: u32,
    pub granularity_unit: GranularityUnit,
}

#[derive(Debug, Serialize)]
pub struct ChartResponse {
    pub filter: FilterForm,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub display_unit: DisplayUnit,
    pub legend: &'static str,
    pub reading_count: usize,
}

impl From<ChartView> for ChartResponse {
    fn from(view: ChartView) -> Self {
        let filter = FilterForm {
            start_time: view.filter.start_time.map(|t| t.format(TIME_FORMAT).to_string()),
            end_time: view.filter.end_time.map(|t| t.format(TIME_FORMAT).to_string()),
            granularity_quantity: view.filter.granularity.quantity,
            granularity_unit: view.filter.granularity.unit,
        };
        let (labels, values) = view
            .aggregation
            .points
            .iter()
            .map(|p| (p.bucket_start.to_rfc3339(), p.mean_depth))
            .unzip();

        Self {
            filter,
            labels,
            values,
            display_unit: view.aggregation.display_unit,
            legend: LEGEND,
            reading_count: view.aggregation.reading_count,
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Aggregated depth chart for the requested window and granularity
pub async fn get_chart(
    Query(params): Query<RawFilterParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty());

    match state.chart_service.chart(session, &params).await {
        Ok(view) => respond(StatusCode::OK, &ChartResponse::from(view), compress).await,
        Err(e) => error_response(e, compress).await,
    }
}

/// Reload every reading from the source
pub async fn refresh_readings(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let compress = accepts_brotli(&headers);

    match state.chart_service.refresh().await {
        Ok(count) => respond(StatusCode::OK, &json!({ "reading_count": count }), compress).await,
        Err(e) => error_response(ChartError::Load(e), compress).await,
    }
}

async fn error_response(error: ChartError, compress: bool) -> Response {
    let status = match &error {
        ChartError::Validation(_) => {
            tracing::warn!("Rejected chart request: {}", error);
            StatusCode::BAD_REQUEST
        }
        ChartError::Load(_) => {
            tracing::error!("Error loading readings: {}", error);
            StatusCode::BAD_GATEWAY
        }
    };
    respond(status, &json!({ "error": error.to_string() }), compress).await
}

async fn respond<T: Serialize>(status: StatusCode, data: &T, compress: bool) -> Response {
    match json_response(status, data, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
