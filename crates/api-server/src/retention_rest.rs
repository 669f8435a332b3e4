//! Retention analytics REST endpoint.

use crate::auth;
use crate::error::ApiError;
use crate::rest::{AppState, ErrorResponse};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use nexus_core::NexusError;
use nexus_reporting::{RetentionQuery, RetentionReport};
use serde::Deserialize;
use std::time::Instant;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RetentionParams {
    /// `24h`, `7d`, `30d` (default) or `all`.
    pub range: Option<String>,
    /// Project id or `all` (default).
    pub project_id: Option<String>,
    /// Environment tag or `all` (default).
    pub environment: Option<String>,
}

/// GET /api/analytics/retention — Cohort retention for the caller's projects.
#[utoipa::path(
    get,
    path = "/api/analytics/retention",
    tag = "Retention",
    params(RetentionParams),
    responses(
        (status = 200, description = "Cohorts, most recent first, and headline metrics", body = RetentionReport),
        (status = 400, description = "Malformed query or projectId", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Project not found or access denied", body = ErrorResponse),
        (status = 500, description = "Failed to fetch retention analytics", body = ErrorResponse),
    )
)]
pub async fn handle_retention(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<RetentionParams>, QueryRejection>,
) -> Result<Json<RetentionReport>, ApiError> {
    let started = Instant::now();
    let company_id = auth::authenticate(&state, &headers).await?;
    let Query(params) =
        params.map_err(|rejection| NexusError::InvalidInput(rejection.body_text()))?;

    let query = RetentionQuery::from_params(
        company_id,
        params.range.as_deref(),
        params.project_id.as_deref(),
        params.environment.as_deref(),
    )?;
    metrics::counter!("retention.requests", "range" => query.range.as_str()).increment(1);

    match state.calculator.compute(&query).await {
        Ok(report) => {
            metrics::histogram!("retention.latency_ms")
                .record(started.elapsed().as_secs_f64() * 1000.0);
            Ok(Json(report))
        }
        Err(e @ NexusError::AccessDenied) => {
            metrics::counter!("retention.denied").increment(1);
            Err(e.into())
        }
        Err(e) => {
            metrics::counter!("retention.errors").increment(1);
            Err(e.into())
        }
    }
}
