//! Pipeline and performance metrics handlers.
//!
//! ```text
//! GET /api/v1/metrics/pipeline?days=30
//! GET /api/v1/metrics/performance?from=2026-01-01T00:00:00Z&to=2026-04-01T00:00:00Z
//! ```
//!
//! Open to principals holding `crm` or `dashboard`. Without a range the
//! pipeline covers every live deal and performance covers the configured
//! trailing window.

use actix_web::{get, web};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::crm::{
    DateRange, LostReasonShare, PerformanceMetrics, PipelineMetrics, StageBreakdown,
};
use crate::domain::Error;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{parse_optional_rfc3339_timestamp, FieldName};
use crate::inbound::http::ApiResult;

/// Time window selection. `days` and explicit bounds are mutually exclusive.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct MetricsQuery {
    /// Inclusive lower bound, RFC 3339.
    pub from: Option<String>,
    /// Exclusive upper bound, RFC 3339.
    pub to: Option<String>,
    /// Trailing window ending now.
    #[param(minimum = 1, maximum = 3650)]
    pub days: Option<i64>,
}

/// Range applied when a request names neither bounds nor `days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unspecified {
    /// No date filter at all.
    Everything,
    /// `metrics_window_days` ending now.
    ConfiguredWindow,
}

fn resolve_range(
    state: &HttpState,
    query: MetricsQuery,
    unspecified: Unspecified,
) -> Result<DateRange, Error> {
    let has_bounds = query.from.is_some() || query.to.is_some();
    match (has_bounds, query.days) {
        (true, Some(_)) => Err(Error::invalid_request(
            "days cannot be combined with from or to",
        )
        .with_details(json!({ "field": "days", "code": "conflicting_range" }))),
        (true, None) => {
            let from = parse_optional_rfc3339_timestamp(query.from.as_deref(), FieldName::new("from"))?;
            let to = parse_optional_rfc3339_timestamp(query.to.as_deref(), FieldName::new("to"))?;
            Ok(DateRange::new(from, to)?)
        }
        (false, Some(days)) => Ok(DateRange::last_days(state.clock.utc(), days)?),
        (false, None) => match unspecified {
            Unspecified::Everything => Ok(DateRange::unbounded()),
            Unspecified::ConfiguredWindow => Ok(DateRange::last_days(
                state.clock.utc(),
                state.metrics_window_days,
            )?),
        },
    }
}

fn range_bounds(range: &DateRange) -> (Option<String>, Option<String>) {
    (
        range.from().map(|at| at.to_rfc3339()),
        range.to().map(|at| at.to_rfc3339()),
    )
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageMetricsResponse {
    #[schema(example = "qualified")]
    pub stage: String,
    pub label: String,
    pub count: u64,
    pub value: i64,
    pub weighted_value: i64,
}

impl From<StageBreakdown> for StageMetricsResponse {
    fn from(breakdown: StageBreakdown) -> Self {
        Self {
            stage: breakdown.stage.as_str().to_owned(),
            label: breakdown.stage.label().to_owned(),
            count: breakdown.count,
            value: breakdown.value,
            weighted_value: breakdown.weighted_value,
        }
    }
}

/// Live pipeline grouped by open stage.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetricsResponse {
    pub from: Option<String>,
    pub to: Option<String>,
    pub stages: Vec<StageMetricsResponse>,
    pub total_deals: u64,
    pub total_value: i64,
    pub weighted_value: i64,
    pub deals_needing_follow_up: u64,
}

impl From<PipelineMetrics> for PipelineMetricsResponse {
    fn from(metrics: PipelineMetrics) -> Self {
        let (from, to) = range_bounds(&metrics.range);
        Self {
            from,
            to,
            stages: metrics
                .stages
                .into_iter()
                .map(StageMetricsResponse::from)
                .collect(),
            total_deals: metrics.total_deals,
            total_value: metrics.total_value,
            weighted_value: metrics.weighted_value,
            deals_needing_follow_up: metrics.deals_needing_follow_up,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LostReasonResponse {
    #[schema(example = "price")]
    pub reason: String,
    pub count: u64,
    #[schema(example = 62.5)]
    pub percentage: f64,
}

impl From<LostReasonShare> for LostReasonResponse {
    fn from(share: LostReasonShare) -> Self {
        Self {
            reason: share.reason,
            count: share.count,
            percentage: share.percentage,
        }
    }
}

/// Outcomes of deals closed within the window.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetricsResponse {
    pub from: Option<String>,
    pub to: Option<String>,
    pub won_count: u64,
    pub lost_count: u64,
    /// Fraction in `[0, 1]`.
    #[schema(example = 0.4)]
    pub win_rate: f64,
    pub average_cycle_days: f64,
    pub won_value: i64,
    pub lost_value: i64,
    pub total_closed_value: i64,
    pub lost_reasons: Vec<LostReasonResponse>,
}

impl From<PerformanceMetrics> for PerformanceMetricsResponse {
    fn from(metrics: PerformanceMetrics) -> Self {
        let (from, to) = range_bounds(&metrics.range);
        Self {
            from,
            to,
            won_count: metrics.won_count,
            lost_count: metrics.lost_count,
            win_rate: metrics.win_rate,
            average_cycle_days: metrics.average_cycle_days,
            won_value: metrics.won_value,
            lost_value: metrics.lost_value,
            total_closed_value: metrics.total_closed_value,
            lost_reasons: metrics
                .lost_reasons
                .into_iter()
                .map(LostReasonResponse::from)
                .collect(),
        }
    }
}

/// Live deals grouped by open stage, optionally limited to those created
/// within a window.
#[utoipa::path(
    get,
    path = "/api/v1/metrics/pipeline",
    params(MetricsQuery),
    responses(
        (status = 200, description = "Pipeline metrics", body = PipelineMetricsResponse),
        (status = 400, description = "Invalid range", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["metrics"],
    operation_id = "pipelineMetrics"
)]
#[get("/pipeline")]
pub async fn pipeline_metrics(
    state: web::Data<HttpState>,
    query: web::Query<MetricsQuery>,
) -> ApiResult<web::Json<PipelineMetricsResponse>> {
    let range = resolve_range(&state, query.into_inner(), Unspecified::Everything)?;
    let metrics = state.metrics.pipeline_metrics(range).await?;
    Ok(web::Json(PipelineMetricsResponse::from(metrics)))
}

/// Win rate, cycle time and loss reasons for deals closed within the window.
#[utoipa::path(
    get,
    path = "/api/v1/metrics/performance",
    params(MetricsQuery),
    responses(
        (status = 200, description = "Performance metrics", body = PerformanceMetricsResponse),
        (status = 400, description = "Invalid range", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["metrics"],
    operation_id = "performanceMetrics"
)]
#[get("/performance")]
pub async fn performance_metrics(
    state: web::Data<HttpState>,
    query: web::Query<MetricsQuery>,
) -> ApiResult<web::Json<PerformanceMetricsResponse>> {
    let range = resolve_range(&state, query.into_inner(), Unspecified::ConfiguredWindow)?;
    let metrics = state.metrics.performance_metrics(range).await?;
    Ok(web::Json(PerformanceMetricsResponse::from(metrics)))
}
