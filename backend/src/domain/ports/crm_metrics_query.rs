//! Driving port for derived pipeline metrics.

use async_trait::async_trait;

use crate::domain::crm::{DateRange, PerformanceMetrics, PipelineMetrics};
use crate::domain::Error;

/// Read-only aggregations recomputed on every call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrmMetricsQuery: Send + Sync {
    /// Live deals per stage for deals created within `range`.
    async fn pipeline_metrics(&self, range: DateRange) -> Result<PipelineMetrics, Error>;

    /// Win rate and cycle time for deals closed within `range`.
    async fn performance_metrics(&self, range: DateRange) -> Result<PerformanceMetrics, Error>;
}
