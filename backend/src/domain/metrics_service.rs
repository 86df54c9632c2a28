//! Metrics aggregator.
//!
//! Reads one consistent snapshot of live deals per call and folds it with the
//! pure functions in [`crate::domain::crm`]. Nothing is cached.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::debug;

use crate::domain::crm::{
    performance_metrics, pipeline_metrics, AlertPolicy, DateRange, PerformanceMetrics,
    PipelineMetrics,
};
use crate::domain::deal_service::map_repository_error;
use crate::domain::ports::{CrmMetricsQuery, DealRepository};
use crate::domain::Error;

/// Pipeline and performance metrics over a [`DealRepository`].
#[derive(Clone)]
pub struct MetricsService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: AlertPolicy,
}

impl<R> MetricsService<R> {
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            policy: AlertPolicy::default(),
        }
    }

    /// Override the follow-up threshold used for the needs-follow-up count.
    pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl<R> CrmMetricsQuery for MetricsService<R>
where
    R: DealRepository,
{
    async fn pipeline_metrics(&self, range: DateRange) -> Result<PipelineMetrics, Error> {
        let deals = self
            .repository
            .snapshot()
            .await
            .map_err(map_repository_error)?;
        let metrics = pipeline_metrics(&deals, &range, self.clock.utc(), &self.policy);
        debug!(
            deals = deals.len(),
            total = metrics.total_deals,
            "pipeline metrics computed"
        );
        Ok(metrics)
    }

    async fn performance_metrics(&self, range: DateRange) -> Result<PerformanceMetrics, Error> {
        let deals = self
            .repository
            .snapshot()
            .await
            .map_err(map_repository_error)?;
        let metrics = performance_metrics(&deals, &range);
        debug!(
            won = metrics.won_count,
            lost = metrics.lost_count,
            "performance metrics computed"
        );
        Ok(metrics)
    }
}
