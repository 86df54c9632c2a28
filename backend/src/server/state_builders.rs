//! Builders for HTTP state over the configured deal store.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use crm_backend::domain::crm::AlertPolicy;
use crm_backend::domain::ports::{DealRepository, FixtureLoginService};
use crm_backend::domain::{DealService, MetricsService};
use crm_backend::inbound::http::state::HttpState;
use crm_backend::outbound::memory::InMemoryDealRepository;
use crm_backend::outbound::persistence::DieselDealRepository;

use super::{ServerConfig, Storage};

/// Wire the lifecycle manager and metrics aggregator over one repository.
///
/// Both services share the repository and clock so that reads observe the
/// writes made through the same process.
fn services_over<R>(
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: AlertPolicy,
) -> (Arc<DealService<R>>, Arc<MetricsService<R>>)
where
    R: DealRepository + 'static,
{
    let deals = DealService::new(repository.clone(), clock.clone()).with_policy(policy);
    let metrics = MetricsService::new(repository, clock).with_policy(policy);
    (Arc::new(deals), Arc::new(metrics))
}

fn state_over<R>(repository: Arc<R>, config: &ServerConfig) -> HttpState
where
    R: DealRepository + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let (deals, metrics) = services_over(repository, clock.clone(), config.policy);
    HttpState::new(Arc::new(FixtureLoginService), deals.clone(), deals, metrics)
        .with_clock(clock)
        .with_metrics_window_days(config.metrics_window_days)
}

/// Build the HTTP state for the configured storage backend.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let state = match &config.storage {
        Storage::Memory => state_over(Arc::new(InMemoryDealRepository::new()), config),
        Storage::Postgres(pool) => state_over(Arc::new(DieselDealRepository::new(pool.clone())), config),
    };
    web::Data::new(state)
}
