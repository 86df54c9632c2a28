//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::domain::ports::{CrmMetricsQuery, DealCommand, DealQuery, LoginService};

/// Metrics window used when a request names no range.
pub const DEFAULT_METRICS_WINDOW_DAYS: i64 = 90;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub deals: Arc<dyn DealCommand>,
    pub deals_query: Arc<dyn DealQuery>,
    pub metrics: Arc<dyn CrmMetricsQuery>,
    /// Source of "now" for default metric windows.
    pub clock: Arc<dyn Clock>,
    pub metrics_window_days: i64,
}

impl HttpState {
    /// Construct state from its ports.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use crm_backend::domain::ports::FixtureLoginService;
    /// use crm_backend::domain::{DealService, MetricsService};
    /// use crm_backend::inbound::http::state::HttpState;
    /// use crm_backend::outbound::memory::InMemoryDealRepository;
    /// use mockable::DefaultClock;
    ///
    /// let repo = Arc::new(InMemoryDealRepository::new());
    /// let deals = Arc::new(DealService::new(repo.clone(), Arc::new(DefaultClock)));
    /// let metrics = Arc::new(MetricsService::new(repo, Arc::new(DefaultClock)));
    /// let state = HttpState::new(Arc::new(FixtureLoginService), deals.clone(), deals, metrics);
    /// let _login = state.login.clone();
    /// ```
    pub fn new(
        login: Arc<dyn LoginService>,
        deals: Arc<dyn DealCommand>,
        deals_query: Arc<dyn DealQuery>,
        metrics: Arc<dyn CrmMetricsQuery>,
    ) -> Self {
        Self {
            login,
            deals,
            deals_query,
            metrics,
            clock: Arc::new(DefaultClock),
            metrics_window_days: DEFAULT_METRICS_WINDOW_DAYS,
        }
    }

    /// Replace the clock used for default metric windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the default metric window length in days.
    pub fn with_metrics_window_days(mut self, days: i64) -> Self {
        self.metrics_window_days = days;
        self
    }
}
