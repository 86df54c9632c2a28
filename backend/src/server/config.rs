//! HTTP server configuration object and helpers.

use actix_web::cookie::{Key, SameSite};
use crm_backend::domain::crm::AlertPolicy;
use crm_backend::outbound::persistence::DbPool;
use std::net::SocketAddr;

/// Where deals are stored.
#[derive(Clone)]
pub enum Storage {
    Memory,
    Postgres(DbPool),
}

impl Storage {
    /// Label reported by the health probes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) storage: Storage,
    pub(crate) policy: AlertPolicy,
    pub(crate) metrics_window_days: i64,
}

impl ServerConfig {
    /// Construct an in-memory configuration with the default CRM policy.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            storage: Storage::Memory,
            policy: AlertPolicy::default(),
            metrics_window_days: crm_backend::inbound::http::state::DEFAULT_METRICS_WINDOW_DAYS,
        }
    }

    /// Store deals in PostgreSQL through `pool`.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.storage = Storage::Postgres(pool);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_metrics_window_days(mut self, days: i64) -> Self {
        self.metrics_window_days = days;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}
