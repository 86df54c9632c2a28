//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Row structs (`models.rs`) and table definitions (`schema.rs`) stay private
//! to this module; the domain only sees [`DieselDealRepository`] through the
//! `DealRepository` port.
//!
//! # Example
//!
//! ```ignore
//! use crm_backend::outbound::persistence::{DbPool, DieselDealRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/crm")).await?;
//! let repo = DieselDealRepository::new(pool);
//! ```

mod diesel_deal_repository;
pub(crate) mod diesel_helpers;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_deal_repository::DieselDealRepository;
pub use migrations::{run_pending_migrations, MigrationError, MIGRATIONS};
pub use pool::{DbPool, PoolConfig, PoolError};
