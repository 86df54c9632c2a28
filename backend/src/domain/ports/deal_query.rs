//! Driving port for deal reads.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::crm::{Deal, DealActivity, DealAlert, DealReminder};
use crate::domain::{Error, UserId};

use super::DealFilter;

/// A deal decorated with the figures the pipeline board needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealView {
    pub deal: Deal,
    pub alerts: Vec<DealAlert>,
    pub days_in_stage: i64,
    pub days_since_interaction: i64,
    /// Soonest pending reminder, if any.
    pub next_reminder: Option<DealReminder>,
}

/// Read operations over deals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DealQuery: Send + Sync {
    /// Fetch one deal. Archived deals are returned so they can be restored.
    async fn get_deal(&self, deal_id: Uuid) -> Result<DealView, Error>;

    async fn list_deals(&self, filter: DealFilter) -> Result<Vec<DealView>, Error>;

    /// Activity log of a deal, newest first.
    async fn list_activities(&self, deal_id: Uuid) -> Result<Vec<DealActivity>, Error>;

    /// Pending reminders, soonest first.
    async fn pending_reminders(&self, assignee: Option<UserId>) -> Result<Vec<DealReminder>, Error>;
}
