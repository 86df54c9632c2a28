//! Driven port for deal, activity and reminder persistence.
//!
//! Deal writes are compare-and-swap on [`Deal::version`]: the caller passes
//! the version it read and a deal already advanced to the next version.
//! Adapters must apply the write only when the stored version still matches
//! and otherwise report [`DealRepositoryError::VersionMismatch`]. This is
//! what serialises concurrent stage changes on one deal.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::crm::{DateRange, Deal, DealActivity, DealPriority, DealReminder, DealStage};
use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by deal repository adapters.
    pub enum DealRepositoryError {
        /// The store could not be reached or a connection could not be
        /// checked out.
        Connection { message: String } =>
            "deal repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "deal repository query failed: {message}",
        /// The stored deal moved on since it was read.
        VersionMismatch { expected: u64, actual: u64 } =>
            "deal version mismatch: expected {expected}, found {actual}",
        /// A write referenced a deal that does not exist.
        MissingDeal { deal_id: Uuid } =>
            "deal {deal_id} does not exist",
        /// A reminder settle raced another settle.
        ReminderNotPending { reminder_id: Uuid } =>
            "reminder {reminder_id} is no longer pending",
        /// An insert reused an existing identifier.
        Duplicate { id: Uuid } =>
            "record {id} already exists",
        /// A permanent delete targeted a deal that is not in the trash.
        NotArchived { deal_id: Uuid } =>
            "deal {deal_id} is not archived",
    }
}

/// Criteria for deal listings. The default lists every live deal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealFilter {
    pub stage: Option<DealStage>,
    pub owner_id: Option<UserId>,
    pub priority: Option<DealPriority>,
    /// Case-insensitive match against name, company and email.
    pub search: Option<String>,
    /// Bounds on `created_at`.
    pub created: DateRange,
    /// List archived deals instead of live ones.
    pub archived: bool,
}

impl DealFilter {
    /// Whether `deal` satisfies every criterion.
    pub fn matches(&self, deal: &Deal) -> bool {
        if deal.is_archived() != self.archived {
            return false;
        }
        if self.stage.is_some_and(|stage| stage != deal.stage()) {
            return false;
        }
        if self.owner_id.is_some_and(|owner| owner != deal.owner_id()) {
            return false;
        }
        if self.priority.is_some_and(|priority| priority != deal.priority()) {
            return false;
        }
        if !self.created.contains(deal.created_at()) {
            return false;
        }
        match self.search_term() {
            None => true,
            Some(term) => [Some(deal.name()), deal.company(), deal.email()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&term)),
        }
    }

    /// Lower-cased, trimmed search text, if any.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

/// Port for deal storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DealRepository: Send + Sync {
    /// Store a new deal together with its opening activity.
    async fn insert_deal(
        &self,
        deal: &Deal,
        opening: &DealActivity,
    ) -> Result<(), DealRepositoryError>;

    /// Fetch a deal, archived or not.
    async fn find_deal(&self, deal_id: Uuid) -> Result<Option<Deal>, DealRepositoryError>;

    /// List deals matching `filter`, most recently updated first.
    async fn list_deals(&self, filter: &DealFilter) -> Result<Vec<Deal>, DealRepositoryError>;

    /// Replace the stored deal if its version still equals
    /// `expected_version`, appending `audit` in the same atomic write.
    /// The stored `last_interaction_at` is never moved backwards.
    async fn update_deal(
        &self,
        deal: &Deal,
        expected_version: u64,
        audit: &[DealActivity],
    ) -> Result<(), DealRepositoryError>;

    /// Permanently delete an archived deal, its activities and reminders,
    /// if its version still equals `expected_version`.
    async fn purge_deal(
        &self,
        deal_id: Uuid,
        expected_version: u64,
    ) -> Result<(), DealRepositoryError>;

    /// Permanently delete every archived deal. Returns the number removed.
    async fn purge_archived(&self) -> Result<u64, DealRepositoryError>;

    /// Append an activity and advance the deal's interaction clock. Does not
    /// change the deal version.
    async fn append_activity(&self, activity: &DealActivity) -> Result<(), DealRepositoryError>;

    /// Activities for a deal, newest first.
    async fn list_activities(
        &self,
        deal_id: Uuid,
    ) -> Result<Vec<DealActivity>, DealRepositoryError>;

    /// Store a new pending reminder.
    async fn insert_reminder(&self, reminder: &DealReminder) -> Result<(), DealRepositoryError>;

    async fn find_reminder(
        &self,
        reminder_id: Uuid,
    ) -> Result<Option<DealReminder>, DealRepositoryError>;

    /// Persist a completed or cancelled reminder, only if it is still
    /// pending in storage.
    async fn settle_reminder(&self, reminder: &DealReminder) -> Result<(), DealRepositoryError>;

    /// Pending reminders, soonest first, optionally for one assignee.
    async fn pending_reminders(
        &self,
        assignee: Option<UserId>,
    ) -> Result<Vec<DealReminder>, DealRepositoryError>;

    /// Every reminder attached to a deal, soonest first.
    async fn reminders_for_deal(
        &self,
        deal_id: Uuid,
    ) -> Result<Vec<DealReminder>, DealRepositoryError>;

    /// All non-archived deals, read in a single consistent query.
    async fn snapshot(&self) -> Result<Vec<Deal>, DealRepositoryError>;
}
