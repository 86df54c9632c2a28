//! Driving port for deal lifecycle mutations.
//!
//! Every request names the acting user so the lifecycle manager can stamp
//! ownership and audit entries. Requests that target an existing deal carry
//! an optional `expected_version`; a stale value fails with a conflict.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::crm::{
    Deal, DealActivity, DealDraft, DealPatch, DealReminder, DealStage, LossDetails, NewActivity,
    NewReminder, PublicLead, WonDetails,
};
use crate::domain::{Error, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDealRequest {
    pub actor: UserId,
    pub draft: DealDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDealRequest {
    pub actor: UserId,
    pub deal_id: Uuid,
    pub expected_version: Option<u64>,
    pub patch: DealPatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeStageRequest {
    pub actor: UserId,
    pub deal_id: Uuid,
    pub expected_version: Option<u64>,
    pub target: DealStage,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkWonRequest {
    pub actor: UserId,
    pub deal_id: Uuid,
    pub expected_version: Option<u64>,
    pub details: WonDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkLostRequest {
    pub actor: UserId,
    pub deal_id: Uuid,
    pub expected_version: Option<u64>,
    pub details: LossDetails,
}

/// Archive, restore or permanently delete a deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealActionRequest {
    pub actor: UserId,
    pub deal_id: Uuid,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddActivityRequest {
    pub actor: UserId,
    pub deal_id: Uuid,
    pub activity: NewActivity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReminderRequest {
    pub actor: UserId,
    pub deal_id: Uuid,
    pub reminder: NewReminder,
}

/// Complete or cancel a reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderActionRequest {
    pub actor: UserId,
    pub reminder_id: Uuid,
}

/// Outcome of a stage-moving transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageChangeResponse {
    pub deal: Deal,
    pub activity: DealActivity,
}

/// Lifecycle operations on deals, their activities and reminders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DealCommand: Send + Sync {
    /// Open a deal in its entry stage and log the creation.
    async fn create_deal(&self, request: CreateDealRequest) -> Result<Deal, Error>;

    /// Edit descriptive fields of a live deal.
    async fn update_deal(&self, request: UpdateDealRequest) -> Result<Deal, Error>;

    /// Move a live deal between non-terminal stages.
    async fn change_stage(&self, request: ChangeStageRequest) -> Result<StageChangeResponse, Error>;

    /// Close a live deal as won.
    async fn mark_won(&self, request: MarkWonRequest) -> Result<StageChangeResponse, Error>;

    /// Close a live deal as lost with a reason.
    async fn mark_lost(&self, request: MarkLostRequest) -> Result<StageChangeResponse, Error>;

    /// Soft-delete a deal.
    async fn archive_deal(&self, request: DealActionRequest) -> Result<Deal, Error>;

    /// Undo a soft delete.
    async fn restore_deal(&self, request: DealActionRequest) -> Result<Deal, Error>;

    /// Delete an archived deal for good, with its activities and reminders.
    async fn purge_deal(&self, request: DealActionRequest) -> Result<(), Error>;

    /// Delete every archived deal for good. Returns how many went.
    async fn empty_trash(&self, actor: UserId) -> Result<u64, Error>;

    /// Open a deal from the public intake form, attributed to
    /// [`UserId::SYSTEM`].
    async fn capture_lead(&self, lead: PublicLead) -> Result<Deal, Error>;

    /// Log an interaction against a deal.
    async fn add_activity(&self, request: AddActivityRequest) -> Result<DealActivity, Error>;

    /// Schedule a follow-up on a deal.
    async fn add_reminder(&self, request: AddReminderRequest) -> Result<DealReminder, Error>;

    async fn complete_reminder(
        &self,
        request: ReminderActionRequest,
    ) -> Result<DealReminder, Error>;

    async fn cancel_reminder(&self, request: ReminderActionRequest) -> Result<DealReminder, Error>;
}
