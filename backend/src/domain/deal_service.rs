//! Deal lifecycle manager.
//!
//! Implements the [`DealCommand`] and [`DealQuery`] driving ports on top of a
//! [`DealRepository`]. The pure transition functions on [`Deal`] decide
//! whether a change is legal; this service reads the current state, applies
//! the transition, and writes the result with a version compare-and-swap so
//! two concurrent writers on one deal can never both succeed.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::crm::{
    alerts_for, AlertPolicy, Deal, DealActivity, DealDraft, DealReminder, DealStage,
    DealTransitionError, PublicLead, ReminderAlreadySettled, ReminderStatus, StageTransition,
    TransitionContext,
};
use crate::domain::ports::{
    AddActivityRequest, AddReminderRequest, ChangeStageRequest, CreateDealRequest, DealActionRequest,
    DealCommand, DealFilter, DealQuery, DealRepository, DealRepositoryError, DealView,
    MarkLostRequest, MarkWonRequest, ReminderActionRequest, StageChangeResponse, UpdateDealRequest,
};
use crate::domain::{Error, UserId};

const CREATED_NOTE: &str = "Deal created";

/// Deal lifecycle service implementing the deal driving ports.
#[derive(Clone)]
pub struct DealService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: AlertPolicy,
}

impl<R> DealService<R> {
    /// Create a service over `repository` using `clock` for timestamps.
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            policy: AlertPolicy::default(),
        }
    }

    /// Override the alert thresholds.
    pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Map repository failures onto the domain error taxonomy.
pub(crate) fn map_repository_error(error: DealRepositoryError) -> Error {
    match error {
        DealRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("deal repository unavailable: {message}"))
        }
        DealRepositoryError::Query { message } => {
            Error::internal(format!("deal repository error: {message}"))
        }
        DealRepositoryError::VersionMismatch { expected, actual } => {
            version_conflict(expected, actual)
        }
        DealRepositoryError::MissingDeal { deal_id } => deal_not_found(deal_id),
        DealRepositoryError::ReminderNotPending { reminder_id } => {
            Error::conflict("reminder was settled concurrently").with_details(json!({
                "reminderId": reminder_id,
                "code": "reminder_not_pending",
            }))
        }
        DealRepositoryError::Duplicate { id } => {
            Error::internal(format!("identifier collision on {id}"))
        }
        DealRepositoryError::NotArchived { deal_id } => {
            Error::invalid_transition("deal is not archived").with_details(json!({
                "dealId": deal_id,
                "code": "not_archived",
            }))
        }
    }
}

fn version_conflict(expected: u64, actual: u64) -> Error {
    Error::conflict("deal was modified concurrently").with_details(json!({
        "expectedVersion": expected,
        "actualVersion": actual,
        "code": "version_mismatch",
    }))
}

fn deal_not_found(deal_id: Uuid) -> Error {
    Error::not_found(format!("deal {deal_id} not found")).with_details(json!({
        "dealId": deal_id,
        "code": "deal_not_found",
    }))
}

fn reminder_not_found(reminder_id: Uuid) -> Error {
    Error::not_found(format!("reminder {reminder_id} not found")).with_details(json!({
        "reminderId": reminder_id,
        "code": "reminder_not_found",
    }))
}

fn map_transition_error(deal: &Deal, target: Option<DealStage>, error: DealTransitionError) -> Error {
    let code = match &error {
        DealTransitionError::Validation(validation) => return validation.clone().into(),
        DealTransitionError::Archived => return deal_not_found(deal.id()),
        DealTransitionError::Closed { .. } => "deal_closed",
        DealTransitionError::SameStage { .. } => "same_stage",
        DealTransitionError::TerminalTarget { .. } => "terminal_target",
        DealTransitionError::NotArchived => "not_archived",
    };
    debug!(deal_id = %deal.id(), from = %deal.stage(), ?target, %error, "transition rejected");
    Error::invalid_transition(error.to_string()).with_details(json!({
        "dealId": deal.id(),
        "from": deal.stage(),
        "to": target,
        "code": code,
    }))
}

fn map_settled(reminder: &DealReminder, error: ReminderAlreadySettled) -> Error {
    Error::invalid_transition(error.to_string()).with_details(json!({
        "reminderId": reminder.id(),
        "status": error.status,
        "code": "reminder_settled",
    }))
}

impl<R> DealService<R>
where
    R: DealRepository,
{
    fn context(&self, actor: UserId) -> TransitionContext {
        TransitionContext {
            actor,
            at: self.clock.utc(),
            activity_id: Uuid::new_v4(),
        }
    }

    /// Create a deal and its opening note in one write.
    async fn open_deal(&self, draft: DealDraft, actor: UserId, note: &str) -> Result<Deal, Error> {
        let now = self.clock.utc();
        let deal = Deal::create(Uuid::new_v4(), draft, actor, now).map_err(|err| match err {
            DealTransitionError::Validation(validation) => validation.into(),
            other => Error::invalid_transition(other.to_string())
                .with_details(json!({ "code": "terminal_target" })),
        })?;
        let opening = DealActivity::note(Uuid::new_v4(), deal.id(), note, actor, now);
        self.repository
            .insert_deal(&deal, &opening)
            .await
            .map_err(map_repository_error)?;
        Ok(deal)
    }

    async fn load(&self, deal_id: Uuid) -> Result<Deal, Error> {
        self.repository
            .find_deal(deal_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| deal_not_found(deal_id))
    }

    /// Load a deal and check the caller's version expectation up front.
    async fn load_expecting(&self, deal_id: Uuid, expected: Option<u64>) -> Result<Deal, Error> {
        let deal = self.load(deal_id).await?;
        match expected {
            Some(version) if version != deal.version() => {
                Err(version_conflict(version, deal.version()))
            }
            _ => Ok(deal),
        }
    }

    /// Load a live (non-archived) deal.
    async fn load_live(&self, deal_id: Uuid) -> Result<Deal, Error> {
        let deal = self.load(deal_id).await?;
        if deal.is_archived() {
            return Err(deal_not_found(deal_id));
        }
        Ok(deal)
    }

    async fn store(&self, current: &Deal, next: &Deal, audit: &[DealActivity]) -> Result<(), Error> {
        self.repository
            .update_deal(next, current.version(), audit)
            .await
            .map_err(|error| {
                if matches!(error, DealRepositoryError::VersionMismatch { .. }) {
                    warn!(deal_id = %current.id(), %error, "lost deal update race");
                }
                map_repository_error(error)
            })
    }

    async fn commit_transition(
        &self,
        current: &Deal,
        target: DealStage,
        transition: Result<StageTransition, DealTransitionError>,
    ) -> Result<StageChangeResponse, Error> {
        let StageTransition { deal, activity } =
            transition.map_err(|err| map_transition_error(current, Some(target), err))?;
        self.store(current, &deal, std::slice::from_ref(&activity))
            .await?;
        info!(
            deal_id = %deal.id(),
            from = %current.stage(),
            to = %deal.stage(),
            version = deal.version(),
            "deal stage changed"
        );
        Ok(StageChangeResponse { deal, activity })
    }

    async fn view(&self, deal: Deal) -> Result<DealView, Error> {
        let now = self.clock.utc();
        let next_reminder = self
            .repository
            .reminders_for_deal(deal.id())
            .await
            .map_err(map_repository_error)?
            .into_iter()
            .filter(|reminder| reminder.status() == ReminderStatus::Pending)
            .min_by_key(DealReminder::remind_at);
        Ok(DealView {
            alerts: alerts_for(&deal, now, &self.policy),
            days_in_stage: deal.days_in_stage(now),
            days_since_interaction: deal.days_since_interaction(now),
            next_reminder,
            deal,
        })
    }

    async fn load_reminder(&self, reminder_id: Uuid) -> Result<DealReminder, Error> {
        self.repository
            .find_reminder(reminder_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| reminder_not_found(reminder_id))
    }

    async fn settle<F>(&self, request: ReminderActionRequest, settle: F) -> Result<DealReminder, Error>
    where
        F: FnOnce(&DealReminder) -> Result<DealReminder, ReminderAlreadySettled> + Send,
    {
        let current = self.load_reminder(request.reminder_id).await?;
        let settled = settle(&current).map_err(|err| map_settled(&current, err))?;
        self.repository
            .settle_reminder(&settled)
            .await
            .map_err(map_repository_error)?;
        info!(
            reminder_id = %settled.id(),
            status = %settled.status(),
            actor = %request.actor,
            "reminder settled"
        );
        Ok(settled)
    }
}

#[async_trait]
impl<R> DealCommand for DealService<R>
where
    R: DealRepository,
{
    async fn create_deal(&self, request: CreateDealRequest) -> Result<Deal, Error> {
        let deal = self
            .open_deal(request.draft, request.actor, CREATED_NOTE)
            .await?;
        info!(deal_id = %deal.id(), stage = %deal.stage(), "deal created");
        Ok(deal)
    }

    async fn update_deal(&self, request: UpdateDealRequest) -> Result<Deal, Error> {
        let current = self
            .load_expecting(request.deal_id, request.expected_version)
            .await?;
        let next = current
            .apply_patch(request.patch, self.clock.utc())
            .map_err(|err| map_transition_error(&current, None, err))?;
        self.store(&current, &next, &[]).await?;
        debug!(deal_id = %next.id(), version = next.version(), "deal details updated");
        Ok(next)
    }

    async fn change_stage(&self, request: ChangeStageRequest) -> Result<StageChangeResponse, Error> {
        let current = self
            .load_expecting(request.deal_id, request.expected_version)
            .await?;
        let transition = current.change_stage(
            request.target,
            request.notes.as_deref(),
            self.context(request.actor),
        );
        self.commit_transition(&current, request.target, transition)
            .await
    }

    async fn mark_won(&self, request: MarkWonRequest) -> Result<StageChangeResponse, Error> {
        let current = self
            .load_expecting(request.deal_id, request.expected_version)
            .await?;
        let transition = current.mark_won(request.details, self.context(request.actor));
        self.commit_transition(&current, DealStage::Won, transition)
            .await
    }

    async fn mark_lost(&self, request: MarkLostRequest) -> Result<StageChangeResponse, Error> {
        let current = self
            .load_expecting(request.deal_id, request.expected_version)
            .await?;
        let transition = current.mark_lost(request.details, self.context(request.actor));
        self.commit_transition(&current, DealStage::Lost, transition)
            .await
    }

    async fn archive_deal(&self, request: DealActionRequest) -> Result<Deal, Error> {
        let current = self
            .load_expecting(request.deal_id, request.expected_version)
            .await?;
        let next = current
            .archive(self.clock.utc())
            .map_err(|err| map_transition_error(&current, None, err))?;
        self.store(&current, &next, &[]).await?;
        info!(deal_id = %next.id(), actor = %request.actor, "deal archived");
        Ok(next)
    }

    async fn restore_deal(&self, request: DealActionRequest) -> Result<Deal, Error> {
        let current = self
            .load_expecting(request.deal_id, request.expected_version)
            .await?;
        let next = current
            .restore(self.clock.utc())
            .map_err(|err| map_transition_error(&current, None, err))?;
        self.store(&current, &next, &[]).await?;
        info!(deal_id = %next.id(), actor = %request.actor, "deal restored");
        Ok(next)
    }

    async fn purge_deal(&self, request: DealActionRequest) -> Result<(), Error> {
        let current = self
            .load_expecting(request.deal_id, request.expected_version)
            .await?;
        current
            .ensure_purgeable()
            .map_err(|err| map_transition_error(&current, None, err))?;
        self.repository
            .purge_deal(current.id(), current.version())
            .await
            .map_err(map_repository_error)?;
        info!(deal_id = %current.id(), actor = %request.actor, "deal permanently deleted");
        Ok(())
    }

    async fn empty_trash(&self, actor: UserId) -> Result<u64, Error> {
        let removed = self
            .repository
            .purge_archived()
            .await
            .map_err(map_repository_error)?;
        info!(removed, %actor, "trash emptied");
        Ok(removed)
    }

    async fn capture_lead(&self, lead: PublicLead) -> Result<Deal, Error> {
        let intake = lead.into_intake()?;
        let deal = self
            .open_deal(intake.draft, UserId::SYSTEM, &intake.opening_note)
            .await?;
        info!(deal_id = %deal.id(), source = ?deal.source(), "public lead captured");
        Ok(deal)
    }

    async fn add_activity(&self, request: AddActivityRequest) -> Result<DealActivity, Error> {
        let deal = self.load_live(request.deal_id).await?;
        let activity = DealActivity::record(
            Uuid::new_v4(),
            deal.id(),
            request.activity,
            request.actor,
            self.clock.utc(),
        )?;
        self.repository
            .append_activity(&activity)
            .await
            .map_err(map_repository_error)?;
        debug!(deal_id = %deal.id(), kind = %activity.kind(), "activity logged");
        Ok(activity)
    }

    async fn add_reminder(&self, request: AddReminderRequest) -> Result<DealReminder, Error> {
        let deal = self.load_live(request.deal_id).await?;
        let reminder = DealReminder::schedule(
            Uuid::new_v4(),
            deal.id(),
            request.reminder,
            request.actor,
            self.clock.utc(),
        )?;
        self.repository
            .insert_reminder(&reminder)
            .await
            .map_err(map_repository_error)?;
        debug!(deal_id = %deal.id(), reminder_id = %reminder.id(), "reminder scheduled");
        Ok(reminder)
    }

    async fn complete_reminder(
        &self,
        request: ReminderActionRequest,
    ) -> Result<DealReminder, Error> {
        let now = self.clock.utc();
        self.settle(request, |reminder| reminder.complete(now)).await
    }

    async fn cancel_reminder(&self, request: ReminderActionRequest) -> Result<DealReminder, Error> {
        let now = self.clock.utc();
        self.settle(request, |reminder| reminder.cancel(now)).await
    }
}

#[async_trait]
impl<R> DealQuery for DealService<R>
where
    R: DealRepository,
{
    async fn get_deal(&self, deal_id: Uuid) -> Result<DealView, Error> {
        let deal = self.load(deal_id).await?;
        self.view(deal).await
    }

    async fn list_deals(&self, filter: DealFilter) -> Result<Vec<DealView>, Error> {
        let deals = self
            .repository
            .list_deals(&filter)
            .await
            .map_err(map_repository_error)?;
        let mut views = Vec::with_capacity(deals.len());
        for deal in deals {
            views.push(self.view(deal).await?);
        }
        Ok(views)
    }

    async fn list_activities(&self, deal_id: Uuid) -> Result<Vec<DealActivity>, Error> {
        self.load(deal_id).await?;
        self.repository
            .list_activities(deal_id)
            .await
            .map_err(map_repository_error)
    }

    async fn pending_reminders(&self, assignee: Option<UserId>) -> Result<Vec<DealReminder>, Error> {
        self.repository
            .pending_reminders(assignee)
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "deal_service_tests.rs"]
mod tests;
