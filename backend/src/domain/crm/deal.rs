//! Deal entity and its lifecycle transitions.
//!
//! A [`Deal`] is created once and then only changes through the transition
//! methods below. Each transition is a pure function returning the next
//! version of the deal; persistence adapters store it with a
//! compare-and-swap on [`Deal::version`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::activity::DealActivity;
use super::stage::DealStage;
use super::validation::{
    self, optional_text, required_text, CrmValidationError, DEFAULT_COUNTRY_CODE, MAX_NAME_LEN,
    MAX_TEXT_LEN,
};
use crate::domain::UserId;

const DEFAULT_PROBABILITY: u8 = 50;
const SECONDS_PER_DAY: i64 = 86_400;

/// Commercial urgency of a deal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl DealPriority {
    pub const fn as_str(self) -> &'static str {
        match self {
            DealPriority::Low => "low",
            DealPriority::Medium => "medium",
            DealPriority::High => "high",
            DealPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for DealPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown deal priority: {0}")]
pub struct UnknownPriority(pub String);

impl FromStr for DealPriority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(DealPriority::Low),
            "medium" => Ok(DealPriority::Medium),
            "high" => Ok(DealPriority::High),
            "urgent" => Ok(DealPriority::Urgent),
            other => Err(UnknownPriority(other.to_owned())),
        }
    }
}

/// First-entry timestamps for the intermediate stages. Never overwritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMilestones {
    pub qualified_at: Option<DateTime<Utc>>,
    pub proposal_sent_at: Option<DateTime<Utc>>,
    pub negotiation_started_at: Option<DateTime<Utc>>,
}

impl StageMilestones {
    fn stamp(&mut self, stage: DealStage, at: DateTime<Utc>) {
        let slot = match stage {
            DealStage::Qualified => &mut self.qualified_at,
            DealStage::Proposal => &mut self.proposal_sent_at,
            DealStage::Negotiation => &mut self.negotiation_started_at,
            DealStage::Lead | DealStage::Won | DealStage::Lost => return,
        };
        slot.get_or_insert(at);
    }
}

/// How a closed deal ended. Exactly one close event exists per deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DealOutcome {
    Won {
        notes: Option<String>,
        closed_at: DateTime<Utc>,
    },
    Lost {
        reason: String,
        notes: Option<String>,
        closed_at: DateTime<Utc>,
    },
}

impl DealOutcome {
    pub fn closed_at(&self) -> DateTime<Utc> {
        match self {
            DealOutcome::Won { closed_at, .. } | DealOutcome::Lost { closed_at, .. } => *closed_at,
        }
    }

    pub fn stage(&self) -> DealStage {
        match self {
            DealOutcome::Won { .. } => DealStage::Won,
            DealOutcome::Lost { .. } => DealStage::Lost,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match self {
            DealOutcome::Won { notes, .. } | DealOutcome::Lost { notes, .. } => notes.as_deref(),
        }
    }

    pub fn loss_reason(&self) -> Option<&str> {
        match self {
            DealOutcome::Lost { reason, .. } => Some(reason),
            DealOutcome::Won { .. } => None,
        }
    }
}

/// Details recorded when a deal is won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WonDetails {
    /// Closing amount; replaces the estimated value.
    pub final_value: i64,
    pub notes: Option<String>,
}

/// Details recorded when a deal is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LossDetails {
    pub reason: String,
    pub notes: Option<String>,
}

/// Input accepted by [`Deal::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealDraft {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub phone_country_code: Option<String>,
    pub client_id: Option<Uuid>,
    pub stage: Option<DealStage>,
    pub value: i64,
    pub currency: Option<String>,
    pub probability: Option<i64>,
    pub priority: Option<DealPriority>,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: Option<UserId>,
    pub notes: Option<String>,
    pub expected_close_date: Option<NaiveDate>,
    pub next_follow_up: Option<DateTime<Utc>>,
}

/// Partial edit of descriptive fields.
///
/// `None` leaves a field untouched. Blank text clears optional text fields;
/// the nested options clear dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealPatch {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub client_id: Option<Option<Uuid>>,
    pub value: Option<i64>,
    pub currency: Option<String>,
    pub probability: Option<i64>,
    pub priority: Option<DealPriority>,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub owner_id: Option<UserId>,
    pub notes: Option<String>,
    pub expected_close_date: Option<Option<NaiveDate>>,
    pub next_follow_up: Option<Option<DateTime<Utc>>>,
}

impl DealPatch {
    pub fn is_empty(&self) -> bool {
        *self == DealPatch::default()
    }
}

/// Who performs a transition, when, and the id for its audit activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    pub actor: UserId,
    pub at: DateTime<Utc>,
    pub activity_id: Uuid,
}

/// Result of a stage-moving transition: the next deal version plus the audit
/// entry that must be stored with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTransition {
    pub deal: Deal,
    pub activity: DealActivity,
}

/// Reasons a lifecycle transition is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DealTransitionError {
    #[error("deal is already closed as {stage}")]
    Closed { stage: DealStage },
    #[error("deal is already in stage {stage}")]
    SameStage { stage: DealStage },
    #[error("stage {target} is reached by closing the deal, not by a stage change")]
    TerminalTarget { target: DealStage },
    #[error("deal has been archived")]
    Archived,
    #[error("deal is not archived")]
    NotArchived,
    #[error(transparent)]
    Validation(#[from] CrmValidationError),
}

/// Sales-pipeline opportunity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    id: Uuid,
    name: String,
    company: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    phone_country_code: String,
    client_id: Option<Uuid>,
    stage: DealStage,
    value: i64,
    currency: String,
    probability: u8,
    priority: DealPriority,
    source: Option<String>,
    tags: Vec<String>,
    owner_id: UserId,
    created_by: UserId,
    notes: Option<String>,
    expected_close_date: Option<NaiveDate>,
    next_follow_up: Option<DateTime<Utc>>,
    milestones: StageMilestones,
    outcome: Option<DealOutcome>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_stage_change_at: DateTime<Utc>,
    last_interaction_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: u64,
}

/// Flat storage form of a deal, validated back into a [`Deal`] on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealRecord {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub phone_country_code: String,
    pub client_id: Option<Uuid>,
    pub stage: DealStage,
    pub value: i64,
    pub currency: String,
    pub probability: u8,
    pub priority: DealPriority,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: UserId,
    pub created_by: UserId,
    pub notes: Option<String>,
    pub expected_close_date: Option<NaiveDate>,
    pub next_follow_up: Option<DateTime<Utc>>,
    pub milestones: StageMilestones,
    pub won_notes: Option<String>,
    pub lost_reason: Option<String>,
    pub lost_notes: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_stage_change_at: DateTime<Utc>,
    pub last_interaction_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub version: u64,
}

/// Raised when a stored record breaks a deal invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored deal {id} is inconsistent: {reason}")]
pub struct CorruptDealRecord {
    pub id: Uuid,
    pub reason: &'static str,
}

impl Deal {
    /// Validate a draft and open a new deal at version 1.
    ///
    /// The draft's stage defaults to `lead`; terminal stages are refused.
    pub fn create(
        id: Uuid,
        draft: DealDraft,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Result<Self, DealTransitionError> {
        let stage = draft.stage.unwrap_or(DealStage::ENTRY);
        if stage.is_terminal() {
            return Err(DealTransitionError::TerminalTarget { target: stage });
        }
        let mut milestones = StageMilestones::default();
        milestones.stamp(stage, at);

        Ok(Self {
            id,
            name: required_text(&draft.name, "name", MAX_NAME_LEN)?,
            company: optional_text(draft.company.as_deref(), "company", MAX_NAME_LEN)?,
            email: validation::email(draft.email.as_deref())?,
            phone: optional_text(draft.phone.as_deref(), "phone", 40)?,
            phone_country_code: optional_text(
                draft.phone_country_code.as_deref(),
                "phoneCountryCode",
                8,
            )?
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_owned()),
            client_id: draft.client_id,
            stage,
            value: validation::money(draft.value)?,
            currency: validation::currency(draft.currency.as_deref())?,
            probability: draft
                .probability
                .map(validation::probability)
                .transpose()?
                .unwrap_or(DEFAULT_PROBABILITY),
            priority: draft.priority.unwrap_or_default(),
            source: optional_text(draft.source.as_deref(), "source", MAX_NAME_LEN)?,
            tags: validation::tags(&draft.tags)?,
            owner_id: draft.owner_id.unwrap_or(actor),
            created_by: actor,
            notes: optional_text(draft.notes.as_deref(), "notes", MAX_TEXT_LEN)?,
            expected_close_date: draft.expected_close_date,
            next_follow_up: draft.next_follow_up,
            milestones,
            outcome: None,
            created_at: at,
            updated_at: at,
            last_stage_change_at: at,
            last_interaction_at: at,
            deleted_at: None,
            version: 1,
        })
    }

    /// Move a live deal to another live stage.
    ///
    /// Any jump between non-terminal stages is permitted, forwards or
    /// backwards. Re-entering the current stage, targeting `won`/`lost`, or
    /// touching a closed deal is refused.
    pub fn change_stage(
        &self,
        target: DealStage,
        notes: Option<&str>,
        ctx: TransitionContext,
    ) -> Result<StageTransition, DealTransitionError> {
        self.ensure_open()?;
        if target.is_terminal() {
            return Err(DealTransitionError::TerminalTarget { target });
        }
        if target == self.stage {
            return Err(DealTransitionError::SameStage { stage: target });
        }
        let notes = optional_text(notes, "notes", MAX_TEXT_LEN)?;

        let mut next = self.bumped(ctx.at);
        next.stage = target;
        next.last_stage_change_at = ctx.at;
        next.last_interaction_at = ctx.at;
        next.milestones.stamp(target, ctx.at);

        let activity = self.audit(target, notes, ctx);
        Ok(StageTransition {
            deal: next,
            activity,
        })
    }

    /// Close the deal as won, replacing its value with the final amount.
    pub fn mark_won(
        &self,
        details: WonDetails,
        ctx: TransitionContext,
    ) -> Result<StageTransition, DealTransitionError> {
        self.ensure_open()?;
        let final_value = validation::money(details.final_value)?;
        let notes = optional_text(details.notes.as_deref(), "notes", MAX_TEXT_LEN)?;

        let mut next = self.close(DealStage::Won, ctx.at);
        next.value = final_value;
        next.probability = 100;
        next.outcome = Some(DealOutcome::Won {
            notes: notes.clone(),
            closed_at: ctx.at,
        });

        let activity = self.audit(DealStage::Won, notes, ctx);
        Ok(StageTransition {
            deal: next,
            activity,
        })
    }

    /// Close the deal as lost. A non-empty reason is required.
    pub fn mark_lost(
        &self,
        details: LossDetails,
        ctx: TransitionContext,
    ) -> Result<StageTransition, DealTransitionError> {
        self.ensure_open()?;
        let reason = required_text(&details.reason, "reason", MAX_NAME_LEN)?;
        let notes = optional_text(details.notes.as_deref(), "notes", MAX_TEXT_LEN)?;

        let mut next = self.close(DealStage::Lost, ctx.at);
        next.probability = 0;
        next.outcome = Some(DealOutcome::Lost {
            reason: reason.clone(),
            notes: notes.clone(),
            closed_at: ctx.at,
        });

        let description = match notes {
            Some(notes) => format!("Reason: {reason}. {notes}"),
            None => format!("Reason: {reason}"),
        };
        let activity = self.audit(DealStage::Lost, Some(description), ctx);
        Ok(StageTransition {
            deal: next,
            activity,
        })
    }

    /// Apply a descriptive edit to a live deal.
    pub fn apply_patch(&self, patch: DealPatch, at: DateTime<Utc>) -> Result<Self, DealTransitionError> {
        self.ensure_open()?;
        let mut next = self.bumped(at);
        if let Some(name) = patch.name {
            next.name = required_text(&name, "name", MAX_NAME_LEN)?;
        }
        if let Some(company) = patch.company {
            next.company = optional_text(Some(&company), "company", MAX_NAME_LEN)?;
        }
        if let Some(email) = patch.email {
            next.email = validation::email(Some(&email))?;
        }
        if let Some(phone) = patch.phone {
            next.phone = optional_text(Some(&phone), "phone", 40)?;
        }
        if let Some(client_id) = patch.client_id {
            next.client_id = client_id;
        }
        if let Some(value) = patch.value {
            next.value = validation::money(value)?;
        }
        if let Some(currency) = patch.currency {
            next.currency = validation::currency(Some(&currency))?;
        }
        if let Some(probability) = patch.probability {
            next.probability = validation::probability(probability)?;
        }
        if let Some(priority) = patch.priority {
            next.priority = priority;
        }
        if let Some(source) = patch.source {
            next.source = optional_text(Some(&source), "source", MAX_NAME_LEN)?;
        }
        if let Some(tags) = patch.tags {
            next.tags = validation::tags(&tags)?;
        }
        if let Some(owner_id) = patch.owner_id {
            next.owner_id = owner_id;
        }
        if let Some(notes) = patch.notes {
            next.notes = optional_text(Some(&notes), "notes", MAX_TEXT_LEN)?;
        }
        if let Some(date) = patch.expected_close_date {
            next.expected_close_date = date;
        }
        if let Some(follow_up) = patch.next_follow_up {
            next.next_follow_up = follow_up;
        }
        Ok(next)
    }

    /// Soft-delete the deal.
    pub fn archive(&self, at: DateTime<Utc>) -> Result<Self, DealTransitionError> {
        if self.deleted_at.is_some() {
            return Err(DealTransitionError::Archived);
        }
        let mut next = self.bumped(at);
        next.deleted_at = Some(at);
        Ok(next)
    }

    /// Undo a soft delete.
    pub fn restore(&self, at: DateTime<Utc>) -> Result<Self, DealTransitionError> {
        if self.deleted_at.is_none() {
            return Err(DealTransitionError::NotArchived);
        }
        let mut next = self.bumped(at);
        next.deleted_at = None;
        Ok(next)
    }

    /// Permanent deletion is only offered for deals already in the trash.
    pub fn ensure_purgeable(&self) -> Result<(), DealTransitionError> {
        if self.deleted_at.is_none() {
            return Err(DealTransitionError::NotArchived);
        }
        Ok(())
    }

    /// Advance the interaction clock; used when an activity is logged.
    pub(crate) fn record_interaction(&mut self, at: DateTime<Utc>) {
        if at > self.last_interaction_at {
            self.last_interaction_at = at;
        }
    }

    fn ensure_open(&self) -> Result<(), DealTransitionError> {
        if self.deleted_at.is_some() {
            return Err(DealTransitionError::Archived);
        }
        if self.stage.is_terminal() {
            return Err(DealTransitionError::Closed { stage: self.stage });
        }
        Ok(())
    }

    fn bumped(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.updated_at = at;
        next
    }

    fn close(&self, stage: DealStage, at: DateTime<Utc>) -> Self {
        let mut next = self.bumped(at);
        next.stage = stage;
        next.last_stage_change_at = at;
        next.last_interaction_at = at;
        next
    }

    fn audit(&self, target: DealStage, notes: Option<String>, ctx: TransitionContext) -> DealActivity {
        DealActivity::stage_change(
            ctx.activity_id,
            self.id,
            self.stage,
            target,
            notes,
            ctx.actor,
            ctx.at,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn phone_country_code(&self) -> &str {
        &self.phone_country_code
    }

    pub fn client_id(&self) -> Option<Uuid> {
        self.client_id
    }

    pub fn stage(&self) -> DealStage {
        self.stage
    }

    /// Amount in the currency's minor unit.
    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn probability(&self) -> u8 {
        self.probability
    }

    pub fn priority(&self) -> DealPriority {
        self.priority
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn expected_close_date(&self) -> Option<NaiveDate> {
        self.expected_close_date
    }

    pub fn next_follow_up(&self) -> Option<DateTime<Utc>> {
        self.next_follow_up
    }

    pub fn milestones(&self) -> &StageMilestones {
        &self.milestones
    }

    pub fn outcome(&self) -> Option<&DealOutcome> {
        self.outcome.as_ref()
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.outcome.as_ref().map(DealOutcome::closed_at)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_stage_change_at(&self) -> DateTime<Utc> {
        self.last_stage_change_at
    }

    pub fn last_interaction_at(&self) -> DateTime<Utc> {
        self.last_interaction_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Neither closed nor archived.
    pub fn is_live(&self) -> bool {
        !self.stage.is_terminal() && self.deleted_at.is_none()
    }

    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whole days since the last logged interaction.
    pub fn days_since_interaction(&self, now: DateTime<Utc>) -> i64 {
        whole_days(self.last_interaction_at, now)
    }

    /// Whole days spent in the current stage.
    pub fn days_in_stage(&self, now: DateTime<Utc>) -> i64 {
        whole_days(self.last_stage_change_at, now)
    }
}

pub(crate) fn whole_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().max(0) / SECONDS_PER_DAY
}

impl From<&Deal> for DealRecord {
    fn from(deal: &Deal) -> Self {
        let (won_notes, lost_reason, lost_notes) = match &deal.outcome {
            Some(DealOutcome::Won { notes, .. }) => (notes.clone(), None, None),
            Some(DealOutcome::Lost { reason, notes, .. }) => {
                (None, Some(reason.clone()), notes.clone())
            }
            None => (None, None, None),
        };
        Self {
            id: deal.id,
            name: deal.name.clone(),
            company: deal.company.clone(),
            email: deal.email.clone(),
            phone: deal.phone.clone(),
            phone_country_code: deal.phone_country_code.clone(),
            client_id: deal.client_id,
            stage: deal.stage,
            value: deal.value,
            currency: deal.currency.clone(),
            probability: deal.probability,
            priority: deal.priority,
            source: deal.source.clone(),
            tags: deal.tags.clone(),
            owner_id: deal.owner_id,
            created_by: deal.created_by,
            notes: deal.notes.clone(),
            expected_close_date: deal.expected_close_date,
            next_follow_up: deal.next_follow_up,
            milestones: deal.milestones,
            won_notes,
            lost_reason,
            lost_notes,
            closed_at: deal.closed_at(),
            created_at: deal.created_at,
            updated_at: deal.updated_at,
            last_stage_change_at: deal.last_stage_change_at,
            last_interaction_at: deal.last_interaction_at,
            deleted_at: deal.deleted_at,
            version: deal.version,
        }
    }
}

impl TryFrom<DealRecord> for Deal {
    type Error = CorruptDealRecord;

    fn try_from(record: DealRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let corrupt = |reason: &'static str| CorruptDealRecord { id, reason };
        if record.version == 0 {
            return Err(corrupt("version must start at 1"));
        }
        if record.probability > 100 {
            return Err(corrupt("probability exceeds 100"));
        }
        let outcome = match (record.stage, record.closed_at) {
            (DealStage::Won, Some(closed_at)) => Some(DealOutcome::Won {
                notes: record.won_notes.clone(),
                closed_at,
            }),
            (DealStage::Lost, Some(closed_at)) => Some(DealOutcome::Lost {
                reason: record
                    .lost_reason
                    .clone()
                    .filter(|reason| !reason.trim().is_empty())
                    .ok_or_else(|| corrupt("lost deal without a reason"))?,
                notes: record.lost_notes.clone(),
                closed_at,
            }),
            (DealStage::Won | DealStage::Lost, None) => {
                return Err(corrupt("closed deal without a close date"));
            }
            (_, Some(_)) => return Err(corrupt("open deal with a close date")),
            (_, None) => None,
        };

        Ok(Self {
            id: record.id,
            name: record.name,
            company: record.company,
            email: record.email,
            phone: record.phone,
            phone_country_code: record.phone_country_code,
            client_id: record.client_id,
            stage: record.stage,
            value: record.value,
            currency: record.currency,
            probability: record.probability,
            priority: record.priority,
            source: record.source,
            tags: record.tags,
            owner_id: record.owner_id,
            created_by: record.created_by,
            notes: record.notes,
            expected_close_date: record.expected_close_date,
            next_follow_up: record.next_follow_up,
            milestones: record.milestones,
            outcome,
            created_at: record.created_at,
            updated_at: record.updated_at,
            last_stage_change_at: record.last_stage_change_at,
            last_interaction_at: record.last_interaction_at,
            deleted_at: record.deleted_at,
            version: record.version,
        })
    }
}
