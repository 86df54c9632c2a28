//! Deal DTOs and parsing helpers.
//!
//! Request bodies keep enums, identifiers and timestamps as strings; the
//! `parse_*` functions turn them into domain inputs with field-level errors.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::crm::{
    DateRange, DealActivity, DealAlert, DealDraft, DealPatch, DealReminder, DealStage,
    LossDetails, NewActivity, NewReminder, WonDetails,
};
use crate::domain::ports::{DealFilter, DealView};
use crate::domain::{Error, UserId};
use crate::inbound::http::validation::{
    parse_enum, parse_optional_date, parse_optional_enum, parse_optional_rfc3339_timestamp,
    parse_optional_user_id, parse_optional_uuid, parse_rfc3339_timestamp, parse_uuid, require,
    FieldName,
};

const DEAL_ID: FieldName = FieldName::new("dealId");
const REMINDER_ID: FieldName = FieldName::new("reminderId");

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub(super) struct DealPath {
    pub(super) deal_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ReminderPath {
    pub(super) reminder_id: String,
}

pub(super) fn parse_deal_id(path: DealPath) -> Result<Uuid, Error> {
    parse_uuid(&path.deal_id, DEAL_ID)
}

pub(super) fn parse_reminder_id(path: ReminderPath) -> Result<Uuid, Error> {
    parse_uuid(&path.reminder_id, REMINDER_ID)
}

/// Optimistic-concurrency token accepted by body-less mutations.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct VersionQuery {
    /// Version the client last read; a stale value fails with `409`.
    pub expected_version: Option<u64>,
}

/// Listing filters for `GET /deals`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct DealListQuery {
    /// Stage wire name.
    pub stage: Option<String>,
    pub owner_id: Option<String>,
    /// `low`, `medium`, `high` or `urgent`.
    pub priority: Option<String>,
    /// Case-insensitive match on name, company and email.
    pub search: Option<String>,
    /// Lower bound on creation time, RFC 3339.
    pub created_from: Option<String>,
    /// Exclusive upper bound on creation time, RFC 3339.
    pub created_to: Option<String>,
    /// List archived deals instead of live ones.
    #[serde(default)]
    pub archived: bool,
}

pub(super) fn parse_list_query(query: DealListQuery) -> Result<DealFilter, Error> {
    let created = DateRange::new(
        parse_optional_rfc3339_timestamp(query.created_from.as_deref(), FieldName::new("createdFrom"))?,
        parse_optional_rfc3339_timestamp(query.created_to.as_deref(), FieldName::new("createdTo"))?,
    )?;
    Ok(DealFilter {
        stage: parse_optional_enum(query.stage.as_deref(), FieldName::new("stage"))?,
        owner_id: parse_optional_user_id(query.owner_id.as_deref(), FieldName::new("ownerId"))?,
        priority: parse_optional_enum(query.priority.as_deref(), FieldName::new("priority"))?,
        search: query.search,
        created,
        archived: query.archived,
    })
}

/// Request payload for opening a deal.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealBody {
    #[schema(example = "Distribuidora Andina")]
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "+57")]
    pub phone_country_code: Option<String>,
    pub client_id: Option<String>,
    /// Entry stage; defaults to `lead`.
    pub stage: Option<String>,
    /// Estimated value in minor currency units.
    #[schema(example = 2_500_000)]
    pub value: Option<i64>,
    #[schema(example = "COP")]
    pub currency: Option<String>,
    pub probability: Option<i64>,
    pub priority: Option<String>,
    pub source: Option<String>,
    #[schema(max_items = 20)]
    pub tags: Option<Vec<String>>,
    pub owner_id: Option<String>,
    pub notes: Option<String>,
    /// `YYYY-MM-DD`.
    pub expected_close_date: Option<String>,
    /// RFC 3339.
    pub next_follow_up: Option<String>,
}

pub(super) fn parse_create_body(body: CreateDealBody) -> Result<DealDraft, Error> {
    Ok(DealDraft {
        name: require(body.name, FieldName::new("name"))?,
        company: body.company,
        email: body.email,
        phone: body.phone,
        phone_country_code: body.phone_country_code,
        client_id: parse_optional_uuid(body.client_id.as_deref(), FieldName::new("clientId"))?,
        stage: parse_optional_enum(body.stage.as_deref(), FieldName::new("stage"))?,
        value: body.value.unwrap_or(0),
        currency: body.currency,
        probability: body.probability,
        priority: parse_optional_enum(body.priority.as_deref(), FieldName::new("priority"))?,
        source: body.source,
        tags: body.tags.unwrap_or_default(),
        owner_id: parse_optional_user_id(body.owner_id.as_deref(), FieldName::new("ownerId"))?,
        notes: body.notes,
        expected_close_date: parse_optional_date(
            body.expected_close_date.as_deref(),
            FieldName::new("expectedCloseDate"),
        )?,
        next_follow_up: parse_optional_rfc3339_timestamp(
            body.next_follow_up.as_deref(),
            FieldName::new("nextFollowUp"),
        )?,
    })
}

/// Partial update. Absent fields are left alone; `null` clears the
/// nullable planning fields.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDealBody {
    pub expected_version: Option<u64>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub client_id: Option<Option<String>>,
    pub value: Option<i64>,
    pub currency: Option<String>,
    pub probability: Option<i64>,
    pub priority: Option<String>,
    pub source: Option<String>,
    #[schema(max_items = 20)]
    pub tags: Option<Vec<String>>,
    pub owner_id: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub expected_close_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub next_follow_up: Option<Option<String>>,
}

pub(super) fn parse_update_body(body: UpdateDealBody) -> Result<(Option<u64>, DealPatch), Error> {
    let client_id = body
        .client_id
        .map(|inner| parse_optional_uuid(inner.as_deref(), FieldName::new("clientId")))
        .transpose()?;
    let expected_close_date = body
        .expected_close_date
        .map(|inner| parse_optional_date(inner.as_deref(), FieldName::new("expectedCloseDate")))
        .transpose()?;
    let next_follow_up = body
        .next_follow_up
        .map(|inner| {
            parse_optional_rfc3339_timestamp(inner.as_deref(), FieldName::new("nextFollowUp"))
        })
        .transpose()?;
    let patch = DealPatch {
        name: body.name,
        company: body.company,
        email: body.email,
        phone: body.phone,
        client_id,
        value: body.value,
        currency: body.currency,
        probability: body.probability,
        priority: parse_optional_enum(body.priority.as_deref(), FieldName::new("priority"))?,
        source: body.source,
        tags: body.tags,
        owner_id: parse_optional_user_id(body.owner_id.as_deref(), FieldName::new("ownerId"))?,
        notes: body.notes,
        expected_close_date,
        next_follow_up,
    };
    Ok((body.expected_version, patch))
}

/// Move a deal between open stages.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStageBody {
    #[schema(example = "proposal")]
    pub stage: Option<String>,
    pub expected_version: Option<u64>,
    pub notes: Option<String>,
}

pub(super) fn parse_stage_body(body: &ChangeStageBody) -> Result<DealStage, Error> {
    let raw = require(body.stage.as_deref(), FieldName::new("stage"))?;
    parse_enum(raw, FieldName::new("stage"))
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WinDealBody {
    /// Closing amount in minor units; replaces the estimate.
    pub final_value: Option<i64>,
    pub notes: Option<String>,
    pub expected_version: Option<u64>,
}

pub(super) fn parse_win_body(body: WinDealBody) -> Result<(Option<u64>, WonDetails), Error> {
    let final_value = require(body.final_value, FieldName::new("finalValue"))?;
    Ok((
        body.expected_version,
        WonDetails {
            final_value,
            notes: body.notes,
        },
    ))
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoseDealBody {
    #[schema(example = "price")]
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub expected_version: Option<u64>,
}

pub(super) fn parse_lose_body(body: LoseDealBody) -> Result<(Option<u64>, LossDetails), Error> {
    let reason = require(body.reason, FieldName::new("reason"))?;
    Ok((
        body.expected_version,
        LossDetails {
            reason,
            notes: body.notes,
        },
    ))
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddActivityBody {
    /// `call`, `whatsapp`, `email`, `meeting` or `note`.
    #[schema(example = "call")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

pub(super) fn parse_activity_body(body: AddActivityBody) -> Result<NewActivity, Error> {
    let kind = require(body.kind.as_deref(), FieldName::new("kind"))?;
    Ok(NewActivity {
        kind: parse_enum(kind, FieldName::new("kind"))?,
        title: body.title,
        description: body.description,
    })
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddReminderBody {
    pub title: Option<String>,
    pub description: Option<String>,
    /// RFC 3339.
    pub remind_at: Option<String>,
    /// Defaults to the caller.
    pub assigned_to: Option<String>,
}

pub(super) fn parse_reminder_body(body: AddReminderBody) -> Result<NewReminder, Error> {
    let title = require(body.title, FieldName::new("title"))?;
    let remind_at = require(body.remind_at.as_deref(), FieldName::new("remindAt"))?;
    Ok(NewReminder {
        title,
        description: body.description,
        remind_at: parse_rfc3339_timestamp(remind_at, FieldName::new("remindAt"))?,
        assigned_to: parse_optional_user_id(
            body.assigned_to.as_deref(),
            FieldName::new("assignedTo"),
        )?,
    })
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct PendingRemindersQuery {
    /// Only reminders assigned to this user. Defaults to every assignee.
    pub assigned_to: Option<String>,
}

pub(super) fn parse_pending_query(
    query: PendingRemindersQuery,
) -> Result<Option<UserId>, Error> {
    parse_optional_user_id(query.assigned_to.as_deref(), FieldName::new("assignedTo"))
}

/// Computed follow-up alert.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    #[schema(example = "no_interaction")]
    pub kind: String,
    #[schema(example = "high")]
    pub severity: String,
    pub message: String,
}

impl From<DealAlert> for AlertResponse {
    fn from(alert: DealAlert) -> Self {
        Self {
            kind: alert.kind.as_str().to_owned(),
            severity: alert.severity.as_str().to_owned(),
            message: alert.message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub id: String,
    pub deal_id: String,
    pub title: String,
    pub description: Option<String>,
    pub remind_at: String,
    pub assigned_to: String,
    pub created_by: String,
    pub created_at: String,
    #[schema(example = "pending")]
    pub status: String,
    pub settled_at: Option<String>,
}

impl From<DealReminder> for ReminderResponse {
    fn from(reminder: DealReminder) -> Self {
        Self {
            id: reminder.id().to_string(),
            deal_id: reminder.deal_id().to_string(),
            title: reminder.title().to_owned(),
            description: reminder.description().map(str::to_owned),
            remind_at: reminder.remind_at().to_rfc3339(),
            assigned_to: reminder.assigned_to().to_string(),
            created_by: reminder.created_by().to_string(),
            created_at: reminder.created_at().to_rfc3339(),
            status: reminder.status().as_str().to_owned(),
            settled_at: reminder.settled_at().map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: String,
    pub deal_id: String,
    #[schema(example = "stage_change")]
    pub kind: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub from_stage: Option<String>,
    pub to_stage: Option<String>,
    pub performed_by: String,
    pub performed_at: String,
}

impl From<DealActivity> for ActivityResponse {
    fn from(activity: DealActivity) -> Self {
        Self {
            id: activity.id().to_string(),
            deal_id: activity.deal_id().to_string(),
            kind: activity.kind().as_str().to_owned(),
            title: activity.title().map(str::to_owned),
            description: activity.description().map(str::to_owned),
            from_stage: activity.from_stage().map(|stage| stage.as_str().to_owned()),
            to_stage: activity.to_stage().map(|stage| stage.as_str().to_owned()),
            performed_by: activity.performed_by().to_string(),
            performed_at: activity.performed_at().to_rfc3339(),
        }
    }
}

/// A deal with its computed alerts and recency figures.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DealResponse {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub phone_country_code: String,
    pub client_id: Option<String>,
    #[schema(example = "qualified")]
    pub stage: String,
    pub value: i64,
    pub currency: String,
    pub probability: u8,
    pub priority: String,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: String,
    pub created_by: String,
    pub notes: Option<String>,
    pub expected_close_date: Option<String>,
    pub next_follow_up: Option<String>,
    pub qualified_at: Option<String>,
    pub proposal_sent_at: Option<String>,
    pub negotiation_started_at: Option<String>,
    pub won_notes: Option<String>,
    pub lost_reason: Option<String>,
    pub lost_notes: Option<String>,
    pub closed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_stage_change_at: String,
    pub last_interaction_at: String,
    pub deleted_at: Option<String>,
    /// Pass back as `expectedVersion` on the next mutation.
    pub version: u64,
    pub days_in_stage: i64,
    pub days_since_interaction: i64,
    pub alerts: Vec<AlertResponse>,
    pub next_reminder: Option<ReminderResponse>,
}

impl From<DealView> for DealResponse {
    fn from(view: DealView) -> Self {
        let DealView {
            deal,
            alerts,
            days_in_stage,
            days_since_interaction,
            next_reminder,
        } = view;
        let milestones = deal.milestones();
        let outcome = deal.outcome();
        let (won_notes, lost_notes) = match outcome.map(|o| (o.stage(), o.notes())) {
            Some((DealStage::Won, notes)) => (notes.map(str::to_owned), None),
            Some((_, notes)) => (None, notes.map(str::to_owned)),
            None => (None, None),
        };
        Self {
            id: deal.id().to_string(),
            name: deal.name().to_owned(),
            company: deal.company().map(str::to_owned),
            email: deal.email().map(str::to_owned),
            phone: deal.phone().map(str::to_owned),
            phone_country_code: deal.phone_country_code().to_owned(),
            client_id: deal.client_id().map(|id| id.to_string()),
            stage: deal.stage().as_str().to_owned(),
            value: deal.value(),
            currency: deal.currency().to_owned(),
            probability: deal.probability(),
            priority: deal.priority().as_str().to_owned(),
            source: deal.source().map(str::to_owned),
            tags: deal.tags().to_vec(),
            owner_id: deal.owner_id().to_string(),
            created_by: deal.created_by().to_string(),
            notes: deal.notes().map(str::to_owned),
            expected_close_date: deal.expected_close_date().map(|date| date.to_string()),
            next_follow_up: deal.next_follow_up().map(|at| at.to_rfc3339()),
            qualified_at: milestones.qualified_at.map(|at| at.to_rfc3339()),
            proposal_sent_at: milestones.proposal_sent_at.map(|at| at.to_rfc3339()),
            negotiation_started_at: milestones.negotiation_started_at.map(|at| at.to_rfc3339()),
            won_notes,
            lost_reason: outcome.and_then(|o| o.loss_reason()).map(str::to_owned),
            lost_notes,
            closed_at: deal.closed_at().map(|at| at.to_rfc3339()),
            created_at: deal.created_at().to_rfc3339(),
            updated_at: deal.updated_at().to_rfc3339(),
            last_stage_change_at: deal.last_stage_change_at().to_rfc3339(),
            last_interaction_at: deal.last_interaction_at().to_rfc3339(),
            deleted_at: deal.deleted_at().map(|at| at.to_rfc3339()),
            version: deal.version(),
            days_in_stage,
            days_since_interaction,
            alerts: alerts.into_iter().map(AlertResponse::from).collect(),
            next_reminder: next_reminder.map(ReminderResponse::from),
        }
    }
}

/// Result of a stage change or close.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageChangeBody {
    pub deal: DealResponse,
    pub activity: ActivityResponse,
}

/// Outcome of `DELETE /deals/trash`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmptyTrashResponse {
    #[schema(example = 3)]
    pub removed: u64,
}

/// One pipeline stage as listed by `GET /stages`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse {
    #[schema(example = "lead")]
    pub id: String,
    pub label: String,
    pub position: usize,
    pub terminal: bool,
}

impl From<DealStage> for StageResponse {
    fn from(stage: DealStage) -> Self {
        Self {
            id: stage.as_str().to_owned(),
            label: stage.label().to_owned(),
            position: stage.position(),
            terminal: stage.is_terminal(),
        }
    }
}
