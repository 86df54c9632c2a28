//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversion to and from the domain storage
//! records happens here so the repository only moves rows.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::crm::{
    ActivityRecord, DealRecord, ReminderRecord, StageMilestones,
};
use crate::domain::UserId;

use super::schema::{deal_activities, deal_reminders, deals};

/// Raised when a stored row cannot be read back into a domain record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {id} has invalid {column}: {value}")]
pub(crate) struct InvalidRow {
    pub id: Uuid,
    pub column: &'static str,
    pub value: String,
}

fn parse_column<T: std::str::FromStr>(
    id: Uuid,
    column: &'static str,
    value: &str,
) -> Result<T, InvalidRow> {
    value.parse().map_err(|_| InvalidRow {
        id,
        column,
        value: value.to_owned(),
    })
}

fn parse_optional_column<T: std::str::FromStr>(
    id: Uuid,
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<T>, InvalidRow> {
    value.map(|raw| parse_column(id, column, raw)).transpose()
}

// ---------------------------------------------------------------------------
// Deal models
// ---------------------------------------------------------------------------

/// Row struct for reading and writing the deals table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = deals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct DealRow {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub phone_country_code: String,
    pub client_id: Option<Uuid>,
    pub stage: String,
    pub value: i64,
    pub currency: String,
    pub probability: i16,
    pub priority: String,
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    pub created_by: Uuid,
    pub notes: Option<String>,
    pub expected_close_date: Option<NaiveDate>,
    pub next_follow_up: Option<DateTime<Utc>>,
    pub qualified_at: Option<DateTime<Utc>>,
    pub proposal_sent_at: Option<DateTime<Utc>>,
    pub negotiation_started_at: Option<DateTime<Utc>>,
    pub won_notes: Option<String>,
    pub lost_reason: Option<String>,
    pub lost_notes: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_stage_change_at: DateTime<Utc>,
    pub last_interaction_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub version: i64,
}

/// Cast a domain version to the `BIGINT` column.
#[expect(
    clippy::cast_possible_wrap,
    reason = "versions grow by one per write and never approach i64::MAX"
)]
pub(crate) fn version_for_db(version: u64) -> i64 {
    version as i64
}

impl From<DealRecord> for DealRow {
    fn from(record: DealRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            company: record.company,
            email: record.email,
            phone: record.phone,
            phone_country_code: record.phone_country_code,
            client_id: record.client_id,
            stage: record.stage.as_str().to_owned(),
            value: record.value,
            currency: record.currency,
            probability: i16::from(record.probability),
            priority: record.priority.as_str().to_owned(),
            source: record.source,
            tags: record.tags,
            owner_id: *record.owner_id.as_uuid(),
            created_by: *record.created_by.as_uuid(),
            notes: record.notes,
            expected_close_date: record.expected_close_date,
            next_follow_up: record.next_follow_up,
            qualified_at: record.milestones.qualified_at,
            proposal_sent_at: record.milestones.proposal_sent_at,
            negotiation_started_at: record.milestones.negotiation_started_at,
            won_notes: record.won_notes,
            lost_reason: record.lost_reason,
            lost_notes: record.lost_notes,
            closed_at: record.closed_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
            last_stage_change_at: record.last_stage_change_at,
            last_interaction_at: record.last_interaction_at,
            deleted_at: record.deleted_at,
            version: version_for_db(record.version),
        }
    }
}

impl TryFrom<DealRow> for DealRecord {
    type Error = InvalidRow;

    fn try_from(row: DealRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let probability = u8::try_from(row.probability).map_err(|_| InvalidRow {
            id,
            column: "probability",
            value: row.probability.to_string(),
        })?;
        let version = u64::try_from(row.version).map_err(|_| InvalidRow {
            id,
            column: "version",
            value: row.version.to_string(),
        })?;
        Ok(Self {
            id,
            stage: parse_column(id, "stage", &row.stage)?,
            priority: parse_column(id, "priority", &row.priority)?,
            name: row.name,
            company: row.company,
            email: row.email,
            phone: row.phone,
            phone_country_code: row.phone_country_code,
            client_id: row.client_id,
            value: row.value,
            currency: row.currency,
            probability,
            source: row.source,
            tags: row.tags,
            owner_id: UserId::from_uuid(row.owner_id),
            created_by: UserId::from_uuid(row.created_by),
            notes: row.notes,
            expected_close_date: row.expected_close_date,
            next_follow_up: row.next_follow_up,
            milestones: StageMilestones {
                qualified_at: row.qualified_at,
                proposal_sent_at: row.proposal_sent_at,
                negotiation_started_at: row.negotiation_started_at,
            },
            won_notes: row.won_notes,
            lost_reason: row.lost_reason,
            lost_notes: row.lost_notes,
            closed_at: row.closed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_stage_change_at: row.last_stage_change_at,
            last_interaction_at: row.last_interaction_at,
            deleted_at: row.deleted_at,
            version,
        })
    }
}

// ---------------------------------------------------------------------------
// Activity models
// ---------------------------------------------------------------------------

/// Row struct for the append-only activity log.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = deal_activities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ActivityRow {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub kind: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub from_stage: Option<String>,
    pub to_stage: Option<String>,
    pub performed_by: Uuid,
    pub performed_at: DateTime<Utc>,
}

impl From<ActivityRecord> for ActivityRow {
    fn from(record: ActivityRecord) -> Self {
        Self {
            id: record.id,
            deal_id: record.deal_id,
            kind: record.kind.as_str().to_owned(),
            title: record.title,
            description: record.description,
            from_stage: record.from_stage.map(|stage| stage.as_str().to_owned()),
            to_stage: record.to_stage.map(|stage| stage.as_str().to_owned()),
            performed_by: *record.performed_by.as_uuid(),
            performed_at: record.performed_at,
        }
    }
}

impl TryFrom<ActivityRow> for ActivityRecord {
    type Error = InvalidRow;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Ok(Self {
            id,
            deal_id: row.deal_id,
            kind: parse_column(id, "kind", &row.kind)?,
            title: row.title,
            description: row.description,
            from_stage: parse_optional_column(id, "from_stage", row.from_stage.as_deref())?,
            to_stage: parse_optional_column(id, "to_stage", row.to_stage.as_deref())?,
            performed_by: UserId::from_uuid(row.performed_by),
            performed_at: row.performed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Reminder models
// ---------------------------------------------------------------------------

/// Row struct for scheduled follow-ups.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = deal_reminders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReminderRow {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub remind_at: DateTime<Utc>,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub settled_at: Option<DateTime<Utc>>,
}

impl From<ReminderRecord> for ReminderRow {
    fn from(record: ReminderRecord) -> Self {
        Self {
            id: record.id,
            deal_id: record.deal_id,
            title: record.title,
            description: record.description,
            remind_at: record.remind_at,
            assigned_to: *record.assigned_to.as_uuid(),
            created_by: *record.created_by.as_uuid(),
            created_at: record.created_at,
            status: record.status.as_str().to_owned(),
            settled_at: record.settled_at,
        }
    }
}

impl TryFrom<ReminderRow> for ReminderRecord {
    type Error = InvalidRow;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Ok(Self {
            id,
            deal_id: row.deal_id,
            status: parse_column(id, "status", &row.status)?,
            title: row.title,
            description: row.description,
            remind_at: row.remind_at,
            assigned_to: UserId::from_uuid(row.assigned_to),
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
            settled_at: row.settled_at,
        })
    }
}
