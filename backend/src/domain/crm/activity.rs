//! Append-only activity log attached to a deal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::DealStage;
use super::validation::{optional_text, CrmValidationError, MAX_NAME_LEN, MAX_TEXT_LEN};
use crate::domain::UserId;

/// Kind of interaction recorded against a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Call,
    Whatsapp,
    Email,
    Meeting,
    Note,
    /// Written by the lifecycle manager on every stage change and close.
    StageChange,
}

impl ActivityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Call => "call",
            ActivityKind::Whatsapp => "whatsapp",
            ActivityKind::Email => "email",
            ActivityKind::Meeting => "meeting",
            ActivityKind::Note => "note",
            ActivityKind::StageChange => "stage_change",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity kind: {0}")]
pub struct UnknownActivityKind(pub String);

impl FromStr for ActivityKind {
    type Err = UnknownActivityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "call" => Ok(ActivityKind::Call),
            "whatsapp" => Ok(ActivityKind::Whatsapp),
            "email" => Ok(ActivityKind::Email),
            "meeting" => Ok(ActivityKind::Meeting),
            "note" => Ok(ActivityKind::Note),
            "stage_change" => Ok(ActivityKind::StageChange),
            other => Err(UnknownActivityKind(other.to_owned())),
        }
    }
}

/// Caller-supplied activity content, validated by [`DealActivity::record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Immutable log entry attached to exactly one deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealActivity {
    id: Uuid,
    deal_id: Uuid,
    kind: ActivityKind,
    title: Option<String>,
    description: Option<String>,
    from_stage: Option<DealStage>,
    to_stage: Option<DealStage>,
    performed_by: UserId,
    performed_at: DateTime<Utc>,
}

/// Storage form of an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub kind: ActivityKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub from_stage: Option<DealStage>,
    pub to_stage: Option<DealStage>,
    pub performed_by: UserId,
    pub performed_at: DateTime<Utc>,
}

impl DealActivity {
    /// Validate a user-logged interaction.
    ///
    /// `stage_change` is reserved for the lifecycle manager, and at least one
    /// of title or description must carry text.
    pub fn record(
        id: Uuid,
        deal_id: Uuid,
        input: NewActivity,
        performed_by: UserId,
        performed_at: DateTime<Utc>,
    ) -> Result<Self, CrmValidationError> {
        if input.kind == ActivityKind::StageChange {
            return Err(CrmValidationError::ReservedActivityKind);
        }
        let title = optional_text(input.title.as_deref(), "title", MAX_NAME_LEN)?;
        let description = optional_text(input.description.as_deref(), "description", MAX_TEXT_LEN)?;
        if title.is_none() && description.is_none() {
            return Err(CrmValidationError::Empty { field: "title" });
        }
        Ok(Self {
            id,
            deal_id,
            kind: input.kind,
            title,
            description,
            from_stage: None,
            to_stage: None,
            performed_by,
            performed_at,
        })
    }

    pub(crate) fn note(
        id: Uuid,
        deal_id: Uuid,
        title: &str,
        performed_by: UserId,
        performed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            deal_id,
            kind: ActivityKind::Note,
            title: Some(title.to_owned()),
            description: None,
            from_stage: None,
            to_stage: None,
            performed_by,
            performed_at,
        }
    }

    pub(crate) fn stage_change(
        id: Uuid,
        deal_id: Uuid,
        from: DealStage,
        to: DealStage,
        description: Option<String>,
        performed_by: UserId,
        performed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            deal_id,
            kind: ActivityKind::StageChange,
            title: Some(format!("Stage changed: {} -> {}", from.label(), to.label())),
            description,
            from_stage: Some(from),
            to_stage: Some(to),
            performed_by,
            performed_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn deal_id(&self) -> Uuid {
        self.deal_id
    }

    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn from_stage(&self) -> Option<DealStage> {
        self.from_stage
    }

    pub fn to_stage(&self) -> Option<DealStage> {
        self.to_stage
    }

    pub fn performed_by(&self) -> UserId {
        self.performed_by
    }

    pub fn performed_at(&self) -> DateTime<Utc> {
        self.performed_at
    }
}

impl From<ActivityRecord> for DealActivity {
    fn from(record: ActivityRecord) -> Self {
        Self {
            id: record.id,
            deal_id: record.deal_id,
            kind: record.kind,
            title: record.title,
            description: record.description,
            from_stage: record.from_stage,
            to_stage: record.to_stage,
            performed_by: record.performed_by,
            performed_at: record.performed_at,
        }
    }
}

impl From<&DealActivity> for ActivityRecord {
    fn from(activity: &DealActivity) -> Self {
        Self {
            id: activity.id,
            deal_id: activity.deal_id,
            kind: activity.kind,
            title: activity.title.clone(),
            description: activity.description.clone(),
            from_stage: activity.from_stage,
            to_stage: activity.to_stage,
            performed_by: activity.performed_by,
            performed_at: activity.performed_at,
        }
    }
}
