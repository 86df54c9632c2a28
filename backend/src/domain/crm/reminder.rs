//! Scheduled follow-ups attached to a deal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{optional_text, required_text, CrmValidationError, MAX_NAME_LEN, MAX_TEXT_LEN};
use crate::domain::UserId;

/// Lifecycle of a reminder. Only `Pending` reminders may be settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl ReminderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Completed => "completed",
            ReminderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reminder status: {0}")]
pub struct UnknownReminderStatus(pub String);

impl FromStr for ReminderStatus {
    type Err = UnknownReminderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(ReminderStatus::Pending),
            "completed" => Ok(ReminderStatus::Completed),
            "cancelled" => Ok(ReminderStatus::Cancelled),
            other => Err(UnknownReminderStatus(other.to_owned())),
        }
    }
}

/// Raised when settling a reminder that is no longer pending.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reminder is already {status}")]
pub struct ReminderAlreadySettled {
    pub status: ReminderStatus,
}

/// Caller-supplied reminder content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub remind_at: DateTime<Utc>,
    /// Defaults to the creator.
    pub assigned_to: Option<UserId>,
}

/// A follow-up due at `remind_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealReminder {
    id: Uuid,
    deal_id: Uuid,
    title: String,
    description: Option<String>,
    remind_at: DateTime<Utc>,
    assigned_to: UserId,
    created_by: UserId,
    created_at: DateTime<Utc>,
    status: ReminderStatus,
    settled_at: Option<DateTime<Utc>>,
}

/// Storage form of a reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRecord {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub remind_at: DateTime<Utc>,
    pub assigned_to: UserId,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub settled_at: Option<DateTime<Utc>>,
}

impl DealReminder {
    /// Validate and schedule a new pending reminder.
    pub fn schedule(
        id: Uuid,
        deal_id: Uuid,
        input: NewReminder,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CrmValidationError> {
        Ok(Self {
            id,
            deal_id,
            title: required_text(&input.title, "title", MAX_NAME_LEN)?,
            description: optional_text(input.description.as_deref(), "description", MAX_TEXT_LEN)?,
            remind_at: input.remind_at,
            assigned_to: input.assigned_to.unwrap_or(created_by),
            created_by,
            created_at,
            status: ReminderStatus::Pending,
            settled_at: None,
        })
    }

    /// Mark the reminder done.
    pub fn complete(&self, at: DateTime<Utc>) -> Result<Self, ReminderAlreadySettled> {
        self.settle(ReminderStatus::Completed, at)
    }

    /// Withdraw the reminder without completing it.
    pub fn cancel(&self, at: DateTime<Utc>) -> Result<Self, ReminderAlreadySettled> {
        self.settle(ReminderStatus::Cancelled, at)
    }

    fn settle(
        &self,
        status: ReminderStatus,
        at: DateTime<Utc>,
    ) -> Result<Self, ReminderAlreadySettled> {
        if self.status != ReminderStatus::Pending {
            return Err(ReminderAlreadySettled {
                status: self.status,
            });
        }
        Ok(Self {
            status,
            settled_at: Some(at),
            ..self.clone()
        })
    }

    /// Pending and past due.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ReminderStatus::Pending && self.remind_at < now
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn deal_id(&self) -> Uuid {
        self.deal_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn remind_at(&self) -> DateTime<Utc> {
        self.remind_at
    }

    pub fn assigned_to(&self) -> UserId {
        self.assigned_to
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> ReminderStatus {
        self.status
    }

    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }
}

impl From<ReminderRecord> for DealReminder {
    fn from(record: ReminderRecord) -> Self {
        Self {
            id: record.id,
            deal_id: record.deal_id,
            title: record.title,
            description: record.description,
            remind_at: record.remind_at,
            assigned_to: record.assigned_to,
            created_by: record.created_by,
            created_at: record.created_at,
            status: record.status,
            settled_at: record.settled_at,
        }
    }
}

impl From<&DealReminder> for ReminderRecord {
    fn from(reminder: &DealReminder) -> Self {
        Self {
            id: reminder.id,
            deal_id: reminder.deal_id,
            title: reminder.title.clone(),
            description: reminder.description.clone(),
            remind_at: reminder.remind_at,
            assigned_to: reminder.assigned_to,
            created_by: reminder.created_by,
            created_at: reminder.created_at,
            status: reminder.status,
            settled_at: reminder.settled_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    #[fixture]
    fn pending() -> DealReminder {
        let now = Utc::now();
        DealReminder::schedule(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NewReminder {
                title: " Call back ".to_owned(),
                description: None,
                remind_at: now + Duration::hours(2),
                assigned_to: None,
            },
            UserId::random(),
            now,
        )
        .expect("valid reminder")
    }

    #[rstest]
    fn schedule_defaults_assignee_to_creator(pending: DealReminder) {
        assert_eq!(pending.assigned_to(), pending.created_by());
        assert_eq!(pending.title(), "Call back");
        assert_eq!(pending.status(), ReminderStatus::Pending);
    }

    #[rstest]
    fn blank_title_is_rejected() {
        let result = DealReminder::schedule(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NewReminder {
                title: "  ".to_owned(),
                description: None,
                remind_at: Utc::now(),
                assigned_to: None,
            },
            UserId::random(),
            Utc::now(),
        );
        assert_eq!(result, Err(CrmValidationError::Empty { field: "title" }));
    }

    #[rstest]
    fn complete_then_cancel_is_rejected(pending: DealReminder) {
        let at = Utc::now();
        let done = pending.complete(at).expect("pending reminders complete");
        assert_eq!(done.status(), ReminderStatus::Completed);
        assert_eq!(done.settled_at(), Some(at));
        assert_eq!(
            done.cancel(at),
            Err(ReminderAlreadySettled {
                status: ReminderStatus::Completed
            })
        );
    }

    #[rstest]
    fn overdue_only_while_pending(pending: DealReminder) {
        let later = pending.remind_at() + Duration::minutes(1);
        assert!(pending.is_overdue(later));
        let cancelled = pending.cancel(later).expect("cancel");
        assert!(!cancelled.is_overdue(later));
    }
}
