//! Follow-up alerts derived from a deal's recency figures.
//!
//! Alerts are computed on read and never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::deal::{whole_days, Deal};

/// Thresholds that drive alerting and follow-up metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    /// Days without interaction before a live deal needs follow-up.
    pub follow_up_after_days: i64,
    /// Minimum value, in minor units, for the dormant high-value alert.
    pub high_value_threshold: i64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            follow_up_after_days: 3,
            high_value_threshold: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    NoInteraction,
    FollowUpOverdue,
    HighValueDormant,
}

impl AlertKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            AlertKind::NoInteraction => "no_interaction",
            AlertKind::FollowUpOverdue => "follow_up_overdue",
            AlertKind::HighValueDormant => "high_value_dormant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Medium,
    High,
    Urgent,
}

impl AlertSeverity {
    pub const fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DealAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Alerts for a live deal, most severe first. Closed or archived deals have
/// none.
pub fn alerts_for(deal: &Deal, now: DateTime<Utc>, policy: &AlertPolicy) -> Vec<DealAlert> {
    if !deal.is_live() {
        return Vec::new();
    }
    let mut alerts = Vec::new();
    let idle_days = deal.days_since_interaction(now);

    if idle_days >= policy.follow_up_after_days {
        let severity = match idle_days {
            d if d >= 7 => AlertSeverity::Urgent,
            d if d >= 5 => AlertSeverity::High,
            _ => AlertSeverity::Medium,
        };
        alerts.push(DealAlert {
            kind: AlertKind::NoInteraction,
            severity,
            message: format!("{idle_days} days without interaction"),
        });
    }

    if let Some(follow_up) = deal.next_follow_up().filter(|at| *at < now) {
        let overdue_days = whole_days(follow_up, now);
        let severity = match overdue_days {
            d if d >= 3 => AlertSeverity::Urgent,
            d if d >= 1 => AlertSeverity::High,
            _ => AlertSeverity::Medium,
        };
        let message = if overdue_days == 0 {
            "follow-up due today".to_owned()
        } else {
            format!("follow-up overdue by {overdue_days} days")
        };
        alerts.push(DealAlert {
            kind: AlertKind::FollowUpOverdue,
            severity,
            message,
        });
    }

    if deal.value() >= policy.high_value_threshold && idle_days >= policy.follow_up_after_days {
        alerts.push(DealAlert {
            kind: AlertKind::HighValueDormant,
            severity: AlertSeverity::High,
            message: format!(
                "high-value deal ({} {}) idle for {idle_days} days",
                deal.value(),
                deal.currency()
            ),
        });
    }

    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crm::{DealDraft, LossDetails, TransitionContext};
    use crate::domain::UserId;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;
    use uuid::Uuid;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid timestamp")
    }

    fn deal(value: i64, next_follow_up: Option<DateTime<Utc>>) -> Deal {
        Deal::create(
            Uuid::new_v4(),
            DealDraft {
                name: "Acme".to_owned(),
                value,
                next_follow_up,
                ..DealDraft::default()
            },
            UserId::random(),
            start(),
        )
        .expect("valid deal")
    }

    #[rstest]
    #[case(2, None)]
    #[case(3, Some(AlertSeverity::Medium))]
    #[case(5, Some(AlertSeverity::High))]
    #[case(9, Some(AlertSeverity::Urgent))]
    fn idle_severity_escalates(#[case] days: i64, #[case] expected: Option<AlertSeverity>) {
        let alerts = alerts_for(&deal(10, None), start() + Duration::days(days), &AlertPolicy::default());
        let idle = alerts.iter().find(|a| a.kind == AlertKind::NoInteraction);
        assert_eq!(idle.map(|a| a.severity), expected);
    }

    #[rstest]
    fn overdue_follow_up_is_flagged() {
        let follow_up = start() + Duration::hours(1);
        let alerts = alerts_for(
            &deal(10, Some(follow_up)),
            follow_up + Duration::days(1),
            &AlertPolicy::default(),
        );
        let overdue = alerts
            .iter()
            .find(|a| a.kind == AlertKind::FollowUpOverdue)
            .expect("overdue alert");
        assert_eq!(overdue.severity, AlertSeverity::High);
    }

    #[rstest]
    fn dormant_high_value_deal_is_flagged() {
        let alerts = alerts_for(
            &deal(2_000_000, None),
            start() + Duration::days(4),
            &AlertPolicy::default(),
        );
        assert!(alerts.iter().any(|a| a.kind == AlertKind::HighValueDormant));
    }

    #[rstest]
    fn closed_deals_raise_nothing() {
        let ctx = TransitionContext {
            actor: UserId::random(),
            at: start(),
            activity_id: Uuid::new_v4(),
        };
        let lost = deal(2_000_000, None)
            .mark_lost(
                LossDetails {
                    reason: "price".to_owned(),
                    notes: None,
                },
                ctx,
            )
            .expect("lose")
            .deal;
        assert!(alerts_for(&lost, start() + Duration::days(30), &AlertPolicy::default()).is_empty());
    }
}
