//! Pipeline and performance aggregation.
//!
//! Both aggregations are pure functions over a deal snapshot. They never
//! mutate deals and never fail: an empty snapshot yields zeroed metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use super::alerts::AlertPolicy;
use super::deal::{Deal, DealOutcome};
use super::stage::DealStage;
use super::validation::CrmValidationError;

const MAX_WINDOW_DAYS: i64 = 3_650;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Half-open `[from, to)` time window; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Build a window, rejecting `from >= to`.
    pub fn new(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Self, CrmValidationError> {
        if let (Some(start), Some(end)) = (from, to) {
            if start >= end {
                return Err(CrmValidationError::InvertedRange);
            }
        }
        Ok(Self { from, to })
    }

    /// Window with no bounds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The `days` days leading up to `now`, with `now` excluded.
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Result<Self, CrmValidationError> {
        if !(1..=MAX_WINDOW_DAYS).contains(&days) {
            return Err(CrmValidationError::WindowOutOfRange);
        }
        Ok(Self {
            from: Some(now - Duration::days(days)),
            to: Some(now),
        })
    }

    pub fn from(&self) -> Option<DateTime<Utc>> {
        self.from
    }

    pub fn to(&self) -> Option<DateTime<Utc>> {
        self.to
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |start| at >= start) && self.to.map_or(true, |end| at < end)
    }
}

/// Count and value of live deals in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBreakdown {
    pub stage: DealStage,
    pub count: u64,
    pub value: i64,
    /// Value scaled by each deal's probability.
    pub weighted_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineMetrics {
    pub range: DateRange,
    /// One entry per open stage, in pipeline order.
    pub stages: Vec<StageBreakdown>,
    pub total_deals: u64,
    pub total_value: i64,
    pub weighted_value: i64,
    pub deals_needing_follow_up: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LostReasonShare {
    pub reason: String,
    pub count: u64,
    /// Share of lost deals, 0 to 100, one decimal.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub range: DateRange,
    pub won_count: u64,
    pub lost_count: u64,
    /// `won / (won + lost)`, 0 when nothing closed.
    pub win_rate: f64,
    /// Mean days from creation to close over closed deals, one decimal.
    pub average_cycle_days: f64,
    pub won_value: i64,
    pub lost_value: i64,
    /// `won_value + lost_value`.
    pub total_closed_value: i64,
    pub lost_reasons: Vec<LostReasonShare>,
}

/// Group live deals created within `range` by stage.
pub fn pipeline_metrics(
    deals: &[Deal],
    range: &DateRange,
    now: DateTime<Utc>,
    policy: &AlertPolicy,
) -> PipelineMetrics {
    let mut stages: Vec<StageBreakdown> = DealStage::OPEN
        .into_iter()
        .map(|stage| StageBreakdown {
            stage,
            count: 0,
            value: 0,
            weighted_value: 0,
        })
        .collect();
    let mut deals_needing_follow_up = 0;

    for deal in deals
        .iter()
        .filter(|deal| deal.is_live() && range.contains(deal.created_at()))
    {
        let Some(slot) = stages.iter_mut().find(|slot| slot.stage == deal.stage()) else {
            continue;
        };
        slot.count += 1;
        slot.value = slot.value.saturating_add(deal.value());
        slot.weighted_value = slot.weighted_value.saturating_add(weighted(deal));
        if deal.days_since_interaction(now) >= policy.follow_up_after_days {
            deals_needing_follow_up += 1;
        }
    }

    PipelineMetrics {
        range: *range,
        total_deals: stages.iter().map(|s| s.count).sum(),
        total_value: stages.iter().fold(0i64, |acc, s| acc.saturating_add(s.value)),
        weighted_value: stages
            .iter()
            .fold(0i64, |acc, s| acc.saturating_add(s.weighted_value)),
        stages,
        deals_needing_follow_up,
    }
}

/// Win rate, cycle time and loss breakdown for deals closed within `range`.
pub fn performance_metrics(deals: &[Deal], range: &DateRange) -> PerformanceMetrics {
    let mut won_count = 0u64;
    let mut lost_count = 0u64;
    let mut won_value = 0i64;
    let mut lost_value = 0i64;
    let mut cycle_seconds = 0i64;
    let mut reasons: BTreeMap<String, u64> = BTreeMap::new();

    for deal in deals.iter().filter(|deal| !deal.is_archived()) {
        let Some(outcome) = deal.outcome() else {
            continue;
        };
        if !range.contains(outcome.closed_at()) {
            continue;
        }
        cycle_seconds += (outcome.closed_at() - deal.created_at()).num_seconds().max(0);
        match outcome {
            DealOutcome::Won { .. } => {
                won_count += 1;
                won_value = won_value.saturating_add(deal.value());
            }
            DealOutcome::Lost { reason, .. } => {
                lost_count += 1;
                lost_value = lost_value.saturating_add(deal.value());
                *reasons.entry(reason.clone()).or_default() += 1;
            }
        }
    }

    let closed = won_count + lost_count;
    let (win_rate, average_cycle_days) = if closed == 0 {
        (0.0, 0.0)
    } else {
        (
            won_count as f64 / closed as f64,
            round_one(cycle_seconds as f64 / SECONDS_PER_DAY / closed as f64),
        )
    };

    let mut lost_reasons: Vec<LostReasonShare> = reasons
        .into_iter()
        .map(|(reason, count)| LostReasonShare {
            reason,
            count,
            percentage: round_one(count as f64 * 100.0 / lost_count as f64),
        })
        .collect();
    lost_reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

    PerformanceMetrics {
        range: *range,
        won_count,
        lost_count,
        win_rate,
        average_cycle_days,
        won_value,
        lost_value,
        total_closed_value: won_value.saturating_add(lost_value),
        lost_reasons,
    }
}

fn weighted(deal: &Deal) -> i64 {
    deal.value().saturating_mul(i64::from(deal.probability())) / 100
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
