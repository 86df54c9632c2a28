//! Regression coverage for pipeline and performance aggregation.

use super::*;
use crate::domain::crm::{DealDraft, LossDetails, TransitionContext, WonDetails};
use crate::domain::UserId;
use chrono::TimeZone;
use rstest::{fixture, rstest};
use uuid::Uuid;

#[fixture]
fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn open(name: &str, value: i64, probability: i64, at: DateTime<Utc>) -> Deal {
    Deal::create(
        Uuid::new_v4(),
        DealDraft {
            name: name.to_owned(),
            value,
            probability: Some(probability),
            ..DealDraft::default()
        },
        UserId::random(),
        at,
    )
    .expect("valid deal")
}

fn ctx(at: DateTime<Utc>) -> TransitionContext {
    TransitionContext {
        actor: UserId::random(),
        at,
        activity_id: Uuid::new_v4(),
    }
}

fn moved(deal: &Deal, stage: DealStage, at: DateTime<Utc>) -> Deal {
    deal.change_stage(stage, None, ctx(at)).expect("stage change").deal
}

fn won(deal: &Deal, value: i64, at: DateTime<Utc>) -> Deal {
    deal.mark_won(
        WonDetails {
            final_value: value,
            notes: None,
        },
        ctx(at),
    )
    .expect("win")
    .deal
}

fn lost(deal: &Deal, reason: &str, at: DateTime<Utc>) -> Deal {
    deal.mark_lost(
        LossDetails {
            reason: reason.to_owned(),
            notes: None,
        },
        ctx(at),
    )
    .expect("lose")
    .deal
}

#[rstest]
fn empty_snapshot_reports_every_open_stage_with_zeros(start: DateTime<Utc>) {
    let metrics = pipeline_metrics(&[], &DateRange::unbounded(), start, &AlertPolicy::default());

    let stages: Vec<_> = metrics.stages.iter().map(|s| s.stage).collect();
    assert_eq!(stages, DealStage::OPEN.to_vec());
    assert!(metrics.stages.iter().all(|s| s.count == 0 && s.value == 0));
    assert_eq!(metrics.total_deals, 0);
    assert_eq!(metrics.total_value, 0);
}

#[rstest]
fn pipeline_groups_live_deals_only(start: DateTime<Utc>) {
    let a = open("A", 1_000, 50, start);
    let b = moved(&open("B", 2_000, 20, start), DealStage::Proposal, start);
    let c = moved(&open("C", 3_000, 100, start), DealStage::Proposal, start);
    let closed = won(&open("D", 9_000, 50, start), 9_000, start);

    let metrics = pipeline_metrics(
        &[a, b, c, closed],
        &DateRange::unbounded(),
        start,
        &AlertPolicy::default(),
    );

    let proposal = metrics
        .stages
        .iter()
        .find(|s| s.stage == DealStage::Proposal)
        .expect("proposal stage");
    assert_eq!(proposal.count, 2);
    assert_eq!(proposal.value, 5_000);
    assert_eq!(proposal.weighted_value, 400 + 3_000);
    assert_eq!(metrics.total_deals, 3);
    assert_eq!(metrics.total_value, 6_000);
    assert_eq!(metrics.weighted_value, 500 + 400 + 3_000);
}

#[rstest]
fn pipeline_range_filters_on_creation_time(start: DateTime<Utc>) {
    let early = open("early", 100, 50, start);
    let late = open("late", 200, 50, start + Duration::days(10));
    let range =
        DateRange::new(Some(start + Duration::days(1)), None).expect("valid range");

    let metrics = pipeline_metrics(&[early, late], &range, start, &AlertPolicy::default());

    assert_eq!(metrics.total_deals, 1);
    assert_eq!(metrics.total_value, 200);
}

#[rstest]
fn pipeline_counts_deals_needing_follow_up(start: DateTime<Utc>) {
    let stale = open("stale", 100, 50, start);
    let fresh = open("fresh", 100, 50, start + Duration::days(3));
    let metrics = pipeline_metrics(
        &[stale, fresh],
        &DateRange::unbounded(),
        start + Duration::days(4),
        &AlertPolicy::default(),
    );
    assert_eq!(metrics.deals_needing_follow_up, 1);
}

#[rstest]
fn win_rate_is_zero_without_closed_deals(start: DateTime<Utc>) {
    let metrics = performance_metrics(&[open("A", 1, 50, start)], &DateRange::unbounded());
    assert_eq!(metrics.win_rate, 0.0);
    assert!(!metrics.win_rate.is_nan());
    assert_eq!(metrics.average_cycle_days, 0.0);
    assert!(metrics.lost_reasons.is_empty());
}

#[rstest]
fn performance_reports_rates_cycle_and_reasons(start: DateTime<Utc>) {
    let deals = vec![
        won(&open("A", 100, 50, start), 500, start + Duration::days(10)),
        lost(&open("B", 200, 50, start), "price", start + Duration::days(20)),
        lost(&open("C", 300, 50, start), "price", start + Duration::days(30)),
        lost(&open("D", 400, 50, start), "timing", start + Duration::days(40)),
    ];

    let metrics = performance_metrics(&deals, &DateRange::unbounded());

    assert_eq!(metrics.won_count, 1);
    assert_eq!(metrics.lost_count, 3);
    assert_eq!(metrics.win_rate, 0.25);
    assert_eq!(metrics.average_cycle_days, 25.0);
    assert_eq!(metrics.won_value, 500);
    assert_eq!(metrics.lost_value, 900);
    assert_eq!(metrics.total_closed_value, 1_400);
    assert_eq!(
        metrics.lost_reasons,
        vec![
            LostReasonShare {
                reason: "price".to_owned(),
                count: 2,
                percentage: 66.7,
            },
            LostReasonShare {
                reason: "timing".to_owned(),
                count: 1,
                percentage: 33.3,
            },
        ]
    );
}

#[rstest]
fn performance_range_filters_on_close_time(start: DateTime<Utc>) {
    let deals = vec![
        won(&open("A", 100, 50, start), 100, start + Duration::days(1)),
        won(&open("B", 100, 50, start), 100, start + Duration::days(50)),
    ];
    let range = DateRange::new(Some(start), Some(start + Duration::days(7))).expect("range");

    let metrics = performance_metrics(&deals, &range);

    assert_eq!(metrics.won_count, 1);
    assert_eq!(metrics.win_rate, 1.0);
}

#[rstest]
fn archived_deals_are_excluded(start: DateTime<Utc>) {
    let archived = won(&open("A", 100, 50, start), 100, start)
        .archive(start)
        .expect("archive");
    let pipeline_archived = open("B", 100, 50, start).archive(start).expect("archive");

    let performance = performance_metrics(&[archived], &DateRange::unbounded());
    let pipeline = pipeline_metrics(
        &[pipeline_archived],
        &DateRange::unbounded(),
        start,
        &AlertPolicy::default(),
    );

    assert_eq!(performance.won_count, 0);
    assert_eq!(pipeline.total_deals, 0);
}

#[rstest]
fn aggregation_leaves_input_untouched(start: DateTime<Utc>) {
    let deals = vec![open("A", 100, 50, start), won(&open("B", 1, 50, start), 5, start)];
    let before = deals.clone();
    let _ = pipeline_metrics(&deals, &DateRange::unbounded(), start, &AlertPolicy::default());
    let _ = performance_metrics(&deals, &DateRange::unbounded());
    assert_eq!(deals, before);
}

#[rstest]
#[case(Some(0), None, true)]
#[case(Some(1), Some(1), false)]
#[case(Some(2), Some(1), false)]
fn date_range_validation(
    start: DateTime<Utc>,
    #[case] from_day: Option<i64>,
    #[case] to_day: Option<i64>,
    #[case] ok: bool,
) {
    let at = |day: i64| start + Duration::days(day);
    assert_eq!(DateRange::new(from_day.map(at), to_day.map(at)).is_ok(), ok);
}

#[rstest]
fn last_days_is_half_open(start: DateTime<Utc>) {
    let range = DateRange::last_days(start, 90).expect("valid window");
    assert!(range.contains(start - Duration::days(90)));
    assert!(!range.contains(start));
    assert_eq!(
        DateRange::last_days(start, 0),
        Err(CrmValidationError::WindowOutOfRange)
    );
}
