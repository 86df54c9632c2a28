//! Regression coverage for the deal stage machine.

use super::*;
use crate::domain::UserId;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rstest::{fixture, rstest};
use uuid::Uuid;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 8, 30, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn lead(now: DateTime<Utc>) -> Deal {
    Deal::create(
        Uuid::new_v4(),
        DealDraft {
            name: "Panadería La Espiga".to_owned(),
            company: Some("La Espiga SAS".to_owned()),
            value: 1_200_000,
            ..DealDraft::default()
        },
        UserId::random(),
        now,
    )
    .expect("valid draft")
}

fn ctx(at: DateTime<Utc>) -> TransitionContext {
    TransitionContext {
        actor: UserId::random(),
        at,
        activity_id: Uuid::new_v4(),
    }
}

fn won(deal: &Deal, at: DateTime<Utc>) -> Deal {
    deal.mark_won(
        WonDetails {
            final_value: 500,
            notes: None,
        },
        ctx(at),
    )
    .expect("win")
    .deal
}

fn lost(deal: &Deal, at: DateTime<Utc>) -> Deal {
    deal.mark_lost(
        LossDetails {
            reason: "price".to_owned(),
            notes: None,
        },
        ctx(at),
    )
    .expect("lose")
    .deal
}

#[rstest]
fn create_applies_defaults(lead: Deal, now: DateTime<Utc>) {
    assert_eq!(lead.stage(), DealStage::Lead);
    assert_eq!(lead.currency(), "COP");
    assert_eq!(lead.probability(), 50);
    assert_eq!(lead.priority(), DealPriority::Medium);
    assert_eq!(lead.owner_id(), lead.created_by());
    assert_eq!(lead.created_at(), now);
    assert_eq!(lead.last_stage_change_at(), now);
    assert_eq!(lead.version(), 1);
    assert!(lead.outcome().is_none());
}

#[rstest]
fn create_honours_explicit_entry_stage(now: DateTime<Utc>) {
    let deal = Deal::create(
        Uuid::new_v4(),
        DealDraft {
            name: "Referral".to_owned(),
            stage: Some(DealStage::Qualified),
            ..DealDraft::default()
        },
        UserId::random(),
        now,
    )
    .expect("valid draft");
    assert_eq!(deal.stage(), DealStage::Qualified);
    assert_eq!(deal.milestones().qualified_at, Some(now));
}

#[rstest]
#[case(DealStage::Won)]
#[case(DealStage::Lost)]
fn create_refuses_terminal_entry_stage(now: DateTime<Utc>, #[case] stage: DealStage) {
    let result = Deal::create(
        Uuid::new_v4(),
        DealDraft {
            name: "Closed already".to_owned(),
            stage: Some(stage),
            ..DealDraft::default()
        },
        UserId::random(),
        now,
    );
    assert_eq!(
        result,
        Err(DealTransitionError::TerminalTarget { target: stage })
    );
}

#[rstest]
fn create_rejects_invalid_fields(now: DateTime<Utc>) {
    let result = Deal::create(
        Uuid::new_v4(),
        DealDraft {
            name: "Acme".to_owned(),
            value: -1,
            ..DealDraft::default()
        },
        UserId::random(),
        now,
    );
    assert_eq!(
        result,
        Err(DealTransitionError::Validation(CrmValidationError::NegativeValue))
    );
}

#[rstest]
fn change_stage_updates_stage_and_emits_audit(lead: Deal, now: DateTime<Utc>) {
    let later = now + Duration::hours(3);
    let transition = lead
        .change_stage(DealStage::Proposal, Some("sent deck"), ctx(later))
        .expect("lead -> proposal");

    assert_eq!(transition.deal.stage(), DealStage::Proposal);
    assert_eq!(transition.deal.last_stage_change_at(), later);
    assert_eq!(transition.deal.version(), lead.version() + 1);
    assert_eq!(transition.deal.milestones().proposal_sent_at, Some(later));
    assert_eq!(transition.activity.kind(), ActivityKind::StageChange);
    assert_eq!(transition.activity.from_stage(), Some(DealStage::Lead));
    assert_eq!(transition.activity.to_stage(), Some(DealStage::Proposal));
    assert_eq!(transition.activity.description(), Some("sent deck"));
    assert_eq!(transition.activity.deal_id(), lead.id());
    // The source value is never modified.
    assert_eq!(lead.stage(), DealStage::Lead);
}

#[rstest]
fn backward_moves_keep_first_milestone(lead: Deal, now: DateTime<Utc>) {
    let first = now + Duration::hours(1);
    let second = now + Duration::hours(2);
    let third = now + Duration::hours(3);
    let qualified = lead
        .change_stage(DealStage::Qualified, None, ctx(first))
        .expect("lead -> qualified")
        .deal;
    let back = qualified
        .change_stage(DealStage::Lead, None, ctx(second))
        .expect("qualified -> lead")
        .deal;
    let again = back
        .change_stage(DealStage::Qualified, None, ctx(third))
        .expect("lead -> qualified")
        .deal;
    assert_eq!(again.milestones().qualified_at, Some(first));
    assert_eq!(again.version(), 4);
}

#[rstest]
fn same_stage_is_rejected(lead: Deal, now: DateTime<Utc>) {
    assert_eq!(
        lead.change_stage(DealStage::Lead, None, ctx(now)),
        Err(DealTransitionError::SameStage {
            stage: DealStage::Lead
        })
    );
}

#[rstest]
#[case(DealStage::Won)]
#[case(DealStage::Lost)]
fn change_stage_cannot_close(lead: Deal, now: DateTime<Utc>, #[case] target: DealStage) {
    assert_eq!(
        lead.change_stage(target, None, ctx(now)),
        Err(DealTransitionError::TerminalTarget { target })
    );
}

#[rstest]
fn mark_won_records_value_and_close_date(lead: Deal, now: DateTime<Utc>) {
    let at = now + Duration::days(2);
    let transition = lead
        .mark_won(
            WonDetails {
                final_value: 500,
                notes: Some("signed".to_owned()),
            },
            ctx(at),
        )
        .expect("win");

    let deal = transition.deal;
    assert_eq!(deal.stage(), DealStage::Won);
    assert_eq!(deal.value(), 500);
    assert_eq!(deal.closed_at(), Some(at));
    assert_eq!(deal.probability(), 100);
    assert_eq!(deal.outcome().and_then(DealOutcome::notes), Some("signed"));
    assert_eq!(transition.activity.to_stage(), Some(DealStage::Won));
}

#[rstest]
#[case("")]
#[case("   ")]
fn mark_lost_requires_reason(lead: Deal, now: DateTime<Utc>, #[case] reason: &str) {
    let result = lead.mark_lost(
        LossDetails {
            reason: reason.to_owned(),
            notes: None,
        },
        ctx(now),
    );
    assert_eq!(
        result,
        Err(DealTransitionError::Validation(CrmValidationError::Empty {
            field: "reason"
        }))
    );
    assert_eq!(lead.stage(), DealStage::Lead);
}

#[rstest]
fn mark_lost_records_reason(lead: Deal, now: DateTime<Utc>) {
    let deal = lost(&lead, now);
    assert_eq!(deal.stage(), DealStage::Lost);
    assert_eq!(deal.outcome().and_then(DealOutcome::loss_reason), Some("price"));
    assert_eq!(deal.probability(), 0);
}

#[rstest]
fn terminal_deals_reject_every_transition(lead: Deal, now: DateTime<Utc>) {
    for closed in [won(&lead, now), lost(&lead, now)] {
        let stage = closed.stage();
        let expected = Err(DealTransitionError::Closed { stage });
        assert_eq!(
            closed
                .change_stage(DealStage::Negotiation, None, ctx(now))
                .map(|t| t.deal),
            expected.clone()
        );
        assert_eq!(
            closed
                .mark_won(
                    WonDetails {
                        final_value: 1,
                        notes: None
                    },
                    ctx(now)
                )
                .map(|t| t.deal),
            expected.clone()
        );
        assert_eq!(
            closed
                .mark_lost(
                    LossDetails {
                        reason: "late".to_owned(),
                        notes: None
                    },
                    ctx(now)
                )
                .map(|t| t.deal),
            expected.clone()
        );
        assert_eq!(closed.apply_patch(DealPatch::default(), now), expected);
    }
}

#[rstest]
fn patch_edits_descriptive_fields_only(lead: Deal, now: DateTime<Utc>) {
    let follow_up = now + Duration::days(1);
    let patched = lead
        .apply_patch(
            DealPatch {
                name: Some("La Espiga".to_owned()),
                company: Some(" ".to_owned()),
                probability: Some(80),
                tags: Some(vec!["bakery".to_owned()]),
                next_follow_up: Some(Some(follow_up)),
                ..DealPatch::default()
            },
            now,
        )
        .expect("patch");
    assert_eq!(patched.name(), "La Espiga");
    assert_eq!(patched.company(), None);
    assert_eq!(patched.probability(), 80);
    assert_eq!(patched.tags(), ["bakery".to_owned()]);
    assert_eq!(patched.next_follow_up(), Some(follow_up));
    assert_eq!(patched.stage(), lead.stage());
    assert_eq!(patched.version(), 2);
}

#[rstest]
fn archived_deals_refuse_transitions_until_restored(lead: Deal, now: DateTime<Utc>) {
    let archived = lead.archive(now).expect("archive");
    assert!(archived.is_archived());
    assert_eq!(archived.archive(now), Err(DealTransitionError::Archived));
    assert_eq!(
        archived
            .change_stage(DealStage::Qualified, None, ctx(now))
            .map(|t| t.deal),
        Err(DealTransitionError::Archived)
    );

    let restored = archived.restore(now).expect("restore");
    assert!(restored.is_live());
    assert_eq!(restored.restore(now), Err(DealTransitionError::NotArchived));
}

#[rstest]
fn records_round_trip_through_storage_form(lead: Deal, now: DateTime<Utc>) {
    for deal in [lead.clone(), won(&lead, now), lost(&lead, now)] {
        let record = DealRecord::from(&deal);
        assert_eq!(Deal::try_from(record), Ok(deal));
    }
}

#[rstest]
fn inconsistent_records_are_rejected(lead: Deal, now: DateTime<Utc>) {
    let mut record = DealRecord::from(&lead);
    record.stage = DealStage::Won;
    assert!(Deal::try_from(record).is_err());

    let mut record = DealRecord::from(&lead);
    record.closed_at = Some(now);
    assert!(Deal::try_from(record).is_err());

    let mut record = DealRecord::from(&lost(&lead, now));
    record.lost_reason = None;
    assert!(Deal::try_from(record).is_err());
}
