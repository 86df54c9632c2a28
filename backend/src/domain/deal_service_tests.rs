//! Tests for the deal lifecycle service.

use super::*;
use crate::domain::crm::{
    ActivityKind, DealDraft, DealPatch, LossDetails, NewActivity, NewReminder, WonDetails,
};
use crate::domain::ports::MockDealRepository;
use crate::domain::ErrorCode;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use rstest::{fixture, rstest};

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn service(repo: MockDealRepository, now: DateTime<Utc>) -> DealService<MockDealRepository> {
    DealService::new(Arc::new(repo), Arc::new(FixtureClock { utc_now: now }))
}

fn open_deal(created_at: DateTime<Utc>) -> Deal {
    Deal::create(
        Uuid::new_v4(),
        DealDraft {
            name: "Distribuidora Andina".to_owned(),
            value: 8_000_000,
            ..DealDraft::default()
        },
        UserId::random(),
        created_at,
    )
    .expect("valid deal")
}

fn with_deal(repo: &mut MockDealRepository, deal: &Deal) {
    let stored = deal.clone();
    repo.expect_find_deal()
        .withf({
            let id = deal.id();
            move |requested| *requested == id
        })
        .returning(move |_| Ok(Some(stored.clone())));
}

fn stage_request(deal: &Deal, target: DealStage, expected: Option<u64>) -> ChangeStageRequest {
    ChangeStageRequest {
        actor: UserId::random(),
        deal_id: deal.id(),
        expected_version: expected,
        target,
        notes: None,
    }
}

#[rstest]
#[tokio::test]
async fn create_deal_stores_deal_with_opening_note(now: DateTime<Utc>) {
    let actor = UserId::random();
    let mut repo = MockDealRepository::new();
    repo.expect_insert_deal()
        .withf(move |deal, opening| {
            deal.stage() == DealStage::Lead
                && deal.version() == 1
                && deal.created_at() == now
                && opening.deal_id() == deal.id()
                && opening.kind() == ActivityKind::Note
                && opening.performed_by() == actor
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let deal = service(repo, now)
        .create_deal(CreateDealRequest {
            actor,
            draft: DealDraft {
                name: "Hotel Mirador".to_owned(),
                ..DealDraft::default()
            },
        })
        .await
        .expect("create");

    assert_eq!(deal.owner_id(), actor);
    assert_eq!(deal.probability(), 50);
}

#[rstest]
#[case(DealDraft::default(), ErrorCode::InvalidRequest)]
#[case(DealDraft { name: "Cierre".into(), stage: Some(DealStage::Won), ..DealDraft::default() }, ErrorCode::InvalidTransition)]
#[tokio::test]
async fn create_deal_rejects_invalid_drafts(
    now: DateTime<Utc>,
    #[case] draft: DealDraft,
    #[case] code: ErrorCode,
) {
    let mut repo = MockDealRepository::new();
    repo.expect_insert_deal().never();

    let err = service(repo, now)
        .create_deal(CreateDealRequest {
            actor: UserId::random(),
            draft,
        })
        .await
        .expect_err("invalid draft");
    assert_eq!(err.code(), code);
}

#[rstest]
#[tokio::test]
async fn change_stage_writes_next_version_with_audit(now: DateTime<Utc>) {
    let deal = open_deal(now - Duration::days(4));
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_update_deal()
        .withf(|next, expected, audit| {
            next.stage() == DealStage::Proposal
                && next.version() == 2
                && *expected == 1
                && audit.len() == 1
                && audit[0].from_stage() == Some(DealStage::Lead)
                && audit[0].to_stage() == Some(DealStage::Proposal)
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let response = service(repo, now)
        .change_stage(stage_request(&deal, DealStage::Proposal, Some(1)))
        .await
        .expect("stage change");

    assert_eq!(response.deal.stage(), DealStage::Proposal);
    assert_eq!(response.deal.last_stage_change_at(), now);
    assert_eq!(response.activity.kind(), ActivityKind::StageChange);
    assert_eq!(
        response.deal.milestones().proposal_sent_at,
        Some(now),
        "proposal milestone stamped"
    );
}

#[rstest]
#[tokio::test]
async fn stale_expected_version_is_a_conflict(now: DateTime<Utc>) {
    let deal = open_deal(now);
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_update_deal().never();

    let err = service(repo, now)
        .change_stage(stage_request(&deal, DealStage::Qualified, Some(7)))
        .await
        .expect_err("stale version");

    assert_eq!(err.code(), ErrorCode::Conflict);
    let details = err.details().expect("details");
    assert_eq!(details["code"], "version_mismatch");
    assert_eq!(details["expectedVersion"], 7);
    assert_eq!(details["actualVersion"], 1);
}

#[rstest]
#[tokio::test]
async fn lost_write_race_surfaces_as_conflict(now: DateTime<Utc>) {
    let deal = open_deal(now);
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_update_deal()
        .times(1)
        .returning(|_, _, _| Err(DealRepositoryError::version_mismatch(1_u64, 2_u64)));

    let err = service(repo, now)
        .change_stage(stage_request(&deal, DealStage::Qualified, None))
        .await
        .expect_err("race lost");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[case(DealStage::Lead, "same_stage")]
#[case(DealStage::Won, "terminal_target")]
#[case(DealStage::Lost, "terminal_target")]
#[tokio::test]
async fn illegal_stage_targets_are_invalid_transitions(
    now: DateTime<Utc>,
    #[case] target: DealStage,
    #[case] code: &str,
) {
    let deal = open_deal(now);
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_update_deal().never();

    let err = service(repo, now)
        .change_stage(stage_request(&deal, target, None))
        .await
        .expect_err("illegal target");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    assert_eq!(err.details().expect("details")["code"], code);
}

#[rstest]
#[tokio::test]
async fn won_deal_refuses_further_stage_changes(now: DateTime<Utc>) {
    let deal = open_deal(now - Duration::days(10));
    let closed = deal
        .mark_won(
            WonDetails {
                final_value: 9_000_000,
                notes: None,
            },
            TransitionContext {
                actor: UserId::random(),
                at: now - Duration::days(1),
                activity_id: Uuid::new_v4(),
            },
        )
        .expect("win")
        .deal;
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &closed);
    repo.expect_update_deal().never();

    let err = service(repo, now)
        .change_stage(stage_request(&closed, DealStage::Negotiation, None))
        .await
        .expect_err("closed deal");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    let details = err.details().expect("details");
    assert_eq!(details["code"], "deal_closed");
    assert_eq!(details["from"], "won");
}

#[rstest]
#[tokio::test]
async fn mark_lost_requires_reason(now: DateTime<Utc>) {
    let deal = open_deal(now);
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_update_deal().never();

    let err = service(repo, now)
        .mark_lost(MarkLostRequest {
            actor: UserId::random(),
            deal_id: deal.id(),
            expected_version: None,
            details: LossDetails {
                reason: "   ".to_owned(),
                notes: None,
            },
        })
        .await
        .expect_err("blank reason");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.details().expect("details")["field"], "reason");
}

#[rstest]
#[tokio::test]
async fn mark_won_closes_deal(now: DateTime<Utc>) {
    let deal = open_deal(now - Duration::days(3));
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_update_deal()
        .withf(|next, _, audit| next.stage() == DealStage::Won && audit.len() == 1)
        .times(1)
        .returning(|_, _, _| Ok(()));

    let response = service(repo, now)
        .mark_won(MarkWonRequest {
            actor: UserId::random(),
            deal_id: deal.id(),
            expected_version: Some(1),
            details: WonDetails {
                final_value: 7_500_000,
                notes: Some("Firmado".to_owned()),
            },
        })
        .await
        .expect("won");
    assert_eq!(response.deal.value(), 7_500_000);
    assert_eq!(response.deal.closed_at(), Some(now));
}

#[rstest]
#[tokio::test]
async fn unknown_deal_is_not_found(now: DateTime<Utc>) {
    let mut repo = MockDealRepository::new();
    repo.expect_find_deal().returning(|_| Ok(None));

    let err = service(repo, now)
        .get_deal(Uuid::new_v4())
        .await
        .expect_err("missing");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(DealRepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(DealRepositoryError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn repository_failures_map_to_error_codes(
    now: DateTime<Utc>,
    #[case] failure: DealRepositoryError,
    #[case] code: ErrorCode,
) {
    let mut repo = MockDealRepository::new();
    repo.expect_find_deal()
        .return_once(move |_| Err(failure));

    let err = service(repo, now)
        .get_deal(Uuid::new_v4())
        .await
        .expect_err("repository failure");
    assert_eq!(err.code(), code);
}

#[rstest]
#[tokio::test]
async fn update_deal_applies_patch_without_touching_stage(now: DateTime<Utc>) {
    let deal = open_deal(now - Duration::days(1));
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_update_deal()
        .withf(|next, expected, audit| {
            next.name() == "Distribuidora Andina Norte" && *expected == 1 && audit.is_empty()
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let updated = service(repo, now)
        .update_deal(UpdateDealRequest {
            actor: UserId::random(),
            deal_id: deal.id(),
            expected_version: Some(1),
            patch: DealPatch {
                name: Some("Distribuidora Andina Norte".to_owned()),
                ..DealPatch::default()
            },
        })
        .await
        .expect("update");
    assert_eq!(updated.stage(), DealStage::Lead);
    assert_eq!(updated.version(), 2);
}

#[rstest]
#[tokio::test]
async fn activities_are_refused_on_archived_deals(now: DateTime<Utc>) {
    let archived = open_deal(now).archive(now).expect("archive");
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &archived);
    repo.expect_append_activity().never();

    let err = service(repo, now)
        .add_activity(AddActivityRequest {
            actor: UserId::random(),
            deal_id: archived.id(),
            activity: NewActivity {
                kind: ActivityKind::Call,
                title: Some("Llamada".to_owned()),
                description: None,
            },
        })
        .await
        .expect_err("archived");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn add_activity_appends_without_version_bump(now: DateTime<Utc>) {
    let deal = open_deal(now - Duration::days(2));
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_update_deal().never();
    repo.expect_append_activity()
        .withf(|activity| activity.kind() == ActivityKind::Whatsapp)
        .times(1)
        .returning(|_| Ok(()));

    let activity = service(repo, now)
        .add_activity(AddActivityRequest {
            actor: UserId::random(),
            deal_id: deal.id(),
            activity: NewActivity {
                kind: ActivityKind::Whatsapp,
                title: None,
                description: Some("Envió catálogo".to_owned()),
            },
        })
        .await
        .expect("activity");
    assert_eq!(activity.performed_at(), now);
}

fn pending_reminder(deal_id: Uuid, remind_at: DateTime<Utc>, created_at: DateTime<Utc>) -> DealReminder {
    DealReminder::schedule(
        Uuid::new_v4(),
        deal_id,
        NewReminder {
            title: "Llamar de nuevo".to_owned(),
            description: None,
            remind_at,
            assigned_to: None,
        },
        UserId::random(),
        created_at,
    )
    .expect("valid reminder")
}

#[rstest]
#[tokio::test]
async fn completing_settled_reminder_is_invalid_transition(now: DateTime<Utc>) {
    let reminder = pending_reminder(Uuid::new_v4(), now, now)
        .cancel(now)
        .expect("cancel");
    let mut repo = MockDealRepository::new();
    let stored = reminder.clone();
    repo.expect_find_reminder()
        .returning(move |_| Ok(Some(stored.clone())));
    repo.expect_settle_reminder().never();

    let err = service(repo, now)
        .complete_reminder(ReminderActionRequest {
            actor: UserId::random(),
            reminder_id: reminder.id(),
        })
        .await
        .expect_err("already cancelled");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    assert_eq!(err.details().expect("details")["status"], "cancelled");
}

#[rstest]
#[tokio::test]
async fn complete_reminder_persists_settlement(now: DateTime<Utc>) {
    let reminder = pending_reminder(Uuid::new_v4(), now + Duration::hours(2), now);
    let mut repo = MockDealRepository::new();
    let stored = reminder.clone();
    repo.expect_find_reminder()
        .returning(move |_| Ok(Some(stored.clone())));
    repo.expect_settle_reminder()
        .withf(move |settled| {
            settled.status() == ReminderStatus::Completed && settled.settled_at() == Some(now)
        })
        .times(1)
        .returning(|_| Ok(()));

    let settled = service(repo, now)
        .complete_reminder(ReminderActionRequest {
            actor: UserId::random(),
            reminder_id: reminder.id(),
        })
        .await
        .expect("complete");
    assert_eq!(settled.status(), ReminderStatus::Completed);
}

#[rstest]
#[tokio::test]
async fn deal_view_reports_soonest_pending_reminder_and_alerts(now: DateTime<Utc>) {
    let deal = open_deal(now - Duration::days(5));
    let soon = pending_reminder(deal.id(), now + Duration::hours(1), now);
    let later = pending_reminder(deal.id(), now + Duration::days(2), now);
    let done = pending_reminder(deal.id(), now - Duration::hours(1), now)
        .complete(now)
        .expect("complete");
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    let reminders = vec![done, later, soon.clone()];
    repo.expect_reminders_for_deal()
        .returning(move |_| Ok(reminders.clone()));

    let view = service(repo, now).get_deal(deal.id()).await.expect("view");

    assert_eq!(view.next_reminder.as_ref().map(DealReminder::id), Some(soon.id()));
    assert_eq!(view.days_in_stage, 5);
    assert_eq!(view.days_since_interaction, 5);
    assert!(!view.alerts.is_empty(), "five quiet days should raise an alert");
}

#[rstest]
#[tokio::test]
async fn purging_a_live_deal_is_refused(now: DateTime<Utc>) {
    let deal = open_deal(now);
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &deal);
    repo.expect_purge_deal().never();

    let err = service(repo, now)
        .purge_deal(DealActionRequest {
            actor: UserId::random(),
            deal_id: deal.id(),
            expected_version: None,
        })
        .await
        .expect_err("live deal");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    assert_eq!(
        err.details().and_then(|d| d.get("code")),
        Some(&json!("not_archived"))
    );
}

#[rstest]
#[tokio::test]
async fn purging_an_archived_deal_uses_its_current_version(now: DateTime<Utc>) {
    let archived = open_deal(now - Duration::days(3))
        .archive(now - Duration::days(1))
        .expect("archive");
    let mut repo = MockDealRepository::new();
    with_deal(&mut repo, &archived);
    let id = archived.id();
    repo.expect_purge_deal()
        .withf(move |deal_id, expected| *deal_id == id && *expected == 2)
        .times(1)
        .returning(|_, _| Ok(()));

    service(repo, now)
        .purge_deal(DealActionRequest {
            actor: UserId::random(),
            deal_id: archived.id(),
            expected_version: Some(2),
        })
        .await
        .expect("purged");
}

#[rstest]
#[tokio::test]
async fn empty_trash_reports_removed_count(now: DateTime<Utc>) {
    let mut repo = MockDealRepository::new();
    repo.expect_purge_archived().times(1).returning(|| Ok(3));

    let removed = service(repo, now)
        .empty_trash(UserId::random())
        .await
        .expect("emptied");
    assert_eq!(removed, 3);
}

#[rstest]
#[tokio::test]
async fn captured_lead_opens_as_system_user(now: DateTime<Utc>) {
    let mut repo = MockDealRepository::new();
    repo.expect_insert_deal()
        .withf(move |deal, opening| {
            deal.stage() == DealStage::Lead
                && deal.created_by() == UserId::SYSTEM
                && deal.owner_id() == UserId::SYSTEM
                && deal.source() == Some("instagram")
                && opening.title() == Some("Lead received via web form")
                && opening.performed_by() == UserId::SYSTEM
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let deal = service(repo, now)
        .capture_lead(PublicLead {
            first_name: "Sofía".to_owned(),
            last_name: "Ramírez".to_owned(),
            email: "sofia@panaderia.co".to_owned(),
            source: Some("instagram".to_owned()),
            ..PublicLead::default()
        })
        .await
        .expect("lead captured");
    assert_eq!(deal.name(), "Sofía Ramírez");
    assert_eq!(deal.version(), 1);
}

#[rstest]
#[tokio::test]
async fn invalid_lead_is_rejected_before_storage(now: DateTime<Utc>) {
    let mut repo = MockDealRepository::new();
    repo.expect_insert_deal().never();

    let err = service(repo, now)
        .capture_lead(PublicLead {
            first_name: "Sofía".to_owned(),
            email: "sin-arroba".to_owned(),
            ..PublicLead::default()
        })
        .await
        .expect_err("bad email");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}
