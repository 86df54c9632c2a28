//! Deal lifecycle HTTP handlers.
//!
//! ```text
//! GET    /api/v1/deals
//! POST   /api/v1/deals
//! GET    /api/v1/deals/{deal_id}
//! PATCH  /api/v1/deals/{deal_id}
//! DELETE /api/v1/deals/{deal_id}
//! DELETE /api/v1/deals/trash
//! DELETE /api/v1/deals/{deal_id}/permanent
//! POST   /api/v1/deals/{deal_id}/restore
//! PATCH  /api/v1/deals/{deal_id}/stage
//! POST   /api/v1/deals/{deal_id}/win
//! POST   /api/v1/deals/{deal_id}/lose
//! GET    /api/v1/deals/{deal_id}/activities
//! POST   /api/v1/deals/{deal_id}/activities
//! POST   /api/v1/deals/{deal_id}/reminders
//! ```
//!
//! Every route sits behind the `crm` module gate. Writes answer with the
//! freshly read deal so clients always receive the current `version`.
//! Permanent deletion additionally requires the admin role.

use actix_web::{delete, get, patch, post, web, HttpResponse};
use uuid::Uuid;

use crate::domain::crm::DealStage;
use crate::domain::require_admin;
use crate::domain::ports::{
    AddActivityRequest, AddReminderRequest, ChangeStageRequest, CreateDealRequest,
    DealActionRequest, MarkLostRequest, MarkWonRequest, StageChangeResponse, UpdateDealRequest,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

pub use super::deals_dto::{
    ActivityResponse, AddActivityBody, AddReminderBody, AlertResponse, ChangeStageBody,
    CreateDealBody, DealListQuery, DealResponse, EmptyTrashResponse, LoseDealBody,
    ReminderResponse, StageChangeBody, StageResponse, UpdateDealBody, VersionQuery, WinDealBody,
};
use super::deals_dto::{
    parse_activity_body, parse_create_body, parse_deal_id, parse_list_query, parse_lose_body,
    parse_reminder_body, parse_stage_body, parse_update_body, parse_win_body, DealPath,
};

async fn current_view(state: &HttpState, deal_id: Uuid) -> ApiResult<DealResponse> {
    let view = state.deals_query.get_deal(deal_id).await?;
    Ok(DealResponse::from(view))
}

async fn stage_change_body(
    state: &HttpState,
    response: StageChangeResponse,
) -> ApiResult<StageChangeBody> {
    let deal = current_view(state, response.deal.id()).await?;
    Ok(StageChangeBody {
        deal,
        activity: ActivityResponse::from(response.activity),
    })
}

/// List live (or archived) deals, most recently updated first.
#[utoipa::path(
    get,
    path = "/api/v1/deals",
    params(DealListQuery),
    responses(
        (status = 200, description = "Deals", body = [DealResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "listDeals"
)]
#[get("")]
pub async fn list_deals(
    state: web::Data<HttpState>,
    query: web::Query<DealListQuery>,
) -> ApiResult<web::Json<Vec<DealResponse>>> {
    let filter = parse_list_query(query.into_inner())?;
    let views = state.deals_query.list_deals(filter).await?;
    Ok(web::Json(views.into_iter().map(DealResponse::from).collect()))
}

/// Open a deal in its entry stage.
#[utoipa::path(
    post,
    path = "/api/v1/deals",
    request_body = CreateDealBody,
    responses(
        (status = 201, description = "Created deal", body = DealResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 422, description = "Terminal entry stage", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "createDeal"
)]
#[post("")]
pub async fn create_deal(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateDealBody>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let draft = parse_create_body(payload.into_inner())?;
    let deal = state
        .deals
        .create_deal(CreateDealRequest {
            actor: principal.user_id,
            draft,
        })
        .await?;
    let body = current_view(&state, deal.id()).await?;
    Ok(HttpResponse::Created().json(body))
}

/// Fetch one deal with its alerts and next reminder.
#[utoipa::path(
    get,
    path = "/api/v1/deals/{deal_id}",
    params(("deal_id" = String, Path, description = "Deal identifier")),
    responses(
        (status = 200, description = "Deal", body = DealResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "getDeal"
)]
#[get("/{deal_id}")]
pub async fn get_deal(
    state: web::Data<HttpState>,
    path: web::Path<DealPath>,
) -> ApiResult<web::Json<DealResponse>> {
    let deal_id = parse_deal_id(path.into_inner())?;
    Ok(web::Json(current_view(&state, deal_id).await?))
}

/// Edit contact, planning and qualification fields of a live deal.
#[utoipa::path(
    patch,
    path = "/api/v1/deals/{deal_id}",
    request_body = UpdateDealBody,
    params(("deal_id" = String, Path, description = "Deal identifier")),
    responses(
        (status = 200, description = "Updated deal", body = DealResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Version conflict", body = ErrorSchema),
        (status = 422, description = "Deal is closed", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "updateDeal"
)]
#[patch("/{deal_id}")]
pub async fn update_deal(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    payload: web::Json<UpdateDealBody>,
) -> ApiResult<web::Json<DealResponse>> {
    let principal = session.require_principal()?;
    let deal_id = parse_deal_id(path.into_inner())?;
    let (expected_version, patch) = parse_update_body(payload.into_inner())?;
    state
        .deals
        .update_deal(UpdateDealRequest {
            actor: principal.user_id,
            deal_id,
            expected_version,
            patch,
        })
        .await?;
    Ok(web::Json(current_view(&state, deal_id).await?))
}

/// Soft-delete a deal.
#[utoipa::path(
    delete,
    path = "/api/v1/deals/{deal_id}",
    params(("deal_id" = String, Path, description = "Deal identifier"), VersionQuery),
    responses(
        (status = 200, description = "Archived deal", body = DealResponse),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Version conflict", body = ErrorSchema),
        (status = 422, description = "Already archived", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "archiveDeal"
)]
#[delete("/{deal_id}")]
pub async fn archive_deal(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    query: web::Query<VersionQuery>,
) -> ApiResult<web::Json<DealResponse>> {
    let principal = session.require_principal()?;
    let deal_id = parse_deal_id(path.into_inner())?;
    state
        .deals
        .archive_deal(DealActionRequest {
            actor: principal.user_id,
            deal_id,
            expected_version: query.expected_version,
        })
        .await?;
    Ok(web::Json(current_view(&state, deal_id).await?))
}

/// Undo a soft delete.
#[utoipa::path(
    post,
    path = "/api/v1/deals/{deal_id}/restore",
    params(("deal_id" = String, Path, description = "Deal identifier"), VersionQuery),
    responses(
        (status = 200, description = "Restored deal", body = DealResponse),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Version conflict", body = ErrorSchema),
        (status = 422, description = "Deal is not archived", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "restoreDeal"
)]
#[post("/{deal_id}/restore")]
pub async fn restore_deal(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    query: web::Query<VersionQuery>,
) -> ApiResult<web::Json<DealResponse>> {
    let principal = session.require_principal()?;
    let deal_id = parse_deal_id(path.into_inner())?;
    state
        .deals
        .restore_deal(DealActionRequest {
            actor: principal.user_id,
            deal_id,
            expected_version: query.expected_version,
        })
        .await?;
    Ok(web::Json(current_view(&state, deal_id).await?))
}

/// Permanently delete one archived deal with its activities and reminders.
#[utoipa::path(
    delete,
    path = "/api/v1/deals/{deal_id}/permanent",
    params(("deal_id" = String, Path, description = "Deal identifier"), VersionQuery),
    responses(
        (status = 204, description = "Deal deleted"),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Admin role required", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Version conflict", body = ErrorSchema),
        (status = 422, description = "Deal is not archived", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "purgeDeal"
)]
#[delete("/{deal_id}/permanent")]
pub async fn purge_deal(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    query: web::Query<VersionQuery>,
) -> ApiResult<HttpResponse> {
    let principal = session.principal();
    let admin = require_admin(principal.as_ref())?;
    let deal_id = parse_deal_id(path.into_inner())?;
    state
        .deals
        .purge_deal(DealActionRequest {
            actor: admin.user_id,
            deal_id,
            expected_version: query.expected_version,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Permanently delete every archived deal.
#[utoipa::path(
    delete,
    path = "/api/v1/deals/trash",
    responses(
        (status = 200, description = "Trash emptied", body = EmptyTrashResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Admin role required", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "emptyTrash"
)]
#[delete("/trash")]
pub async fn empty_trash(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<EmptyTrashResponse>> {
    let principal = session.principal();
    let admin = require_admin(principal.as_ref())?;
    let removed = state.deals.empty_trash(admin.user_id).await?;
    Ok(web::Json(EmptyTrashResponse { removed }))
}

/// Move a live deal to another open stage.
#[utoipa::path(
    patch,
    path = "/api/v1/deals/{deal_id}/stage",
    request_body = ChangeStageBody,
    params(("deal_id" = String, Path, description = "Deal identifier")),
    responses(
        (status = 200, description = "Stage changed", body = StageChangeBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Version conflict", body = ErrorSchema),
        (status = 422, description = "Transition not allowed", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "changeDealStage"
)]
#[patch("/{deal_id}/stage")]
pub async fn change_stage(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    payload: web::Json<ChangeStageBody>,
) -> ApiResult<web::Json<StageChangeBody>> {
    let principal = session.require_principal()?;
    let deal_id = parse_deal_id(path.into_inner())?;
    let body = payload.into_inner();
    let target = parse_stage_body(&body)?;
    let response = state
        .deals
        .change_stage(ChangeStageRequest {
            actor: principal.user_id,
            deal_id,
            expected_version: body.expected_version,
            target,
            notes: body.notes,
        })
        .await?;
    Ok(web::Json(stage_change_body(&state, response).await?))
}

/// Close a live deal as won.
#[utoipa::path(
    post,
    path = "/api/v1/deals/{deal_id}/win",
    request_body = WinDealBody,
    params(("deal_id" = String, Path, description = "Deal identifier")),
    responses(
        (status = 200, description = "Deal won", body = StageChangeBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Version conflict", body = ErrorSchema),
        (status = 422, description = "Deal is closed", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "winDeal"
)]
#[post("/{deal_id}/win")]
pub async fn win_deal(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    payload: web::Json<WinDealBody>,
) -> ApiResult<web::Json<StageChangeBody>> {
    let principal = session.require_principal()?;
    let deal_id = parse_deal_id(path.into_inner())?;
    let (expected_version, details) = parse_win_body(payload.into_inner())?;
    let response = state
        .deals
        .mark_won(MarkWonRequest {
            actor: principal.user_id,
            deal_id,
            expected_version,
            details,
        })
        .await?;
    Ok(web::Json(stage_change_body(&state, response).await?))
}

/// Close a live deal as lost.
#[utoipa::path(
    post,
    path = "/api/v1/deals/{deal_id}/lose",
    request_body = LoseDealBody,
    params(("deal_id" = String, Path, description = "Deal identifier")),
    responses(
        (status = 200, description = "Deal lost", body = StageChangeBody),
        (status = 400, description = "Missing reason", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Version conflict", body = ErrorSchema),
        (status = 422, description = "Deal is closed", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "loseDeal"
)]
#[post("/{deal_id}/lose")]
pub async fn lose_deal(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    payload: web::Json<LoseDealBody>,
) -> ApiResult<web::Json<StageChangeBody>> {
    let principal = session.require_principal()?;
    let deal_id = parse_deal_id(path.into_inner())?;
    let (expected_version, details) = parse_lose_body(payload.into_inner())?;
    let response = state
        .deals
        .mark_lost(MarkLostRequest {
            actor: principal.user_id,
            deal_id,
            expected_version,
            details,
        })
        .await?;
    Ok(web::Json(stage_change_body(&state, response).await?))
}

/// Activity log of a deal, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/deals/{deal_id}/activities",
    params(("deal_id" = String, Path, description = "Deal identifier")),
    responses(
        (status = 200, description = "Activities", body = [ActivityResponse]),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "listDealActivities"
)]
#[get("/{deal_id}/activities")]
pub async fn list_activities(
    state: web::Data<HttpState>,
    path: web::Path<DealPath>,
) -> ApiResult<web::Json<Vec<ActivityResponse>>> {
    let deal_id = parse_deal_id(path.into_inner())?;
    let activities = state.deals_query.list_activities(deal_id).await?;
    Ok(web::Json(
        activities.into_iter().map(ActivityResponse::from).collect(),
    ))
}

/// Log an interaction against a live deal.
#[utoipa::path(
    post,
    path = "/api/v1/deals/{deal_id}/activities",
    request_body = AddActivityBody,
    params(("deal_id" = String, Path, description = "Deal identifier")),
    responses(
        (status = 201, description = "Recorded activity", body = ActivityResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "addDealActivity"
)]
#[post("/{deal_id}/activities")]
pub async fn add_activity(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    payload: web::Json<AddActivityBody>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let deal_id = parse_deal_id(path.into_inner())?;
    let activity = parse_activity_body(payload.into_inner())?;
    let recorded = state
        .deals
        .add_activity(AddActivityRequest {
            actor: principal.user_id,
            deal_id,
            activity,
        })
        .await?;
    Ok(HttpResponse::Created().json(ActivityResponse::from(recorded)))
}

/// Schedule a follow-up reminder on a live deal.
#[utoipa::path(
    post,
    path = "/api/v1/deals/{deal_id}/reminders",
    request_body = AddReminderBody,
    params(("deal_id" = String, Path, description = "Deal identifier")),
    responses(
        (status = 201, description = "Scheduled reminder", body = ReminderResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "addDealReminder"
)]
#[post("/{deal_id}/reminders")]
pub async fn add_reminder(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<DealPath>,
    payload: web::Json<AddReminderBody>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let deal_id = parse_deal_id(path.into_inner())?;
    let reminder = parse_reminder_body(payload.into_inner())?;
    let scheduled = state
        .deals
        .add_reminder(AddReminderRequest {
            actor: principal.user_id,
            deal_id,
            reminder,
        })
        .await?;
    Ok(HttpResponse::Created().json(ReminderResponse::from(scheduled)))
}

/// Pipeline stages in board order.
#[utoipa::path(
    get,
    path = "/api/v1/stages",
    responses(
        (status = 200, description = "Stages", body = [StageResponse]),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["deals"],
    operation_id = "listStages"
)]
#[get("")]
pub async fn list_stages() -> web::Json<Vec<StageResponse>> {
    web::Json(DealStage::ALL.into_iter().map(StageResponse::from).collect())
}

#[cfg(test)]
#[path = "deals_tests.rs"]
mod tests;
