//! Reminder HTTP handlers.
//!
//! ```text
//! GET   /api/v1/reminders/pending
//! PATCH /api/v1/reminders/{reminder_id}/complete
//! PATCH /api/v1/reminders/{reminder_id}/cancel
//! ```

use actix_web::{get, patch, web};

use crate::domain::ports::ReminderActionRequest;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

use super::deals_dto::{
    parse_pending_query, parse_reminder_id, PendingRemindersQuery, ReminderPath, ReminderResponse,
};

/// Pending reminders, soonest first.
#[utoipa::path(
    get,
    path = "/api/v1/reminders/pending",
    params(PendingRemindersQuery),
    responses(
        (status = 200, description = "Pending reminders", body = [ReminderResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["reminders"],
    operation_id = "listPendingReminders"
)]
#[get("/pending")]
pub async fn pending_reminders(
    state: web::Data<HttpState>,
    query: web::Query<PendingRemindersQuery>,
) -> ApiResult<web::Json<Vec<ReminderResponse>>> {
    let assignee = parse_pending_query(query.into_inner())?;
    let reminders = state.deals_query.pending_reminders(assignee).await?;
    Ok(web::Json(
        reminders.into_iter().map(ReminderResponse::from).collect(),
    ))
}

/// Mark a pending reminder done.
#[utoipa::path(
    patch,
    path = "/api/v1/reminders/{reminder_id}/complete",
    params(("reminder_id" = String, Path, description = "Reminder identifier")),
    responses(
        (status = 200, description = "Completed reminder", body = ReminderResponse),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 422, description = "Reminder already settled", body = ErrorSchema)
    ),
    tags = ["reminders"],
    operation_id = "completeReminder"
)]
#[patch("/{reminder_id}/complete")]
pub async fn complete_reminder(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<ReminderPath>,
) -> ApiResult<web::Json<ReminderResponse>> {
    let principal = session.require_principal()?;
    let reminder_id = parse_reminder_id(path.into_inner())?;
    let reminder = state
        .deals
        .complete_reminder(ReminderActionRequest {
            actor: principal.user_id,
            reminder_id,
        })
        .await?;
    Ok(web::Json(ReminderResponse::from(reminder)))
}

/// Withdraw a pending reminder.
#[utoipa::path(
    patch,
    path = "/api/v1/reminders/{reminder_id}/cancel",
    params(("reminder_id" = String, Path, description = "Reminder identifier")),
    responses(
        (status = 200, description = "Cancelled reminder", body = ReminderResponse),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 422, description = "Reminder already settled", body = ErrorSchema)
    ),
    tags = ["reminders"],
    operation_id = "cancelReminder"
)]
#[patch("/{reminder_id}/cancel")]
pub async fn cancel_reminder(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<ReminderPath>,
) -> ApiResult<web::Json<ReminderResponse>> {
    let principal = session.require_principal()?;
    let reminder_id = parse_reminder_id(path.into_inner())?;
    let reminder = state
        .deals
        .cancel_reminder(ReminderActionRequest {
            actor: principal.user_id,
            reminder_id,
        })
        .await?;
    Ok(web::Json(ReminderResponse::from(reminder)))
}
