//! PostgreSQL-backed `DealRepository` implementation using Diesel ORM.
//!
//! Every write runs in one transaction. Deal updates filter on the stored
//! `version`, so a writer holding a stale read affects zero rows and is told
//! which version won.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tracing::debug;
use uuid::Uuid;

use crate::domain::crm::{
    ActivityRecord, Deal, DealActivity, DealRecord, DealReminder, ReminderRecord, ReminderStatus,
};
use crate::domain::ports::{DealFilter, DealRepository, DealRepositoryError};
use crate::domain::UserId;

use super::diesel_helpers::{map_diesel_error, map_invalid_row, map_pool_error};
use super::models::{version_for_db, ActivityRow, DealRow, ReminderRow};
use super::pool::DbPool;
use super::schema::{deal_activities, deal_reminders, deals};

const PENDING: &str = ReminderStatus::Pending.as_str();

/// Diesel-backed implementation of the `DealRepository` port.
#[derive(Clone)]
pub struct DieselDealRepository {
    pool: DbPool,
}

impl DieselDealRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<diesel::result::Error> for DealRepositoryError {
    fn from(error: diesel::result::Error) -> Self {
        map_diesel_error(error)
    }
}

fn row_to_deal(row: DealRow) -> Result<Deal, DealRepositoryError> {
    let record = DealRecord::try_from(row)?;
    Deal::try_from(record).map_err(map_invalid_row)
}

fn row_to_activity(row: ActivityRow) -> Result<DealActivity, DealRepositoryError> {
    Ok(ActivityRecord::try_from(row)?.into())
}

fn row_to_reminder(row: ReminderRow) -> Result<DealReminder, DealRepositoryError> {
    Ok(ReminderRecord::try_from(row)?.into())
}

fn stored_version(version: i64) -> u64 {
    u64::try_from(version).unwrap_or_default()
}

/// Treat a unique violation on insert as an identifier collision.
fn map_insert_error(id: Uuid) -> impl FnOnce(DealRepositoryError) -> DealRepositoryError {
    move |error| match error {
        DealRepositoryError::Query { message } if message == "unique constraint violated" => {
            DealRepositoryError::duplicate(id)
        }
        other => other,
    }
}

/// `ILIKE` pattern matching `term` anywhere, with wildcards escaped.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl DealRepository for DieselDealRepository {
    async fn insert_deal(
        &self,
        deal: &Deal,
        opening: &DealActivity,
    ) -> Result<(), DealRepositoryError> {
        let deal_row = DealRow::from(DealRecord::from(deal));
        let activity_row = ActivityRow::from(ActivityRecord::from(opening));
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(deals::table)
                    .values(&deal_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(deal_activities::table)
                    .values(&activity_row)
                    .execute(conn)
                    .await?;
                Ok::<(), DealRepositoryError>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_insert_error(deal.id()))
    }

    async fn find_deal(&self, deal_id: Uuid) -> Result<Option<Deal>, DealRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<DealRow> = deals::table
            .filter(deals::id.eq(deal_id))
            .select(DealRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_deal).transpose()
    }

    async fn list_deals(&self, filter: &DealFilter) -> Result<Vec<Deal>, DealRepositoryError> {
        let mut query = deals::table.into_boxed();
        query = if filter.archived {
            query.filter(deals::deleted_at.is_not_null())
        } else {
            query.filter(deals::deleted_at.is_null())
        };
        if let Some(stage) = filter.stage {
            query = query.filter(deals::stage.eq(stage.as_str()));
        }
        if let Some(owner) = filter.owner_id {
            query = query.filter(deals::owner_id.eq(*owner.as_uuid()));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(deals::priority.eq(priority.as_str()));
        }
        if let Some(from) = filter.created.from() {
            query = query.filter(deals::created_at.ge(from));
        }
        if let Some(to) = filter.created.to() {
            query = query.filter(deals::created_at.lt(to));
        }
        if let Some(term) = filter.search_term() {
            let pattern = contains_pattern(&term);
            query = query.filter(
                deals::name
                    .ilike(pattern.clone())
                    .or(deals::company.ilike(pattern.clone()))
                    .or(deals::email.ilike(pattern)),
            );
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<DealRow> = query
            .select(DealRow::as_select())
            .order_by((deals::updated_at.desc(), deals::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(rows = rows.len(), "deals listed");
        rows.into_iter().map(row_to_deal).collect()
    }

    async fn update_deal(
        &self,
        deal: &Deal,
        expected_version: u64,
        audit: &[DealActivity],
    ) -> Result<(), DealRepositoryError> {
        let deal_id = deal.id();
        let row = DealRow::from(DealRecord::from(deal));
        let audit_rows: Vec<ActivityRow> = audit
            .iter()
            .map(|activity| ActivityRow::from(ActivityRecord::from(activity)))
            .collect();
        let expected = version_for_db(expected_version);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                // Activities advance the interaction clock without a version
                // bump, so never write it backwards.
                let mut row = row;
                let stored_interaction: Option<DateTime<Utc>> = deals::table
                    .filter(deals::id.eq(deal_id))
                    .select(deals::last_interaction_at)
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                if let Some(stored) = stored_interaction {
                    row.last_interaction_at = row.last_interaction_at.max(stored);
                }

                let updated = diesel::update(
                    deals::table
                        .filter(deals::id.eq(deal_id))
                        .filter(deals::version.eq(expected)),
                )
                .set(&row)
                .execute(conn)
                .await?;

                if updated == 0 {
                    let actual: Option<i64> = deals::table
                        .filter(deals::id.eq(deal_id))
                        .select(deals::version)
                        .first(conn)
                        .await
                        .optional()?;
                    return Err(match actual {
                        Some(version) => DealRepositoryError::version_mismatch(
                            expected_version,
                            stored_version(version),
                        ),
                        None => DealRepositoryError::missing_deal(deal_id),
                    });
                }

                if !audit_rows.is_empty() {
                    diesel::insert_into(deal_activities::table)
                        .values(&audit_rows)
                        .execute(conn)
                        .await?;
                }
                Ok::<(), DealRepositoryError>(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn purge_deal(
        &self,
        deal_id: Uuid,
        expected_version: u64,
    ) -> Result<(), DealRepositoryError> {
        let expected = version_for_db(expected_version);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                // Activities and reminders go with the deal via ON DELETE CASCADE.
                let deleted = diesel::delete(
                    deals::table
                        .filter(deals::id.eq(deal_id))
                        .filter(deals::version.eq(expected))
                        .filter(deals::deleted_at.is_not_null()),
                )
                .execute(conn)
                .await?;
                if deleted > 0 {
                    return Ok(());
                }

                let stored: Option<(i64, Option<DateTime<Utc>>)> = deals::table
                    .filter(deals::id.eq(deal_id))
                    .select((deals::version, deals::deleted_at))
                    .first(conn)
                    .await
                    .optional()?;
                Err(match stored {
                    None => DealRepositoryError::missing_deal(deal_id),
                    Some((version, _)) if version != expected => {
                        DealRepositoryError::version_mismatch(
                            expected_version,
                            stored_version(version),
                        )
                    }
                    Some(_) => DealRepositoryError::not_archived(deal_id),
                })
            }
            .scope_boxed()
        })
        .await
    }

    async fn purge_archived(&self) -> Result<u64, DealRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(deals::table.filter(deals::deleted_at.is_not_null()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(removed, "archived deals purged");
        Ok(u64::try_from(removed).unwrap_or_default())
    }

    async fn append_activity(&self, activity: &DealActivity) -> Result<(), DealRepositoryError> {
        let deal_id = activity.deal_id();
        let performed_at = activity.performed_at();
        let row = ActivityRow::from(ActivityRecord::from(activity));
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let exists: Option<Uuid> = deals::table
                    .filter(deals::id.eq(deal_id))
                    .select(deals::id)
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                if exists.is_none() {
                    return Err(DealRepositoryError::missing_deal(deal_id));
                }
                diesel::update(
                    deals::table
                        .filter(deals::id.eq(deal_id))
                        .filter(deals::last_interaction_at.lt(performed_at)),
                )
                .set(deals::last_interaction_at.eq(performed_at))
                .execute(conn)
                .await?;
                diesel::insert_into(deal_activities::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok::<(), DealRepositoryError>(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn list_activities(
        &self,
        deal_id: Uuid,
    ) -> Result<Vec<DealActivity>, DealRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ActivityRow> = deal_activities::table
            .filter(deal_activities::deal_id.eq(deal_id))
            .select(ActivityRow::as_select())
            .order_by(deal_activities::performed_at.desc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_activity).collect()
    }

    async fn insert_reminder(&self, reminder: &DealReminder) -> Result<(), DealRepositoryError> {
        let row = ReminderRow::from(ReminderRecord::from(reminder));
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(deal_reminders::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
            .map_err(map_insert_error(reminder.id()))
    }

    async fn find_reminder(
        &self,
        reminder_id: Uuid,
    ) -> Result<Option<DealReminder>, DealRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ReminderRow> = deal_reminders::table
            .filter(deal_reminders::id.eq(reminder_id))
            .select(ReminderRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_reminder).transpose()
    }

    async fn settle_reminder(&self, reminder: &DealReminder) -> Result<(), DealRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            deal_reminders::table
                .filter(deal_reminders::id.eq(reminder.id()))
                .filter(deal_reminders::status.eq(PENDING)),
        )
        .set((
            deal_reminders::status.eq(reminder.status().as_str()),
            deal_reminders::settled_at.eq(reminder.settled_at()),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(DealRepositoryError::reminder_not_pending(reminder.id()));
        }
        Ok(())
    }

    async fn pending_reminders(
        &self,
        assignee: Option<UserId>,
    ) -> Result<Vec<DealReminder>, DealRepositoryError> {
        let mut query = deal_reminders::table
            .inner_join(deals::table)
            .filter(deal_reminders::status.eq(PENDING))
            .filter(deals::deleted_at.is_null())
            .into_boxed();
        if let Some(user) = assignee {
            query = query.filter(deal_reminders::assigned_to.eq(*user.as_uuid()));
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ReminderRow> = query
            .select(ReminderRow::as_select())
            .order_by((deal_reminders::remind_at.asc(), deal_reminders::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_reminder).collect()
    }

    async fn reminders_for_deal(
        &self,
        deal_id: Uuid,
    ) -> Result<Vec<DealReminder>, DealRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ReminderRow> = deal_reminders::table
            .filter(deal_reminders::deal_id.eq(deal_id))
            .select(ReminderRow::as_select())
            .order_by((deal_reminders::remind_at.asc(), deal_reminders::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_reminder).collect()
    }

    async fn snapshot(&self) -> Result<Vec<Deal>, DealRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<DealRow> = deals::table
            .filter(deals::deleted_at.is_null())
            .select(DealRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_deal).collect()
    }
}
