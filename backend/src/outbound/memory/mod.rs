//! Process-local `DealRepository` used when no database is configured and by
//! the integration tests.
//!
//! A single `RwLock` guards all three collections so every write, including
//! the compare-and-swap on the deal version and its audit entries, is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::crm::{Deal, DealActivity, DealReminder, ReminderStatus};
use crate::domain::ports::{DealFilter, DealRepository, DealRepositoryError};
use crate::domain::UserId;

#[derive(Default)]
struct Store {
    deals: HashMap<Uuid, Deal>,
    activities: Vec<DealActivity>,
    reminders: HashMap<Uuid, DealReminder>,
}

impl Store {
    /// Drop matching deals with everything attached to them.
    fn remove_deals(&mut self, doomed: impl Fn(&Deal) -> bool) -> usize {
        let ids: Vec<Uuid> = self
            .deals
            .values()
            .filter(|deal| doomed(*deal))
            .map(Deal::id)
            .collect();
        for id in &ids {
            self.deals.remove(id);
        }
        self.activities
            .retain(|activity| !ids.contains(&activity.deal_id()));
        self.reminders
            .retain(|_, reminder| !ids.contains(&reminder.deal_id()));
        ids.len()
    }
}

/// In-memory deal store.
#[derive(Default)]
pub struct InMemoryDealRepository {
    store: RwLock<Store>,
}

impl InMemoryDealRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DealRepository for InMemoryDealRepository {
    async fn insert_deal(
        &self,
        deal: &Deal,
        opening: &DealActivity,
    ) -> Result<(), DealRepositoryError> {
        let mut store = self.store.write().await;
        if store.deals.contains_key(&deal.id()) {
            return Err(DealRepositoryError::duplicate(deal.id()));
        }
        store.deals.insert(deal.id(), deal.clone());
        store.activities.push(opening.clone());
        Ok(())
    }

    async fn find_deal(&self, deal_id: Uuid) -> Result<Option<Deal>, DealRepositoryError> {
        Ok(self.store.read().await.deals.get(&deal_id).cloned())
    }

    async fn list_deals(&self, filter: &DealFilter) -> Result<Vec<Deal>, DealRepositoryError> {
        let store = self.store.read().await;
        let mut deals: Vec<Deal> = store
            .deals
            .values()
            .filter(|deal| filter.matches(deal))
            .cloned()
            .collect();
        deals.sort_by(|a, b| {
            b.updated_at()
                .cmp(&a.updated_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(deals)
    }

    async fn update_deal(
        &self,
        deal: &Deal,
        expected_version: u64,
        audit: &[DealActivity],
    ) -> Result<(), DealRepositoryError> {
        let mut store = self.store.write().await;
        let stored = store
            .deals
            .get(&deal.id())
            .ok_or_else(|| DealRepositoryError::missing_deal(deal.id()))?;
        if stored.version() != expected_version {
            return Err(DealRepositoryError::version_mismatch(
                expected_version,
                stored.version(),
            ));
        }
        // Activities advance the interaction clock without a version bump.
        let mut next = deal.clone();
        next.record_interaction(stored.last_interaction_at());
        store.deals.insert(deal.id(), next);
        store.activities.extend(audit.iter().cloned());
        Ok(())
    }

    async fn purge_deal(
        &self,
        deal_id: Uuid,
        expected_version: u64,
    ) -> Result<(), DealRepositoryError> {
        let mut store = self.store.write().await;
        let stored = store
            .deals
            .get(&deal_id)
            .ok_or_else(|| DealRepositoryError::missing_deal(deal_id))?;
        if stored.version() != expected_version {
            return Err(DealRepositoryError::version_mismatch(
                expected_version,
                stored.version(),
            ));
        }
        if !stored.is_archived() {
            return Err(DealRepositoryError::not_archived(deal_id));
        }
        store.remove_deals(|deal| deal.id() == deal_id);
        Ok(())
    }

    async fn purge_archived(&self) -> Result<u64, DealRepositoryError> {
        let mut store = self.store.write().await;
        let removed = store.remove_deals(Deal::is_archived);
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn append_activity(&self, activity: &DealActivity) -> Result<(), DealRepositoryError> {
        let mut store = self.store.write().await;
        let deal = store
            .deals
            .get_mut(&activity.deal_id())
            .ok_or_else(|| DealRepositoryError::missing_deal(activity.deal_id()))?;
        deal.record_interaction(activity.performed_at());
        store.activities.push(activity.clone());
        Ok(())
    }

    async fn list_activities(
        &self,
        deal_id: Uuid,
    ) -> Result<Vec<DealActivity>, DealRepositoryError> {
        let store = self.store.read().await;
        // Reverse insertion order first so equal timestamps stay newest first.
        let mut activities: Vec<DealActivity> = store
            .activities
            .iter()
            .rev()
            .filter(|activity| activity.deal_id() == deal_id)
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.performed_at().cmp(&a.performed_at()));
        Ok(activities)
    }

    async fn insert_reminder(&self, reminder: &DealReminder) -> Result<(), DealRepositoryError> {
        let mut store = self.store.write().await;
        if !store.deals.contains_key(&reminder.deal_id()) {
            return Err(DealRepositoryError::missing_deal(reminder.deal_id()));
        }
        if store.reminders.contains_key(&reminder.id()) {
            return Err(DealRepositoryError::duplicate(reminder.id()));
        }
        store.reminders.insert(reminder.id(), reminder.clone());
        Ok(())
    }

    async fn find_reminder(
        &self,
        reminder_id: Uuid,
    ) -> Result<Option<DealReminder>, DealRepositoryError> {
        Ok(self.store.read().await.reminders.get(&reminder_id).cloned())
    }

    async fn settle_reminder(&self, reminder: &DealReminder) -> Result<(), DealRepositoryError> {
        let mut store = self.store.write().await;
        match store.reminders.get_mut(&reminder.id()) {
            Some(stored) if stored.status() == ReminderStatus::Pending => {
                *stored = reminder.clone();
                Ok(())
            }
            _ => Err(DealRepositoryError::reminder_not_pending(reminder.id())),
        }
    }

    async fn pending_reminders(
        &self,
        assignee: Option<UserId>,
    ) -> Result<Vec<DealReminder>, DealRepositoryError> {
        let store = self.store.read().await;
        let mut reminders: Vec<DealReminder> = store
            .reminders
            .values()
            .filter(|reminder| reminder.status() == ReminderStatus::Pending)
            .filter(|reminder| assignee.map_or(true, |user| reminder.assigned_to() == user))
            .filter(|reminder| {
                store
                    .deals
                    .get(&reminder.deal_id())
                    .is_some_and(|deal| !deal.is_archived())
            })
            .cloned()
            .collect();
        reminders.sort_by_key(|reminder| (reminder.remind_at(), reminder.id()));
        Ok(reminders)
    }

    async fn reminders_for_deal(
        &self,
        deal_id: Uuid,
    ) -> Result<Vec<DealReminder>, DealRepositoryError> {
        let store = self.store.read().await;
        let mut reminders: Vec<DealReminder> = store
            .reminders
            .values()
            .filter(|reminder| reminder.deal_id() == deal_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|reminder| (reminder.remind_at(), reminder.id()));
        Ok(reminders)
    }

    async fn snapshot(&self) -> Result<Vec<Deal>, DealRepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .deals
            .values()
            .filter(|deal| !deal.is_archived())
            .cloned()
            .collect())
    }
}
