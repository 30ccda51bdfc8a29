use crate::domain::{
    notification::{Notification, NotificationStatus},
    value_objects::NotificationId,
};
use crate::ports::notification_repository::{
    NotificationFilter, NotificationRepository as NotificationRepositoryTrait, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::poisoned;

#[derive(Default)]
struct NotificationState {
    /// 作成順
    notifications: Vec<Notification>,
    claims: HashMap<NotificationId, DateTime<Utc>>,
}

/// In-memory notification store (insertion order is creation order)
#[derive(Default)]
pub struct NotificationRepository {
    state: Mutex<NotificationState>,
}

impl NotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, NotificationState>> {
        self.state
            .lock()
            .map_err(|_| poisoned("notification store"))
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        self.lock()?.notifications.push(notification.clone());
        Ok(())
    }

    async fn get_by_id(&self, notification_id: NotificationId) -> Result<Option<Notification>> {
        Ok(self
            .lock()?
            .notifications
            .iter()
            .find(|n| n.notification_id == notification_id)
            .cloned())
    }

    async fn find(&self, filter: NotificationFilter) -> Result<Vec<Notification>> {
        Ok(self
            .lock()?
            .notifications
            .iter()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect())
    }

    async fn claim(
        &self,
        notification_id: NotificationId,
        at: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        let pending = state
            .notifications
            .iter()
            .any(|n| n.notification_id == notification_id && n.status == NotificationStatus::Pending);
        let held = state
            .claims
            .get(&notification_id)
            .is_some_and(|claimed_until| *claimed_until > at);

        if !pending || held {
            return Ok(false);
        }
        state.claims.insert(notification_id, until);
        Ok(true)
    }

    async fn update_status(
        &self,
        notification: &Notification,
        expected: NotificationStatus,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        let updated = match state
            .notifications
            .iter_mut()
            .find(|n| n.notification_id == notification.notification_id)
        {
            Some(stored) if stored.status == expected => {
                stored.status = notification.status;
                stored.updated_at = notification.updated_at;
                true
            }
            _ => false,
        };
        if updated {
            state.claims.remove(&notification.notification_id);
        }
        Ok(updated)
    }

    async fn reset_failed(&self, at: DateTime<Utc>) -> Result<u64> {
        let mut count = 0;
        for n in self
            .lock()?
            .notifications
            .iter_mut()
            .filter(|n| n.status == NotificationStatus::Failed)
        {
            n.status = NotificationStatus::Pending;
            n.updated_at = at;
            count += 1;
        }
        Ok(count)
    }
}
