use crate::domain::{
    notification::{Notification, NotificationStatus, NotificationType},
    value_objects::{NotificationId, UserId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 通知の検索条件（指定された項目すべてに一致するもの）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub user_id: Option<UserId>,
    pub status: Option<NotificationStatus>,
    pub notification_type: Option<NotificationType>,
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        self.user_id.is_none_or(|id| notification.user_id == id)
            && self.status.is_none_or(|s| notification.status == s)
            && self
                .notification_type
                .is_none_or(|t| notification.notification_type == t)
    }
}

/// 通知リポジトリポート
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<()>;

    async fn get_by_id(&self, notification_id: NotificationId) -> Result<Option<Notification>>;

    /// 条件に一致する通知を作成順に返す
    async fn find(&self, filter: NotificationFilter) -> Result<Vec<Notification>>;

    /// PENDINGの通知を `until` まで占有する
    ///
    /// PENDINGでない、または別の占有が `at` の時点で有効な場合は `false`。
    /// 占有は `update_status` で解除される。
    async fn claim(
        &self,
        notification_id: NotificationId,
        at: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<bool>;

    /// 状態を比較して更新する
    ///
    /// 保存済みの状態が `expected` と一致する場合のみ `notification` の状態で上書きし、
    /// 占有を解除する。一致しなかった場合は `false`。
    async fn update_status(
        &self,
        notification: &Notification,
        expected: NotificationStatus,
    ) -> Result<bool>;

    /// FAILEDの通知をすべてPENDINGに戻し、件数を返す
    async fn reset_failed(&self, at: DateTime<Utc>) -> Result<u64>;
}
