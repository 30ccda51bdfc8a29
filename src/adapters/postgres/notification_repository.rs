use crate::domain::{
    notification::{Notification, NotificationStatus, NotificationType},
    value_objects::{NotificationId, UserId},
};
use crate::ports::notification_repository::{
    NotificationFilter, NotificationRepository as NotificationRepositoryTrait, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

use super::invalid_data;

const NOTIFICATION_COLUMNS: &str = r#"
    notification_id,
    user_id,
    notification_type,
    template,
    payload,
    status,
    created_at,
    updated_at
"#;

fn map_row_to_notification(row: &PgRow) -> Result<Notification> {
    let type_str: &str = row.get("notification_type");
    let status_str: &str = row.get("status");

    Ok(Notification {
        notification_id: NotificationId::from_uuid(row.get("notification_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        notification_type: NotificationType::from_str(type_str).map_err(invalid_data)?,
        template: row.get("template"),
        payload: row.get("payload"),
        status: NotificationStatus::from_str(status_str).map_err(invalid_data)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// NotificationRepositoryのPostgreSQL実装
///
/// payloadはJSONBで保存する。
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                notification_id,
                user_id,
                notification_type,
                template,
                payload,
                status,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.notification_id.value())
        .bind(notification.user_id.value())
        .bind(notification.notification_type.as_str())
        .bind(&notification.template)
        .bind(&notification.payload)
        .bind(notification.status.as_str())
        .bind(notification.created_at)
        .bind(notification.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, notification_id: NotificationId) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = $1"
        ))
        .bind(notification_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_notification).transpose()
    }

    /// 指定されなかった条件はNULLで渡して無視する
    async fn find(&self, filter: NotificationFilter) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::varchar IS NULL OR status = $2)
              AND ($3::varchar IS NULL OR notification_type = $3)
            ORDER BY created_at ASC
            "#
        ))
        .bind(filter.user_id.map(|id| id.value()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.notification_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_notification).collect()
    }

    async fn claim(
        &self,
        notification_id: NotificationId,
        at: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET claimed_until = $3
            WHERE notification_id = $1
              AND status = 'PENDING'
              AND (claimed_until IS NULL OR claimed_until <= $2)
            "#,
        )
        .bind(notification_id.value())
        .bind(at)
        .bind(until)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        notification: &Notification,
        expected: NotificationStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $2, updated_at = $3, claimed_until = NULL
            WHERE notification_id = $1 AND status = $4
            "#,
        )
        .bind(notification.notification_id.value())
        .bind(notification.status.as_str())
        .bind(notification.updated_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_failed(&self, at: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'PENDING', updated_at = $1 WHERE status = 'FAILED'",
        )
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
