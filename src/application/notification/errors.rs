use thiserror::Error;

/// 通知アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum NotificationApplicationError {
    /// 通知が見つからない
    #[error("Notification not found")]
    NotificationNotFound,

    /// 通知の状態が不正（例: PENDINGを期待したがSENTだった）
    #[error("Invalid notification state: {0}")]
    InvalidNotificationState(String),

    /// NotificationRepositoryのエラー
    #[error("Notification repository error")]
    NotificationRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, NotificationApplicationError>;
