use crate::domain::{
    self, Notification, NotificationDraft, NotificationStatus, NotificationType,
    notification::{render_body, render_subject},
    value_objects::*,
};
use crate::ports::*;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::errors::{NotificationApplicationError, Result};

/// 通知ディスパッチャーの依存関係
#[derive(Clone)]
pub struct ServiceDependencies {
    pub notification_repository: Arc<dyn NotificationRepository>,
    pub account_service: Arc<dyn AccountService>,
    pub mail_transport: Arc<dyn MailTransport>,
    /// 送信元メールアドレス
    pub mail_from: String,
}

/// 支払い完了通知の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSuccess {
    pub amount: String,
    pub payment_method: String,
    pub transaction_id: String,
}

/// 定期スイープの結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// FAILEDからPENDINGに戻した件数
    pub retried: u64,
    /// 送信に成功した件数
    pub sent: usize,
}

/// 送信中の通知を占有しておく時間
///
/// 送信側が途中で停止しても、この時間が過ぎれば再び送信できる。
const DISPATCH_CLAIM_SECS: i64 = 300;

fn invalid_state(e: domain::NotificationTransitionError) -> NotificationApplicationError {
    let domain::NotificationTransitionError::NotPending(status) = e;
    NotificationApplicationError::InvalidNotificationState(format!(
        "Notification is {}, expected PENDING",
        status
    ))
}

async fn load_notification(
    deps: &ServiceDependencies,
    notification_id: NotificationId,
) -> Result<Notification> {
    deps.notification_repository
        .get_by_id(notification_id)
        .await
        .map_err(NotificationApplicationError::NotificationRepositoryError)?
        .ok_or(NotificationApplicationError::NotificationNotFound)
}

/// PENDINGの通知を占有する
///
/// 別のリクエストが送信・キャンセル中の場合は状態不正とする。
async fn claim(
    deps: &ServiceDependencies,
    notification_id: NotificationId,
    at: DateTime<Utc>,
) -> Result<()> {
    let claimed = deps
        .notification_repository
        .claim(notification_id, at, at + Duration::seconds(DISPATCH_CLAIM_SECS))
        .await
        .map_err(NotificationApplicationError::NotificationRepositoryError)?;

    if !claimed {
        return Err(NotificationApplicationError::InvalidNotificationState(
            "Notification is not PENDING or is being processed".to_string(),
        ));
    }
    Ok(())
}

/// 状態を比較して保存する
///
/// 読み込み後に別のリクエストが状態を変えていた場合は状態不正とする。
async fn save_transition(
    deps: &ServiceDependencies,
    notification: &Notification,
    expected: NotificationStatus,
) -> Result<()> {
    let updated = deps
        .notification_repository
        .update_status(notification, expected)
        .await
        .map_err(NotificationApplicationError::NotificationRepositoryError)?;

    if !updated {
        return Err(NotificationApplicationError::InvalidNotificationState(
            format!("Notification is no longer {}", expected),
        ));
    }
    Ok(())
}

/// 通知を作成する（常にPENDING）
pub async fn create_notification(
    deps: &ServiceDependencies,
    draft: NotificationDraft,
    created_at: DateTime<Utc>,
) -> Result<Notification> {
    let notification = domain::notification::create_notification(draft, created_at);

    deps.notification_repository
        .insert(&notification)
        .await
        .map_err(NotificationApplicationError::NotificationRepositoryError)?;

    tracing::debug!(
        notification_id = %notification.notification_id,
        template = %notification.template,
        "Notification created"
    );

    Ok(notification)
}

/// 配信を試みる
///
/// EMAILは利用者のメールアドレスを取得してメール送信ポートへ渡す。
/// アドレスが見つからない・取得できない・送信に失敗した場合は `false`。
/// EMAIL以外は常に成功とする。
async fn deliver(deps: &ServiceDependencies, notification: &Notification) -> bool {
    match notification.notification_type {
        NotificationType::Sms => true,
        NotificationType::Email => {
            let to = match deps.account_service.get_email(notification.user_id).await {
                Lookup::Found(email) => email,
                Lookup::Missing => {
                    tracing::warn!(
                        notification_id = %notification.notification_id,
                        user_id = %notification.user_id,
                        "No email address for user"
                    );
                    return false;
                }
                Lookup::Unavailable(reason) => {
                    tracing::warn!(
                        notification_id = %notification.notification_id,
                        reason = %reason,
                        "Email lookup failed"
                    );
                    return false;
                }
            };

            let message = MailMessage {
                from: deps.mail_from.clone(),
                to,
                subject: render_subject(&notification.template).to_string(),
                body: render_body(&notification.template, &notification.payload),
            };

            match deps.mail_transport.send(message).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        notification_id = %notification.notification_id,
                        error = %e,
                        "Mail transport failed"
                    );
                    false
                }
            }
        }
    }
}

async fn dispatch(
    deps: &ServiceDependencies,
    notification: Notification,
    at: DateTime<Utc>,
) -> Result<Notification> {
    if notification.status != NotificationStatus::Pending {
        return Err(invalid_state(
            domain::NotificationTransitionError::NotPending(notification.status),
        ));
    }

    // 配信は占有できた1件のリクエストだけが行う
    claim(deps, notification.notification_id, at).await?;

    let delivered = deliver(deps, &notification).await;
    let notification =
        domain::notification::record_dispatch(notification, delivered, at).map_err(invalid_state)?;

    save_transition(deps, &notification, NotificationStatus::Pending).await?;

    tracing::info!(
        notification_id = %notification.notification_id,
        status = %notification.status,
        "Notification dispatched"
    );

    Ok(notification)
}

/// 通知を送信する
///
/// ビジネスルール：
/// - 通知が存在すること
/// - PENDINGであること
/// - 配信結果に応じてSENTまたはFAILEDにする
pub async fn send_notification(
    deps: &ServiceDependencies,
    notification_id: NotificationId,
    at: DateTime<Utc>,
) -> Result<Notification> {
    let notification = load_notification(deps, notification_id).await?;
    dispatch(deps, notification, at).await
}

/// 通知をキャンセルする（PENDINGのみ）
pub async fn cancel_notification(
    deps: &ServiceDependencies,
    notification_id: NotificationId,
    at: DateTime<Utc>,
) -> Result<Notification> {
    let notification = load_notification(deps, notification_id).await?;
    let notification =
        domain::notification::cancel_notification(notification, at).map_err(invalid_state)?;

    claim(deps, notification_id, at).await?;
    save_transition(deps, &notification, NotificationStatus::Pending).await?;

    Ok(notification)
}

/// FAILEDの通知をすべてPENDINGに戻す
///
/// バックオフや試行回数の上限はない。
pub async fn retry_failed(deps: &ServiceDependencies, at: DateTime<Utc>) -> Result<u64> {
    let count = deps
        .notification_repository
        .reset_failed(at)
        .await
        .map_err(NotificationApplicationError::NotificationRepositoryError)?;

    tracing::info!(count, "Failed notifications reset to PENDING");
    Ok(count)
}

/// PENDINGの通知をすべて送信する
///
/// 個々の通知の送信中に別のリクエストが状態を変えていた場合はスキップする。
///
/// # 戻り値
/// SENTになった件数
pub async fn send_pending(deps: &ServiceDependencies, at: DateTime<Utc>) -> Result<usize> {
    let pending = find_notifications(
        deps,
        NotificationFilter {
            status: Some(NotificationStatus::Pending),
            ..Default::default()
        },
    )
    .await?;

    let mut sent = 0;
    for notification in pending {
        let notification_id = notification.notification_id;
        match dispatch(deps, notification, at).await {
            Ok(n) if n.status == NotificationStatus::Sent => sent += 1,
            Ok(_) => {}
            Err(NotificationApplicationError::InvalidNotificationState(reason)) => {
                tracing::debug!(notification_id = %notification_id, reason = %reason, "Skipped");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(sent)
}

/// 再試行と送信をまとめて行う（定期スイープ）
pub async fn run_sweep(deps: &ServiceDependencies, at: DateTime<Utc>) -> Result<SweepReport> {
    let retried = retry_failed(deps, at).await?;
    let sent = send_pending(deps, at).await?;
    Ok(SweepReport { retried, sent })
}

/// 罰金の支払い完了通知を作成して送信する
pub async fn notify_fine_payment_success(
    deps: &ServiceDependencies,
    user_id: UserId,
    payment: PaymentSuccess,
    at: DateTime<Utc>,
) -> Result<Notification> {
    let draft = NotificationDraft::fine_payment_success(
        user_id,
        &payment.amount,
        &payment.payment_method,
        &payment.transaction_id,
    );
    let notification = create_notification(deps, draft, at).await?;
    dispatch(deps, notification, at).await
}

/// 貸出料の支払い完了通知を作成して送信する
pub async fn notify_borrow_payment_success(
    deps: &ServiceDependencies,
    user_id: UserId,
    payment: PaymentSuccess,
    at: DateTime<Utc>,
) -> Result<Notification> {
    let draft = NotificationDraft::borrow_payment_success(
        user_id,
        &payment.amount,
        &payment.payment_method,
        &payment.transaction_id,
    );
    let notification = create_notification(deps, draft, at).await?;
    dispatch(deps, notification, at).await
}

pub async fn get_notification(
    deps: &ServiceDependencies,
    notification_id: NotificationId,
) -> Result<Notification> {
    load_notification(deps, notification_id).await
}

/// 条件に一致する通知を取得する（条件なしなら全件）
pub async fn find_notifications(
    deps: &ServiceDependencies,
    filter: NotificationFilter,
) -> Result<Vec<Notification>> {
    deps.notification_repository
        .find(filter)
        .await
        .map_err(NotificationApplicationError::NotificationRepositoryError)
}
