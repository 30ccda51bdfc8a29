use chrono::Duration;
use library_ledger::application::notification::*;
use library_ledger::domain::value_objects::*;
use library_ledger::domain::{NotificationDraft, NotificationStatus, NotificationType};
use library_ledger::ports::{NotificationFilter, NotificationRepository};
use serde_json::json;

mod common;

use common::{TestContext, base_time};

fn email_draft(user_id: UserId) -> NotificationDraft {
    NotificationDraft {
        user_id,
        notification_type: NotificationType::Email,
        template: "BOOK_RETURNED".to_string(),
        payload: json!({ "bookTitle": "Dune" }),
    }
}

fn user_with_email(ctx: &TestContext) -> UserId {
    let user_id = UserId::new();
    ctx.account_service
        .add_user_with_email(user_id, "reader@example.com");
    user_id
}

#[tokio::test]
async fn test_create_is_always_pending() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);

    let notification = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();

    assert_eq!(notification.status, NotificationStatus::Pending);
    let stored = get_notification(&ctx.notifications, notification.notification_id)
        .await
        .unwrap();
    assert_eq!(stored, notification);
}

#[tokio::test]
async fn test_send_email_delivers_rendered_mail() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    let notification = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();

    let sent = send_notification(&ctx.notifications, notification.notification_id, base_time())
        .await
        .unwrap();

    assert_eq!(sent.status, NotificationStatus::Sent);
    let mails = ctx.mail_transport.sent();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, "reader@example.com");
    assert_eq!(mails[0].from, "library@test");
    assert_eq!(mails[0].subject, "Book Returned Successfully");
    assert!(mails[0].body.contains("Dune"));
}

#[tokio::test]
async fn test_send_without_email_address_fails_notification() {
    let ctx = TestContext::new();
    let user_id = UserId::new();
    ctx.account_service.add_user(user_id);
    let notification = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();

    let result = send_notification(&ctx.notifications, notification.notification_id, base_time())
        .await
        .unwrap();

    assert_eq!(result.status, NotificationStatus::Failed);
    assert!(ctx.mail_transport.sent().is_empty());
}

#[tokio::test]
async fn test_send_with_failing_transport_fails_notification() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    ctx.mail_transport.set_failing(true);
    let notification = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();

    let result = send_notification(&ctx.notifications, notification.notification_id, base_time())
        .await
        .unwrap();

    assert_eq!(result.status, NotificationStatus::Failed);
}

#[tokio::test]
async fn test_send_sms_always_succeeds() {
    let ctx = TestContext::new();
    // アカウントに存在しなくてもSMSは成功扱い
    let draft = NotificationDraft::fine_payment(
        UserId::new(),
        FineId::new(),
        rust_decimal::Decimal::from(30_000),
    );
    let notification = create_notification(&ctx.notifications, draft, base_time())
        .await
        .unwrap();

    let sent = send_notification(&ctx.notifications, notification.notification_id, base_time())
        .await
        .unwrap();

    assert_eq!(sent.status, NotificationStatus::Sent);
    assert!(ctx.mail_transport.sent().is_empty());
}

#[tokio::test]
async fn test_send_requires_pending() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    let notification = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();
    let id = notification.notification_id;

    send_notification(&ctx.notifications, id, base_time())
        .await
        .unwrap();
    let again = send_notification(&ctx.notifications, id, base_time()).await;

    assert!(matches!(
        again,
        Err(NotificationApplicationError::InvalidNotificationState(_))
    ));
    assert_eq!(ctx.mail_transport.sent().len(), 1);
}

#[tokio::test]
async fn test_unknown_notification_is_not_found() {
    let ctx = TestContext::new();

    let result = send_notification(&ctx.notifications, NotificationId::new(), base_time()).await;

    assert!(matches!(
        result,
        Err(NotificationApplicationError::NotificationNotFound)
    ));
}

#[tokio::test]
async fn test_cancel_only_pending() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    let pending = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();
    let to_send = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();

    let cancelled = cancel_notification(&ctx.notifications, pending.notification_id, base_time())
        .await
        .unwrap();
    assert_eq!(cancelled.status, NotificationStatus::Cancelled);

    send_notification(&ctx.notifications, to_send.notification_id, base_time())
        .await
        .unwrap();
    let result = cancel_notification(&ctx.notifications, to_send.notification_id, base_time()).await;
    assert!(matches!(
        result,
        Err(NotificationApplicationError::InvalidNotificationState(_))
    ));
}

#[tokio::test]
async fn test_failed_notification_is_pending_after_retry() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    ctx.mail_transport.set_failing(true);
    let notification = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();
    send_notification(&ctx.notifications, notification.notification_id, base_time())
        .await
        .unwrap();

    let retried = retry_failed(&ctx.notifications, base_time()).await.unwrap();
    assert_eq!(retried, 1);

    let reset = get_notification(&ctx.notifications, notification.notification_id)
        .await
        .unwrap();
    assert_eq!(reset.status, NotificationStatus::Pending);

    // 再試行後はキャンセルもできる
    let cancelled = cancel_notification(&ctx.notifications, notification.notification_id, base_time())
        .await
        .unwrap();
    assert_eq!(cancelled.status, NotificationStatus::Cancelled);
}

#[tokio::test]
async fn test_sweep_retries_then_sends() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    ctx.mail_transport.set_failing(true);
    let first = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();
    send_notification(&ctx.notifications, first.notification_id, base_time())
        .await
        .unwrap();
    create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();

    ctx.mail_transport.set_failing(false);
    let report = run_sweep(&ctx.notifications, base_time()).await.unwrap();

    assert_eq!(report, SweepReport { retried: 1, sent: 2 });
    let pending = find_notifications(
        &ctx.notifications,
        NotificationFilter {
            status: Some(NotificationStatus::Pending),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_send_pending_counts_only_sent() {
    let ctx = TestContext::new();
    let with_email = user_with_email(&ctx);
    let without_email = UserId::new();
    ctx.account_service.add_user(without_email);

    create_notification(&ctx.notifications, email_draft(with_email), base_time())
        .await
        .unwrap();
    create_notification(&ctx.notifications, email_draft(without_email), base_time())
        .await
        .unwrap();

    let sent = send_pending(&ctx.notifications, base_time()).await.unwrap();
    assert_eq!(sent, 1);

    let failed = find_notifications(
        &ctx.notifications,
        NotificationFilter {
            status: Some(NotificationStatus::Failed),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].user_id, without_email);
}

#[tokio::test]
async fn test_payment_success_notification_is_created_and_sent() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);

    let notification = notify_fine_payment_success(
        &ctx.notifications,
        user_id,
        PaymentSuccess {
            amount: "30000".to_string(),
            payment_method: "CASH".to_string(),
            transaction_id: "CASH-1".to_string(),
        },
        base_time(),
    )
    .await
    .unwrap();

    assert_eq!(notification.template, "FINE_PAYMENT_SUCCESS");
    assert_eq!(notification.status, NotificationStatus::Sent);
    assert_eq!(notification.payload["transactionId"], "CASH-1");
    assert_eq!(ctx.mail_transport.sent()[0].subject, "Fine Payment Successful");
}

#[tokio::test]
async fn test_borrow_payment_success_fails_when_account_down() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    ctx.account_service.set_unavailable(true);

    let notification = notify_borrow_payment_success(
        &ctx.notifications,
        user_id,
        PaymentSuccess {
            amount: "15000".to_string(),
            payment_method: "VNPAY".to_string(),
            transaction_id: "TXN-9".to_string(),
        },
        base_time(),
    )
    .await
    .unwrap();

    assert_eq!(notification.template, "BORROW_PAYMENT_SUCCESS");
    assert_eq!(notification.status, NotificationStatus::Failed);
}

#[tokio::test]
async fn test_find_notifications_by_user_status_and_type() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    let other = user_with_email(&ctx);

    let email = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();
    create_notification(
        &ctx.notifications,
        NotificationDraft::fine_payment(user_id, FineId::new(), rust_decimal::Decimal::ONE),
        base_time(),
    )
    .await
    .unwrap();
    create_notification(&ctx.notifications, email_draft(other), base_time())
        .await
        .unwrap();

    let all = find_notifications(&ctx.notifications, NotificationFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let by_user = find_notifications(
        &ctx.notifications,
        NotificationFilter {
            user_id: Some(user_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(by_user.len(), 2);

    let emails_for_user = find_notifications(
        &ctx.notifications,
        NotificationFilter {
            user_id: Some(user_id),
            status: Some(NotificationStatus::Pending),
            notification_type: Some(NotificationType::Email),
        },
    )
    .await
    .unwrap();
    assert_eq!(emails_for_user.len(), 1);
    assert_eq!(emails_for_user[0].notification_id, email.notification_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_deliver_once() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    let notification = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let deps = ctx.notifications.clone();
            let notification_id = notification.notification_id;
            tokio::spawn(async move { send_notification(&deps, notification_id, base_time()).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(sent) => {
                assert_eq!(sent.status, NotificationStatus::Sent);
                succeeded += 1;
            }
            Err(e) => assert!(matches!(
                e,
                NotificationApplicationError::InvalidNotificationState(_)
            )),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(ctx.mail_transport.sent().len(), 1);
}

#[tokio::test]
async fn test_send_while_claimed_elsewhere_is_rejected_until_claim_expires() {
    let ctx = TestContext::new();
    let user_id = user_with_email(&ctx);
    let notification = create_notification(&ctx.notifications, email_draft(user_id), base_time())
        .await
        .unwrap();
    let notification_id = notification.notification_id;

    // 別の送信側が占有したまま停止した
    let claimed = ctx
        .notification_repository
        .claim(notification_id, base_time(), base_time() + Duration::minutes(5))
        .await
        .unwrap();
    assert!(claimed);

    let result = send_notification(&ctx.notifications, notification_id, base_time()).await;
    assert!(matches!(
        result,
        Err(NotificationApplicationError::InvalidNotificationState(_))
    ));
    let result = cancel_notification(&ctx.notifications, notification_id, base_time()).await;
    assert!(matches!(
        result,
        Err(NotificationApplicationError::InvalidNotificationState(_))
    ));
    assert!(ctx.mail_transport.sent().is_empty());

    let later = base_time() + Duration::minutes(6);
    let sent = send_notification(&ctx.notifications, notification_id, later)
        .await
        .unwrap();

    assert_eq!(sent.status, NotificationStatus::Sent);
    assert_eq!(ctx.mail_transport.sent().len(), 1);
}
