//! PostgreSQLアダプターのテスト
//!
//! 実行には DATABASE_URL が必要: `cargo test -- --ignored`

use chrono::Duration;
use futures::TryStreamExt;
use library_ledger::adapters::postgres::{
    PostgresFineRepository, PostgresLoanRepository, PostgresNotificationRepository,
    PostgresPaymentLogStore, PostgresPaymentRepository,
};
use library_ledger::domain::commands::*;
use library_ledger::domain::{self, LendingPolicy, LoanStatus, NotificationDraft, NotificationStatus};
use library_ledger::domain::{PaymentMethod, PaymentType, value_objects::*};
use library_ledger::ports::*;
use rust_decimal_macros::dec;
use serial_test::serial;
use sqlx::PgPool;

mod common;

use common::base_time;

/// 各テストの前にすべてのデータを削除する
async fn cleanup_database(pool: &PgPool) {
    sqlx::query("TRUNCATE TABLE payment_logs, payments, notifications, fines, loans CASCADE")
        .execute(pool)
        .await
        .expect("Failed to truncate tables");
}

fn borrowed(user_id: UserId, book_id: BookId) -> domain::loan::BorrowedLoan {
    let cmd = common::borrow_cmd(user_id, book_id);
    domain::loan::borrow_book(
        cmd.user_id,
        cmd.book_id,
        cmd.borrowed_at,
        cmd.due_date,
        &LendingPolicy::default(),
    )
    .unwrap()
    .0
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_insert_if_allowed_enforces_duplicate_and_limit() {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    let repository = PostgresLoanRepository::new(pool.clone());
    let user_id = UserId::new();

    let first = borrowed(user_id, BookId::new());
    assert_eq!(
        repository.insert_if_allowed(&first, 5).await.unwrap(),
        BorrowSlot::Inserted
    );
    assert_eq!(
        repository
            .insert_if_allowed(&borrowed(user_id, first.book_id), 5)
            .await
            .unwrap(),
        BorrowSlot::AlreadyBorrowed
    );

    for _ in 0..4 {
        repository
            .insert_if_allowed(&borrowed(user_id, BookId::new()), 5)
            .await
            .unwrap();
    }
    assert_eq!(
        repository
            .insert_if_allowed(&borrowed(user_id, BookId::new()), 5)
            .await
            .unwrap(),
        BorrowSlot::LimitReached
    );
    assert_eq!(repository.count_active_by_user_id(user_id).await.unwrap(), 5);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_concurrent_borrows_respect_limit() {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    let user_id = UserId::new();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let repository = PostgresLoanRepository::new(pool.clone());
            let loan = borrowed(user_id, BookId::new());
            tokio::spawn(async move { repository.insert_if_allowed(&loan, 5).await.unwrap() })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap() == BorrowSlot::Inserted {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 5);
    let repository = PostgresLoanRepository::new(pool);
    assert_eq!(repository.count_active_by_user_id(user_id).await.unwrap(), 5);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_close_with_fine_then_pay_once() {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    let loans = PostgresLoanRepository::new(pool.clone());
    let fines = PostgresFineRepository::new(pool.clone());

    let loan = borrowed(UserId::new(), BookId::new());
    loans.insert_if_allowed(&loan, 5).await.unwrap();

    let returned_at = base_time() + Duration::days(17);
    let (closed, _, fine) = domain::loan::return_book(
        domain::Loan::Borrowed(loan.clone()),
        returned_at,
        &LendingPolicy::default().fine,
    )
    .unwrap();
    let fine = fine.unwrap();

    assert!(loans.close(&closed, Some(&fine)).await.unwrap());
    // 2回目は比較に失敗し、罰金も追加されない
    assert!(!loans.close(&closed, Some(&fine)).await.unwrap());

    let stored = loans.get_by_id(loan.loan_id).await.unwrap().unwrap();
    assert_eq!(stored.status(), LoanStatus::LateReturned);
    assert_eq!(stored.returned_at(), Some(returned_at));

    let stored_fines = fines.find_by_user_id(loan.user_id).await.unwrap();
    assert_eq!(stored_fines.len(), 1);
    assert_eq!(stored_fines[0].loan_id, loan.loan_id);
    assert_eq!(stored_fines[0].amount, dec!(30000));

    assert!(fines.mark_paid(fine.fine_id).await.unwrap());
    assert!(!fines.mark_paid(fine.fine_id).await.unwrap());
    assert!(
        fines
            .find_unpaid_by_user_id(loan.user_id)
            .await
            .unwrap()
            .is_empty()
    );

    // 削除すると罰金も消える
    assert!(loans.delete(loan.loan_id).await.unwrap());
    assert!(fines.find_all().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_notification_status_compare_and_reset() {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    let repository = PostgresNotificationRepository::new(pool);

    let draft = NotificationDraft::book_returned(UserId::new(), BookId::new(), None);
    let notification = domain::notification::create_notification(draft, base_time());
    repository.insert(&notification).await.unwrap();

    // 占有は1件のみ、期限切れ後は取り直せる
    let id = notification.notification_id;
    let until = base_time() + Duration::minutes(5);
    assert!(repository.claim(id, base_time(), until).await.unwrap());
    assert!(!repository.claim(id, base_time(), until).await.unwrap());
    let later = base_time() + Duration::minutes(6);
    assert!(repository.claim(id, later, later + Duration::minutes(5)).await.unwrap());

    let failed = domain::notification::record_dispatch(notification.clone(), false, base_time())
        .unwrap();
    assert!(
        repository
            .update_status(&failed, NotificationStatus::Pending)
            .await
            .unwrap()
    );
    assert!(
        !repository
            .update_status(&failed, NotificationStatus::Pending)
            .await
            .unwrap()
    );

    assert_eq!(repository.reset_failed(base_time()).await.unwrap(), 1);

    let stored = repository
        .get_by_id(notification.notification_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, NotificationStatus::Pending);
    assert_eq!(stored.payload["bookTitle"], serde_json::Value::Null);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_payment_logs_keep_append_order() {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    let payments = PostgresPaymentRepository::new(pool.clone());
    let logs = PostgresPaymentLogStore::new(pool);

    let (payment, created) = domain::payment::create_payment(
        UserId::new(),
        dec!(15000),
        PaymentType::Borrow,
        PaymentMethod::Cash,
        None,
        base_time(),
    )
    .unwrap();
    payments.insert_with_log(&payment, &created).await.unwrap();

    let (processed, cash_log) = domain::payment::process_cash(payment.clone(), base_time()).unwrap();
    assert!(
        payments
            .transition(&processed, Some(domain::PaymentStatus::Pending), &cash_log)
            .await
            .unwrap()
    );

    // 既にSUCCESSなので更新されず、ログも増えない
    let (_, second_cash_log) = domain::payment::process_cash(payment.clone(), base_time()).unwrap();
    assert!(
        !payments
            .transition(&processed, Some(domain::PaymentStatus::Pending), &second_cash_log)
            .await
            .unwrap()
    );

    let (failed, failed_log) = domain::payment::fail_payment(processed, "refund", base_time());
    assert!(payments.transition(&failed, None, &failed_log).await.unwrap());

    let loaded = logs.load(payment.payment_id).await.unwrap();
    let payloads: Vec<&str> = loaded.iter().map(|l| l.payload.as_str()).collect();
    assert_eq!(
        payloads,
        vec!["Payment created", "Cash payment processed", "Payment failed: refund"]
    );

    let streamed: Vec<_> = logs.stream_all().try_collect().await.unwrap();
    assert_eq!(streamed, loaded);

    let stored = payments.get_by_id(payment.payment_id).await.unwrap().unwrap();
    assert_eq!(stored.status, domain::PaymentStatus::Failed);
}
