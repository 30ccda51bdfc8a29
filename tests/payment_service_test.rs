use library_ledger::application::payment::*;
use library_ledger::domain::commands::*;
use library_ledger::domain::value_objects::*;
use library_ledger::domain::{Gateway, PaymentMethod, PaymentStatus, PaymentType};
use library_ledger::ports::PaymentFilter;
use rust_decimal_macros::dec;
use uuid::Uuid;

mod common;

use common::{TestContext, base_time};

fn create_cmd(user_id: UserId, method: PaymentMethod) -> CreatePayment {
    CreatePayment {
        user_id,
        amount: dec!(30000),
        payment_type: PaymentType::Fine,
        method,
        reference_id: None,
        created_at: base_time(),
    }
}

#[tokio::test]
async fn test_create_payment_is_pending_with_creation_log() {
    let ctx = TestContext::new();

    let payment = create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Vnpay))
        .await
        .unwrap();

    assert_eq!(payment.status, PaymentStatus::Pending);
    let logs = payment_logs(&ctx.payments, payment.payment_id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].gateway, Gateway::Vnpay);
    assert_eq!(logs[0].payload, "Payment created");
}

#[tokio::test]
async fn test_create_payment_rejects_non_positive_amount() {
    let ctx = TestContext::new();
    let cmd = CreatePayment {
        amount: dec!(-1),
        ..create_cmd(UserId::new(), PaymentMethod::Cash)
    };

    let result = create_payment(&ctx.payments, cmd).await;

    assert!(matches!(result, Err(PaymentApplicationError::Validation(_))));
    assert!(
        find_payments(&ctx.payments, PaymentFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_process_vnpay_records_transaction_in_order() {
    let ctx = TestContext::new();
    let payment = create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Vnpay))
        .await
        .unwrap();

    let processed = process_vnpay(
        &ctx.payments,
        ProcessVnpayPayment {
            payment_id: payment.payment_id,
            transaction_id: "TXN-42".to_string(),
            payload: "vnp_ResponseCode=00".to_string(),
            processed_at: base_time(),
        },
    )
    .await
    .unwrap();

    assert_eq!(processed.status, PaymentStatus::Success);
    let logs = payment_logs(&ctx.payments, payment.payment_id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].payload, "Payment created");
    assert_eq!(logs[1].transaction_id.as_deref(), Some("TXN-42"));
    assert_eq!(logs[1].payload, "vnp_ResponseCode=00");
}

#[tokio::test]
async fn test_process_cash_twice_is_invalid_state() {
    let ctx = TestContext::new();
    let payment = create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Cash))
        .await
        .unwrap();
    let cmd = ProcessCashPayment {
        payment_id: payment.payment_id,
        processed_at: base_time(),
    };

    let processed = process_cash(&ctx.payments, cmd.clone()).await.unwrap();
    assert_eq!(processed.status, PaymentStatus::Success);

    let again = process_cash(&ctx.payments, cmd).await;
    assert!(matches!(
        again,
        Err(PaymentApplicationError::InvalidPaymentState(_))
    ));

    // 失敗した遷移はログを残さない
    let logs = payment_logs(&ctx.payments, payment.payment_id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(
        logs[1].transaction_id,
        Some(format!("CASH-{}", payment.payment_id))
    );
}

#[tokio::test]
async fn test_log_write_failure_leaves_payment_pending_and_retryable() {
    let ctx = TestContext::new();
    let payment = create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Cash))
        .await
        .unwrap();
    let cmd = ProcessCashPayment {
        payment_id: payment.payment_id,
        processed_at: base_time(),
    };

    ctx.payment_store.set_log_writes_failing(true);
    let result = process_cash(&ctx.payments, cmd.clone()).await;
    assert!(matches!(
        result,
        Err(PaymentApplicationError::PaymentRepositoryError(_))
    ));

    // 状態もログも変わっていない
    let stored = get_payment(&ctx.payments, payment.payment_id).await.unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(
        payment_logs(&ctx.payments, payment.payment_id)
            .await
            .unwrap()
            .len(),
        1
    );

    ctx.payment_store.set_log_writes_failing(false);
    let processed = process_cash(&ctx.payments, cmd).await.unwrap();

    assert_eq!(processed.status, PaymentStatus::Success);
    let logs = payment_logs(&ctx.payments, payment.payment_id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].gateway, Gateway::Cash);
}

#[tokio::test]
async fn test_create_payment_is_not_stored_when_log_write_fails() {
    let ctx = TestContext::new();
    ctx.payment_store.set_log_writes_failing(true);

    let result = create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Vnpay)).await;

    assert!(result.is_err());
    assert!(
        find_payments(&ctx.payments, PaymentFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
    assert!(all_payment_logs(&ctx.payments).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fail_payment_from_any_status_appends_log() {
    let ctx = TestContext::new();
    let payment = create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Cash))
        .await
        .unwrap();
    process_cash(
        &ctx.payments,
        ProcessCashPayment {
            payment_id: payment.payment_id,
            processed_at: base_time(),
        },
    )
    .await
    .unwrap();

    let failed = fail_payment(
        &ctx.payments,
        FailPayment {
            payment_id: payment.payment_id,
            reason: "chargeback".to_string(),
            failed_at: base_time(),
        },
    )
    .await
    .unwrap();

    assert_eq!(failed.status, PaymentStatus::Failed);
    let logs = payment_logs(&ctx.payments, payment.payment_id).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[2].payload, "Payment failed: chargeback");
}

#[tokio::test]
async fn test_unknown_payment_is_not_found() {
    let ctx = TestContext::new();
    let missing = PaymentId::new();

    let result = process_cash(
        &ctx.payments,
        ProcessCashPayment {
            payment_id: missing,
            processed_at: base_time(),
        },
    )
    .await;
    assert!(matches!(result, Err(PaymentApplicationError::PaymentNotFound)));

    let logs = payment_logs(&ctx.payments, missing).await;
    assert!(matches!(logs, Err(PaymentApplicationError::PaymentNotFound)));
}

#[tokio::test]
async fn test_find_payments_by_user_status_and_reference() {
    let ctx = TestContext::new();
    let user_id = UserId::new();
    let fine_ref = Uuid::new_v4();

    let referenced = create_payment(
        &ctx.payments,
        CreatePayment {
            reference_id: Some(fine_ref),
            ..create_cmd(user_id, PaymentMethod::Cash)
        },
    )
    .await
    .unwrap();
    create_payment(&ctx.payments, create_cmd(user_id, PaymentMethod::Vnpay))
        .await
        .unwrap();
    create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Cash))
        .await
        .unwrap();
    process_cash(
        &ctx.payments,
        ProcessCashPayment {
            payment_id: referenced.payment_id,
            processed_at: base_time(),
        },
    )
    .await
    .unwrap();

    let by_user = find_payments(
        &ctx.payments,
        PaymentFilter {
            user_id: Some(user_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(by_user.len(), 2);

    let succeeded = find_payments(
        &ctx.payments,
        PaymentFilter {
            user_id: Some(user_id),
            status: Some(PaymentStatus::Success),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(succeeded.len(), 1);

    let by_reference = find_payments(
        &ctx.payments,
        PaymentFilter {
            reference_id: Some(fine_ref),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(by_reference.len(), 1);
    assert_eq!(by_reference[0].payment_id, referenced.payment_id);
}

#[tokio::test]
async fn test_all_logs_and_logs_by_gateway() {
    let ctx = TestContext::new();
    let cash = create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Cash))
        .await
        .unwrap();
    create_payment(&ctx.payments, create_cmd(UserId::new(), PaymentMethod::Vnpay))
        .await
        .unwrap();
    process_cash(
        &ctx.payments,
        ProcessCashPayment {
            payment_id: cash.payment_id,
            processed_at: base_time(),
        },
    )
    .await
    .unwrap();

    let all = all_payment_logs(&ctx.payments).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].payment_id, cash.payment_id);
    assert_eq!(all[2].payment_id, cash.payment_id);

    let cash_logs = payment_logs_by_gateway(&ctx.payments, Gateway::Cash)
        .await
        .unwrap();
    assert_eq!(cash_logs.len(), 2);
    assert!(cash_logs.iter().all(|l| l.gateway == Gateway::Cash));
}
