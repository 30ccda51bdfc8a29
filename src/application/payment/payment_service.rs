use crate::domain::{
    self, Gateway, Payment, PaymentLogEntry, PaymentStatus, commands::*, value_objects::*,
};
use crate::ports::*;
use futures::TryStreamExt;
use std::sync::Arc;

use super::errors::{PaymentApplicationError, Result};

/// 支払い台帳の依存関係
#[derive(Clone)]
pub struct ServiceDependencies {
    pub payment_repository: Arc<dyn PaymentRepository>,
    pub payment_log_store: Arc<dyn PaymentLogStore>,
}

fn map_payment_error(e: domain::PaymentError) -> PaymentApplicationError {
    match e {
        domain::PaymentError::NonPositiveAmount => {
            PaymentApplicationError::Validation("amount must be greater than zero".to_string())
        }
        domain::PaymentError::NotPending(status) => PaymentApplicationError::InvalidPaymentState(
            format!("Payment is {}, expected PENDING", status),
        ),
    }
}

async fn load_payment(deps: &ServiceDependencies, payment_id: PaymentId) -> Result<Payment> {
    deps.payment_repository
        .get_by_id(payment_id)
        .await
        .map_err(PaymentApplicationError::PaymentRepositoryError)?
        .ok_or(PaymentApplicationError::PaymentNotFound)
}

/// 状態の保存とログの追記を1回の保存で行う
///
/// `expected` が指定されていれば、保存済みの状態が一致する場合のみ更新する。
/// 保存に失敗した場合は状態もログも変わらないため、呼び出し元は再実行できる。
async fn save_transition(
    deps: &ServiceDependencies,
    payment: &Payment,
    expected: Option<PaymentStatus>,
    entry: PaymentLogEntry,
) -> Result<()> {
    let updated = deps
        .payment_repository
        .transition(payment, expected, &entry)
        .await
        .map_err(PaymentApplicationError::PaymentRepositoryError)?;

    if !updated {
        return Err(PaymentApplicationError::InvalidPaymentState(
            "Payment is no longer PENDING".to_string(),
        ));
    }

    tracing::info!(
        payment_id = %payment.payment_id,
        status = %payment.status,
        "Payment status changed"
    );
    Ok(())
}

/// 支払いを作成する
///
/// ビジネスルール：
/// - 金額は正であること
/// - PENDINGで作成し、作成ログを1件記録する
pub async fn create_payment(deps: &ServiceDependencies, cmd: CreatePayment) -> Result<Payment> {
    let (payment, entry) = domain::payment::create_payment(
        cmd.user_id,
        cmd.amount,
        cmd.payment_type,
        cmd.method,
        cmd.reference_id,
        cmd.created_at,
    )
    .map_err(map_payment_error)?;

    deps.payment_repository
        .insert_with_log(&payment, &entry)
        .await
        .map_err(PaymentApplicationError::PaymentRepositoryError)?;

    tracing::info!(
        payment_id = %payment.payment_id,
        user_id = %payment.user_id,
        amount = %payment.amount,
        method = payment.method.as_str(),
        "Payment created"
    );

    Ok(payment)
}

/// VNPAYでの支払い完了を反映する
///
/// 署名やコールバックの検証は行わない。PENDINGの支払いのみ。
pub async fn process_vnpay(deps: &ServiceDependencies, cmd: ProcessVnpayPayment) -> Result<Payment> {
    let payment = load_payment(deps, cmd.payment_id).await?;

    let (payment, entry) =
        domain::payment::process_vnpay(payment, cmd.transaction_id, cmd.payload, cmd.processed_at)
            .map_err(map_payment_error)?;

    save_transition(deps, &payment, Some(PaymentStatus::Pending), entry).await?;

    Ok(payment)
}

/// 現金での支払い完了を反映する（PENDINGのみ）
pub async fn process_cash(deps: &ServiceDependencies, cmd: ProcessCashPayment) -> Result<Payment> {
    let payment = load_payment(deps, cmd.payment_id).await?;

    let (payment, entry) =
        domain::payment::process_cash(payment, cmd.processed_at).map_err(map_payment_error)?;

    save_transition(deps, &payment, Some(PaymentStatus::Pending), entry).await?;

    Ok(payment)
}

/// 支払いを失敗にする
///
/// 現在の状態に関係なくFAILEDにし、理由をログに残す。
pub async fn fail_payment(deps: &ServiceDependencies, cmd: FailPayment) -> Result<Payment> {
    let payment = load_payment(deps, cmd.payment_id).await?;

    let (payment, entry) = domain::payment::fail_payment(payment, &cmd.reason, cmd.failed_at);

    save_transition(deps, &payment, None, entry).await?;

    Ok(payment)
}

pub async fn get_payment(deps: &ServiceDependencies, payment_id: PaymentId) -> Result<Payment> {
    load_payment(deps, payment_id).await
}

/// 条件に一致する支払いを取得する（条件なしなら全件）
pub async fn find_payments(
    deps: &ServiceDependencies,
    filter: PaymentFilter,
) -> Result<Vec<Payment>> {
    deps.payment_repository
        .find(filter)
        .await
        .map_err(PaymentApplicationError::PaymentRepositoryError)
}

/// 支払いのログを追記順に取得する
pub async fn payment_logs(
    deps: &ServiceDependencies,
    payment_id: PaymentId,
) -> Result<Vec<PaymentLogEntry>> {
    load_payment(deps, payment_id).await?;

    deps.payment_log_store
        .load(payment_id)
        .await
        .map_err(PaymentApplicationError::PaymentLogStoreError)
}

/// すべてのログを挿入順に取得する
pub async fn all_payment_logs(deps: &ServiceDependencies) -> Result<Vec<PaymentLogEntry>> {
    deps.payment_log_store
        .stream_all()
        .try_collect()
        .await
        .map_err(PaymentApplicationError::PaymentLogStoreError)
}

pub async fn payment_logs_by_gateway(
    deps: &ServiceDependencies,
    gateway: Gateway,
) -> Result<Vec<PaymentLogEntry>> {
    deps.payment_log_store
        .find_by_gateway(gateway)
        .await
        .map_err(PaymentApplicationError::PaymentLogStoreError)
}
