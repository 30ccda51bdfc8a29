use crate::domain::{self, DomainEvent, Fine, commands::PayFine, value_objects::*};
use rust_decimal::Decimal;

use super::errors::{LoanApplicationError, Result};
use super::loan_service::{ServiceDependencies, publish};

/// 罰金を支払う
///
/// ビジネスルール：
/// - 罰金が存在すること
/// - 未払いであること（2回目の支払いは失敗する）
///
/// 支払い済みへの更新は「未払いの場合のみ」の条件付きで行う。
pub async fn pay_fine(deps: &ServiceDependencies, cmd: PayFine) -> Result<Fine> {
    // 1. 罰金を読み込む
    let fine = deps
        .fine_repository
        .get_by_id(cmd.fine_id)
        .await
        .map_err(LoanApplicationError::FineRepositoryError)?
        .ok_or(LoanApplicationError::FineNotFound)?;

    // 2. ドメイン層の純粋関数を呼び出し
    let (fine, event) = domain::fine::pay_fine(fine, cmd.paid_at).map_err(|e| match e {
        domain::PayFineError::AlreadyPaid => LoanApplicationError::FineAlreadyPaid,
    })?;

    // 3. 未払いの場合のみ更新
    let updated = deps
        .fine_repository
        .mark_paid(cmd.fine_id)
        .await
        .map_err(LoanApplicationError::FineRepositoryError)?;

    if !updated {
        return Err(LoanApplicationError::FineAlreadyPaid);
    }

    tracing::info!(fine_id = %fine.fine_id, amount = %fine.amount, "Fine paid");

    publish(&deps.loan_notifier, DomainEvent::FinePaid(event)).await;

    Ok(fine)
}

pub async fn list_fines(deps: &ServiceDependencies) -> Result<Vec<Fine>> {
    deps.fine_repository
        .find_all()
        .await
        .map_err(LoanApplicationError::FineRepositoryError)
}

pub async fn fines_by_user(deps: &ServiceDependencies, user_id: UserId) -> Result<Vec<Fine>> {
    deps.fine_repository
        .find_by_user_id(user_id)
        .await
        .map_err(LoanApplicationError::FineRepositoryError)
}

pub async fn unpaid_fines_by_user(
    deps: &ServiceDependencies,
    user_id: UserId,
) -> Result<Vec<Fine>> {
    deps.fine_repository
        .find_unpaid_by_user_id(user_id)
        .await
        .map_err(LoanApplicationError::FineRepositoryError)
}

/// 利用者の未払い罰金の合計
pub async fn unpaid_fine_total(deps: &ServiceDependencies, user_id: UserId) -> Result<Decimal> {
    let fines = unpaid_fines_by_user(deps, user_id).await?;
    Ok(fines.iter().map(|f| f.amount).sum())
}
