use crate::domain::{self, DomainEvent, Loan};
use chrono::{DateTime, Utc};

use super::errors::{LoanApplicationError, Result};
use super::loan_service::{ServiceDependencies, publish};

/// 延滞リマインダーのバッチ
///
/// 定期的に実行され、返却期限を過ぎた貸出ごとにBOOK_OVERDUE通知を1件登録する。
///
/// ビジネスルール：
/// - 返却期限（due_date）を過ぎたBORROWEDの貸出が対象
/// - 貸出の状態は変更しない（延滞は状態ではなく期限との比較で判定する）
/// - 通知の登録に失敗した貸出は件数に含めない
///
/// # 戻り値
/// 登録したリマインダーの件数
pub async fn send_overdue_reminders(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<usize> {
    let mut enqueued = 0;

    // 1. 延滞候補を取得
    let candidates = deps
        .loan_repository
        .find_overdue(now)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;

    // 2. 各候補について延滞イベントを生成して通知
    for loan in candidates {
        let Loan::Borrowed(borrowed) = loan else {
            continue;
        };

        let Some(event) = domain::loan::detect_overdue(&borrowed, now) else {
            continue;
        };

        if publish(&deps.loan_notifier, DomainEvent::LoanOverdue(event)).await {
            enqueued += 1;
        }
    }

    tracing::info!(enqueued, "Overdue reminders enqueued");

    Ok(enqueued)
}
