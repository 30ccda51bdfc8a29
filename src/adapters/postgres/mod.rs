pub mod fine_repository;
pub mod loan_repository;
pub mod notification_repository;
pub mod payment_log_store;
pub mod payment_repository;

// パブリックに型を再エクスポート
pub use fine_repository::FineRepository as PostgresFineRepository;
pub use loan_repository::LoanRepository as PostgresLoanRepository;
pub use notification_repository::NotificationRepository as PostgresNotificationRepository;
pub use payment_log_store::PaymentLogStore as PostgresPaymentLogStore;
pub use payment_repository::PaymentRepository as PostgresPaymentRepository;

use crate::domain::fine::Fine;
use sqlx::{Postgres, Transaction};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 列の値がドメインの型に変換できない場合のエラー
pub(crate) fn invalid_data(message: impl Into<String>) -> BoxError {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.into(),
    ))
}

/// 罰金を1件挿入する（貸出の終了と同じトランザクション内）
pub(crate) async fn insert_fine(
    tx: &mut Transaction<'_, Postgres>,
    fine: &Fine,
) -> Result<(), BoxError> {
    sqlx::query(
        r#"
        INSERT INTO fines (fine_id, loan_id, user_id, amount, reason, paid, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(fine.fine_id.value())
    .bind(fine.loan_id.value())
    .bind(fine.user_id.value())
    .bind(fine.amount)
    .bind(fine.reason.as_str())
    .bind(fine.paid)
    .bind(fine.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
