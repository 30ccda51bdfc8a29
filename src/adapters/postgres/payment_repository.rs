use crate::domain::{
    payment::{Payment, PaymentLogEntry, PaymentMethod, PaymentStatus, PaymentType},
    value_objects::{PaymentId, UserId},
};
use crate::ports::payment_repository::{
    PaymentFilter, PaymentRepository as PaymentRepositoryTrait, Result,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

use super::{invalid_data, payment_log_store::append_entries};

const PAYMENT_COLUMNS: &str = r#"
    payment_id,
    user_id,
    amount,
    payment_type,
    method,
    status,
    reference_id,
    created_at,
    updated_at
"#;

fn map_row_to_payment(row: &PgRow) -> Result<Payment> {
    let type_str: &str = row.get("payment_type");
    let method_str: &str = row.get("method");
    let status_str: &str = row.get("status");

    Ok(Payment {
        payment_id: PaymentId::from_uuid(row.get("payment_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        amount: row.get("amount"),
        payment_type: PaymentType::from_str(type_str).map_err(invalid_data)?,
        method: PaymentMethod::from_str(method_str).map_err(invalid_data)?,
        status: PaymentStatus::from_str(status_str).map_err(invalid_data)?,
        reference_id: row.get("reference_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// PaymentRepositoryのPostgreSQL実装
///
/// 支払いの変更とpayment_logsへの追記は同じトランザクションで行う。
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepositoryTrait for PaymentRepository {
    async fn insert_with_log(&self, payment: &Payment, entry: &PaymentLogEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id,
                user_id,
                amount,
                payment_type,
                method,
                status,
                reference_id,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.payment_id.value())
        .bind(payment.user_id.value())
        .bind(payment.amount)
        .bind(payment.payment_type.as_str())
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.reference_id)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await?;

        append_entries(&mut tx, payment.payment_id, std::slice::from_ref(entry)).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_by_id(&self, payment_id: PaymentId) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1"
        ))
        .bind(payment_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_payment).transpose()
    }

    async fn find(&self, filter: PaymentFilter) -> Result<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::varchar IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR reference_id = $3)
            ORDER BY created_at ASC
            "#
        ))
        .bind(filter.user_id.map(|id| id.value()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.reference_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_payment).collect()
    }

    /// `expected` がNULLなら状態を問わず更新する
    async fn transition(
        &self,
        payment: &Payment,
        expected: Option<PaymentStatus>,
        entry: &PaymentLogEntry,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, updated_at = $3
            WHERE payment_id = $1 AND ($4::varchar IS NULL OR status = $4)
            "#,
        )
        .bind(payment.payment_id.value())
        .bind(payment.status.as_str())
        .bind(payment.updated_at)
        .bind(expected.map(|s| s.as_str()))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        append_entries(&mut tx, payment.payment_id, std::slice::from_ref(entry)).await?;

        tx.commit().await?;
        Ok(true)
    }
}
