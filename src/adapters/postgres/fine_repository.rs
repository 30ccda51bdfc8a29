use crate::domain::{
    fine::{Fine, FineReason},
    value_objects::{FineId, LoanId, UserId},
};
use crate::ports::fine_repository::{FineRepository as FineRepositoryTrait, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

use super::invalid_data;

const FINE_COLUMNS: &str = "fine_id, loan_id, user_id, amount, reason, paid, created_at";

fn map_row_to_fine(row: &PgRow) -> Result<Fine> {
    let reason_str: &str = row.get("reason");
    let reason = FineReason::from_str(reason_str).map_err(invalid_data)?;

    Ok(Fine {
        fine_id: FineId::from_uuid(row.get("fine_id")),
        loan_id: LoanId::from_uuid(row.get("loan_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        amount: row.get("amount"),
        reason,
        paid: row.get("paid"),
        created_at: row.get("created_at"),
    })
}

/// FineRepositoryのPostgreSQL実装
///
/// 罰金の挿入は貸出の終了と同じトランザクションで `LoanRepository` が行う。
pub struct FineRepository {
    pool: PgPool,
}

impl FineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_by(&self, filter: &str, id: uuid::Uuid) -> Result<Vec<Fine>> {
        let rows = sqlx::query(&format!(
            "SELECT {FINE_COLUMNS} FROM fines WHERE {filter} ORDER BY created_at ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_fine).collect()
    }
}

#[async_trait]
impl FineRepositoryTrait for FineRepository {
    async fn get_by_id(&self, fine_id: FineId) -> Result<Option<Fine>> {
        let row = sqlx::query(&format!("SELECT {FINE_COLUMNS} FROM fines WHERE fine_id = $1"))
            .bind(fine_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_fine).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Fine>> {
        let rows = sqlx::query(&format!(
            "SELECT {FINE_COLUMNS} FROM fines ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_fine).collect()
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Fine>> {
        self.fetch_by("user_id = $1", user_id.value()).await
    }

    async fn find_unpaid_by_user_id(&self, user_id: UserId) -> Result<Vec<Fine>> {
        self.fetch_by("user_id = $1 AND paid = FALSE", user_id.value())
            .await
    }

    /// 未払いの場合のみ更新する
    async fn mark_paid(&self, fine_id: FineId) -> Result<bool> {
        let result = sqlx::query("UPDATE fines SET paid = TRUE WHERE fine_id = $1 AND paid = FALSE")
            .bind(fine_id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
