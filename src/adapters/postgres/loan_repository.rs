use crate::domain::{
    fine::Fine,
    loan::{BorrowedLoan, Loan, LoanCore, LoanStatus},
    value_objects::{BookId, LoanId, UserId},
};
use crate::ports::loan_repository::{BorrowSlot, LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::str::FromStr;

use super::{insert_fine, invalid_data};

const LOAN_COLUMNS: &str = r#"
    loan_id,
    user_id,
    book_id,
    borrowed_at,
    due_date,
    returned_at,
    status,
    created_at,
    updated_at
"#;

/// PostgreSQLの行データをLoan集約に変換する
///
/// statusとreturned_atの組み合わせが不変条件に反する行はエラーにする。
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let status_str: &str = row.get("status");
    let status = LoanStatus::from_str(status_str).map_err(invalid_data)?;

    let core = LoanCore {
        loan_id: LoanId::from_uuid(row.get("loan_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        borrowed_at: row.get("borrowed_at"),
        due_date: row.get("due_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    };

    Loan::from_parts(core, status, row.get("returned_at")).map_err(|e| invalid_data(e.to_string()))
}

/// LoanRepositoryのPostgreSQL実装
///
/// 貸出の重複・上限チェックは利用者単位のアドバイザリロックの中で行い、
/// (user_id, book_id) WHERE status = 'BORROWED' の部分ユニークインデックスで二重に守る。
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    /// PostgreSQLコネクションプールから新しいLoanRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_loans(&self, sql: &str, bind: Option<uuid::Uuid>) -> Result<Vec<Loan>> {
        let query = sqlx::query(sql);
        let query = match bind {
            Some(id) => query.bind(id),
            None => query,
        };
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(map_row_to_loan).collect()
    }

    /// 利用者単位のトランザクションロックを取得する
    async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: UserId) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text, 0))")
            .bind(user_id.value())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    /// 条件付きで貸出を挿入する
    ///
    /// 同じ利用者の貸出リクエストはロックで直列化されるため、
    /// 件数の確認と挿入の間に別の貸出が割り込むことはない。
    async fn insert_if_allowed(&self, loan: &BorrowedLoan, max_active: usize) -> Result<BorrowSlot> {
        let mut tx = self.pool.begin().await?;

        Self::lock_user(&mut tx, loan.user_id).await?;

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE book_id = $2) AS same_book,
                COUNT(*) AS active
            FROM loans
            WHERE user_id = $1 AND status = 'BORROWED'
            "#,
        )
        .bind(loan.user_id.value())
        .bind(loan.book_id.value())
        .fetch_one(&mut *tx)
        .await?;

        let same_book: i64 = row.get("same_book");
        let active: i64 = row.get("active");

        if same_book > 0 {
            return Ok(BorrowSlot::AlreadyBorrowed);
        }
        if active >= max_active as i64 {
            return Ok(BorrowSlot::LimitReached);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                user_id,
                book_id,
                borrowed_at,
                due_date,
                returned_at,
                status,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, NULL, 'BORROWED', $6, $7)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.user_id.value())
        .bind(loan.book_id.value())
        .bind(loan.borrowed_at)
        .bind(loan.due_date)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Ok(BorrowSlot::AlreadyBorrowed);
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(BorrowSlot::Inserted)
    }

    /// 貸出を終了状態にし、罰金を同じトランザクションで保存する
    async fn close(&self, loan: &Loan, fine: Option<&Fine>) -> Result<bool> {
        let Some(returned_at) = loan.returned_at() else {
            return Err("cannot close a loan that is still BORROWED".into());
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE loans
            SET status = $2, returned_at = $3, updated_at = $4
            WHERE loan_id = $1 AND status = 'BORROWED'
            "#,
        )
        .bind(loan.loan_id().value())
        .bind(loan.status().as_str())
        .bind(returned_at)
        .bind(loan.core().updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(fine) = fine {
            insert_fine(&mut tx, fine).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!("SELECT {LOAN_COLUMNS} FROM loans WHERE loan_id = $1"))
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Loan>> {
        self.fetch_loans(
            &format!("SELECT {LOAN_COLUMNS} FROM loans ORDER BY borrowed_at DESC"),
            None,
        )
        .await
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Loan>> {
        self.fetch_loans(
            &format!("SELECT {LOAN_COLUMNS} FROM loans WHERE user_id = $1 ORDER BY borrowed_at DESC"),
            Some(user_id.value()),
        )
        .await
    }

    async fn find_by_book_id(&self, book_id: BookId) -> Result<Vec<Loan>> {
        self.fetch_loans(
            &format!("SELECT {LOAN_COLUMNS} FROM loans WHERE book_id = $1 ORDER BY borrowed_at DESC"),
            Some(book_id.value()),
        )
        .await
    }

    async fn find_active_by_user_id(&self, user_id: UserId) -> Result<Vec<Loan>> {
        self.fetch_loans(
            &format!(
                "SELECT {LOAN_COLUMNS} FROM loans \
                 WHERE user_id = $1 AND status = 'BORROWED' ORDER BY borrowed_at DESC"
            ),
            Some(user_id.value()),
        )
        .await
    }

    async fn count_active_by_user_id(&self, user_id: UserId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND status = 'BORROWED'",
        )
        .bind(user_id.value())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    /// 延滞候補を検索する
    ///
    /// (due_date) WHERE status = 'BORROWED' の部分インデックスを使用する。
    async fn find_overdue(&self, cutoff: DateTime<Utc>) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE status = 'BORROWED' AND due_date < $1 ORDER BY due_date ASC"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    /// 罰金は外部キーの ON DELETE CASCADE で削除される
    async fn delete(&self, loan_id: LoanId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM loans WHERE loan_id = $1")
            .bind(loan_id.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
