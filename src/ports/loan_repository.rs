use crate::domain::{
    fine::Fine,
    loan::{BorrowedLoan, Loan},
    value_objects::{BookId, LoanId, UserId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 条件付き挿入の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowSlot {
    /// 挿入された
    Inserted,
    /// 同じ書籍を既に貸出中
    AlreadyBorrowed,
    /// 貸出中の冊数が上限に達している
    LimitReached,
}

/// 貸出リポジトリポート
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 貸出を条件付きで挿入する
    ///
    /// 「同じ利用者が同じ書籍を貸出中でない」かつ「貸出中の冊数が
    /// `max_active` 未満」の判定と挿入を、利用者単位でアトミックに行う。
    /// 同時に届いた貸出リクエストが上限をすり抜けることはない。
    async fn insert_if_allowed(&self, loan: &BorrowedLoan, max_active: usize)
    -> Result<BorrowSlot>;

    /// 貸出を終了状態で保存する（返却・紛失）
    ///
    /// 保存済みの状態がBORROWEDの場合に限り更新し、発行された罰金も同時に保存する。
    /// 既に終了していた場合は何も変更せず `false` を返す。
    async fn close(&self, loan: &Loan, fine: Option<&Fine>) -> Result<bool>;

    /// IDで貸出を取得する
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 全貸出を取得する
    async fn find_all(&self) -> Result<Vec<Loan>>;

    /// 利用者の全貸出を取得する（貸出履歴）
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Loan>>;

    /// 書籍の全貸出を取得する
    async fn find_by_book_id(&self, book_id: BookId) -> Result<Vec<Loan>>;

    /// 利用者の貸出中の貸出を取得する
    async fn find_active_by_user_id(&self, user_id: UserId) -> Result<Vec<Loan>>;

    /// 利用者の貸出中の冊数
    async fn count_active_by_user_id(&self, user_id: UserId) -> Result<u64>;

    /// 延滞候補を検索する
    ///
    /// due_date < cutoff かつ BORROWED の貸出を返す。延滞リマインダーで使用される。
    async fn find_overdue(&self, cutoff: DateTime<Utc>) -> Result<Vec<Loan>>;

    /// 貸出と関連する罰金を削除する（管理者操作）
    ///
    /// 存在しなかった場合は `false`。
    async fn delete(&self, loan_id: LoanId) -> Result<bool>;
}
