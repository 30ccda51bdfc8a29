use crate::domain::{
    fine::Fine,
    value_objects::{FineId, UserId},
};
use async_trait::async_trait;

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 罰金リポジトリポート
///
/// 罰金の作成は貸出の終了と同時に `LoanRepository::close` が行う。
/// ここでは参照と支払いのみ扱う。
#[async_trait]
pub trait FineRepository: Send + Sync {
    async fn get_by_id(&self, fine_id: FineId) -> Result<Option<Fine>>;

    async fn find_all(&self) -> Result<Vec<Fine>>;

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Fine>>;

    async fn find_unpaid_by_user_id(&self, user_id: UserId) -> Result<Vec<Fine>>;

    /// 未払いの罰金を支払い済みにする
    ///
    /// 既に支払い済み（または存在しない）なら `false`。
    async fn mark_paid(&self, fine_id: FineId) -> Result<bool>;
}
